//! # Connection Tasks
//!
//! One reader task and one writer task per authenticated connection.

use std::sync::Arc;

use bytes::Bytes;
use dr_01_wire_protocol::io::{read_frame, recv_cookie, send_verdict, FrameIoError};
use shared_types::ConnectionHandle;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, WriteHalf};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, warn};

use super::{ListenerContext, TransportError, TransportEvent};

/// Authenticate `stream`, then pump frames until it closes.
pub async fn serve_connection<S>(mut stream: S, peer: String, ctx: Arc<ListenerContext>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    if let Err(error) = handshake(&mut stream, &ctx).await {
        warn!(peer = %peer, %error, "Handshake failed, dropping connection");
        return;
    }

    let handle = ctx.next_handle();
    let (mut reader, writer) = tokio::io::split(stream);
    let (writer_tx, writer_rx) = mpsc::unbounded_channel();
    if ctx
        .events
        .send(TransportEvent::Accepted {
            handle,
            writer: writer_tx,
        })
        .is_err()
    {
        return;
    }
    debug!(conn = %handle, peer = %peer, "Connection authenticated");

    tokio::spawn(write_frames(handle, writer, writer_rx));

    loop {
        match read_frame(&mut reader, ctx.max_payload).await {
            Ok(Some(raw)) => match raw.decode() {
                Ok(envelope) => {
                    if ctx
                        .events
                        .send(TransportEvent::Frame { handle, envelope })
                        .is_err()
                    {
                        return;
                    }
                }
                // Length was valid, so the stream is still in sync
                Err(error) => warn!(conn = %handle, %error, "Skipping undecodable frame"),
            },
            Ok(None) => break,
            Err(FrameIoError::Io(error)) => {
                debug!(conn = %handle, %error, "Connection read failed");
                break;
            }
            Err(FrameIoError::Protocol(error)) => {
                warn!(conn = %handle, %error, "Framing error, closing connection");
                break;
            }
        }
    }

    let _ = ctx.events.send(TransportEvent::Closed { handle });
}

async fn handshake<S>(stream: &mut S, ctx: &ListenerContext) -> Result<(), TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let presented = tokio::time::timeout(ctx.handshake_timeout, recv_cookie(stream))
        .await
        .map_err(|_| TransportError::HandshakeTimeout)??;

    let accepted = ctx.cookie.verify(&presented);
    send_verdict(stream, accepted)
        .await
        .map_err(FrameIoError::from)?;

    if accepted {
        Ok(())
    } else {
        Err(TransportError::CookieRejected)
    }
}

async fn write_frames<S>(
    handle: ConnectionHandle,
    mut writer: WriteHalf<S>,
    mut frames: UnboundedReceiver<Bytes>,
) where
    S: AsyncWrite,
{
    while let Some(frame) = frames.recv().await {
        if let Err(error) = writer.write_all(&frame).await {
            debug!(conn = %handle, %error, "Connection write failed");
            return;
        }
    }
    let _ = writer.shutdown().await;
}
