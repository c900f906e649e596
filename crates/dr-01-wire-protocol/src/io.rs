//! # Async Frame I/O
//!
//! Reading and writing frames over any tokio byte stream, plus the cookie
//! handshake that precedes the first frame on a connection.
//!
//! ```text
//! client                                   router
//!   │ ── u32 len + cookie bytes ──────────→ │
//!   │ ←──────────────── 0x01 accept/0x00 ── │
//!   │ ══ frames ═════════════════════════ ⇄ │
//! ```

use std::io;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::codec::{FrameHeader, HEADER_LEN};
use crate::envelope::Envelope;
use crate::error::ProtocolError;

/// Handshake verdict byte: cookie accepted.
pub const AUTH_ACCEPTED: u8 = 0x01;

/// Handshake verdict byte: cookie rejected.
pub const AUTH_REJECTED: u8 = 0x00;

/// Largest cookie a server will read.
pub const MAX_COOKIE_LEN: usize = 256;

/// Errors from frame I/O.
#[derive(Debug, Error)]
pub enum FrameIoError {
    /// Underlying stream failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Frame could not be framed or encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// A frame read off the stream, not yet decoded.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Fixed header.
    pub header: FrameHeader,
    /// Payload bytes.
    pub payload: Bytes,
}

impl RawFrame {
    /// Decode into an envelope.
    pub fn decode(self) -> Result<Envelope, ProtocolError> {
        Envelope::decode(&self.header, self.payload)
    }
}

/// Read one frame.
///
/// Returns `Ok(None)` on a clean end of stream between frames.
pub async fn read_frame<R>(
    reader: &mut R,
    max_payload: usize,
) -> Result<Option<RawFrame>, FrameIoError>
where
    R: AsyncRead + Unpin,
{
    let mut raw = [0u8; HEADER_LEN];
    let first = reader.read(&mut raw).await?;
    if first == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut raw[first..]).await?;

    let header = FrameHeader::parse(&raw);
    let len = header.check_len(max_payload)?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    Ok(Some(RawFrame {
        header,
        payload: Bytes::from(payload),
    }))
}

/// Encode and write one envelope.
pub async fn write_frame<W>(writer: &mut W, envelope: &Envelope) -> Result<(), FrameIoError>
where
    W: AsyncWrite + Unpin,
{
    let frame = envelope.encode()?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Client side: send the cookie.
pub async fn send_cookie<W>(writer: &mut W, cookie: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u32(cookie.len() as u32).await?;
    writer.write_all(cookie).await?;
    writer.flush().await
}

/// Server side: read the cookie a client presents.
pub async fn recv_cookie<R>(reader: &mut R) -> Result<Bytes, FrameIoError>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await? as usize;
    if len > MAX_COOKIE_LEN {
        return Err(ProtocolError::PayloadTooLarge {
            len,
            max: MAX_COOKIE_LEN,
        }
        .into());
    }
    let mut cookie = vec![0u8; len];
    reader.read_exact(&mut cookie).await?;
    Ok(Bytes::from(cookie))
}

/// Server side: answer the handshake.
pub async fn send_verdict<W>(writer: &mut W, accepted: bool) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let verdict = if accepted { AUTH_ACCEPTED } else { AUTH_REJECTED };
    writer.write_u8(verdict).await?;
    writer.flush().await
}

/// Client side: send the cookie and wait for the verdict.
pub async fn authenticate<S>(stream: &mut S, cookie: &[u8]) -> io::Result<bool>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send_cookie(stream, cookie).await?;
    Ok(stream.read_u8().await? == AUTH_ACCEPTED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;

    #[tokio::test]
    async fn test_frames_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        let first = Envelope::new(Opcode::Send, 0, "a", "b*", Bytes::from_static(b"x"));
        let second = Envelope::new(Opcode::Call, 3, "a", "c", Bytes::new());
        write_frame(&mut client, &first).await.unwrap();
        write_frame(&mut client, &second).await.unwrap();
        drop(client);

        let got = read_frame(&mut server, 1024).await.unwrap().unwrap();
        assert_eq!(got.decode().unwrap(), first);
        let got = read_frame(&mut server, 1024).await.unwrap().unwrap();
        assert_eq!(got.decode().unwrap(), second);
        assert!(read_frame(&mut server, 1024).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let big = Envelope::new(Opcode::Send, 0, "a", "b", Bytes::from(vec![0u8; 200]));
        write_frame(&mut client, &big).await.unwrap();

        let err = read_frame(&mut server, 64).await.unwrap_err();
        assert!(matches!(
            err,
            FrameIoError::Protocol(ProtocolError::PayloadTooLarge { max: 64, .. })
        ));
    }

    #[tokio::test]
    async fn test_truncated_frame_is_io_error() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        client.write_all(&[0, 0, 0, 1, 0, 0]).await.unwrap();
        drop(client);

        let err = read_frame(&mut server, 64).await.unwrap_err();
        assert!(matches!(err, FrameIoError::Io(_)));
    }

    #[tokio::test]
    async fn test_handshake() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        let server_side = tokio::spawn(async move {
            let cookie = recv_cookie(&mut server).await.unwrap();
            send_verdict(&mut server, &cookie[..] == b"secret").await.unwrap();
        });

        assert!(authenticate(&mut client, b"secret").await.unwrap());
        server_side.await.unwrap();
    }

    #[tokio::test]
    async fn test_handshake_cookie_too_long() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        send_cookie(&mut client, &[7u8; MAX_COOKIE_LEN + 1]).await.unwrap();

        let err = recv_cookie(&mut server).await.unwrap_err();
        assert!(matches!(
            err,
            FrameIoError::Protocol(ProtocolError::PayloadTooLarge { .. })
        ));
    }
}
