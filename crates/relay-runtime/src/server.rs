//! # Relay Server
//!
//! The router task. Owns the `MessageRouter` and reacts to transport events
//! and process control one at a time.
//!
//! ```text
//! TransportEvent::Accepted ──→ attach writer, insert connection
//! TransportEvent::Frame    ──→ route
//! TransportEvent::Closed   ──→ teardown, detach writer
//! ControlEvent::Reload     ──→ rewrite discovery file
//! ControlEvent::Shutdown   ──→ stop listeners, return
//! ```

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dr_02_message_router::{MessageRouter, RouteOutcome, RouterApi};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::adapters::{ConnectionWriters, HubRelay};
use crate::bootstrap::{discovery, BootstrapError, DiscoveryRecord, SessionCookie};
use crate::container::LimitsConfig;
use crate::transport::{ListenerContext, Listeners, TransportEvent};

/// Router wired to the runtime adapters.
pub type RelayRouter = MessageRouter<ConnectionWriters, HubRelay>;

/// Process-level requests for the router task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Rewrite the discovery file.
    Reload,
    /// Stop serving.
    Shutdown,
}

enum Wake {
    Transport(TransportEvent),
    Control(ControlEvent),
}

/// The router task.
pub struct RelayServer {
    router: RelayRouter,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    discovery: Option<(PathBuf, DiscoveryRecord)>,
}

impl Default for RelayServer {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayServer {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            router: MessageRouter::new(ConnectionWriters::new(), HubRelay::new()),
            events_tx,
            events_rx,
            shutdown_tx,
            shutdown_rx,
            discovery: None,
        }
    }

    /// Start accepting on `listeners`.
    pub fn start(
        &self,
        listeners: Listeners,
        cookie: SessionCookie,
        limits: &LimitsConfig,
    ) -> Vec<JoinHandle<()>> {
        let ctx = Arc::new(ListenerContext::new(
            cookie,
            limits.max_payload_bytes,
            limits.handshake_timeout(),
            self.events_tx.clone(),
        ));
        listeners.spawn(ctx, self.shutdown_rx.clone())
    }

    /// Write the discovery file and remember it for `Reload`.
    pub fn publish_discovery(
        &mut self,
        path: PathBuf,
        record: DiscoveryRecord,
    ) -> Result<(), BootstrapError> {
        discovery::write(&path, &record)?;
        self.discovery = Some((path, record));
        Ok(())
    }

    /// The router.
    pub fn router(&self) -> &RelayRouter {
        &self.router
    }

    /// Serve until `ControlEvent::Shutdown` or until `control` closes.
    pub async fn run(&mut self, mut control: mpsc::UnboundedReceiver<ControlEvent>) {
        loop {
            let wake = tokio::select! {
                Some(event) = self.events_rx.recv() => Wake::Transport(event),
                event = control.recv() => Wake::Control(event.unwrap_or(ControlEvent::Shutdown)),
            };

            match wake {
                Wake::Transport(event) => self.handle_event(event),
                Wake::Control(ControlEvent::Reload) => self.reload(),
                Wake::Control(ControlEvent::Shutdown) => break,
            }
        }

        info!(
            connections = self.router.connection_count(),
            registered = self.router.registered_count(),
            "Router shutting down"
        );
        let _ = self.shutdown_tx.send(true);
        self.router.sink_mut().clear();
    }

    /// Apply one transport event.
    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Accepted { handle, writer } => {
                if let Err(error) = self.router.connection_accepted(handle) {
                    warn!(conn = %handle, %error, "Rejecting connection");
                    return;
                }
                self.router.sink_mut().attach(handle, writer);
            }
            TransportEvent::Frame { handle, envelope } => {
                let opcode = envelope.opcode;
                match self.router.route(handle, envelope) {
                    RouteOutcome::Dropped(reason) => {
                        debug!(conn = %handle, %opcode, %reason, "Envelope dropped");
                    }
                    outcome => debug!(conn = %handle, %opcode, ?outcome, "Envelope routed"),
                }
            }
            TransportEvent::Closed { handle } => {
                self.router.disconnect(handle);
                self.router.sink_mut().detach(handle);
            }
        }
    }

    fn reload(&self) {
        info!(
            connections = self.router.connection_count(),
            registered = self.router.registered_count(),
            "Reload requested"
        );
        if let Some((path, record)) = &self.discovery {
            if let Err(error) = discovery::write(path, record) {
                error!(%error, "Failed to rewrite discovery file");
            }
        }
    }
}

/// Translate `SIGTERM`, `SIGINT` and `SIGHUP` into control events.
pub fn spawn_signal_forwarder(
    control: mpsc::UnboundedSender<ControlEvent>,
) -> io::Result<JoinHandle<()>> {
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut hangup = signal(SignalKind::hangup())?;

    Ok(tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = terminate.recv() => ControlEvent::Shutdown,
                _ = interrupt.recv() => ControlEvent::Shutdown,
                _ = hangup.recv() => ControlEvent::Reload,
            };
            info!(?event, "Signal received");
            if control.send(event).is_err() || event == ControlEvent::Shutdown {
                break;
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use dr_01_wire_protocol::{ArgWriter, CallBody, Envelope, Opcode};
    use shared_types::{ConnectionHandle, SERVER_APP_ID};

    fn accept(server: &mut RelayServer, raw: u64) -> mpsc::UnboundedReceiver<Bytes> {
        let (writer, frames) = mpsc::unbounded_channel();
        server.handle_event(TransportEvent::Accepted {
            handle: ConnectionHandle::new(raw),
            writer,
        });
        frames
    }

    #[tokio::test]
    async fn test_events_drive_router() {
        let mut server = RelayServer::new();
        let mut frames = accept(&mut server, 1);
        assert_eq!(server.router().connection_count(), 1);

        let body = CallBody::new("", "registerAs", ArgWriter::new().string("kate").finish());
        server.handle_event(TransportEvent::Frame {
            handle: ConnectionHandle::new(1),
            envelope: Envelope::new(Opcode::Call, 0, "anon", SERVER_APP_ID, body.encode()),
        });
        assert!(frames.try_recv().is_ok());
        assert_eq!(server.router().registered_count(), 1);

        server.handle_event(TransportEvent::Closed {
            handle: ConnectionHandle::new(1),
        });
        assert_eq!(server.router().connection_count(), 0);
        assert!(server.router().sink().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_accept_keeps_first_writer() {
        let mut server = RelayServer::new();
        let _first = accept(&mut server, 1);
        let _second = accept(&mut server, 1);
        assert_eq!(server.router().connection_count(), 1);
        assert_eq!(server.router().sink().len(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".deskrelay_test");
        let mut server = RelayServer::new();
        server
            .publish_discovery(path.clone(), DiscoveryRecord::for_current_process(vec![]))
            .unwrap();
        std::fs::remove_file(&path).unwrap();

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        control_tx.send(ControlEvent::Reload).unwrap();
        control_tx.send(ControlEvent::Shutdown).unwrap();
        server.run(control_rx).await;

        assert!(path.exists());
        assert!(*server.shutdown_rx.borrow());
    }
}
