//! # Listeners
//!
//! The Unix socket is always bound; TCP only unless `--nolocal`.

use std::fs;
use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::{TcpListener, UnixListener};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::connection::serve_connection;
use super::{ListenerContext, TransportError};

/// Bound listening sockets.
#[derive(Debug)]
pub struct Listeners {
    unix: UnixListener,
    unix_path: PathBuf,
    tcp: Option<TcpListener>,
}

impl Listeners {
    /// Bind the Unix socket at `socket_path` and, if given, TCP at `tcp_bind`.
    ///
    /// A leftover socket file from a dead daemon is replaced.
    pub async fn bind(
        socket_path: &Path,
        tcp_bind: Option<SocketAddr>,
    ) -> Result<Self, TransportError> {
        let bind_error = |address: String| {
            move |source| TransportError::Bind { address, source }
        };
        let local = socket_path.display().to_string();

        if let Some(parent) = socket_path.parent() {
            fs::create_dir_all(parent).map_err(bind_error(local.clone()))?;
        }
        if socket_path.exists() {
            let _ = fs::remove_file(socket_path);
        }
        let unix = UnixListener::bind(socket_path).map_err(bind_error(local.clone()))?;
        fs::set_permissions(socket_path, fs::Permissions::from_mode(0o600))
            .map_err(bind_error(local))?;

        let tcp = match tcp_bind {
            Some(address) => Some(
                TcpListener::bind(address)
                    .await
                    .map_err(bind_error(address.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            unix,
            unix_path: socket_path.to_path_buf(),
            tcp,
        })
    }

    /// Addresses for the discovery file.
    pub fn addresses(&self) -> Vec<String> {
        let mut addresses = vec![format!("local:{}", self.unix_path.display())];
        if let Some(tcp) = &self.tcp {
            match tcp.local_addr() {
                Ok(address) => addresses.push(format!("tcp:{address}")),
                Err(error) => warn!(%error, "TCP listener has no local address"),
            }
        }
        addresses
    }

    /// Path of the Unix socket.
    pub fn unix_path(&self) -> &Path {
        &self.unix_path
    }

    /// Start accepting until `shutdown` turns true.
    pub fn spawn(
        self,
        ctx: Arc<ListenerContext>,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        info!(socket = %self.unix_path.display(), tcp = self.tcp.is_some(), "Listening");

        let mut tasks = vec![tokio::spawn(accept_unix(
            self.unix,
            Arc::clone(&ctx),
            shutdown.clone(),
        ))];
        if let Some(tcp) = self.tcp {
            tasks.push(tokio::spawn(accept_tcp(tcp, ctx, shutdown)));
        }
        tasks
    }
}

async fn accept_unix(
    listener: UnixListener,
    ctx: Arc<ListenerContext>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            accept = listener.accept() => match accept {
                Ok((stream, _addr)) => {
                    tokio::spawn(serve_connection(stream, "local".to_string(), Arc::clone(&ctx)));
                }
                Err(error) => warn!(%error, "Unix accept failed"),
            }
        }
    }
}

async fn accept_tcp(
    listener: TcpListener,
    ctx: Arc<ListenerContext>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            accept = listener.accept() => match accept {
                Ok((stream, addr)) => {
                    let _ = stream.set_nodelay(true);
                    tokio::spawn(serve_connection(stream, addr.to_string(), Arc::clone(&ctx)));
                }
                Err(error) => warn!(%error, "TCP accept failed"),
            }
        }
    }
}
