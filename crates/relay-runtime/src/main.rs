//! # deskrelayd
//!
//! Entry point of the DeskRelay daemon.
//!
//! ## Startup Sequence
//!
//! 1. Parse flags (unknown flags print usage and exit 0)
//! 2. Load configuration (defaults, TOML, `DR_*` environment, flags)
//! 3. Take the startup lock; hand over to a running instance if there is one
//! 4. Fork and detach, then build a single-threaded runtime
//! 5. Write the cookie, bind listeners, publish the discovery file
//! 6. Route until `SIGTERM`/`SIGINT`, then remove every published file

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use relay_runtime::bootstrap::{
    daemonize, discovery, DiscoveryRecord, ForkOutcome, InstanceCheck, RelayPaths, SessionCookie,
    SessionScope, StartupLock,
};
use relay_runtime::transport::Listeners;
use relay_runtime::{spawn_signal_forwarder, Cli, RelayConfig, RelayServer};

fn main() -> Result<()> {
    let Some(cli) = Cli::parse_or_usage(std::env::args_os()) else {
        return Ok(());
    };

    init_logging(cli.debug)?;

    let mut config = RelayConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);

    let scope = SessionScope::current().context("Failed to determine session scope")?;
    let paths = RelayPaths::resolve(&config, &scope);
    debug!(?paths, "Resolved session paths");

    let lock = StartupLock::acquire(&paths.lock).context("Failed to take startup lock")?;
    match discovery::check_existing(&paths.discovery)? {
        InstanceCheck::Running(record) => {
            info!(pid = record.pid, "DeskRelay already running, asking it to refresh");
            discovery::notify_running(record.pid)?;
            return Ok(());
        }
        InstanceCheck::Stale => discovery::remove(&paths.discovery)?,
        InstanceCheck::Absent => {}
    }

    if let ForkOutcome::Parent(child) = daemonize(cli.nofork, cli.nosid)? {
        debug!(%child, "Daemon forked");
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;
    runtime.block_on(run(config, paths, lock))
}

fn init_logging(debug: bool) -> Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run(config: RelayConfig, paths: RelayPaths, lock: StartupLock) -> Result<()> {
    info!("===========================================");
    info!("  DeskRelay v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let cookie = SessionCookie::generate();
    cookie
        .write_to(&paths.cookie)
        .context("Failed to provision auth cookie")?;

    let tcp_bind = config.network.enable_tcp.then_some(config.network.tcp_bind);
    let listeners = Listeners::bind(&paths.socket, tcp_bind)
        .await
        .context("Failed to open listeners")?;
    let addresses = listeners.addresses();

    let mut server = RelayServer::new();
    let _listener_tasks = server.start(listeners, cookie, &config.limits);
    server
        .publish_discovery(
            paths.discovery.clone(),
            DiscoveryRecord::for_current_process(addresses),
        )
        .context("Failed to publish discovery file")?;
    drop(lock);

    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let _signals = spawn_signal_forwarder(control_tx).context("Failed to install signal handlers")?;

    info!(pid = std::process::id(), "DeskRelay is running");
    server.run(control_rx).await;

    cleanup(&paths);
    info!("Shutdown complete");
    Ok(())
}

fn cleanup(paths: &RelayPaths) {
    if let Err(error) = discovery::remove(&paths.discovery) {
        warn!(%error, "Failed to remove discovery file");
    }
    for path in [&paths.socket, &paths.cookie] {
        if let Err(error) = std::fs::remove_file(path) {
            warn!(path = %path.display(), %error, "Failed to remove file");
        }
    }
}
