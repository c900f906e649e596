//! Command line of `deskrelayd`.

use std::path::PathBuf;

use clap::{CommandFactory, Parser};

use crate::container::RelayConfig;

/// DeskRelay: desktop-wide message router daemon
#[derive(Parser, Debug, Default, Clone, PartialEq, Eq)]
#[command(name = "deskrelayd")]
#[command(about = "Desktop-wide inter-process message router")]
pub struct Cli {
    /// Stay in the foreground
    #[arg(long)]
    pub nofork: bool,

    /// Do not become a session leader
    #[arg(long)]
    pub nosid: bool,

    /// Only listen on the local socket (no TCP)
    #[arg(long)]
    pub nolocal: bool,

    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse `args`; `None` means usage was printed and the process should exit 0.
    pub fn parse_or_usage<I, T>(args: I) -> Option<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        match Self::try_parse_from(args) {
            Ok(cli) => Some(cli),
            Err(err) => {
                use clap::error::ErrorKind;
                match err.kind() {
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                        let _ = err.print();
                    }
                    _ => {
                        let _ = Self::command().print_help();
                    }
                }
                None
            }
        }
    }

    /// Apply flags that override configuration.
    pub fn apply(&self, config: &mut RelayConfig) {
        if self.nolocal {
            config.network.enable_tcp = false;
        }
    }
}
