use std::path::PathBuf;

use clap::{Parser, Subcommand};
use live_notify::logging::DEFAULT_LOG_LEVEL;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Push a notification when Twitch channels go live",
    long_about = None
)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml", env = "LIVE_NOTIFY_CONFIG")]
    pub config: PathBuf,

    /// Log level for live-notify (overridden by RUST_LOG)
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, env = "LIVE_NOTIFY_LOG_LEVEL")]
    pub log_level: String,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Poll until interrupted (default)
    Run {
        /// Run a single poll cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Validate configuration, credentials and configured channels
    Check {
        /// Also send a test notification
        #[arg(long)]
        send_test: bool,
    },
}

impl Args {
    pub fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Run { once: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_run() {
        let args = Args::try_parse_from(["live-notify"]).unwrap();
        assert_eq!(args.config, PathBuf::from("config.yaml"));
        assert_eq!(args.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(args.command(), Commands::Run { once: false });
    }

    #[test]
    fn test_check_with_send_test() {
        let args =
            Args::try_parse_from(["live-notify", "-c", "/etc/ln.yaml", "check", "--send-test"])
                .unwrap();
        assert_eq!(args.config, PathBuf::from("/etc/ln.yaml"));
        assert_eq!(args.command(), Commands::Check { send_test: true });
    }

    #[test]
    fn test_run_once() {
        let args = Args::try_parse_from(["live-notify", "--log-level", "debug", "run", "--once"])
            .unwrap();
        assert_eq!(args.log_level, "debug");
        assert_eq!(args.command(), Commands::Run { once: true });
    }
}
