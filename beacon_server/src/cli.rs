use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "beacon", version, about = "Per-user notification poller")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Poll every registered stream until Ctrl-C (default if no subcommand given).
    Run {
        /// JSON file holding an array of stream registrations.
        #[arg(long, env = "BEACON_REGISTRATIONS")]
        registrations: Option<PathBuf>,

        /// Also apply enable/disable events read as JSON lines from stdin.
        #[arg(long)]
        stdin_events: bool,
    },

    /// Validate a registrations file without polling.
    CheckRegistrations {
        /// Path to the JSON registrations file.
        path: PathBuf,
    },

    /// Print the effective configuration.
    Config,
}

impl Cli {
    /// The given subcommand, or `run` with the same defaults an explicit `run` gets.
    pub fn command_or_default(self) -> Commands {
        self.command
            .unwrap_or_else(|| default_run(std::env::var_os("BEACON_REGISTRATIONS")))
    }
}

fn default_run(registrations: Option<OsString>) -> Commands {
    Commands::Run {
        registrations: registrations
            .filter(|v| !v.is_empty())
            .map(PathBuf::from),
        stdin_events: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_accepts_registrations_and_stdin_flag() {
        let cli = Cli::try_parse_from([
            "beacon",
            "run",
            "--registrations",
            "streams.json",
            "--stdin-events",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Run {
                registrations,
                stdin_events,
            }) => {
                assert_eq!(registrations, Some(PathBuf::from("streams.json")));
                assert!(stdin_events);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn no_subcommand_is_allowed() {
        let cli = Cli::try_parse_from(["beacon"]).unwrap();
        assert!(cli.command.is_none());
    }

    fn run_args(cmd: Commands) -> (Option<PathBuf>, bool) {
        match cmd {
            Commands::Run {
                registrations,
                stdin_events,
            } => (registrations, stdin_events),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn default_run_uses_registrations_env() {
        let (registrations, stdin_events) =
            run_args(default_run(Some(OsString::from("streams.json"))));
        assert_eq!(registrations, Some(PathBuf::from("streams.json")));
        assert!(!stdin_events);

        let (registrations, _) = run_args(default_run(Some(OsString::new())));
        assert_eq!(registrations, None);
    }

    #[test]
    fn default_run_matches_explicit_run_defaults() {
        let explicit = Cli::try_parse_from(["beacon", "run", "--registrations", "streams.json"])
            .unwrap()
            .command_or_default();
        assert_eq!(
            run_args(explicit),
            run_args(default_run(Some(OsString::from("streams.json"))))
        );
    }
}
