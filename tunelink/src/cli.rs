use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (defaults to <config dir>/tunelink/config.toml)
    #[arg(short, long, global = true, env = "TUNELINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON file backing the shared store; overrides the configured path
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Arguments the browser passes when it launches the host (caller
    /// origin, manifest path, extension id). Ignored.
    #[arg(hide = true, allow_hyphen_values = true)]
    pub browser_args: Vec<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run as a native messaging host on stdin/stdout (the default)
    Host,

    /// Like the song on one page and print the outcome as JSON
    Dispatch {
        /// Page URL, e.g. a YouTube watch URL
        url: String,
    },

    /// Store a token pair obtained from the Spotify authorization flow
    Auth {
        #[arg(long, env = "TUNELINK_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,

        #[arg(long, env = "TUNELINK_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: String,
    },

    /// Show the stored credential age and the last outcome
    Status,
}

impl Args {
    /// The subcommand to run; launching without one starts the host.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_launch_runs_host() {
        let args = Args::parse_from(["tunelink", "chrome-extension://abcdefghijklmnop/"]);
        assert_eq!(args.command(), Commands::Host);

        let args = Args::parse_from([
            "tunelink",
            "/home/user/.mozilla/native-messaging-hosts/tunelink.json",
            "tunelink@example.com",
        ]);
        assert_eq!(args.command(), Commands::Host);
    }

    #[test]
    fn test_dispatch_with_store() {
        let args = Args::parse_from([
            "tunelink",
            "--store",
            "/tmp/store.json",
            "dispatch",
            "https://www.youtube.com/watch?v=abc",
        ]);
        assert_eq!(args.store, Some(PathBuf::from("/tmp/store.json")));
        assert_eq!(
            args.command(),
            Commands::Dispatch {
                url: "https://www.youtube.com/watch?v=abc".to_string()
            }
        );
    }

    #[test]
    fn test_auth_tokens() {
        let args = Args::try_parse_from([
            "tunelink",
            "auth",
            "--access-token",
            "A1",
            "--refresh-token",
            "R1",
        ])
        .unwrap();
        assert_eq!(
            args.command(),
            Commands::Auth {
                access_token: "A1".to_string(),
                refresh_token: "R1".to_string()
            }
        );
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Args::try_parse_from(["tunelink", "-v", "-q", "status"]).is_err());
    }
}
