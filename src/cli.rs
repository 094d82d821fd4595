//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// keyward - HWID-bound activation key service
#[derive(Parser, Debug)]
#[command(name = "keyward")]
#[command(version)]
#[command(about = "HWID-bound activation key service", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML); `KW__*` environment variables override it
    #[arg(long, short = 'c', global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// List active leases, longest remaining first
    Actives,

    /// Show every record stored for one HWID
    Inspect { hwid: String },

    /// Blacklist an HWID (clears its pending key and lease, signals a kick)
    Blacklist {
        hwid: String,

        /// Reason recorded with the entry
        #[arg(long)]
        reason: Option<String>,
    },

    /// Remove an HWID from the blacklist
    Unblacklist { hwid: String },

    /// Signal a disconnect without touching the lease
    Kick {
        hwid: String,

        /// Reason shown to the client
        #[arg(long)]
        reason: Option<String>,
    },
}

/// Configuration management commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// `serve` when no subcommand was given
    pub fn command_or_default(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_serve() {
        let cli = Cli::try_parse_from(["keyward"]).unwrap();
        assert_eq!(cli.config, DEFAULT_CONFIG_PATH);
        assert_eq!(cli.command_or_default(), Commands::Serve);
    }

    #[test]
    fn test_admin_commands() {
        let cli = Cli::try_parse_from([
            "keyward",
            "-c",
            "/etc/keyward.toml",
            "blacklist",
            "ABC123",
            "--reason",
            "chargeback",
        ])
        .unwrap();
        assert_eq!(cli.config, "/etc/keyward.toml");
        assert_eq!(
            cli.command_or_default(),
            Commands::Blacklist {
                hwid: "ABC123".to_string(),
                reason: Some("chargeback".to_string()),
            }
        );

        let cli = Cli::try_parse_from(["keyward", "kick", "ABC123"]).unwrap();
        assert_eq!(
            cli.command_or_default(),
            Commands::Kick {
                hwid: "ABC123".to_string(),
                reason: None,
            }
        );
    }

    #[test]
    fn test_config_generate() {
        let cli = Cli::try_parse_from(["keyward", "config", "generate", "out.toml", "--force"])
            .unwrap();
        assert_eq!(
            cli.command_or_default(),
            Commands::Config {
                action: ConfigCommands::Generate {
                    output_path: Some("out.toml".to_string()),
                    force: true,
                }
            }
        );
    }

    #[test]
    fn test_missing_hwid_is_rejected() {
        assert!(Cli::try_parse_from(["keyward", "inspect"]).is_err());
    }
}
