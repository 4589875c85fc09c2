// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `assetdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetdag",
    version,
    about = "Build, watch and package static front-end assets.",
    long_about = None
)]
pub struct CliArgs {
    /// Entry point to run. Defaults to a single build of every asset class.
    #[command(subcommand)]
    pub command: Option<EntryPoint>,

    /// Path to the project file (TOML). Optional: built-in defaults apply
    /// when the file does not exist.
    #[arg(long, global = true, value_name = "PATH", default_value = "Assetdag.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETDAG_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load the project, print the task graph of the entry point, but don't
    /// run anything.
    #[arg(long, global = true)]
    pub dry_run: bool,
}

impl CliArgs {
    /// The selected entry point, falling back to `default`.
    pub fn entry_point(&self) -> EntryPoint {
        self.command.clone().unwrap_or(EntryPoint::Default)
    }
}

/// Task-group entry points.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum EntryPoint {
    /// Build every asset category once.
    Default,
    /// Rebuild on change, serve the build tree and push reload notifications.
    Watch {
        /// Skip the full build that normally runs before watching starts.
        #[arg(long)]
        no_initial_build: bool,
    },
    /// Build every asset category, then compress the build tree.
    Distribute,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_subcommand_means_default() {
        let args = CliArgs::parse_from(["assetdag"]);
        assert_eq!(args.entry_point(), EntryPoint::Default);
        assert_eq!(args.config, "Assetdag.toml");
    }

    #[test]
    fn watch_accepts_flags_after_subcommand() {
        let args = CliArgs::parse_from([
            "assetdag",
            "watch",
            "--no-initial-build",
            "--config",
            "site/Assetdag.toml",
        ]);
        assert_eq!(
            args.entry_point(),
            EntryPoint::Watch {
                no_initial_build: true
            }
        );
        assert_eq!(args.config, "site/Assetdag.toml");
    }
}
