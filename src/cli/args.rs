//! Command-line argument definitions

use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;

use crate::cli::commands::{
    create::CreateArgs, deploy::DeployArgs, display::DisplayArgs, revision::RevisionArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "orion",
    version,
    about = "Versioned CAD assemblies: deduplicated parts, stable names, minimal git diffs"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options accepted by every subcommand
#[derive(clap::Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl GlobalOpts {
    /// Most verbose level that gets logged
    pub fn log_level(&self) -> Level {
        if self.quiet {
            return Level::ERROR;
        }
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a project from a CAD file
    Create(CreateArgs),

    /// Rebuild a project from a revised CAD file and stage the changes
    Revision(RevisionArgs),

    /// Show the assembly tree and the part catalog
    Display(DisplayArgs),

    /// Commit staged changes and push them to the remote
    Deploy(DeployArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_level_from_flags() {
        let cli = Cli::parse_from(["orion", "-vv", "display"]);
        assert_eq!(cli.global.log_level(), Level::DEBUG);

        let cli = Cli::parse_from(["orion", "display", "-q"]);
        assert_eq!(cli.global.log_level(), Level::ERROR);

        assert_eq!(GlobalOpts::default().log_level(), Level::WARN);
    }
}
