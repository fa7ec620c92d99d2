use clap::{Parser, Subcommand};

use crate::cmd::*;

mod args;
pub use args::*;

/// The CLI interface for the Hoard application.
#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
pub struct Cli {
    /// The selected command.
    #[clap(subcommand)]
    pub command: HoardCommand,

    #[clap(flatten)]
    pub verbosity: Verbosity,
}

/// The top-level commands supported by Hoard.
#[derive(Debug, Subcommand)]
pub enum HoardCommand {
    List(list::List),
    Pack(pack::Pack),
    Show(show::Show),
}

impl Command for HoardCommand {
    fn handle(self) -> eyre::Result<()> {
        match self {
            Self::List(list) => list.handle(),
            Self::Pack(pack) => pack.handle(),
            Self::Show(show) => show.handle(),
        }
    }
}
