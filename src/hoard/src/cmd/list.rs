use std::path::PathBuf;

use clap::Args;

use super::{open_pack, Command};
use crate::cli::Threads;

/// Lists the resource names in a pack file.
#[derive(Debug, Args)]
pub struct List {
    /// The pack file to list.
    input: PathBuf,

    /// Only lists names matching this glob pattern.
    #[clap(short, long)]
    filter: Option<String>,

    /// Also lists the recorded source files.
    #[clap(long)]
    sources: bool,

    #[clap(flatten)]
    threads: Threads,
}

impl Command for List {
    fn handle(self) -> eyre::Result<()> {
        let cache = open_pack(&self.input, self.threads.executor())?;

        let names = match &self.filter {
            Some(pattern) => cache.resource_names_matching(pattern)?,
            None => cache.resource_object_names(),
        };
        for name in names {
            println!("{name}");
        }

        if self.sources {
            for source in cache.source_files() {
                println!("source: {}", source.display());
            }
        }

        Ok(())
    }
}
