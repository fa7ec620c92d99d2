use std::{io::Write, path::PathBuf, sync::Arc};

use clap::Args;
use eyre::Context;
use hoard_resource::{load_resources_from_file, CacheBuilder};
use hoard_stream::FileWriter;

use super::{factories, Command};
use crate::cli::Threads;

/// Builds JSON resource sources into a pack file.
#[derive(Debug, Args)]
pub struct Pack {
    /// The JSON source files to build.
    ///
    /// When several sources define the same name, the first one wins.
    #[clap(required = true)]
    inputs: Vec<PathBuf>,

    /// The path of the pack file to write.
    #[clap(short)]
    output: PathBuf,

    /// Records the source files in the pack so that it can be rebuilt.
    #[clap(long)]
    debug: bool,

    #[clap(flatten)]
    threads: Threads,
}

impl Command for Pack {
    fn handle(self) -> eyre::Result<()> {
        let registry = Arc::new(hoard_resource::registry());
        let factories = factories(&registry);
        let cache = CacheBuilder::new(registry.clone())
            .factories(factories.clone())
            .executor(self.threads.executor())
            .debug(self.debug)
            .build();

        for input in &self.inputs {
            let dict = load_resources_from_file(input, &registry, &factories, self.debug)
                .with_context(|| format!("failed to build '{}'", input.display()))?;

            let added = cache.add_resources(&dict);
            log::info!("Added {added} resources from '{}'", input.display());
        }

        let mut writer = FileWriter::create(&self.output).with_context(|| {
            format!("failed to create pack at '{}'", self.output.display())
        })?;
        cache.save(&mut writer)?;
        writer.flush()?;

        log::info!(
            "Packed {} resources into '{}'",
            cache.resource_object_names().len(),
            self.output.display()
        );
        Ok(())
    }
}
