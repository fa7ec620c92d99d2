use std::sync::Arc;

use clap::{ArgAction, Args};
use hoard_executor::Executor;

/// Configures the verbosity of the builtin logger.
#[derive(Clone, Copy, Debug, Args)]
pub struct Verbosity {
    /// Configures the log verbosity of Hoard.
    ///
    /// `-v` is Debug, `-vv` is Trace.
    #[clap(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl Verbosity {
    /// Configures the global logger based on the settings.
    pub fn setup(self) -> eyre::Result<()> {
        let level = self.log_level();
        simple_logger::init_with_level(level)?;
        Ok(())
    }

    fn log_level(self) -> log::Level {
        match self.verbose {
            0 => log::Level::Info,
            1 => log::Level::Debug,
            _ => log::Level::Trace,
        }
    }
}

/// Configures the executor that loads resources.
#[derive(Clone, Copy, Debug, Args)]
pub struct Threads {
    /// The number of worker threads to load resources on.
    ///
    /// 0 or 1 loads everything on the calling thread. Defaults to
    /// the available parallelism of the machine.
    #[clap(short = 'j', long, env = "HOARD_WORKER_THREADS")]
    pub threads: Option<usize>,
}

impl Threads {
    pub fn executor(self) -> Arc<Executor> {
        let executor = match self.threads {
            Some(0 | 1) => Executor::current(),
            Some(n) => Executor::threaded(n),
            None => Executor::default(),
        };

        Arc::new(executor)
    }
}
