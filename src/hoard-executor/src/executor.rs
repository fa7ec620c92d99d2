use std::{env, thread};

use thiserror::Error;

mod current;
use current::Current;

mod threaded;
use threaded::Threaded;

const HOARD_WORKER_THREADS: &str = "HOARD_WORKER_THREADS";

#[derive(Clone, Debug, Error)]
#[error("invalid value in {}; must be a natural number", HOARD_WORKER_THREADS)]
pub struct BadConfiguration;

fn available_threads() -> Result<usize, BadConfiguration> {
    match env::var(HOARD_WORKER_THREADS) {
        Ok(value) => value.trim().parse().map_err(|_| BadConfiguration),

        Err(_) => Ok(thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1)),
    }
}

/// An executor for background jobs.
///
/// Configuration is possible with the `HOARD_WORKER_THREADS`
/// environment variable specifying the number of threads to use.
/// If not set, falls back to [`thread::available_parallelism`].
///
/// The API is the same for both flavors of execution and users
/// should not need to worry about any execution flavor details.
pub enum Executor {
    /// A single-threaded executor on the current thread.
    Current(Current),
    /// A multithreaded executor performing work on background threads.
    Threaded(Threaded),
}

impl Executor {
    /// Creates a single-threaded executor on the current thread.
    #[inline]
    pub fn current() -> Self {
        Self::Current(Current::new())
    }

    /// Creates a multithreaded executor with `nthreads` workers.
    #[inline]
    pub fn threaded(nthreads: usize) -> Self {
        Self::Threaded(Threaded::new(nthreads.max(1)))
    }

    /// Gets the preferred executor for the configuration of available
    /// worker threads on the system.
    #[inline]
    pub fn get() -> Result<Self, BadConfiguration> {
        match available_threads()? {
            0 | 1 => Ok(Self::current()),
            n => Ok(Self::threaded(n)),
        }
    }

    /// Gets the number of threads jobs may run on concurrently.
    pub fn worker_count(&self) -> usize {
        match self {
            Self::Threaded(t) => t.worker_count(),
            Self::Current(..) => 1,
        }
    }

    /// Spawns a job to run inside the executor.
    ///
    /// With the current-thread flavor, the job runs to completion
    /// before this returns.
    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match self {
            Self::Threaded(t) => t.spawn(job),
            Self::Current(c) => c.spawn(job),
        }
    }

    /// Blocks until all spawned jobs, including those spawned while
    /// waiting, have finished.
    ///
    /// Must not be called from inside a job.
    pub fn join(&self) {
        match self {
            Self::Threaded(t) => t.join(),
            Self::Current(..) => {}
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::get().unwrap_or_else(|e| {
            log::warn!("{e}; falling back to a single thread");
            Self::current()
        })
    }
}
