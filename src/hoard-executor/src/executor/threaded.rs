use std::thread;

use parking_lot::Mutex;
use threadpool::{Builder, ThreadPool};

const WORKER_NAME: &str = "hoard-worker";

// Materializing deeply nested resources recurses, so workers get
// more stack than the platform default.
const WORKER_STACK: usize = 8 * 1024 * 1024;

fn make_worker_pool(nthreads: usize) -> ThreadPool {
    Builder::new()
        .num_threads(nthreads)
        .thread_name(WORKER_NAME.into())
        .thread_stack_size(WORKER_STACK)
        .build()
}

/// An executor flavor which processes jobs on background threads.
pub struct Threaded {
    pool: Mutex<ThreadPool>,
    nthreads: usize,
}

impl Threaded {
    pub(super) fn new(nthreads: usize) -> Self {
        Self {
            pool: Mutex::new(make_worker_pool(nthreads)),
            nthreads,
        }
    }

    #[inline]
    pub(super) fn worker_count(&self) -> usize {
        self.nthreads
    }

    pub(super) fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.lock().execute(job);
    }

    pub(super) fn join(&self) {
        // Workers keep spawning while we wait, so the lock is not held.
        let pool = self.pool.lock().clone();
        pool.join();
    }
}

impl Drop for Threaded {
    fn drop(&mut self) {
        // A job may hold the last handle; joining would wait on itself.
        if thread::current().name() == Some(WORKER_NAME) {
            log::debug!("Executor dropped on a worker, not joining");
            return;
        }

        self.pool.get_mut().join();
    }
}
