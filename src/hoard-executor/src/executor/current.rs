use std::sync::atomic::{AtomicUsize, Ordering};

/// An executor flavor which carries out every job on the
/// current thread in sequential order.
pub struct Current {
    depth: AtomicUsize,
}

impl Current {
    #[inline]
    pub(super) fn new() -> Self {
        Self {
            depth: AtomicUsize::new(0),
        }
    }

    pub(super) fn spawn<F: FnOnce()>(&self, job: F) {
        // Jobs spawned from jobs nest on the stack.
        let depth = self.depth.fetch_add(1, Ordering::Relaxed);
        log::trace!("Running job inline at depth {depth}");

        job();

        self.depth.fetch_sub(1, Ordering::Relaxed);
    }
}
