use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, Waker},
};

use parking_lot::{Condvar, Mutex};

struct State {
    in_flight: usize,
    wakers: Vec<Waker>,
}

/// Counts in-flight loads and signals when the count drops to zero.
///
/// The signal is manual-reset: it is cleared when the first load
/// starts and set again when the last one ends.
pub(crate) struct DoneLoading {
    state: Mutex<State>,
    cond: Condvar,
}

impl DoneLoading {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                in_flight: 0,
                wakers: Vec::new(),
            }),
            cond: Condvar::new(),
        }
    }

    pub(crate) fn begin(&self) {
        self.state.lock().in_flight += 1;
    }

    pub(crate) fn end(&self) {
        let wakers = {
            let mut state = self.state.lock();
            debug_assert!(state.in_flight > 0, "load count underflow");
            state.in_flight = state.in_flight.saturating_sub(1);

            if state.in_flight != 0 {
                return;
            }
            std::mem::take(&mut state.wakers)
        };

        self.cond.notify_all();
        for waker in wakers {
            waker.wake();
        }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    pub(crate) fn wait(&self) {
        let mut state = self.state.lock();
        while state.in_flight != 0 {
            self.cond.wait(&mut state);
        }
    }

    fn poll_done(&self, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.state.lock();
        if state.in_flight == 0 {
            return Poll::Ready(());
        }

        if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

/// A future which resolves once no loads are in flight.
pub(crate) struct Flush(pub(crate) Arc<DoneLoading>);

impl Future for Flush {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.0.poll_done(cx)
    }
}
