use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use hoard_executor::Executor;

#[test]
fn current_runs_inline() {
    let executor = Executor::current();
    let counter = Arc::new(AtomicUsize::new(0));

    let c = counter.clone();
    executor.spawn(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(executor.worker_count(), 1);
}

#[test]
fn threaded_runs_all_jobs() {
    let executor = Executor::threaded(4);
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..100 {
        let c = counter.clone();
        executor.spawn(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
    }
    executor.join();

    assert_eq!(counter.load(Ordering::SeqCst), 100);
    assert_eq!(executor.worker_count(), 4);
}

#[test]
fn jobs_spawn_jobs() {
    let executor = Arc::new(Executor::threaded(2));
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..10 {
        let e = executor.clone();
        let c = counter.clone();
        executor.spawn(move || {
            let c2 = c.clone();
            e.spawn(move || {
                c2.fetch_add(1, Ordering::SeqCst);
            });
            c.fetch_add(1, Ordering::SeqCst);
        });
    }
    executor.join();

    assert_eq!(counter.load(Ordering::SeqCst), 20);
}
