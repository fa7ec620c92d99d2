use std::env;

use hoard_executor::Executor;

// Environment mutation is process-wide, so all variants are checked
// from a single test.
#[test]
fn worker_threads_from_env() {
    env::set_var("HOARD_WORKER_THREADS", "1");
    assert!(matches!(Executor::get(), Ok(Executor::Current(_))));

    env::set_var("HOARD_WORKER_THREADS", "3");
    let executor = Executor::get().unwrap();
    assert_eq!(executor.worker_count(), 3);

    env::set_var("HOARD_WORKER_THREADS", "many");
    assert!(Executor::get().is_err());

    env::remove_var("HOARD_WORKER_THREADS");
    assert!(Executor::get().is_ok());
}
