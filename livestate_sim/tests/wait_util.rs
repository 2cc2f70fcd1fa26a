use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use livestate_sim::error::SimError;
use livestate_sim::util::wait_until;

#[test]
fn wait_until_success_path() {
    let flag = Arc::new(AtomicBool::new(false));
    let flag_bg = flag.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        flag_bg.store(true, Ordering::Relaxed);
    });

    let res = wait_until(
        || flag.load(Ordering::Relaxed),
        Duration::from_millis(500),
        Duration::from_micros(200),
    );
    assert!(res.is_ok(), "expected success, got {res:?}");
}

#[test]
fn wait_until_timeout_path() {
    let err = wait_until(
        || false,
        Duration::from_millis(5),
        Duration::from_micros(200),
    )
    .expect_err("expected timeout error");
    assert_eq!(err, SimError::Timeout);
}
