//! Integration tests for the serialized dispatch loop.
//!
//! Submissions are made from plain test threads, outside any runtime, the way an
//! external host would call in.

mod common;

use std::thread;
use std::time::{Duration, Instant};

use multitask_bridge::config::BridgeConfig;
use multitask_bridge::core::{from_fn, Arguments, BridgeError, SharedCallable, TaskError};
use multitask_bridge::Bridge;
use serde_json::{json, Value};

use common::{bridge, mark_finished, wake, wake_count, EARLY_WAKES};

fn echo() -> SharedCallable {
    from_fn("echo", |args: Arguments| {
        Ok(json!({
            "args": args.args(),
            "kw": args.keywords(),
        }))
    })
}

#[test]
fn test_handles_arrive_in_submission_order() {
    const BASE: usize = 0x1_0000;
    let bridge = bridge();

    let handles: Vec<_> = (0..50_usize)
        .map(|i| {
            bridge
                .scheduleasync(echo(), wake(BASE + i), Arguments::new().with_arg(i))
                .unwrap()
        })
        .collect();

    for pair in handles.windows(2) {
        assert!(pair[0].id() < pair[1].id(), "ids out of order");
    }
    for (i, handle) in handles.into_iter().enumerate() {
        assert!(handle.notifies());
        let value = bridge.wait(handle).unwrap();
        assert_eq!(value["args"], json!([i]));
    }
    for i in 0..50 {
        assert_eq!(wake_count(BASE + i), 1);
    }
    assert_eq!(bridge.stats().dispatched, 50);
}

#[test]
fn test_loop_survives_failing_tasks() {
    const BASE: usize = 0x2_0000;
    const N: usize = 30;
    let bridge = bridge();

    let flaky = from_fn("flaky", |args: Arguments| {
        let i = args.arg(0).and_then(Value::as_u64).unwrap_or_default();
        let addr = usize::try_from(i).unwrap_or_default() + BASE;
        mark_finished(addr);
        if i % 3 == 0 {
            anyhow::bail!("task {i} failed");
        }
        Ok(json!(i))
    });

    let handles: Vec<_> = (0..N)
        .map(|i| {
            bridge
                .scheduleasync(flaky.clone(), wake(BASE + i), Arguments::new().with_arg(i))
                .unwrap()
        })
        .collect();
    assert_eq!(handles.len(), N);

    let mut failures = 0;
    for (i, handle) in handles.into_iter().enumerate() {
        match bridge.wait(handle) {
            Ok(value) => assert_eq!(value, json!(i)),
            Err(TaskError::Failed(err)) => {
                assert_eq!(err.to_string(), format!("task {i} failed"));
                failures += 1;
            }
            Err(other) => panic!("unexpected outcome: {other}"),
        }
    }
    assert_eq!(failures, N.div_ceil(3));

    for i in 0..N {
        assert_eq!(wake_count(BASE + i), 1, "wake {i} not delivered exactly once");
    }
    assert!(EARLY_WAKES
        .lock()
        .iter()
        .all(|a| !(BASE..BASE + N).contains(a)));

    let stats = bridge.stats();
    assert_eq!(stats.dispatched, N as u64);
    assert_eq!(stats.failed, failures as u64);
    assert_eq!(stats.completed, (N - failures) as u64);
    assert_eq!(stats.notifications, N as u64);
}

fn explode() -> anyhow::Result<Value> {
    panic!("boom")
}

#[test]
fn test_loop_survives_panicking_task() {
    const ADDR: usize = 0x2_8000;
    let bridge = bridge();

    let panicking = from_fn("panicking", |_| explode());
    let handle = bridge.scheduleasync(panicking, wake(ADDR), Arguments::new()).unwrap();
    match bridge.wait(handle) {
        Err(TaskError::Panicked(msg)) => assert_eq!(msg, "boom"),
        other => panic!("unexpected outcome: {other:?}"),
    }

    let ok = from_fn("ok", |_| Ok(Value::Bool(true)));
    let next = bridge.scheduleasync(ok, wake(ADDR + 1), Arguments::new()).unwrap();
    assert_eq!(bridge.wait(next).unwrap(), json!(true));

    assert_eq!(wake_count(ADDR), 1);
    assert_eq!(wake_count(ADDR + 1), 1);
    let stats = bridge.stats();
    assert_eq!(stats.panicked, 1);
    assert_eq!(stats.dispatched, 2);
}

#[test]
fn test_null_wake_is_never_notified() {
    let bridge = bridge();

    for i in 0..10 {
        let handle = bridge
            .scheduleasync(echo(), None, Arguments::new().with_arg(i))
            .unwrap();
        assert!(!handle.notifies());
        bridge.wait(handle).unwrap();
    }
    let stats = bridge.stats();
    assert_eq!(stats.dispatched, 10);
    assert_eq!(stats.notifications, 0);
    assert_eq!(stats.missed_notifications, 0);
}

#[test]
fn test_concurrent_callers_receive_their_own_arguments() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 25;
    let bridge = bridge();

    thread::scope(|scope| {
        for t in 0..THREADS {
            let bridge = &bridge;
            scope.spawn(move || {
                for seq in 0..PER_THREAD {
                    let args = Arguments::new()
                        .with_arg(t)
                        .with_arg(seq)
                        .with_keyword("caller", format!("thread-{t}"));
                    let handle = bridge.scheduleasync(echo(), None, args).unwrap();
                    let value = bridge.wait(handle).unwrap();
                    assert_eq!(value["args"], json!([t, seq]));
                    assert_eq!(value["kw"], json!({ "caller": format!("thread-{t}") }));
                }
            });
        }
    });

    assert_eq!(bridge.stats().dispatched, (THREADS * PER_THREAD) as u64);
}

#[test]
fn test_dispatch_worker_is_not_blocked_by_running_tasks() {
    let bridge = bridge();
    let slow = from_fn("slow", |_| {
        thread::sleep(Duration::from_millis(300));
        Ok(Value::Null)
    });

    let started = Instant::now();
    let first = bridge.scheduleasync(slow.clone(), None, Arguments::new()).unwrap();
    let second = bridge.scheduleasync(slow, None, Arguments::new()).unwrap();
    assert!(started.elapsed() < Duration::from_millis(300));

    bridge.wait(first).unwrap();
    bridge.wait(second).unwrap();
}

#[test]
fn test_wake_requires_installed_callback() {
    let bridge = Bridge::new(BridgeConfig::new().with_worker_threads(1)).unwrap();

    let result = bridge.scheduleasync(echo(), wake(0x3_0000), Arguments::new());
    assert!(matches!(result, Err(BridgeError::WakeCallbackMissing)));
    assert_eq!(bridge.stats().dispatched, 0);

    // The loop is still usable without a wake pointer.
    let handle = bridge.scheduleasync(echo(), None, Arguments::new()).unwrap();
    assert!(bridge.wait(handle).is_ok());
}

#[test]
fn test_shutdown_rejects_further_submissions() {
    let bridge = bridge();
    bridge.shutdown();

    let result = bridge.scheduleasync(echo(), None, Arguments::new());
    assert!(matches!(result, Err(BridgeError::DispatchClosed)));

    // Direct spawns are unaffected.
    let handle = bridge.asynccall(echo(), None, Arguments::new()).unwrap();
    assert!(bridge.wait(handle).is_ok());
}

#[test]
fn test_shutdown_does_not_wait_for_running_tasks() {
    let bridge = bridge();
    let slow = from_fn("slow", |_| {
        thread::sleep(Duration::from_secs(3));
        Ok(Value::Null)
    });
    let handle = bridge.scheduleasync(slow, None, Arguments::new()).unwrap();

    let started = Instant::now();
    bridge.shutdown();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!handle.is_finished());
}
