//! Tests for the effect value and its primitive operators.

use super::*;
use crate::testing::{Probe, TestError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing_test::traced_test;

// Constructors

#[tokio::test]
async fn test_pure_and_fail() {
    assert_eq!(Effect::<_, TestError>::pure(42).run().await, Ok(42));
    assert_eq!(
        Effect::<i32, _>::fail(TestError::failed("boom")).run().await,
        Err(TestError::failed("boom"))
    );
}

#[tokio::test]
async fn test_constants() {
    assert_eq!(Effect::<_, TestError>::always_true().run().await, Ok(true));
    assert_eq!(Effect::<_, TestError>::always_false().run().await, Ok(false));
    assert_eq!(Effect::<_, TestError>::unit().run().await, Ok(()));
}

#[tokio::test]
async fn test_fail_with_builds_fresh_error() {
    let built = Arc::new(AtomicUsize::new(0));
    let effect = {
        let built = Arc::clone(&built);
        Effect::<u8, _>::fail_with(move || {
            built.fetch_add(1, Ordering::SeqCst);
            TestError::failed("fresh")
        })
    };

    assert!(effect.run().await.is_err());
    assert!(effect.run().await.is_err());
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_from_fn_runs_once_per_run() {
    let probe = Probe::new();
    let effect = probe.wrap(Effect::<_, TestError>::from_fn(&Scheduler::Inline, || Ok(1)));

    assert_eq!(effect.run().await, Ok(1));
    assert_eq!(effect.run().await, Ok(1));
    assert_eq!(probe.count(), 2);
}

#[tokio::test]
async fn test_from_fn_panic_becomes_fault() {
    let effect = Effect::<u8, TestError>::from_fn(&Scheduler::Inline, || panic!("bad input"));

    match effect.run().await {
        Err(TestError::Fault(Fault::Panicked { message })) => assert_eq!(message, "bad input"),
        other => panic!("expected a panic fault, got {:?}", other),
    }
}

#[tokio::test]
async fn test_from_async_panic_becomes_fault() {
    let effect = Effect::<u8, TestError>::from_async(&Scheduler::Inline, || async {
        tokio::task::yield_now().await;
        panic!("mid-flight")
    });

    assert!(matches!(
        effect.run().await,
        Err(TestError::Fault(fault)) if fault.is_panic()
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_spawned_and_blocking_leaves() {
    let handle = Handle::current();
    let spawned = Effect::<_, TestError>::from_async(&Scheduler::Spawn(handle.clone()), || async { Ok(1) });
    let blocking = Effect::<_, TestError>::from_fn(&Scheduler::Blocking(handle), || Ok(2));

    assert_eq!(spawned.run().await, Ok(1));
    assert_eq!(blocking.run().await, Ok(2));
}

#[tokio::test]
async fn test_defer_builds_per_run() {
    let builds = Arc::new(AtomicUsize::new(0));
    let effect = {
        let builds = Arc::clone(&builds);
        Effect::<_, TestError>::defer(move || Effect::pure(builds.fetch_add(1, Ordering::SeqCst)))
    };

    assert_eq!(builds.load(Ordering::SeqCst), 0);
    assert_eq!(effect.run().await, Ok(0));
    assert_eq!(effect.run().await, Ok(1));
}

#[tokio::test]
async fn test_defer_captures_panicking_builder() {
    let effect = Effect::<u8, TestError>::defer(|| panic!("no effect today"));
    assert!(matches!(effect.run().await, Err(TestError::Fault(fault)) if fault.is_panic()));
}

// Transformations

#[tokio::test]
async fn test_map_and_try_map() {
    let effect = Effect::<_, TestError>::pure(21).map(|x| x * 2);
    assert_eq!(effect.run().await, Ok(42));

    let parsed = Effect::<_, TestError>::pure("x").try_map(|s| s.parse::<u8>().map_err(|e| TestError::failed(e.to_string())));
    assert!(parsed.run().await.is_err());

    let probe = Probe::new();
    let skipped = Effect::<u8, _>::fail(TestError::failed("early")).map(move |x| {
        probe.hit();
        x
    });
    assert_eq!(skipped.run().await, Err(TestError::failed("early")));
}

#[tokio::test]
async fn test_map_err_and_void() {
    let effect = Effect::<u8, _>::fail("raw").map_err(|e| format!("wrapped: {}", e));
    assert_eq!(effect.run().await, Err("wrapped: raw".to_string()));
    assert_eq!(Effect::<_, TestError>::pure(3).void().run().await, Ok(()));
}

#[tokio::test]
async fn test_and_then_chains_and_short_circuits() {
    let chained = Effect::<_, TestError>::pure(20).and_then(|x| Effect::pure(x + 1));
    assert_eq!(chained.run().await, Ok(21));

    let probe = Probe::new();
    let next = probe.clone();
    let failed = Effect::<u8, _>::fail(TestError::failed("first")).and_then(move |x| next.pure(x));
    assert_eq!(failed.run().await, Err(TestError::failed("first")));
    assert_eq!(probe.count(), 0);
}

#[tokio::test]
async fn test_and_then_or_else_runs_one_branch() {
    let ok = Effect::<_, TestError>::pure(1).and_then_or_else(
        |n| Effect::pure(format!("ok {}", n)),
        |_| Effect::pure("err".to_string()),
    );
    let err = Effect::<u8, _>::fail(TestError::failed("x")).and_then_or_else(
        |n| Effect::pure(format!("ok {}", n)),
        |e| Effect::pure(format!("err {}", e)),
    );

    assert_eq!(ok.run().await, Ok("ok 1".to_string()));
    assert_eq!(err.run().await, Ok("err x".to_string()));
}

// Recovery

#[tokio::test]
async fn test_recover_and_recover_with() {
    let recovered = Effect::<i32, _>::fail(TestError::failed("x")).recover(|_| -1);
    assert_eq!(recovered.run().await, Ok(-1));

    let replaced = Effect::<i32, _>::fail(TestError::failed("x"))
        .recover_with(|_| Effect::fail(TestError::failed("second")));
    assert_eq!(replaced.run().await, Err(TestError::failed("second")));
}

#[tokio::test]
async fn test_fallback_to_reports_original_failure() {
    let primary = Effect::<u8, _>::fail(TestError::failed("primary"));

    let rescued = primary.fallback_to(Effect::pure(7));
    assert_eq!(rescued.run().await, Ok(7));

    let both_fail = primary.fallback_to(Effect::fail(TestError::failed("fallback")));
    assert_eq!(both_fail.run().await, Err(TestError::failed("primary")));
}

#[tokio::test]
async fn test_fallback_not_run_on_success() {
    let probe = Probe::new();
    let effect = Effect::<_, TestError>::pure(1).fallback_to(probe.pure(2));

    assert_eq!(effect.run().await, Ok(1));
    assert_eq!(probe.count(), 0);
}

// Observation

#[tokio::test]
async fn test_tap_and_tap_err_observe() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let ok = {
        let seen = Arc::clone(&seen);
        Effect::<_, TestError>::pure(5).tap(move |v| seen.lock().unwrap().push(format!("ok {}", v)))
    };
    let err = {
        let seen = Arc::clone(&seen);
        Effect::<u8, _>::fail(TestError::failed("no")).tap_err(move |e| seen.lock().unwrap().push(format!("err {}", e)))
    };

    assert_eq!(ok.run().await, Ok(5));
    assert_eq!(err.run().await, Err(TestError::failed("no")));
    assert_eq!(*seen.lock().unwrap(), ["ok 5", "err no"]);
}

#[tokio::test]
#[traced_test]
async fn test_panicking_tap_leaves_outcome_unchanged() {
    let effect = Effect::<_, TestError>::pure(9).tap(|_| panic!("observer broke"));

    assert_eq!(effect.run().await, Ok(9));
    assert!(logs_contain("callback panicked"));
    assert!(logs_contain("observer broke"));
}

// Time

#[tokio::test(start_paused = true)]
async fn test_timeout_elapses() {
    let slow = Effect::<(), TestError>::delay(Duration::from_secs(10)).map(|_| 1);
    let effect = slow.timeout(Duration::from_secs(1));

    match effect.run().await {
        Err(TestError::Fault(fault)) => assert_eq!(fault, Fault::timeout(Duration::from_secs(1))),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_passes_fast_outcome() {
    let fast = Effect::<(), TestError>::delay(Duration::from_millis(5)).map(|_| 1);
    assert_eq!(fast.timeout(Duration::from_secs(1)).run().await, Ok(1));
}

#[test]
#[should_panic(expected = "timeout duration must be positive")]
fn test_zero_timeout_is_rejected() {
    let _ = Effect::<u8, TestError>::pure(1).timeout(Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_delay_waits() {
    let start = tokio::time::Instant::now();
    Effect::<(), TestError>::delay(Duration::from_millis(250)).run().await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(250));

    let zero = Effect::<(), TestError>::delay(Duration::ZERO);
    assert_eq!(zero.run().await, Ok(()));
}

#[tokio::test(start_paused = true)]
async fn test_race_adopts_first_outcome_even_failure() {
    let slow = Effect::<(), TestError>::delay(Duration::from_millis(100)).map(|_| "slow");
    let failing = Effect::<(), TestError>::delay(Duration::from_millis(10))
        .and_then(|_| Effect::fail(TestError::failed("fast failure")));

    assert_eq!(
        Effect::race(slow.clone(), [failing]).run().await,
        Err(TestError::failed("fast failure"))
    );
    assert_eq!(slow.race_with(Effect::pure("now")).run().await, Ok("now"));
}

#[tokio::test(start_paused = true)]
async fn test_race_losers_finish_in_background() {
    let probe = Probe::new();
    let finished = probe.clone();
    let loser = Effect::<(), TestError>::delay(Duration::from_millis(50)).tap(move |_| finished.hit());
    let winner = Effect::<(), TestError>::unit();

    assert_eq!(winner.race_with(loser).run().await, Ok(()));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(probe.count(), 1);
}

// Blocking

#[test]
fn test_join_outside_runtime() {
    let effect = Effect::<_, TestError>::pure(2).map(|x| x * 21);
    assert_eq!(effect.join(), Ok(42));
}

#[tokio::test]
async fn test_join_on_current_thread_runtime_is_refused() {
    let effect = Effect::<_, TestError>::pure(1);
    assert!(matches!(effect.join(), Err(TestError::Fault(Fault::Runtime(_)))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_join_on_multi_thread_runtime() {
    assert_eq!(Effect::<_, TestError>::pure(3).join(), Ok(3));
}

#[test]
fn test_kind_names_outermost_node() {
    let effect = Effect::<_, TestError>::pure(1).map(|x| x + 1);
    assert_eq!(effect.kind(), "Map");
    assert!(format!("{:?}", effect).contains("Map"));
}
