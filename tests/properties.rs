//! Property-based tests for boolean reductions and retry policy shapes.

use proptest::prelude::*;
use std::time::Duration;
use tributary::testing::{Probe, TestError};
use tributary::{AllOf, AnyOf, Effect, Expression, RetryPolicy};

fn counted(values: &[bool], probe: &Probe) -> Vec<Effect<bool, TestError>> {
    values.iter().map(|v| probe.pure(*v)).collect()
}

proptest! {
    #[test]
    fn prop_all_of_is_logical_and(values in prop::collection::vec(any::<bool>(), 0..12)) {
        let expected = values.iter().all(|v| *v);

        let par = Probe::new();
        let outcome = AllOf::par(counted(&values, &par)).into_effect().join();
        prop_assert_eq!(outcome, Ok(expected));
        prop_assert_eq!(par.count(), values.len());

        let seq = Probe::new();
        let outcome = AllOf::seq(counted(&values, &seq)).into_effect().join();
        prop_assert_eq!(outcome, Ok(expected));
        let deciding = values.iter().position(|v| !*v).map_or(values.len(), |i| i + 1);
        prop_assert_eq!(seq.count(), deciding);
    }

    #[test]
    fn prop_any_of_is_logical_or(values in prop::collection::vec(any::<bool>(), 0..12)) {
        let expected = values.iter().any(|v| *v);

        let par = Probe::new();
        let outcome = AnyOf::par(counted(&values, &par)).into_effect().join();
        prop_assert_eq!(outcome, Ok(expected));
        prop_assert_eq!(par.count(), values.len());

        let seq = Probe::new();
        let outcome = AnyOf::seq(counted(&values, &seq)).into_effect().join();
        prop_assert_eq!(outcome, Ok(expected));
        let deciding = values.iter().position(|v| *v).map_or(values.len(), |i| i + 1);
        prop_assert_eq!(seq.count(), deciding);
    }

    #[test]
    fn prop_parallel_failure_dominates(
        values in prop::collection::vec(any::<bool>(), 0..8),
        at in 0usize..8,
    ) {
        let mut children: Vec<Effect<bool, TestError>> =
            values.iter().map(|v| Effect::pure(*v)).collect();
        let at = at.min(children.len());
        children.insert(at, Effect::fail(TestError::failed("child")));

        prop_assert_eq!(
            AllOf::par(children.clone()).into_effect().join(),
            Err(TestError::failed("child"))
        );
        prop_assert_eq!(
            AnyOf::par(children).into_effect().join(),
            Err(TestError::failed("child"))
        );
    }

    #[test]
    fn prop_cap_delay_bounds_every_step(
        base_ms in 1u64..500,
        cap_ms in 1u64..10_000,
        steps in 1usize..40,
    ) {
        let cap = Duration::from_millis(cap_ms);
        let policy = RetryPolicy::exponential_backoff(Duration::from_millis(base_ms)).cap_delay(cap);

        let statuses = policy.simulate(steps);
        prop_assert_eq!(statuses.len(), steps);
        for status in statuses {
            prop_assert!(status.previous_delay() <= cap);
        }
    }

    #[test]
    fn prop_cumulative_limit_stops_before_exceeding(
        delay_ms in 1u64..1_000,
        max_ms in 0u64..20_000,
    ) {
        let delay = Duration::from_millis(delay_ms);
        let max = Duration::from_millis(max_ms);
        let policy = RetryPolicy::constant_delay(delay).limit_retries_by_cumulative_delay(max);

        let statuses = policy.simulate(100);
        let total = statuses.last().map_or(Duration::ZERO, |s| s.cumulative_delay());
        prop_assert!(total <= max);
        if statuses.len() < 100 {
            prop_assert!(total + delay > max);
        }
    }

    #[test]
    fn prop_jitter_stays_within_cap(
        base_ms in 1u64..200,
        cap_ms in 1u64..5_000,
        steps in 1usize..20,
    ) {
        let base = Duration::from_millis(base_ms);
        let cap = Duration::from_millis(cap_ms);

        for policy in [
            RetryPolicy::full_jitter(base, cap),
            RetryPolicy::equal_jitter(base, cap),
            RetryPolicy::decorrelated_jitter(base, cap),
        ] {
            for status in policy.simulate(steps) {
                prop_assert!(status.previous_delay() <= cap);
            }
        }
    }

    #[test]
    fn prop_limit_retries_grants_exactly_n(n in 0u32..50) {
        let statuses = RetryPolicy::limit_retries(n).simulate(100);
        prop_assert_eq!(statuses.len(), n as usize);
        prop_assert!(statuses.iter().all(|s| s.cumulative_delay() == Duration::ZERO));
    }
}
