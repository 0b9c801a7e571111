//! Retry policies as pure functions of [`RetryStatus`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::status::RetryStatus;

type DelayFn = dyn Fn(&RetryStatus) -> Option<Duration> + Send + Sync;

/// Decides, from the current [`RetryStatus`], how long to wait before the next
/// attempt, or that no further attempt should be made (`None`).
///
/// Policies are values: they never sleep, count or remember anything, so the
/// same policy can drive any number of loops concurrently. New shapes are
/// built by composing the standard ones rather than by subclassing.
///
/// # Examples
///
/// ```rust
/// use tributary::{RetryPolicy, RetryStatus};
/// use std::time::Duration;
///
/// // Exponential backoff from 100ms, never more than 1s, at most 5 retries.
/// let policy = RetryPolicy::exponential_backoff(Duration::from_millis(100))
///     .cap_delay(Duration::from_secs(1))
///     .append(RetryPolicy::limit_retries(5));
///
/// let delays: Vec<_> = policy
///     .simulate(10)
///     .iter()
///     .map(|status| status.previous_delay().as_millis())
///     .collect();
/// assert_eq!(delays, [100, 200, 400, 800, 1000]);
/// ```
#[derive(Clone)]
pub struct RetryPolicy {
    delay: Arc<DelayFn>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy").finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// A policy from an arbitrary function.
    pub fn new<F>(delay: F) -> Self
    where
        F: Fn(&RetryStatus) -> Option<Duration> + Send + Sync + 'static,
    {
        RetryPolicy {
            delay: Arc::new(delay),
        }
    }

    /// The delay before the next attempt, or `None` to give up.
    pub fn delay(&self, status: &RetryStatus) -> Option<Duration> {
        (self.delay)(status)
    }

    /// Never retry.
    pub fn never() -> Self {
        RetryPolicy::new(|_| None)
    }

    /// Retry immediately while fewer than `n` retries have been made.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tributary::RetryPolicy;
    ///
    /// assert_eq!(RetryPolicy::limit_retries(3).simulate(10).len(), 3);
    /// ```
    pub fn limit_retries(n: u32) -> Self {
        RetryPolicy::new(move |status| (status.counter() < n).then_some(Duration::ZERO))
    }

    /// Always wait `delay`. Unbounded on its own.
    pub fn constant_delay(delay: Duration) -> Self {
        RetryPolicy::new(move |_| Some(delay))
    }

    /// Wait `base * (counter + 1)`: 1x, 2x, 3x, ...
    pub fn incremental_delay(base: Duration) -> Self {
        RetryPolicy::new(move |status| {
            Some(base.saturating_mul(status.counter().saturating_add(1)))
        })
    }

    /// Wait `base * 2^counter`: 1x, 2x, 4x, ...
    pub fn exponential_backoff(base: Duration) -> Self {
        RetryPolicy::new(move |status| Some(exponential(base, status.counter())))
    }

    /// Wait `base * fib(counter + 1)`: 1x, 1x, 2x, 3x, 5x, ...
    pub fn fibonacci_backoff(base: Duration) -> Self {
        RetryPolicy::new(move |status| {
            Some(base.saturating_mul(fibonacci(status.counter().saturating_add(1))))
        })
    }

    /// Randomized exponential backoff; see [`Jitter`].
    pub fn jittered(jitter: Jitter, base: Duration, cap: Duration) -> Self {
        RetryPolicy::new(move |status| Some(jitter.delay(base, cap, status)))
    }

    /// Uniform in `[0, min(cap, base * 2^counter)]`.
    pub fn full_jitter(base: Duration, cap: Duration) -> Self {
        RetryPolicy::jittered(Jitter::Full, base, cap)
    }

    /// Half the capped exponential delay plus a uniform share of the other half.
    pub fn equal_jitter(base: Duration, cap: Duration) -> Self {
        RetryPolicy::jittered(Jitter::Equal, base, cap)
    }

    /// `base` first, then uniform in `[base, previous * 3]`. Every delay,
    /// the first included, is capped at `cap`.
    pub fn decorrelated_jitter(base: Duration, cap: Duration) -> Self {
        RetryPolicy::jittered(Jitter::Decorrelated, base, cap)
    }

    /// Combine with `other`: the larger of both delays, giving up as soon as
    /// either policy does.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tributary::{RetryPolicy, RetryStatus};
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::constant_delay(Duration::from_millis(50))
    ///     .append(RetryPolicy::limit_retries(2));
    ///
    /// let third = RetryStatus::new(2, Duration::from_millis(100), Duration::from_millis(50));
    /// assert_eq!(policy.delay(&RetryStatus::initial()), Some(Duration::from_millis(50)));
    /// assert_eq!(policy.delay(&third), None);
    /// ```
    pub fn append(self, other: RetryPolicy) -> Self {
        RetryPolicy::new(move |status| match (self.delay(status), other.delay(status)) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        })
    }

    /// Use this policy's delay while it has one, then fall back to `other`.
    pub fn followed_by(self, other: RetryPolicy) -> Self {
        RetryPolicy::new(move |status| self.delay(status).or_else(|| other.delay(status)))
    }

    /// Clamp every delay to at most `cap`.
    pub fn cap_delay(self, cap: Duration) -> Self {
        RetryPolicy::new(move |status| self.delay(status).map(|delay| delay.min(cap)))
    }

    /// Give up once a single delay would reach `max`.
    pub fn limit_retries_by_delay(self, max: Duration) -> Self {
        RetryPolicy::new(move |status| self.delay(status).filter(|delay| *delay < max))
    }

    /// Give up once the total waited would exceed `max`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tributary::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::constant_delay(Duration::from_millis(100))
    ///     .limit_retries_by_cumulative_delay(Duration::from_millis(350));
    ///
    /// // 100 + 100 + 100 fits; a fourth wait would bring the total to 400.
    /// assert_eq!(policy.simulate(10).len(), 3);
    /// ```
    pub fn limit_retries_by_cumulative_delay(self, max: Duration) -> Self {
        RetryPolicy::new(move |status| {
            self.delay(status)
                .filter(|delay| status.cumulative_delay().saturating_add(*delay) <= max)
        })
    }

    /// The statuses a loop driven by this policy would pass through, without
    /// sleeping.
    ///
    /// Entry `i` is the status after the `i + 1`th granted delay, so its
    /// `previous_delay` is that delay. At most `n` entries; fewer when the
    /// policy gives up first.
    pub fn simulate(&self, n: usize) -> Vec<RetryStatus> {
        let mut statuses = Vec::with_capacity(n.min(64));
        let mut status = RetryStatus::initial();
        while statuses.len() < n {
            match self.delay(&status) {
                Some(delay) => {
                    status = status.advance(delay);
                    statuses.push(status);
                }
                None => break,
            }
        }
        statuses
    }
}

impl Default for RetryPolicy {
    /// Up to five immediate retries.
    fn default() -> Self {
        RetryPolicy::limit_retries(5)
    }
}

/// Randomization applied to exponential backoff to spread out retries from
/// many callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Jitter {
    /// Uniform in `[0, min(cap, base * 2^counter)]`.
    Full,
    /// `half + uniform[0, half]` where `half` is the capped exponential delay
    /// divided by two.
    Equal,
    /// `base` on the first attempt, then uniform in `[base, previous * 3]`.
    /// Every delay, the first included, is capped at `cap`.
    Decorrelated,
}

impl Jitter {
    /// Draw the delay for `status`.
    pub fn delay(&self, base: Duration, cap: Duration, status: &RetryStatus) -> Duration {
        match self {
            Jitter::Full => {
                let ceiling = exponential(base, status.counter()).min(cap);
                random_between(Duration::ZERO, ceiling)
            }
            Jitter::Equal => {
                let half = exponential(base, status.counter()).min(cap) / 2;
                half.saturating_add(random_between(Duration::ZERO, half))
            }
            Jitter::Decorrelated => {
                if status.counter() == 0 {
                    return base.min(cap);
                }
                let upper = status.previous_delay().saturating_mul(3);
                random_between(base, upper).min(cap)
            }
        }
    }
}

fn exponential(base: Duration, counter: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(counter))
}

/// Uniform in `[low, high]`; `low` when the range is empty.
fn random_between(low: Duration, high: Duration) -> Duration {
    if high <= low {
        return low;
    }
    let nanos = rand::rng().random_range(as_nanos(low)..=as_nanos(high));
    Duration::from_nanos(nanos)
}

fn as_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// The nth Fibonacci number, saturating.
fn fibonacci(n: u32) -> u32 {
    if n == 0 {
        return 0;
    }
    let mut a = 0u32;
    let mut b = 1u32;
    for _ in 1..n {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    b
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn at(counter: u32) -> RetryStatus {
        RetryStatus::new(counter, Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn test_limit_retries() {
        let policy = RetryPolicy::limit_retries(2);
        assert_eq!(policy.delay(&at(0)), Some(Duration::ZERO));
        assert_eq!(policy.delay(&at(1)), Some(Duration::ZERO));
        assert_eq!(policy.delay(&at(2)), None);
    }

    #[test]
    fn test_never() {
        assert!(RetryPolicy::never().simulate(3).is_empty());
    }

    #[test]
    fn test_constant_delay() {
        let policy = RetryPolicy::constant_delay(ms(500));
        for counter in 0..4 {
            assert_eq!(policy.delay(&at(counter)), Some(ms(500)));
        }
    }

    #[test]
    fn test_incremental_delay() {
        let policy = RetryPolicy::incremental_delay(ms(100));
        assert_eq!(policy.delay(&at(0)), Some(ms(100)));
        assert_eq!(policy.delay(&at(1)), Some(ms(200)));
        assert_eq!(policy.delay(&at(2)), Some(ms(300)));
    }

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::exponential_backoff(ms(100));
        assert_eq!(policy.delay(&at(0)), Some(ms(100)));
        assert_eq!(policy.delay(&at(1)), Some(ms(200)));
        assert_eq!(policy.delay(&at(2)), Some(ms(400)));
        assert_eq!(policy.delay(&at(3)), Some(ms(800)));
    }

    #[test]
    fn test_exponential_backoff_saturates() {
        let policy = RetryPolicy::exponential_backoff(Duration::from_secs(u64::MAX / 2));
        assert_eq!(policy.delay(&at(2)), Some(Duration::MAX));
        assert!(RetryPolicy::exponential_backoff(ms(100)).delay(&at(200)).is_some());
    }

    #[test]
    fn test_fibonacci_backoff() {
        let policy = RetryPolicy::fibonacci_backoff(ms(100));
        let delays: Vec<_> = (0..6).map(|c| policy.delay(&at(c))).collect();
        assert_eq!(
            delays,
            [100, 100, 200, 300, 500, 800].map(|m| Some(ms(m)))
        );
    }

    #[test]
    fn test_fibonacci_function() {
        assert_eq!(fibonacci(0), 0);
        assert_eq!(fibonacci(1), 1);
        assert_eq!(fibonacci(2), 1);
        assert_eq!(fibonacci(7), 13);
        assert_eq!(fibonacci(100), u32::MAX);
    }

    #[test]
    fn test_append_takes_max_and_gives_up_with_either() {
        let policy = RetryPolicy::constant_delay(ms(10))
            .append(RetryPolicy::incremental_delay(ms(4)))
            .append(RetryPolicy::limit_retries(3));

        assert_eq!(policy.delay(&at(0)), Some(ms(10)));
        assert_eq!(policy.delay(&at(2)), Some(ms(12)));
        assert_eq!(policy.delay(&at(3)), None);
    }

    #[test]
    fn test_followed_by() {
        let policy = RetryPolicy::constant_delay(ms(10))
            .append(RetryPolicy::limit_retries(2))
            .followed_by(RetryPolicy::constant_delay(ms(99)));

        assert_eq!(policy.delay(&at(1)), Some(ms(10)));
        assert_eq!(policy.delay(&at(2)), Some(ms(99)));
    }

    #[test]
    fn test_cap_delay() {
        let policy = RetryPolicy::exponential_backoff(ms(100)).cap_delay(ms(250));
        assert_eq!(policy.delay(&at(1)), Some(ms(200)));
        assert_eq!(policy.delay(&at(2)), Some(ms(250)));
    }

    #[test]
    fn test_limit_retries_by_delay() {
        let policy = RetryPolicy::exponential_backoff(ms(100)).limit_retries_by_delay(ms(400));
        assert_eq!(policy.delay(&at(1)), Some(ms(200)));
        assert_eq!(policy.delay(&at(2)), None);
    }

    #[test]
    fn test_limit_retries_by_cumulative_delay() {
        let policy = RetryPolicy::constant_delay(ms(100))
            .limit_retries_by_cumulative_delay(ms(300));
        let statuses = policy.simulate(10);

        assert_eq!(statuses.len(), 3);
        assert_eq!(statuses[2].cumulative_delay(), ms(300));
    }

    #[test]
    fn test_simulate_threads_status() {
        let statuses = RetryPolicy::incremental_delay(ms(10)).simulate(3);

        assert_eq!(
            statuses,
            vec![
                RetryStatus::new(1, ms(10), ms(10)),
                RetryStatus::new(2, ms(30), ms(20)),
                RetryStatus::new(3, ms(60), ms(30)),
            ]
        );
    }

    #[test]
    fn test_simulate_zero_steps() {
        assert!(RetryPolicy::constant_delay(ms(1)).simulate(0).is_empty());
    }

    #[test]
    fn test_full_jitter_bounds() {
        let policy = RetryPolicy::full_jitter(ms(100), ms(300));
        for counter in 0..8 {
            let delay = policy.delay(&at(counter)).unwrap();
            assert!(delay <= exponential(ms(100), counter).min(ms(300)));
        }
    }

    #[test]
    fn test_equal_jitter_bounds() {
        let policy = RetryPolicy::equal_jitter(ms(100), ms(1000));
        for _ in 0..50 {
            let delay = policy.delay(&at(2)).unwrap();
            assert!(delay >= ms(200) && delay <= ms(400), "{:?}", delay);
        }
    }

    #[test]
    fn test_decorrelated_jitter() {
        let policy = RetryPolicy::decorrelated_jitter(ms(100), ms(1000));
        assert_eq!(policy.delay(&at(0)), Some(ms(100)));

        let status = RetryStatus::new(1, ms(100), ms(200));
        for _ in 0..50 {
            let delay = policy.delay(&status).unwrap();
            assert!(delay >= ms(100) && delay <= ms(600), "{:?}", delay);
        }

        let status = RetryStatus::new(4, ms(3000), ms(900));
        assert!(policy.delay(&status).unwrap() <= ms(1000));
    }

    #[test]
    fn test_decorrelated_first_delay_respects_cap() {
        let policy = RetryPolicy::decorrelated_jitter(ms(500), ms(200));
        assert_eq!(policy.delay(&at(0)), Some(ms(200)));
    }

    #[test]
    fn test_random_between_empty_range() {
        assert_eq!(random_between(ms(5), ms(5)), ms(5));
        assert_eq!(random_between(ms(5), ms(1)), ms(5));
    }

    #[test]
    fn test_default_policy() {
        assert_eq!(RetryPolicy::default().simulate(10).len(), 5);
    }

    #[test]
    fn test_policy_is_debug() {
        assert_eq!(format!("{:?}", RetryPolicy::never()), "RetryPolicy { .. }");
    }
}
