//! Exponential backoff policy for retrying failed attempts.
//!
//! A [`BackoffState`] is a pure value. Feeding it the [`FailureKind`] of the
//! latest attempt yields a [`Decision`]: either wait and retry with the next
//! state, or give up. The caller performs the actual wait.
//!
//! Wait durations follow `min(base_delay * multiplier^attempt, max_delay)`,
//! optionally scaled by a random factor in `[1 - jitter, 1 + jitter]`.
//!
//! ```
//! use std::time::Duration;
//! use trc8004_core::{BackoffPolicy, Decision, FailureKind};
//!
//! let policy = BackoffPolicy {
//!     jitter: 0.0,
//!     ..BackoffPolicy::default()
//! };
//!
//! let state = policy.start();
//! match state.decide(FailureKind::Timeout) {
//!     Decision::Retry { wait, next } => {
//!         assert_eq!(wait, Duration::from_secs(1));
//!         assert_eq!(next.attempt(), 1);
//!     }
//!     Decision::GiveUp(_) => unreachable!(),
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::failure::FailureKind;

/// Retry policy parameters.
///
/// `max_attempts` counts every attempt, including the first. A value of 0 is
/// treated as 1: an operation is always tried once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    /// Total attempts allowed before giving up.
    pub max_attempts: u32,
    /// Wait before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Growth factor per attempt. Values below 1.0 are treated as 1.0.
    pub multiplier: f64,
    /// Upper bound on the un-jittered wait, in milliseconds.
    pub max_delay_ms: u64,
    /// Jitter fraction in `[0, 1]`, applied as `±jitter`.
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    /// Default policy:
    /// - 3 attempts
    /// - Base: 1 second
    /// - Factor: 2.0
    /// - Max: 30 seconds
    /// - Jitter: 0.1 (±10%)
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            multiplier: 2.0,
            max_delay_ms: 30_000,
            jitter: 0.1,
        }
    }
}

impl BackoffPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// A policy with `max_attempts` attempts and no waiting in between.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            multiplier: 1.0,
            max_delay_ms: 0,
            jitter: 0.0,
        }
    }

    /// The initial state for a fresh operation.
    pub fn start(&self) -> BackoffState {
        BackoffState {
            policy: *self,
            attempt: 0,
        }
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Effective attempt budget.
    pub fn attempt_budget(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// The un-jittered wait after the failure of attempt number `attempt`
    /// (0-indexed).
    ///
    /// Non-decreasing in `attempt` and never above `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let max = self.max_delay().as_secs_f64();
        let multiplier = self.multiplier.max(1.0);
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw = self.base_delay().as_secs_f64() * multiplier.powi(exponent);

        let secs = if raw.is_finite() { raw.min(max) } else { max };
        Duration::from_secs_f64(secs.max(0.0))
    }

    fn jitter_fraction(&self) -> f64 {
        if self.jitter.is_finite() {
            self.jitter.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Why a retry loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    /// The failure will not go away by repeating the request.
    Permanent(FailureKind),
    /// The attempt budget is spent. Carries the last transient failure.
    Exhausted { attempts: u32, last: FailureKind },
}

impl GiveUpReason {
    /// The failure that ended the loop.
    pub fn failure(&self) -> FailureKind {
        match self {
            Self::Permanent(kind) => *kind,
            Self::Exhausted { last, .. } => *last,
        }
    }
}

/// Outcome of consulting the policy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Wait for `wait`, then try again with `next`.
    Retry { wait: Duration, next: BackoffState },
    /// Stop retrying.
    GiveUp(GiveUpReason),
}

/// Retry bookkeeping for one operation.
///
/// Each operation owns its own state; nothing is shared between concurrent
/// callers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffState {
    policy: BackoffPolicy,
    attempt: u32,
}

impl BackoffState {
    /// Number of failed attempts recorded so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Whether the attempt budget is spent.
    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.policy.attempt_budget()
    }

    /// Decide what to do after an attempt failed with `failure`.
    pub fn decide(&self, failure: FailureKind) -> Decision {
        self.decide_with_rng(failure, &mut rand::thread_rng())
    }

    /// Like [`decide`](Self::decide), drawing jitter from `rng`.
    pub fn decide_with_rng<R: Rng>(&self, failure: FailureKind, rng: &mut R) -> Decision {
        if failure.is_permanent() {
            return Decision::GiveUp(GiveUpReason::Permanent(failure));
        }

        let attempts = self.attempt.saturating_add(1);
        if attempts >= self.policy.attempt_budget() {
            return Decision::GiveUp(GiveUpReason::Exhausted {
                attempts,
                last: failure,
            });
        }

        let delay = self.policy.delay_for(self.attempt);
        let jitter = self.policy.jitter_fraction();
        let wait = if jitter > 0.0 && !delay.is_zero() {
            delay.mul_f64(1.0 + rng.gen_range(-jitter..=jitter))
        } else {
            delay
        };

        Decision::Retry {
            wait,
            next: BackoffState {
                policy: self.policy,
                attempt: attempts,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn no_jitter(base_ms: u64, max_ms: u64, max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts,
            base_delay_ms: base_ms,
            multiplier: 2.0,
            max_delay_ms: max_ms,
            jitter: 0.0,
        }
    }

    fn retry_wait(decision: Decision) -> (Duration, BackoffState) {
        match decision {
            Decision::Retry { wait, next } => (wait, next),
            Decision::GiveUp(reason) => panic!("expected retry, got give-up: {reason:?}"),
        }
    }

    #[test]
    fn test_delays_increase_exponentially() {
        let policy = no_jitter(100, 60_000, 10);
        let mut state = policy.start();

        let mut waits = Vec::new();
        for _ in 0..4 {
            let (wait, next) = retry_wait(state.decide(FailureKind::Timeout));
            waits.push(wait);
            state = next;
        }

        assert_eq!(
            waits,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
            ]
        );
    }

    #[test]
    fn test_respects_max_delay() {
        let policy = no_jitter(100, 500, 10);
        assert_eq!(policy.delay_for(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(500));
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let policy = no_jitter(10, 100, 3);
        let state = policy.start();

        let (_, state) = retry_wait(state.decide(FailureKind::RateLimited));
        let (_, state) = retry_wait(state.decide(FailureKind::ServerError(503)));

        match state.decide(FailureKind::Timeout) {
            Decision::GiveUp(GiveUpReason::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last, FailureKind::Timeout);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn test_permanent_failure_never_retries() {
        let state = BackoffPolicy::default().start();
        assert_eq!(
            state.decide(FailureKind::NotFound),
            Decision::GiveUp(GiveUpReason::Permanent(FailureKind::NotFound))
        );
    }

    #[test]
    fn test_zero_attempts_means_one() {
        let state = no_jitter(10, 100, 0).start();
        assert!(matches!(
            state.decide(FailureKind::Timeout),
            Decision::GiveUp(GiveUpReason::Exhausted { attempts: 1, .. })
        ));
    }

    #[test]
    fn test_jitter_is_bounded() {
        let policy = BackoffPolicy {
            max_attempts: 5,
            base_delay_ms: 1_000,
            multiplier: 2.0,
            max_delay_ms: 30_000,
            jitter: 0.2,
        };

        for _ in 0..100 {
            let (wait, _) = retry_wait(policy.start().decide(FailureKind::Timeout));
            assert!(wait >= Duration::from_millis(800));
            assert!(wait <= Duration::from_millis(1200));
        }
    }

    #[test]
    fn test_sub_unit_multiplier_is_clamped() {
        let policy = BackoffPolicy {
            multiplier: 0.5,
            jitter: 0.0,
            ..BackoffPolicy::default()
        };
        assert_eq!(policy.delay_for(0), policy.delay_for(5));
    }

    #[test]
    fn test_policy_deserializes_with_defaults() {
        let policy: BackoffPolicy = serde_json::from_str(r#"{"max_attempts": 7}"#).unwrap();
        assert_eq!(policy.max_attempts, 7);
        assert_eq!(policy.base_delay_ms, 1_000);
        assert_eq!(policy.max_delay_ms, 30_000);
    }

    proptest! {
        #[test]
        fn prop_delays_monotonic_and_capped(
            base_ms in 0u64..10_000,
            max_ms in 0u64..120_000,
            multiplier in 1.0f64..8.0,
            attempts in 1u32..64,
        ) {
            let policy = BackoffPolicy {
                max_attempts: attempts,
                base_delay_ms: base_ms,
                multiplier,
                max_delay_ms: max_ms,
                jitter: 0.0,
            };

            let mut previous = Duration::ZERO;
            for attempt in 0..attempts {
                let delay = policy.delay_for(attempt);
                prop_assert!(delay >= previous);
                prop_assert!(delay <= policy.max_delay());
                previous = delay;
            }
        }

        #[test]
        fn prop_never_retries_past_budget(attempts in 1u32..32) {
            let policy = BackoffPolicy::immediate(attempts);
            let mut state = policy.start();
            let mut retries = 0u32;

            loop {
                match state.decide(FailureKind::Unreachable) {
                    Decision::Retry { next, .. } => {
                        retries += 1;
                        state = next;
                    }
                    Decision::GiveUp(reason) => {
                        prop_assert_eq!(reason.failure(), FailureKind::Unreachable);
                        break;
                    }
                }
            }

            prop_assert_eq!(retries, attempts - 1);
            prop_assert!(matches!(
                state.decide(FailureKind::Unreachable),
                Decision::GiveUp(_)
            ));
        }
    }
}
