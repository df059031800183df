//! Cancellable, time-bounded polling with optional backoff.

use crate::models::{ChatbotError, Result, TrainingConfig};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How often to poll and when to give up.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay after the first unconverged read
    pub interval: Duration,
    /// Multiplier applied to the delay after every unconverged read
    pub backoff_factor: f64,
    /// Upper bound for the delay
    pub max_interval: Duration,
    /// Overall budget; `None` waits until converged or cancelled
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            backoff_factor: 1.0,
            max_interval: Duration::from_secs(60),
            deadline: None,
        }
    }
}

impl PollPolicy {
    pub fn from_config(config: &TrainingConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.poll_interval_secs),
            backoff_factor: config.backoff_factor,
            max_interval: Duration::from_secs(config.max_interval_secs),
            deadline: config.deadline_secs.map(Duration::from_secs),
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Delay to use after `current`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        if self.backoff_factor <= 1.0 || !self.backoff_factor.is_finite() {
            return current;
        }
        let cap = self.max_interval.max(self.interval);
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_factor)
            .map_or(cap, |next| next.min(cap))
    }
}

/// Value produced by a successful poll.
#[derive(Debug, Clone, PartialEq)]
pub struct Polled<T> {
    pub value: T,
    /// Number of probes performed, including the final one
    pub attempts: u32,
}

/// Run `probe` until it yields `Some`, sleeping between attempts.
///
/// Probe errors end the poll immediately. Cancellation is observed before
/// every probe and during every sleep.
pub async fn poll_until<T, F, Fut>(
    policy: &PollPolicy,
    cancel: &CancellationToken,
    mut probe: F,
) -> Result<Polled<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let started = Instant::now();
    let mut delay = policy.interval;
    let mut attempts = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Err(ChatbotError::Cancelled);
        }

        attempts += 1;
        if let Some(value) = probe().await? {
            return Ok(Polled { value, attempts });
        }

        if let Some(deadline) = policy.deadline {
            let wake = started.elapsed().checked_add(delay);
            if wake.map_or(true, |wake| wake > deadline) {
                return Err(ChatbotError::Timeout(deadline));
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(ChatbotError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        delay = policy.next_interval(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_interval_by_default() {
        let policy = PollPolicy::default();
        assert_eq!(policy.next_interval(policy.interval), Duration::from_secs(10));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = PollPolicy {
            interval: Duration::from_secs(10),
            backoff_factor: 2.0,
            max_interval: Duration::from_secs(30),
            deadline: None,
        };
        let second = policy.next_interval(policy.interval);
        assert_eq!(second, Duration::from_secs(20));
        assert_eq!(policy.next_interval(second), Duration::from_secs(30));
        assert_eq!(policy.next_interval(Duration::from_secs(30)), Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_overflow_clamps_to_cap() {
        let policy = PollPolicy {
            interval: Duration::from_secs(u64::MAX / 2),
            backoff_factor: 4.0,
            max_interval: Duration::from_secs(60),
            deadline: None,
        };
        assert_eq!(policy.next_interval(policy.interval), policy.interval);
        assert_eq!(
            policy.next_interval(Duration::from_secs(u64::MAX)),
            Duration::from_secs(u64::MAX / 2)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_with_deadline_times_out() {
        let policy = PollPolicy {
            interval: Duration::MAX,
            backoff_factor: 2.0,
            max_interval: Duration::MAX,
            deadline: Some(Duration::from_secs(30)),
        };
        let err = poll_until(&policy, &CancellationToken::new(), || async { Ok(None::<()>) })
            .await
            .unwrap_err();
        assert!(matches!(err, ChatbotError::Timeout(_)));
    }

    #[test]
    fn test_from_config() {
        let config = TrainingConfig {
            poll_interval_secs: 5,
            backoff_factor: 1.5,
            max_interval_secs: 40,
            deadline_secs: Some(300),
        };
        let policy = PollPolicy::from_config(&config);
        assert_eq!(policy.interval, Duration::from_secs(5));
        assert_eq!(policy.deadline, Some(Duration::from_secs(300)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_on_first_success_without_sleeping() {
        let started = Instant::now();
        let polled = poll_until(&PollPolicy::default(), &CancellationToken::new(), || async {
            Ok(Some(7))
        })
        .await
        .unwrap();
        assert_eq!(polled, Polled { value: 7, attempts: 1 });
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stops_polling() {
        let policy = PollPolicy::default().with_deadline(Duration::from_secs(25));
        let mut calls = 0;
        let err = poll_until(&policy, &CancellationToken::new(), || {
            calls += 1;
            async { Ok(None::<()>) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ChatbotError::Timeout(d) if d == Duration::from_secs(25)));
        // reads at t=0, 10, 20; the next sleep would cross the deadline
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_sleep() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(15)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let mut calls = 0;
        let err = poll_until(&PollPolicy::default(), &token, || {
            calls += 1;
            async { Ok(None::<()>) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ChatbotError::Cancelled));
        assert_eq!(calls, 2);
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_error_is_fatal() {
        let err = poll_until(&PollPolicy::default(), &CancellationToken::new(), || async {
            Err::<Option<()>, _>(ChatbotError::InvalidResource("bad".to_string()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ChatbotError::InvalidResource(_)));
    }
}
