// src/services/poll.rs
//! Sequential "poll until ready" loop for upstreams that answer with a
//! retry-later signal instead of a result.
use log::warn;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    /// Wait used when the upstream gives no hint
    pub default_wait: Duration,
    /// Upper bound on a single wait, whatever the upstream asks for
    pub max_wait: Duration,
    /// Upper bound on the sum of all waits
    pub max_total_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_retries: 60,
            default_wait: Duration::from_secs(5),
            max_wait: Duration::from_secs(60),
            max_total_wait: Duration::from_secs(15 * 60),
        }
    }
}

/// Outcome of one attempt.
#[derive(Debug)]
pub enum Attempt<T> {
    Ready(T),
    RetryAfter(Option<Duration>),
}

#[derive(Debug, thiserror::Error)]
pub enum PollError<E> {
    #[error("gave up after {0} retries")]
    Exhausted(u32),
    #[error("cumulative wait would exceed {0:?}")]
    DeadlineExceeded(Duration),
    #[error("{0}")]
    Failed(E),
}

pub async fn poll_until_ready<F, Fut, T, E>(policy: &PollPolicy, mut f: F) -> Result<T, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Attempt<T>, E>>,
{
    let mut retries = 0;
    let mut waited = Duration::ZERO;

    loop {
        let hint = match f(retries).await.map_err(PollError::Failed)? {
            Attempt::Ready(value) => return Ok(value),
            Attempt::RetryAfter(hint) => hint,
        };

        if retries >= policy.max_retries {
            warn!("Upstream still not ready after {} retries", retries);
            return Err(PollError::Exhausted(retries));
        }

        let delay = hint.unwrap_or(policy.default_wait).min(policy.max_wait);
        if waited.saturating_add(delay) > policy.max_total_wait {
            warn!(
                "Next wait of {:?} would exceed the {:?} ceiling",
                delay, policy.max_total_wait
            );
            return Err(PollError::DeadlineExceeded(policy.max_total_wait));
        }

        retries += 1;
        warn!(
            "Upstream not ready, retry {}/{} in {:?}",
            retries, policy.max_retries, delay
        );
        tokio::time::sleep(delay).await;
        waited = waited.saturating_add(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> PollPolicy {
        PollPolicy {
            max_retries,
            default_wait: Duration::from_millis(1),
            max_wait: Duration::from_millis(5),
            max_total_wait: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn ready_on_first_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = poll_until_ready(&fast_policy(3), move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>(Attempt::Ready(42)) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ready_after_retries() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = poll_until_ready(&fast_policy(3), move |_| {
            let count = counter_clone.fetch_add(1, Ordering::SeqCst);
            async move {
                if count < 2 {
                    Ok::<_, String>(Attempt::RetryAfter(None))
                } else {
                    Ok(Attempt::Ready("done"))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_after_max_retries() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), _> = poll_until_ready(&fast_policy(2), move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>(Attempt::RetryAfter(None)) }
        })
        .await;

        assert!(matches!(result, Err(PollError::Exhausted(2))));
        assert_eq!(counter.load(Ordering::SeqCst), 3); // Initial + 2 retries
    }

    #[tokio::test]
    async fn attempt_error_is_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), _> = poll_until_ready(&fast_policy(5), move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Err::<Attempt<()>, _>("boom") }
        })
        .await;

        assert!(matches!(result, Err(PollError::Failed("boom"))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hinted_wait_is_capped() {
        let start = std::time::Instant::now();

        let result = poll_until_ready(&fast_policy(1), |retry| async move {
            if retry == 0 {
                Ok::<_, String>(Attempt::RetryAfter(Some(Duration::from_secs(3600))))
            } else {
                Ok(Attempt::Ready(()))
            }
        })
        .await;

        assert!(result.is_ok());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn upstream_hint_replaces_default_wait() {
        let policy = PollPolicy {
            max_retries: 3,
            default_wait: Duration::from_secs(30),
            max_wait: Duration::from_secs(30),
            max_total_wait: Duration::from_secs(120),
        };
        let start = std::time::Instant::now();

        let result = poll_until_ready(&policy, |retry| async move {
            if retry < 2 {
                Ok::<_, String>(Attempt::RetryAfter(Some(Duration::from_millis(20))))
            } else {
                Ok(Attempt::Ready(retry))
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(40));
        assert!(elapsed < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn maximal_durations_do_not_overflow() {
        let policy = PollPolicy {
            max_retries: 5,
            default_wait: Duration::from_millis(1),
            max_wait: Duration::MAX,
            max_total_wait: Duration::MAX - Duration::from_nanos(1),
        };
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), _> = poll_until_ready(&policy, move |retry| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async move {
                if retry == 0 {
                    Ok::<_, String>(Attempt::RetryAfter(Some(Duration::from_millis(1))))
                } else {
                    Ok(Attempt::RetryAfter(Some(Duration::MAX)))
                }
            }
        })
        .await;

        // 1ms + Duration::MAX saturates past the ceiling
        assert!(matches!(result, Err(PollError::DeadlineExceeded(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cumulative_wait_ceiling() {
        let policy = PollPolicy {
            max_retries: 100,
            default_wait: Duration::from_millis(10),
            max_wait: Duration::from_millis(10),
            max_total_wait: Duration::from_millis(25),
        };
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), _> = poll_until_ready(&policy, move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>(Attempt::RetryAfter(None)) }
        })
        .await;

        assert!(matches!(result, Err(PollError::DeadlineExceeded(_))));
        // Waits of 10ms + 10ms fit, a third would reach 30ms
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
