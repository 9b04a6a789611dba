//! 지수 백오프 재시도 실행기.
//!
//! 실패한 작업을 `base_delay * 2^(n-1)` 간격으로 다시 실행합니다.
//! 최종 실패 시 마지막 에러에 시도 횟수를 덧붙여 반환합니다.

use std::future::Future;
use std::time::Duration;

use puzzle_core::{FetcherConfig, PuzzleError, PuzzleResult};
use tracing::{debug, warn};

/// 재시도 설정.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// 최대 시도 횟수 (첫 시도 포함, 최소 1)
    pub max_attempts: u32,
    /// 첫 재시도 전 대기 시간
    pub base_delay: Duration,
    /// 대기 시간 상한
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryConfig {
    /// 새 재시도 설정 생성.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Default::default()
        }
    }

    /// 대기 시간 상한 설정.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// 재시도 없이 한 번만 실행.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// `attempt`번째 시도가 실패한 뒤의 대기 시간 (1부터 시작).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// 모든 재시도 대기 시간의 합.
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts).map(|n| self.delay_for(n)).sum()
    }

    /// 시도와 대기 전체가 `budget` 안에 끝나도록 하는 시도당 타임아웃.
    ///
    /// 예산의 10%는 여유로 남깁니다. 대기 합만으로 예산을 넘으면 `None`.
    pub fn attempt_timeout(&self, budget: Duration) -> Option<Duration> {
        let usable = budget.mul_f64(0.9).checked_sub(self.total_backoff())?;
        let per_attempt = usable / self.max_attempts.max(1);
        (!per_attempt.is_zero()).then_some(per_attempt)
    }
}

impl From<&FetcherConfig> for RetryConfig {
    fn from(config: &FetcherConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
        }
    }
}

/// 재시도 실행 결과 통계.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryStats {
    /// 실제 시도 횟수
    pub attempts: u32,
    /// 누적 대기 시간
    pub total_delay: Duration,
}

/// 모든 에러에 대해 재시도합니다.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, label: &str, op: F) -> PuzzleResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PuzzleResult<T>>,
{
    with_retry_stats(config, label, op, |_| true).await.0
}

/// `should_retry`가 참인 에러에 대해서만 재시도합니다.
///
/// 재시도 대상이 아닌 에러는 즉시 반환됩니다.
pub async fn with_retry_if<T, F, Fut, P>(
    config: &RetryConfig,
    label: &str,
    op: F,
    should_retry: P,
) -> PuzzleResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PuzzleResult<T>>,
    P: Fn(&PuzzleError) -> bool,
{
    with_retry_stats(config, label, op, should_retry).await.0
}

/// 재시도 실행 후 결과와 함께 시도 통계를 반환합니다.
pub async fn with_retry_stats<T, F, Fut, P>(
    config: &RetryConfig,
    label: &str,
    mut op: F,
    should_retry: P,
) -> (PuzzleResult<T>, RetryStats)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PuzzleResult<T>>,
    P: Fn(&PuzzleError) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut stats = RetryStats::default();

    loop {
        stats.attempts += 1;
        let attempt = stats.attempts;

        let err = match op().await {
            Ok(value) => return (Ok(value), stats),
            Err(e) => e,
        };

        if attempt >= max_attempts || !should_retry(&err) {
            if attempt > 1 {
                warn!(
                    operation = label,
                    attempts = attempt,
                    error = %err,
                    "재시도 최종 실패"
                );
            }
            return (Err(err.with_attempts(attempt)), stats);
        }

        let delay = config.delay_for(attempt);
        debug!(
            operation = label,
            attempt = attempt,
            max_attempts = max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "재시도 예정"
        );
        tokio::time::sleep(delay).await;
        stats.total_delay += delay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_growth_is_capped() {
        let config = RetryConfig::new(6, Duration::from_millis(500))
            .with_max_delay(Duration::from_secs(3));

        assert_eq!(config.delay_for(1), Duration::from_millis(500));
        assert_eq!(config.delay_for(2), Duration::from_millis(1000));
        assert_eq!(config.delay_for(3), Duration::from_millis(2000));
        assert_eq!(config.delay_for(4), Duration::from_secs(3));
        assert_eq!(config.delay_for(40), Duration::from_secs(3));
    }

    #[test]
    fn test_attempt_timeout_fits_budget() {
        let config = RetryConfig::new(3, Duration::from_millis(500));
        assert_eq!(config.total_backoff(), Duration::from_millis(1500));

        // 10s * 0.9 - 1.5s = 7.5s, 시도 3회
        let per_attempt = config.attempt_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(per_attempt, Duration::from_millis(2500));
        assert!(per_attempt * 3 + config.total_backoff() < Duration::from_secs(10));

        // 대기 합이 예산보다 크면 불가
        assert_eq!(config.attempt_timeout(Duration::from_secs(1)), None);
        assert_eq!(
            RetryConfig::no_retry().attempt_timeout(Duration::from_secs(1)),
            Some(Duration::from_millis(900))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = &AtomicU32::new(0);
        let config = RetryConfig::new(3, Duration::from_millis(100));

        let (result, stats) = with_retry_stats(
            &config,
            "test",
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(PuzzleError::TransientNetwork("연결 끊김".into()))
                } else {
                    Ok(n)
                }
            },
            PuzzleError::is_retryable,
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(stats.attempts, 3);
        // 100ms + 200ms
        assert_eq!(stats.total_delay, Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_error_carries_attempt_count() {
        let config = RetryConfig::new(3, Duration::from_millis(10));

        let result: PuzzleResult<()> = with_retry(&config, "test", || async {
            Err(PuzzleError::TransientNetwork("503".into()))
        })
        .await;

        match result {
            Err(PuzzleError::TransientNetwork(msg)) => assert!(msg.contains("3회 시도 후")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = &AtomicU32::new(0);
        let config = RetryConfig::new(5, Duration::from_millis(10));

        let result: PuzzleResult<()> = with_retry_if(
            &config,
            "test",
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(PuzzleError::NotFound("2025-08-20".into()))
            },
            PuzzleError::is_retryable,
        )
        .await;

        assert!(matches!(result, Err(PuzzleError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = &AtomicU32::new(0);
        let config = RetryConfig::new(0, Duration::ZERO);

        let result = with_retry(&config, "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, PuzzleError>(())
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
