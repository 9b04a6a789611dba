//! Fetcher 통계 구조체.

use std::time::Duration;

use chrono::{DateTime, Utc};
use puzzle_core::{ErrorClass, PuzzleError};
use serde::Serialize;

/// 마지막 실패 정보.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    /// 실패 시각
    pub at: DateTime<Utc>,
    /// 에러 분류
    pub class: ErrorClass,
    /// 에러 메시지
    pub error: String,
}

/// 소스별 수집 통계
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetcherStats {
    /// 총 시도 횟수 (날짜 검증을 통과한 요청만)
    pub total_attempts: u64,
    /// 성공 횟수
    pub successes: u64,
    /// 실패 횟수
    pub failures: u64,
    /// 평균 지연 시간 (밀리초, 누적 평균)
    pub avg_latency_ms: f64,
    /// 마지막 성공 시각
    pub last_success: Option<DateTime<Utc>>,
    /// 마지막 실패
    pub last_failure: Option<FailureRecord>,
}

impl FetcherStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 성공 기록
    pub fn record_success(&mut self, latency: Duration) {
        self.push_latency(latency);
        self.successes += 1;
        self.last_success = Some(Utc::now());
    }

    /// 실패 기록
    pub fn record_failure(&mut self, latency: Duration, error: &PuzzleError) {
        self.push_latency(latency);
        self.failures += 1;
        self.last_failure = Some(FailureRecord {
            at: Utc::now(),
            class: error.class(),
            error: error.to_string(),
        });
    }

    fn push_latency(&mut self, latency: Duration) {
        self.total_attempts += 1;
        let sample = latency.as_secs_f64() * 1000.0;
        self.avg_latency_ms += (sample - self.avg_latency_ms) / self.total_attempts as f64;
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            0.0
        } else {
            (self.successes as f64 / self.total_attempts as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, source: &str) {
        tracing::info!(
            source = source,
            total = self.total_attempts,
            successes = self.successes,
            failures = self.failures,
            success_rate = format!("{:.1}%", self.success_rate()),
            avg_latency = format!("{:.1}ms", self.avg_latency_ms),
            last_error = self.last_failure.as_ref().map(|f| f.error.as_str()),
            "소스 통계"
        );
    }
}
