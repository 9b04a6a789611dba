//! 소스 헬스 모니터와 주기적 프로브.
//!
//! # 상태 전이
//!
//! ```text
//! Healthy ──[PersistentSource / 연속 TransientNetwork ≥ 임계치]──> Unhealthy
//!    ↑                                                              │
//!    └────────────[조회 성공 또는 프로브 성공]───────────────────────┘
//! ```
//!
//! 등록 시 모든 소스는 정상 상태로 시작합니다.
//! 비정상 소스는 오케스트레이터의 조회 경로에서 제외되고,
//! 백그라운드 프로브가 성공하면 다시 포함됩니다.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use puzzle_core::PuzzleError;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::fetcher::Fetcher;
use crate::{read, write};

/// 소스 헬스 상태.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthState {
    /// 정상 여부
    pub healthy: bool,
    /// 마지막 상태 변경 시각
    pub changed_at: DateTime<Utc>,
    /// 마지막 상태 변경 사유
    pub reason: Option<String>,
    /// 연속 헬스 실패 횟수
    pub consecutive_failures: u32,
}

impl HealthState {
    fn healthy() -> Self {
        Self {
            healthy: true,
            changed_at: Utc::now(),
            reason: None,
            consecutive_failures: 0,
        }
    }
}

/// 기본 연속 일시 장애 임계치.
pub const DEFAULT_TRANSIENT_THRESHOLD: u32 = 3;

/// 소스별 헬스 모니터.
#[derive(Debug)]
pub struct HealthMonitor {
    states: RwLock<HashMap<String, HealthState>>,
    transient_threshold: u32,
    transitions: AtomicU64,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthMonitor {
    /// 새 헬스 모니터 생성.
    pub fn new() -> Self {
        Self::with_transient_threshold(DEFAULT_TRANSIENT_THRESHOLD)
    }

    /// 연속 일시 장애 임계치를 지정해 생성 (최소 1).
    pub fn with_transient_threshold(threshold: u32) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            transient_threshold: threshold.max(1),
            transitions: AtomicU64::new(0),
        }
    }

    /// 소스 등록 (기존 상태는 정상으로 초기화).
    pub fn register(&self, name: &str) {
        write(&self.states).insert(name.to_string(), HealthState::healthy());
    }

    /// 소스 제거.
    pub fn unregister(&self, name: &str) -> bool {
        write(&self.states).remove(name).is_some()
    }

    /// 정상 여부 (미등록 소스는 `false`).
    pub fn is_healthy(&self, name: &str) -> bool {
        read(&self.states).get(name).is_some_and(|s| s.healthy)
    }

    /// 상태 조회.
    pub fn state(&self, name: &str) -> Option<HealthState> {
        read(&self.states).get(name).cloned()
    }

    /// 정상으로 표시.
    pub fn mark_healthy(&self, name: &str, reason: &str) {
        let mut states = write(&self.states);
        let Some(state) = states.get_mut(name) else {
            return;
        };

        state.consecutive_failures = 0;
        if !state.healthy {
            state.healthy = true;
            state.changed_at = Utc::now();
            state.reason = Some(reason.to_string());
            self.transitions.fetch_add(1, Ordering::Relaxed);
            info!(source = name, reason = reason, "소스 복구");
        }
    }

    /// 비정상으로 표시.
    pub fn mark_unhealthy(&self, name: &str, reason: &str) {
        if let Some(state) = write(&self.states).get_mut(name) {
            state.consecutive_failures += 1;
        }
        self.set_unhealthy(name, reason);
    }

    fn set_unhealthy(&self, name: &str, reason: &str) {
        let mut states = write(&self.states);
        let Some(state) = states.get_mut(name) else {
            return;
        };

        if state.healthy {
            state.healthy = false;
            state.changed_at = Utc::now();
            state.reason = Some(reason.to_string());
            self.transitions.fetch_add(1, Ordering::Relaxed);
            warn!(source = name, reason = reason, "소스 비정상 전환");
        }
    }

    /// 조회 성공 기록.
    pub fn record_success(&self, name: &str) {
        self.mark_healthy(name, "조회 성공");
    }

    /// 조회 실패 기록. 정상 → 비정상 전환이 일어났는지 반환합니다.
    ///
    /// - `PersistentSource`: 즉시 비정상
    /// - `TransientNetwork`: 연속 횟수가 임계치에 도달하면 비정상
    /// - `NotFound`/`MalformedData`: 소스가 응답했으므로 연속 횟수만 초기화
    pub fn record_failure(&self, name: &str, error: &PuzzleError) -> bool {
        let was_healthy = self.is_healthy(name);

        match error {
            e if e.is_health_signal() => self.mark_unhealthy(name, &e.to_string()),
            PuzzleError::TransientNetwork(msg) => {
                let failures = {
                    let mut states = write(&self.states);
                    let Some(state) = states.get_mut(name) else {
                        return false;
                    };
                    state.consecutive_failures += 1;
                    state.consecutive_failures
                };
                if failures < self.transient_threshold {
                    debug!(
                        source = name,
                        consecutive = failures,
                        threshold = self.transient_threshold,
                        "일시 장애 누적"
                    );
                    return false;
                }
                self.set_unhealthy(name, &format!("연속 일시 장애 {}회: {}", failures, msg));
            }
            _ => {
                if let Some(state) = write(&self.states).get_mut(name) {
                    state.consecutive_failures = 0;
                }
                return false;
            }
        }

        was_healthy && !self.is_healthy(name)
    }

    /// 정상 소스 수.
    pub fn healthy_count(&self) -> usize {
        read(&self.states).values().filter(|s| s.healthy).count()
    }

    /// 누적 상태 전이 횟수.
    pub fn transition_count(&self) -> u64 {
        self.transitions.load(Ordering::Relaxed)
    }

    /// 이름순 스냅샷.
    pub fn snapshot(&self) -> Vec<(String, HealthState)> {
        let mut states: Vec<_> = read(&self.states)
            .iter()
            .map(|(name, state)| (name.clone(), state.clone()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    /// 전체 상태 삭제.
    pub fn clear(&self) {
        write(&self.states).clear();
    }
}

/// 프로브 한 회차 실행.
///
/// 각 Fetcher에 대해 `date`를 프로브하고 결과에 따라 헬스 상태를 갱신합니다.
/// 프로브가 `false`(퍼즐 없음)를 반환하거나 에러가 나면 비정상으로 표시합니다.
pub async fn probe_sources(health: &HealthMonitor, fetchers: &[Arc<Fetcher>], date: NaiveDate) {
    for fetcher in fetchers {
        let name = fetcher.source_name();
        match fetcher.probe_date(date).await {
            Ok(true) => health.mark_healthy(name, "프로브 성공"),
            Ok(false) => {
                health.mark_unhealthy(name, &format!("프로브 실패: {} 퍼즐 없음", date))
            }
            Err(e) => health.mark_unhealthy(name, &format!("프로브 에러: {}", e)),
        }
    }

    debug!(
        date = %date,
        sources = fetchers.len(),
        healthy = health.healthy_count(),
        "헬스 프로브 완료"
    );
}

/// 백그라운드 프로브 작업 핸들.
///
/// drop 또는 [`HealthProbe::stop`] 시 작업이 취소됩니다.
pub struct HealthProbe {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl HealthProbe {
    /// 고정 주기로 `tick`을 실행하는 작업 시작.
    ///
    /// 첫 실행은 한 주기가 지난 뒤입니다.
    pub fn spawn<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let child = token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = child.cancelled() => {
                        debug!("헬스 프로브 종료");
                        break;
                    }
                    _ = interval.tick() => {
                        tick().await;
                    }
                }
            }
        });

        info!(period_secs = period.as_secs(), "헬스 프로브 시작");
        Self {
            token,
            handle: Some(handle),
        }
    }

    /// 실행 중 여부.
    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled() && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// 작업 취소 후 종료를 기다립니다.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "헬스 프로브 작업 종료 실패");
            }
        }
    }
}

impl Drop for HealthProbe {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_new_sources_start_healthy() {
        let monitor = HealthMonitor::new();
        monitor.register("a");
        assert!(monitor.is_healthy("a"));
        assert!(!monitor.is_healthy("unknown"));
        assert_eq!(monitor.healthy_count(), 1);
    }

    #[test]
    fn test_health_signal_transitions() {
        let monitor = HealthMonitor::new();
        monitor.register("a");

        // NotFound는 헬스에 영향 없음
        assert!(!monitor.record_failure("a", &PuzzleError::NotFound("x".into())));
        assert!(monitor.is_healthy("a"));

        assert!(monitor.record_failure("a", &PuzzleError::PersistentSource("401".into())));
        assert!(!monitor.is_healthy("a"));
        // 이미 비정상이면 전이 없음
        assert!(!monitor.record_failure("a", &PuzzleError::PersistentSource("401".into())));
        assert_eq!(monitor.state("a").unwrap().consecutive_failures, 2);

        monitor.record_success("a");
        assert!(monitor.is_healthy("a"));
        assert_eq!(monitor.state("a").unwrap().consecutive_failures, 0);
        assert_eq!(monitor.transition_count(), 2);
    }

    #[test]
    fn test_transient_failures_need_threshold() {
        let monitor = HealthMonitor::with_transient_threshold(3);
        monitor.register("a");
        let timeout = PuzzleError::TransientNetwork("timeout".into());

        assert!(!monitor.record_failure("a", &timeout));
        assert!(!monitor.record_failure("a", &timeout));
        assert!(monitor.is_healthy("a"));

        // 응답이 오면 연속 횟수 초기화
        monitor.record_failure("a", &PuzzleError::NotFound("x".into()));
        assert!(!monitor.record_failure("a", &timeout));
        assert!(!monitor.record_failure("a", &timeout));
        assert!(monitor.is_healthy("a"));

        assert!(monitor.record_failure("a", &timeout));
        assert!(!monitor.is_healthy("a"));
        let state = monitor.state("a").unwrap();
        assert_eq!(state.consecutive_failures, 3);
        assert!(state.reason.unwrap().contains("3회"));
    }

    #[test]
    fn test_unregister_and_snapshot() {
        let monitor = HealthMonitor::new();
        monitor.register("b");
        monitor.register("a");
        monitor.mark_unhealthy("b", "down");

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot[0].0, "a");
        assert!(!snapshot[1].1.healthy);
        assert_eq!(snapshot[1].1.reason.as_deref(), Some("down"));

        assert!(monitor.unregister("b"));
        assert!(!monitor.unregister("b"));
        assert_eq!(monitor.snapshot().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_runs_on_interval_until_stopped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();

        let probe = HealthProbe::spawn(Duration::from_secs(60), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert!(probe.is_running());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        probe.stop().await;
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }
}
