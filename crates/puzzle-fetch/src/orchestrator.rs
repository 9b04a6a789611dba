//! 우선순위 기반 퍼즐 오케스트레이터.
//!
//! 등록된 Fetcher를 우선순위 순으로 시도하고 첫 번째 성공 결과를 반환합니다.
//!
//! # 조회 흐름
//!
//! 1. 날짜 검증 (실패 시 즉시 입력 에러)
//! 2. 캐시 조회 (히트 시 소스 호출 없음)
//! 3. 같은 날짜의 진행 중 요청 확인 (`InProgress`)
//! 4. 정상 소스를 `(priority, 등록 순서)` 순으로 시도
//! 5. 모두 실패하면 `Exhausted`
//!
//! `PersistentSource`를 내거나 `TransientNetwork`가 임계치만큼 연속된 소스는
//! 비정상으로 표시되어 이후 조회에서 제외됩니다.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use puzzle_core::{
    rank_candidates, resolve_request_date, today_utc, AppConfig, PuzzleError, PuzzleRecord,
    PuzzleResult, ScoredCandidate,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::cache::PuzzleCache;
use crate::fetcher::Fetcher;
use crate::health::{probe_sources, HealthMonitor, HealthProbe, HealthState};
use crate::stats::FetcherStats;
use crate::{lock, read, write};

/// 오케스트레이터 설정.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// 캐시 TTL
    pub cache_ttl: Duration,
    /// 헬스 프로브 활성화
    pub probe_enabled: bool,
    /// 헬스 프로브 주기
    pub probe_interval: Duration,
    /// 프로브 대상 날짜 (오늘로부터 며칠 전)
    pub probe_lookback_days: u64,
    /// 소스를 비정상으로 전환하는 연속 일시 장애 횟수
    pub transient_failure_threshold: u32,
    /// 동시에 진행 가능한 날짜 수 (없으면 무제한)
    pub max_in_flight: Option<usize>,
    /// 우선순위 미지정 시 기본값
    pub default_priority: i32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            probe_enabled: true,
            probe_interval: Duration::from_secs(15 * 60),
            probe_lookback_days: 1,
            transient_failure_threshold: 3,
            max_in_flight: None,
            default_priority: 100,
        }
    }
}

impl From<&AppConfig> for OrchestratorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            cache_ttl: config.cache.ttl(),
            probe_enabled: config.health.enabled,
            probe_interval: config.health.probe_interval(),
            probe_lookback_days: config.health.probe_lookback_days,
            transient_failure_threshold: config.health.transient_failure_threshold,
            max_in_flight: config.orchestrator.max_in_flight,
            default_priority: config.orchestrator.default_priority,
        }
    }
}

struct Registration {
    fetcher: Arc<Fetcher>,
    priority: i32,
    seq: u64,
}

/// 소스별 상태 요약.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub name: String,
    pub priority: i32,
    pub health: Option<HealthState>,
    pub stats: FetcherStats,
}

/// 오케스트레이터 통계.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStats {
    /// 우선순위 순 소스 상태
    pub per_source: Vec<SourceStatus>,
    /// 캐시 항목 수
    pub cache_size: usize,
    /// 정상 소스 수
    pub healthy_sources: usize,
    /// 진행 중인 날짜 수
    pub active_in_flight: usize,
}

/// 진행 중 표시. drop 시 해제됩니다 (취소 포함).
struct InFlightGuard {
    dates: Arc<Mutex<HashSet<NaiveDate>>>,
    date: NaiveDate,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.dates).remove(&self.date);
    }
}

/// 퍼즐 오케스트레이터.
pub struct PuzzleOrchestrator {
    config: OrchestratorConfig,
    registrations: Arc<RwLock<Vec<Registration>>>,
    next_seq: AtomicU64,
    cache: PuzzleCache,
    health: Arc<HealthMonitor>,
    in_flight: Arc<Mutex<HashSet<NaiveDate>>>,
    probe: Mutex<Option<HealthProbe>>,
}

impl Default for PuzzleOrchestrator {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default())
    }
}

impl PuzzleOrchestrator {
    /// 새 오케스트레이터 생성.
    pub fn new(config: OrchestratorConfig) -> Self {
        let health = HealthMonitor::with_transient_threshold(config.transient_failure_threshold);
        Self {
            cache: PuzzleCache::new(config.cache_ttl),
            config,
            registrations: Arc::new(RwLock::new(Vec::new())),
            next_seq: AtomicU64::new(0),
            health: Arc::new(health),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            probe: Mutex::new(None),
        }
    }

    /// 설정 반환.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// 헬스 모니터.
    pub fn health(&self) -> &HealthMonitor {
        &self.health
    }

    /// 캐시.
    pub fn cache(&self) -> &PuzzleCache {
        &self.cache
    }

    /// Fetcher 등록.
    ///
    /// 같은 이름이 이미 있으면 교체하며, 헬스 상태는 정상으로 초기화됩니다.
    /// 우선순위가 같으면 먼저 등록된 쪽이 먼저 시도됩니다.
    pub fn register_fetcher(&self, fetcher: Arc<Fetcher>, priority: i32) -> PuzzleResult<()> {
        let name = fetcher.source_name().to_string();
        if name.trim().is_empty() {
            return Err(PuzzleError::Config("소스 이름이 비어 있습니다".into()));
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        {
            let mut regs = write(&self.registrations);
            let replaced = regs.len();
            regs.retain(|r| r.fetcher.source_name() != name);
            if regs.len() != replaced {
                debug!(source = %name, "기존 소스 교체");
            }
            regs.push(Registration {
                fetcher,
                priority,
                seq,
            });
            regs.sort_by_key(|r| (r.priority, r.seq));
        }
        self.health.register(&name);

        info!(source = %name, priority = priority, "소스 등록");
        Ok(())
    }

    /// 기본 우선순위로 Fetcher 등록.
    pub fn register_default(&self, fetcher: Arc<Fetcher>) -> PuzzleResult<()> {
        self.register_fetcher(fetcher, self.config.default_priority)
    }

    /// Fetcher 등록 해제.
    pub fn unregister_fetcher(&self, name: &str) -> bool {
        let removed = {
            let mut regs = write(&self.registrations);
            let before = regs.len();
            regs.retain(|r| r.fetcher.source_name() != name);
            regs.len() != before
        };
        if removed {
            self.health.unregister(name);
            info!(source = name, "소스 등록 해제");
        }
        removed
    }

    /// 우선순위 순 소스 이름.
    pub fn fetcher_names(&self) -> Vec<String> {
        read(&self.registrations)
            .iter()
            .map(|r| r.fetcher.source_name().to_string())
            .collect()
    }

    fn ordered_fetchers(&self) -> Vec<Arc<Fetcher>> {
        read(&self.registrations)
            .iter()
            .map(|r| r.fetcher.clone())
            .collect()
    }

    /// 날짜(`YYYY-MM-DD`)의 퍼즐 조회.
    pub async fn fetch_puzzle(&self, date: &str) -> PuzzleResult<PuzzleRecord> {
        let date = resolve_request_date(date, today_utc(), false)?;
        self.fetch_resolved(date, false).await
    }

    /// 로컬 기준 오늘 퍼즐 조회.
    ///
    /// 로컬 날짜는 UTC보다 하루 앞설 수 있으므로 미래 날짜를 허용합니다.
    pub async fn fetch_today(&self) -> PuzzleResult<PuzzleRecord> {
        let today = Local::now().date_naive();
        self.fetch_resolved(today, true).await
    }

    #[instrument(skip(self))]
    async fn fetch_resolved(&self, date: NaiveDate, allow_future: bool) -> PuzzleResult<PuzzleRecord> {
        if let Some(record) = self.cache.get(date) {
            debug!(source = record.source(), "캐시 히트");
            return Ok(record);
        }

        let _guard = self.begin(date)?;
        let date_str = date.format("%Y-%m-%d").to_string();

        let mut tried = 0;
        let mut last: Option<PuzzleError> = None;

        for fetcher in self.ordered_fetchers() {
            let name = fetcher.source_name();
            if !self.health.is_healthy(name) {
                debug!(source = name, "비정상 소스 건너뜀");
                continue;
            }

            tried += 1;
            match fetcher.fetch_puzzle_with(&date_str, allow_future).await {
                Ok(record) => {
                    self.health.record_success(name);
                    self.cache.put(&record);
                    info!(source = name, game_id = record.game_id(), "퍼즐 조회 성공");
                    return Ok(record);
                }
                Err(e) if e.is_invalid_input() => return Err(e),
                Err(e) => {
                    if self.health.record_failure(name, &e) {
                        warn!(source = name, error = %e, "소스 비정상 처리, 다음 소스 시도");
                    } else if matches!(e, PuzzleError::MalformedData(_)) {
                        warn!(source = name, error = %e, "소스 데이터 불량, 다음 소스 시도");
                    } else {
                        debug!(source = name, error = %e, "소스 실패, 다음 소스 시도");
                    }
                    last = Some(e);
                }
            }
        }

        warn!(tried = tried, "모든 소스 실패");
        Err(PuzzleError::Exhausted {
            date,
            tried,
            last: last.map(Box::new),
        })
    }

    fn begin(&self, date: NaiveDate) -> PuzzleResult<InFlightGuard> {
        let mut dates = lock(&self.in_flight);
        if dates.contains(&date) {
            return Err(PuzzleError::InProgress(date));
        }
        if let Some(max) = self.config.max_in_flight {
            if dates.len() >= max {
                return Err(PuzzleError::TooManyInFlight(max));
            }
        }
        dates.insert(date);

        Ok(InFlightGuard {
            dates: self.in_flight.clone(),
            date,
        })
    }

    /// 날짜의 퍼즐을 제공할 수 있는 소스가 있는지 확인.
    ///
    /// 캐시에 있으면 소스를 호출하지 않습니다.
    pub async fn is_available(&self, date: &str) -> bool {
        let Ok(parsed) = resolve_request_date(date, today_utc(), false) else {
            return false;
        };
        if self.cache.contains(parsed) {
            return true;
        }

        for fetcher in self.ordered_fetchers() {
            if self.health.is_healthy(fetcher.source_name()) && fetcher.is_available(date).await {
                return true;
            }
        }
        false
    }

    /// 모든 등록 소스에서 후보를 가져와 품질 점수순으로 정렬.
    ///
    /// 진단용이며 캐시와 헬스 상태를 바꾸지 않습니다. 실패한 소스는 결과에서 빠집니다.
    /// 각 Fetcher의 통계(`FetcherStats`)에는 일반 조회와 똑같이 기록됩니다.
    pub async fn compare_sources(&self, date: &str) -> PuzzleResult<Vec<ScoredCandidate>> {
        resolve_request_date(date, today_utc(), false)?;

        let mut records = Vec::new();
        for fetcher in self.ordered_fetchers() {
            match fetcher.fetch_puzzle(date).await {
                Ok(record) => records.push(record),
                Err(e) => debug!(source = fetcher.source_name(), error = %e, "비교 대상 제외"),
            }
        }
        Ok(rank_candidates(records))
    }

    /// 통계 스냅샷.
    pub fn stats(&self) -> OrchestratorStats {
        let sources = read(&self.registrations)
            .iter()
            .map(|r| {
                let name = r.fetcher.source_name();
                SourceStatus {
                    name: name.to_string(),
                    priority: r.priority,
                    health: self.health.state(name),
                    stats: r.fetcher.stats(),
                }
            })
            .collect();

        OrchestratorStats {
            per_source: sources,
            cache_size: self.cache.len(),
            healthy_sources: self.health.healthy_count(),
            active_in_flight: lock(&self.in_flight).len(),
        }
    }

    /// 캐시 전체 삭제.
    pub fn clear_cache(&self) {
        self.cache.clear_all();
        info!("캐시 초기화");
    }

    /// 만료 캐시 정리.
    pub fn clear_expired_cache(&self) -> usize {
        self.cache.clear_expired()
    }

    /// 헬스 프로브 한 회차를 즉시 실행.
    pub async fn probe_now(&self) {
        let date = probe_date(self.config.probe_lookback_days);
        probe_sources(&self.health, &self.ordered_fetchers(), date).await;
    }

    /// 백그라운드 헬스 프로브 시작.
    ///
    /// 비활성화되어 있거나 이미 실행 중이면 `false`.
    pub fn start_health_probe(&self) -> bool {
        if !self.config.probe_enabled {
            return false;
        }

        let mut slot = lock(&self.probe);
        if slot.as_ref().is_some_and(HealthProbe::is_running) {
            return false;
        }

        let registrations = self.registrations.clone();
        let health = self.health.clone();
        let lookback = self.config.probe_lookback_days;

        *slot = Some(HealthProbe::spawn(self.config.probe_interval, move || {
            let fetchers: Vec<Arc<Fetcher>> = read(&registrations)
                .iter()
                .map(|r| r.fetcher.clone())
                .collect();
            let health = health.clone();
            async move {
                probe_sources(&health, &fetchers, probe_date(lookback)).await;
            }
        }));
        true
    }

    /// 백그라운드 헬스 프로브 중지.
    pub async fn stop_health_probe(&self) {
        let probe = lock(&self.probe).take();
        if let Some(probe) = probe {
            probe.stop().await;
        }
    }

    /// 프로브를 멈추고 캐시, 등록, 헬스, 진행 중 상태를 모두 비웁니다.
    pub async fn destroy(&self) {
        self.stop_health_probe().await;
        self.cache.clear_all();
        write(&self.registrations).clear();
        self.health.clear();
        lock(&self.in_flight).clear();
        info!("오케스트레이터 종료");
    }
}

fn probe_date(lookback_days: u64) -> NaiveDate {
    let today = today_utc();
    today
        .checked_sub_days(chrono::Days::new(lookback_days))
        .unwrap_or(today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{FetcherOptions, PuzzleSource};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Named(&'static str);

    #[async_trait]
    impl PuzzleSource for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn fetch_raw(&self, date: NaiveDate) -> PuzzleResult<Value> {
            Err(PuzzleError::NotFound(date.to_string()))
        }
    }

    fn fetcher(name: &'static str) -> Arc<Fetcher> {
        Arc::new(Fetcher::new(Named(name), FetcherOptions::default()))
    }

    #[test]
    fn test_registration_order() {
        let orch = PuzzleOrchestrator::default();
        orch.register_fetcher(fetcher("c"), 10).unwrap();
        orch.register_fetcher(fetcher("a"), 1).unwrap();
        orch.register_fetcher(fetcher("b"), 10).unwrap();
        assert_eq!(orch.fetcher_names(), vec!["a", "c", "b"]);

        // 같은 이름은 교체 (새 순서 번호)
        orch.register_fetcher(fetcher("c"), 10).unwrap();
        assert_eq!(orch.fetcher_names(), vec!["a", "b", "c"]);

        assert!(orch.unregister_fetcher("a"));
        assert!(!orch.unregister_fetcher("a"));
        assert_eq!(orch.fetcher_names(), vec!["b", "c"]);
    }

    #[test]
    fn test_empty_name_rejected() {
        let orch = PuzzleOrchestrator::default();
        let err = orch.register_fetcher(fetcher("  "), 1).unwrap_err();
        assert!(matches!(err, PuzzleError::Config(_)));
    }

    #[test]
    fn test_in_flight_guard_released_on_drop() {
        let orch = PuzzleOrchestrator::new(OrchestratorConfig {
            max_in_flight: Some(1),
            ..Default::default()
        });
        let date = NaiveDate::from_ymd_opt(2025, 8, 20).unwrap();
        let other = NaiveDate::from_ymd_opt(2025, 8, 21).unwrap();

        let guard = orch.begin(date).unwrap();
        assert!(matches!(orch.begin(date), Err(PuzzleError::InProgress(_))));
        assert!(matches!(orch.begin(other), Err(PuzzleError::TooManyInFlight(1))));
        assert_eq!(orch.stats().active_in_flight, 1);

        drop(guard);
        assert!(orch.begin(date).is_ok());
        assert_eq!(orch.stats().active_in_flight, 0);
    }

    #[tokio::test]
    async fn test_exhausted_without_sources() {
        let orch = PuzzleOrchestrator::default();
        match orch.fetch_puzzle("2025-08-20").await {
            Err(PuzzleError::Exhausted { tried, last, .. }) => {
                assert_eq!(tried, 0);
                assert!(last.is_none());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stats_snapshot_is_serializable() {
        let orch = PuzzleOrchestrator::default();
        orch.register_fetcher(fetcher("a"), 1).unwrap();
        let _ = orch.fetch_puzzle("2025-08-20").await;

        let value = serde_json::to_value(orch.stats()).unwrap();
        assert_eq!(value["per_source"][0]["name"], json!("a"));
        assert_eq!(value["per_source"][0]["stats"]["failures"], json!(1));
        assert_eq!(value["active_in_flight"], json!(0));
        assert_eq!(value["healthy_sources"], json!(1));
    }

    #[tokio::test]
    async fn test_destroy_clears_state() {
        let orch = PuzzleOrchestrator::default();
        orch.register_fetcher(fetcher("a"), 1).unwrap();
        assert!(orch.start_health_probe());
        assert!(!orch.start_health_probe());

        orch.destroy().await;
        assert!(orch.fetcher_names().is_empty());
        assert_eq!(orch.health().healthy_count(), 0);
        assert!(orch.start_health_probe());
        orch.stop_health_probe().await;
    }
}
