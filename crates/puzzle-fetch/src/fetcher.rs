//! 소스 어댑터 인터페이스와 공통 Fetcher 래퍼.
//!
//! 구체 소스는 [`PuzzleSource`]로 원본 JSON만 가져오고,
//! [`Fetcher`]가 날짜 검증, 타임아웃, 최소 구조 검사, 정규화, 통계 기록을 맡습니다.
//! 따라서 모든 소스가 같은 계약을 따릅니다:
//!
//! - 잘못된 날짜는 I/O 없이 거부되고 통계에 반영되지 않음
//! - 성공한 결과는 항상 검증을 통과한 레코드이며 `source`가 소스 이름으로 설정됨
//! - 날짜 검증 이후의 모든 시도는 성공/실패 중 하나로 기록됨

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use puzzle_core::{
    resolve_request_date, today_utc, validate_and_sanitize, FetcherConfig, PuzzleError,
    PuzzleRecord, PuzzleResult, ValidationOptions, GROUP_COUNT,
};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::lock;
use crate::stats::FetcherStats;

/// 퍼즐 소스 어댑터.
///
/// 구현체는 날짜 하나에 대한 원본 후보 JSON을 반환합니다.
/// 정규화와 검증은 [`Fetcher`]가 수행합니다.
#[async_trait]
pub trait PuzzleSource: Send + Sync {
    /// 소스 이름 (오케스트레이터 등록 키)
    fn name(&self) -> &str;

    /// 날짜의 원본 후보 조회.
    ///
    /// 에러는 분류에 맞게 반환해야 합니다:
    /// 퍼즐 없음은 `NotFound`, 일시적 장애는 `TransientNetwork`,
    /// 인증 실패 등은 `PersistentSource`, 파싱 실패는 `MalformedData`.
    async fn fetch_raw(&self, date: NaiveDate) -> PuzzleResult<Value>;

    /// 날짜의 퍼즐을 제공할 수 있는지 가볍게 확인.
    ///
    /// 기본 구현은 전체 조회를 시도합니다.
    async fn probe(&self, date: NaiveDate) -> PuzzleResult<bool> {
        match self.fetch_raw(date).await {
            Ok(_) => Ok(true),
            Err(PuzzleError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Fetcher 옵션.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherOptions {
    /// 요청 타임아웃
    pub timeout: Duration,
    /// 미래 날짜 허용
    pub allow_future: bool,
    /// 경고를 에러로 승격
    pub strict: bool,
}

impl Default for FetcherOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            allow_future: false,
            strict: false,
        }
    }
}

impl FetcherOptions {
    /// 타임아웃 설정.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 미래 날짜 허용 설정.
    pub fn with_allow_future(mut self, allow: bool) -> Self {
        self.allow_future = allow;
        self
    }

    /// 엄격 모드 설정.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl From<&FetcherConfig> for FetcherOptions {
    fn from(config: &FetcherConfig) -> Self {
        Self {
            timeout: config.timeout(),
            allow_future: false,
            strict: config.strict,
        }
    }
}

/// 소스 어댑터를 감싸는 공통 Fetcher.
pub struct Fetcher {
    source: Box<dyn PuzzleSource>,
    options: FetcherOptions,
    stats: Mutex<FetcherStats>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("source", &self.source.name())
            .field("options", &self.options)
            .finish()
    }
}

impl Fetcher {
    /// 새 Fetcher 생성.
    pub fn new(source: impl PuzzleSource + 'static, options: FetcherOptions) -> Self {
        Self::from_boxed(Box::new(source), options)
    }

    /// 박싱된 소스로 Fetcher 생성.
    pub fn from_boxed(source: Box<dyn PuzzleSource>, options: FetcherOptions) -> Self {
        Self {
            source,
            options,
            stats: Mutex::new(FetcherStats::new()),
        }
    }

    /// 소스 이름.
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// 옵션.
    pub fn options(&self) -> &FetcherOptions {
        &self.options
    }

    /// 통계 스냅샷.
    pub fn stats(&self) -> FetcherStats {
        lock(&self.stats).clone()
    }

    /// 통계 초기화.
    pub fn reset_stats(&self) {
        *lock(&self.stats) = FetcherStats::new();
    }

    /// 날짜(`YYYY-MM-DD`)의 퍼즐 조회.
    pub async fn fetch_puzzle(&self, date: &str) -> PuzzleResult<PuzzleRecord> {
        self.fetch_puzzle_with(date, false).await
    }

    /// 미래 날짜 허용 여부를 지정해 퍼즐 조회.
    ///
    /// `allow_future`는 옵션 값과 OR로 합쳐집니다.
    #[instrument(skip(self), fields(source = %self.source.name()))]
    pub async fn fetch_puzzle_with(
        &self,
        date: &str,
        allow_future: bool,
    ) -> PuzzleResult<PuzzleRecord> {
        let allow_future = allow_future || self.options.allow_future;
        let date = resolve_request_date(date, today_utc(), allow_future)?;

        let attempt = AttemptRecorder::start(&self.stats);
        let result = self.fetch_checked(date, allow_future).await;
        attempt.finish(&result);

        if let Err(e) = &result {
            debug!(date = %date, error = %e, "조회 실패");
        }
        result
    }

    async fn fetch_checked(&self, date: NaiveDate, allow_future: bool) -> PuzzleResult<PuzzleRecord> {
        let name = self.source.name();

        let raw = match tokio::time::timeout(self.options.timeout, self.source.fetch_raw(date)).await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(PuzzleError::TransientNetwork(format!(
                    "{} 응답 시간 초과 ({}ms)",
                    name,
                    self.options.timeout.as_millis()
                )))
            }
        };

        check_shape(&raw)?;

        let options = ValidationOptions::default()
            .strict(self.options.strict)
            .allow_future(allow_future);
        let outcome = validate_and_sanitize(&raw, &options);
        for warning in &outcome.warnings {
            debug!(source = name, warning = %warning, "검증 경고");
        }
        let record = outcome.into_result()?;

        if record.date() != date {
            return Err(PuzzleError::MalformedData(format!(
                "요청 날짜 {}와 다른 퍼즐 반환: {}",
                date,
                record.date()
            )));
        }

        Ok(record.with_source(name))
    }

    /// 날짜 문자열에 대한 가용성 확인.
    ///
    /// 날짜가 잘못되었거나 소스 오류가 나면 `false`.
    pub async fn is_available(&self, date: &str) -> bool {
        match resolve_request_date(date, today_utc(), self.options.allow_future) {
            Ok(date) => self.probe_date(date).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// 검증된 날짜에 대한 프로브 (헬스 체크용, 에러 분류 유지).
    pub async fn probe_date(&self, date: NaiveDate) -> PuzzleResult<bool> {
        match tokio::time::timeout(self.options.timeout, self.source.probe(date)).await {
            Ok(result) => result,
            Err(_) => Err(PuzzleError::TransientNetwork(format!(
                "{} 프로브 시간 초과",
                self.source.name()
            ))),
        }
    }
}

/// 정규화 전 최소 구조 검사: 그룹 4개, date/gameId 존재.
fn check_shape(raw: &Value) -> PuzzleResult<()> {
    let obj = raw
        .as_object()
        .ok_or_else(|| PuzzleError::MalformedData("응답이 객체가 아닙니다".into()))?;

    let group_count = obj.get("groups").and_then(Value::as_array).map(Vec::len);
    if group_count != Some(GROUP_COUNT) {
        return Err(PuzzleError::MalformedData(format!(
            "그룹이 {}개여야 합니다 (실제: {})",
            GROUP_COUNT,
            group_count.map_or_else(|| "없음".to_string(), |n| n.to_string())
        )));
    }

    for field in ["date", "gameId"] {
        if obj.get(field).map_or(true, Value::is_null) {
            return Err(PuzzleError::MalformedData(format!("{} 필드가 없습니다", field)));
        }
    }
    Ok(())
}

/// 시도 하나의 지연 시간과 결과를 기록합니다.
///
/// 결과 없이 drop되면 (호출자 취소) 실패로 기록합니다.
struct AttemptRecorder<'a> {
    stats: &'a Mutex<FetcherStats>,
    started: Instant,
    finished: bool,
}

impl<'a> AttemptRecorder<'a> {
    fn start(stats: &'a Mutex<FetcherStats>) -> Self {
        Self {
            stats,
            started: Instant::now(),
            finished: false,
        }
    }

    fn finish(mut self, result: &PuzzleResult<PuzzleRecord>) {
        let latency = self.started.elapsed();
        let mut stats = lock(self.stats);
        match result {
            Ok(_) => stats.record_success(latency),
            Err(e) => stats.record_failure(latency, e),
        }
        self.finished = true;
    }
}

impl Drop for AttemptRecorder<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let error = PuzzleError::TransientNetwork("요청이 취소되었습니다".into());
            lock(self.stats).record_failure(self.started.elapsed(), &error);
            warn!("진행 중인 조회가 취소됨");
        }
    }
}
