//! 퍼즐 수집 오케스트레이션.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - PuzzleSource trait: 소스 어댑터 인터페이스
//! - Fetcher: 날짜 검증, 타임아웃, 정규화, 통계를 담당하는 공통 래퍼
//! - 지수 백오프 재시도 실행기
//! - TTL 캐시
//! - 소스별 헬스 모니터 및 주기적 프로브
//! - 우선순위 기반 오케스트레이터 (first-success-wins)
//! - HTTP JSON / 정적 테이블 소스

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub mod cache;
pub mod fetcher;
pub mod health;
pub mod orchestrator;
pub mod retry;
pub mod sources;
pub mod stats;

pub use cache::PuzzleCache;
pub use fetcher::{Fetcher, FetcherOptions, PuzzleSource};
pub use health::{probe_sources, HealthMonitor, HealthProbe, HealthState};
pub use orchestrator::{OrchestratorConfig, OrchestratorStats, PuzzleOrchestrator, SourceStatus};
pub use retry::{with_retry, with_retry_if, with_retry_stats, RetryConfig, RetryStats};
pub use sources::{build_fetchers, HttpJsonSource, StaticTableSource};
pub use stats::{FailureRecord, FetcherStats};

// 잠금을 await 지점 너머로 들고 있지 않으므로 poison 상태에서도 내부 값을 그대로 사용합니다.

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
