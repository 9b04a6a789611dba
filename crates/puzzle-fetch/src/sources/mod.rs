//! 구체 소스 어댑터와 설정 기반 생성.

pub mod http_json;
pub mod nyt;
pub mod static_table;

use std::sync::Arc;
use std::time::Duration;

use puzzle_core::{AppConfig, PuzzleError, PuzzleResult, SourceConfig, SourceKind};
use tracing::info;

use crate::fetcher::{Fetcher, FetcherOptions, PuzzleSource};
use crate::retry::RetryConfig;

pub use http_json::HttpJsonSource;
pub use static_table::StaticTableSource;

/// 설정의 활성 소스로 `(Fetcher, 우선순위)` 목록을 만듭니다.
pub fn build_fetchers(config: &AppConfig) -> PuzzleResult<Vec<(Arc<Fetcher>, i32)>> {
    config.validate()?;

    let mut fetchers = Vec::new();
    for source in config.enabled_sources() {
        let timeout = source
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| config.fetcher.timeout());
        let options = FetcherOptions::from(&config.fetcher)
            .with_timeout(timeout)
            .with_allow_future(source.allow_future);

        let adapter = build_source(source, config, timeout)?;
        let priority = source
            .priority
            .unwrap_or(config.orchestrator.default_priority);

        info!(
            source = %source.name,
            kind = ?source.kind,
            priority = priority,
            timeout_ms = timeout.as_millis() as u64,
            "소스 구성"
        );
        fetchers.push((Arc::new(Fetcher::from_boxed(adapter, options)), priority));
    }
    Ok(fetchers)
}

fn build_source(
    source: &SourceConfig,
    config: &AppConfig,
    timeout: Duration,
) -> PuzzleResult<Box<dyn PuzzleSource>> {
    match source.kind {
        SourceKind::HttpJson => {
            let url = source.url.as_deref().ok_or_else(|| {
                PuzzleError::Config(format!("{}: http_json 소스에는 url이 필요합니다", source.name))
            })?;
            // 모든 시도 + 재시도 대기가 Fetcher 타임아웃 안에 끝나야 함
            let retry = RetryConfig::from(&config.fetcher);
            let request_timeout = retry.attempt_timeout(timeout).ok_or_else(|| {
                PuzzleError::Config(format!(
                    "{}: 타임아웃 {}ms가 재시도 대기 합 {}ms보다 짧습니다",
                    source.name,
                    timeout.as_millis(),
                    retry.total_backoff().as_millis()
                ))
            })?;
            let http = HttpJsonSource::new(&source.name, url, source.format, request_timeout)?
                .with_retry(retry);
            Ok(Box::new(http))
        }
        SourceKind::StaticFile => {
            let path = source.path.as_ref().ok_or_else(|| {
                PuzzleError::Config(format!("{}: static_file 소스에는 path가 필요합니다", source.name))
            })?;
            Ok(Box::new(StaticTableSource::load(&source.name, path)?))
        }
    }
}
