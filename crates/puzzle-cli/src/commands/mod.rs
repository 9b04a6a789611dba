//! CLI 명령 구현.

pub mod check;
pub mod fetch;
pub mod status;
pub mod watch;

use anyhow::{Context, Result};
use puzzle_core::AppConfig;
use puzzle_fetch::{build_fetchers, OrchestratorConfig, PuzzleOrchestrator};
use tracing::info;

pub use check::{check_candidates, check_file, CheckSummary};
pub use fetch::{compare, fetch, render_record, FetchTarget};
pub use status::status;
pub use watch::{watch, WatchConfig};

/// 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!("지원하지 않는 출력 형식: {} (text, json)", s),
        }
    }
}

/// 설정 파일 경로가 있으면 그 파일을, 없으면 기본 경로를 로드합니다.
pub fn load_config(path: Option<&str>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("설정 파일 로드 실패: {}", path))?,
        None => AppConfig::load_default().context("기본 설정 로드 실패")?,
    };
    config.validate()?;
    Ok(config)
}

/// 설정의 소스를 모두 등록한 오케스트레이터 생성.
pub fn build_orchestrator(config: &AppConfig) -> Result<PuzzleOrchestrator> {
    let orchestrator = PuzzleOrchestrator::new(OrchestratorConfig::from(config));

    let fetchers = build_fetchers(config)?;
    if fetchers.is_empty() {
        anyhow::bail!("활성화된 소스가 없습니다 (설정의 [[sources]] 확인)");
    }
    for (fetcher, priority) in fetchers {
        orchestrator.register_fetcher(fetcher, priority)?;
    }

    info!(sources = ?orchestrator.fetcher_names(), "오케스트레이터 준비 완료");
    Ok(orchestrator)
}

/// 소스별 통계 요약 로그.
pub fn log_source_stats(orchestrator: &PuzzleOrchestrator) {
    for source in orchestrator.stats().per_source {
        source.stats.log_summary(&source.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("text").unwrap(), OutputFormat::Text);
        assert!(OutputFormat::parse("csv").is_err());
    }

    #[test]
    fn test_build_orchestrator_requires_sources() {
        let config = AppConfig::default();
        assert!(build_orchestrator(&config).is_err());
    }

    #[test]
    fn test_build_orchestrator_registers_in_priority_order() {
        let config = AppConfig::from_toml_str(
            r#"
            [[sources]]
            name = "backup"
            kind = "http_json"
            url = "https://backup.example.com"
            priority = 20

            [[sources]]
            name = "primary"
            kind = "http_json"
            url = "https://primary.example.com"
            priority = 10
            "#,
        )
        .unwrap();

        let orchestrator = build_orchestrator(&config).unwrap();
        assert_eq!(orchestrator.fetcher_names(), vec!["primary", "backup"]);
    }
}
