//! 설정 관리.
//!
//! 기본값 → TOML 파일 → 환경 변수(`PUZZLE__SECTION__KEY`) 순서로 덮어씁니다.
//! 모든 섹션은 `Default`를 가지며 시간 값은 `*_secs`/`*_ms` 필드와 `Duration` 접근자로 표현합니다.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{PuzzleError, PuzzleResult};

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 캐시 설정
    #[serde(default)]
    pub cache: CacheConfig,
    /// 헬스 프로브 설정
    #[serde(default)]
    pub health: HealthConfig,
    /// 소스별 요청 설정 (기본값)
    #[serde(default)]
    pub fetcher: FetcherConfig,
    /// 오케스트레이터 설정
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 등록할 소스 목록
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// 캐시 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// 캐시 유효 시간 (초)
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// 헬스 프로브 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthConfig {
    /// 주기적 프로브 활성화
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 프로브 주기 (초)
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    /// 프로브 대상 날짜 (오늘로부터 며칠 전)
    #[serde(default = "default_probe_lookback_days")]
    pub probe_lookback_days: u64,
    /// 소스를 비정상으로 전환하는 연속 일시 장애 횟수
    #[serde(default = "default_transient_failure_threshold")]
    pub transient_failure_threshold: u32,
}

fn default_true() -> bool {
    true
}
fn default_probe_interval_secs() -> u64 {
    15 * 60
}
fn default_probe_lookback_days() -> u64 {
    1
}
fn default_transient_failure_threshold() -> u32 {
    3
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            probe_interval_secs: default_probe_interval_secs(),
            probe_lookback_days: default_probe_lookback_days(),
            transient_failure_threshold: default_transient_failure_threshold(),
        }
    }
}

impl HealthConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }
}

/// 소스별 요청 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    /// 요청 타임아웃 (밀리초)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// 최대 시도 횟수 (첫 시도 포함)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// 재시도 기본 대기 (밀리초, 2배씩 증가)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// 재시도 최대 대기 (밀리초)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// 엄격 검증 (경고를 에러로 승격)
    #[serde(default)]
    pub strict: bool,
}

fn default_timeout_ms() -> u64 {
    10_000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    8_000
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            strict: false,
        }
    }
}

impl FetcherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// 오케스트레이터 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorSettings {
    /// 동시에 처리할 수 있는 날짜 수 (없으면 무제한)
    #[serde(default)]
    pub max_in_flight: Option<usize>,
    /// 우선순위를 지정하지 않은 소스의 기본 우선순위
    #[serde(default = "default_priority")]
    pub default_priority: i32,
}

fn default_priority() -> i32 {
    100
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_in_flight: None,
            default_priority: default_priority(),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// 소스 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// `{url}/{date}.json` 형태의 HTTP JSON 엔드포인트
    HttpJson,
    /// 정규 레코드 배열을 담은 로컬 JSON 파일
    StaticFile,
}

/// HTTP 응답 형식.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// 정규 레코드 형식 그대로
    #[default]
    Canonical,
    /// `{id, print_date, categories: [{title, cards: [{content, position}]}]}`
    NytV2,
}

/// 소스 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// 소스 이름 (등록 키)
    pub name: String,
    /// 소스 종류
    pub kind: SourceKind,
    /// HTTP 기본 URL (http_json)
    #[serde(default)]
    pub url: Option<String>,
    /// 파일 경로 (static_file)
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// 응답 형식
    #[serde(default)]
    pub format: SourceFormat,
    /// 우선순위 (낮을수록 먼저 시도)
    #[serde(default)]
    pub priority: Option<i32>,
    /// 활성화 여부
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 소스별 타임아웃 (밀리초, 없으면 fetcher 기본값)
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// 미래 날짜 허용 (UTC보다 앞선 시간대의 소스)
    #[serde(default)]
    pub allow_future: bool,
}

impl AppConfig {
    /// TOML 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("PUZZLE")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// 기본 경로(`config/default.toml`, 없으면 환경 변수만)에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(
                config::Environment::with_prefix("PUZZLE")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn from_toml_str(toml: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// 설정 일관성 검사.
    pub fn validate(&self) -> PuzzleResult<()> {
        if self.cache.ttl_secs == 0 {
            return Err(PuzzleError::Config("cache.ttl_secs는 0보다 커야 합니다".into()));
        }
        if self.fetcher.max_attempts == 0 {
            return Err(PuzzleError::Config(
                "fetcher.max_attempts는 1 이상이어야 합니다".into(),
            ));
        }
        if self.health.enabled && self.health.probe_interval_secs == 0 {
            return Err(PuzzleError::Config(
                "health.probe_interval_secs는 0보다 커야 합니다".into(),
            ));
        }
        if self.health.transient_failure_threshold == 0 {
            return Err(PuzzleError::Config(
                "health.transient_failure_threshold는 1 이상이어야 합니다".into(),
            ));
        }
        if self.orchestrator.max_in_flight == Some(0) {
            return Err(PuzzleError::Config(
                "orchestrator.max_in_flight는 1 이상이어야 합니다".into(),
            ));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            let name = source.name.trim();
            if name.is_empty() {
                return Err(PuzzleError::Config("소스 이름이 비어 있습니다".into()));
            }
            if !names.insert(name.to_string()) {
                return Err(PuzzleError::Config(format!("중복 소스 이름: {}", name)));
            }
            match source.kind {
                SourceKind::HttpJson if source.url.is_none() => {
                    return Err(PuzzleError::Config(format!(
                        "소스 '{}'에 url이 필요합니다",
                        name
                    )));
                }
                SourceKind::StaticFile if source.path.is_none() => {
                    return Err(PuzzleError::Config(format!(
                        "소스 '{}'에 path가 필요합니다",
                        name
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// 활성화된 소스 목록.
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[cache]
ttl_secs = 3600

[fetcher]
timeout_ms = 2500
max_attempts = 4

[orchestrator]
max_in_flight = 8

[[sources]]
name = "nyt"
kind = "http_json"
url = "https://www.nytimes.com/svc/connections/v2"
format = "nyt_v2"
priority = 10

[[sources]]
name = "archive"
kind = "static_file"
path = "data/archive.json"
priority = 50
enabled = false
"#;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.cache.ttl(), Duration::from_secs(86_400));
        assert_eq!(config.fetcher.max_attempts, 3);
        assert_eq!(config.fetcher.base_delay(), Duration::from_millis(500));
        assert_eq!(config.orchestrator.max_in_flight, None);
        assert_eq!(config.orchestrator.default_priority, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.fetcher.timeout(), Duration::from_millis(2500));
        assert_eq!(config.fetcher.max_attempts, 4);
        // 지정하지 않은 값은 기본값
        assert_eq!(config.fetcher.base_delay_ms, 500);
        assert_eq!(config.orchestrator.max_in_flight, Some(8));
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].format, SourceFormat::NytV2);
        assert_eq!(config.sources[1].kind, SourceKind::StaticFile);
        assert_eq!(config.enabled_sources().count(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_sources() {
        let mut config = AppConfig::from_toml_str(SAMPLE).unwrap();
        config.sources[1].name = "nyt".to_string();
        assert!(matches!(config.validate(), Err(PuzzleError::Config(_))));
    }

    #[test]
    fn test_validate_requires_url_for_http() {
        let mut config = AppConfig::from_toml_str(SAMPLE).unwrap();
        config.sources[0].url = None;
        assert!(matches!(config.validate(), Err(PuzzleError::Config(_))));
    }
}
