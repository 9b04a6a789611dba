//! 퍼즐 수집 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 특정 날짜 퍼즐 조회
//! puzzle --config config/default.toml fetch 2025-08-20
//!
//! # 오늘 퍼즐을 JSON으로 저장
//! puzzle fetch --format json --output today.json
//!
//! # 후보 파일 검증 (경고도 에러로 처리)
//! puzzle check archive.json --strict
//!
//! # 소스별 품질 비교
//! puzzle compare 2025-08-20
//!
//! # 데몬 모드 (30분 주기)
//! puzzle watch --interval-minutes 30
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use puzzle_cli::{
    build_orchestrator, check_file, compare, fetch, load_config, log_source_stats, status, watch,
    FetchTarget, OutputFormat, WatchConfig,
};
use puzzle_core::{init_logging, LogConfig, LogFormat, ValidationOptions};
use tracing::info;

#[derive(Parser)]
#[command(name = "puzzle")]
#[command(about = "Daily word puzzle fetcher - 우선순위 기반 다중 소스 수집", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로 (없으면 config/default.toml + 환경 변수)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// 로그 레벨 (설정 파일 값보다 우선)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 날짜별 퍼즐 조회 (생략 시 오늘)
    Fetch {
        /// 날짜 (YYYY-MM-DD 또는 today)
        date: Option<String>,

        /// 출력 형식 (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// 출력 파일 경로
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 후보 JSON 파일 검증
    Check {
        /// 단일 객체 또는 배열을 담은 JSON 파일
        file: PathBuf,

        /// 경고를 에러로 처리
        #[arg(long, default_value = "false")]
        strict: bool,

        /// 미래 날짜 허용
        #[arg(long, default_value = "false")]
        allow_future: bool,
    },

    /// 모든 소스의 후보를 품질 점수로 비교
    Compare {
        /// 날짜 (YYYY-MM-DD)
        date: String,

        /// 출력 형식 (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// 소스 헬스 점검
    Status {
        /// 가용성을 확인할 날짜
        date: Option<String>,

        /// 출력 형식 (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// 데몬 모드: 주기적으로 오늘 퍼즐 조회
    Watch {
        /// 조회 주기 (분)
        #[arg(long, default_value = "60")]
        interval_minutes: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;

    let mut log_config = LogConfig::from(&config.logging);
    if let Some(level) = cli.log_level {
        log_config.level = level;
    }
    match cli.log_format {
        Some(format) => {
            log_config.format = format.parse::<LogFormat>().map_err(anyhow::Error::msg)?;
        }
        // 데몬은 한 줄 형식 기본
        None if matches!(cli.command, Commands::Watch { .. }) => {
            log_config = log_config.with_format(LogFormat::Compact);
        }
        None => {}
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    match cli.command {
        Commands::Fetch {
            date,
            format,
            output,
        } => {
            let orchestrator = build_orchestrator(&config)?;
            let target = FetchTarget::from_arg(date);
            let result = fetch(
                &orchestrator,
                &target,
                OutputFormat::parse(&format)?,
                output.as_deref(),
            )
            .await;
            log_source_stats(&orchestrator);
            orchestrator.destroy().await;
            result?;
        }
        Commands::Check {
            file,
            strict,
            allow_future,
        } => {
            let options = ValidationOptions::default()
                .strict(strict || config.fetcher.strict)
                .allow_future(allow_future);
            let summary = check_file(&file, &options)?;
            if summary.invalid > 0 {
                anyhow::bail!("{}/{}개 후보가 검증에 실패했습니다", summary.invalid, summary.total);
            }
        }
        Commands::Compare { date, format } => {
            let orchestrator = build_orchestrator(&config)?;
            compare(&orchestrator, &date, OutputFormat::parse(&format)?).await?;
        }
        Commands::Status { date, format } => {
            let orchestrator = build_orchestrator(&config)?;
            let stats = status(&orchestrator, date.as_deref(), OutputFormat::parse(&format)?).await?;
            if stats.healthy_sources == 0 {
                anyhow::bail!("정상 상태의 소스가 없습니다");
            }
        }
        Commands::Watch { interval_minutes } => {
            let orchestrator = build_orchestrator(&config)?;
            let runs = watch(&orchestrator, &WatchConfig::from_minutes(interval_minutes)).await?;
            info!(runs = runs, "데몬 종료");
        }
    }

    Ok(())
}
