//! 데몬 모드: 주기적으로 오늘 퍼즐을 조회합니다.

use std::time::Duration;

use anyhow::Result;
use puzzle_fetch::PuzzleOrchestrator;
use tracing::{error, info};

use super::log_source_stats;

/// 데몬 설정.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// 조회 주기
    pub interval: Duration,
    /// 최대 실행 횟수 (없으면 종료 신호까지)
    pub max_runs: Option<u64>,
}

impl WatchConfig {
    pub fn from_minutes(minutes: u64) -> Self {
        Self {
            interval: Duration::from_secs(minutes.max(1) * 60),
            max_runs: None,
        }
    }
}

/// 종료 신호를 받을 때까지 주기적으로 조회합니다.
///
/// 첫 조회는 즉시 실행됩니다. 조회 실패는 기록만 하고 다음 주기에 다시 시도합니다.
pub async fn watch(orchestrator: &PuzzleOrchestrator, config: &WatchConfig) -> Result<u64> {
    info!(
        "=== 데몬 모드 시작 (주기: {}분) ===",
        config.interval.as_secs() / 60
    );

    if orchestrator.start_health_probe() {
        info!("백그라운드 헬스 프로브 활성화");
    }

    let mut interval = tokio::time::interval(config.interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut runs = 0u64;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("종료 신호 수신, 데몬 종료 중...");
                break;
            }
            _ = interval.tick() => {
                runs += 1;
                match orchestrator.fetch_today().await {
                    Ok(record) => info!(
                        date = %record.date(),
                        game_id = record.game_id(),
                        source = record.source(),
                        "오늘 퍼즐 확보"
                    ),
                    Err(e) => error!(error = %e, "오늘 퍼즐 조회 실패"),
                }

                let expired = orchestrator.clear_expired_cache();
                if expired > 0 {
                    info!(expired = expired, "만료 캐시 정리");
                }
                log_source_stats(orchestrator);

                if config.max_runs.is_some_and(|max| runs >= max) {
                    break;
                }
            }
        }
    }

    orchestrator.destroy().await;
    Ok(runs)
}
