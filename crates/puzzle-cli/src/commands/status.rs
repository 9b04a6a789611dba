//! 소스 헬스 점검 명령.

use anyhow::Result;
use puzzle_fetch::{OrchestratorStats, PuzzleOrchestrator};

use super::OutputFormat;

/// 프로브를 한 번 실행하고 소스 상태를 출력합니다.
///
/// `date`가 주어지면 해당 날짜의 가용성도 함께 확인합니다.
pub async fn status(
    orchestrator: &PuzzleOrchestrator,
    date: Option<&str>,
    format: OutputFormat,
) -> Result<OrchestratorStats> {
    orchestrator.probe_now().await;

    let available = match date {
        Some(date) => Some(orchestrator.is_available(date).await),
        None => None,
    };
    let stats = orchestrator.stats();

    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "stats": &stats,
                "available": available,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => {
            println!("{:<16} {:>8} {:>8}  {}", "source", "priority", "healthy", "reason");
            for source in &stats.per_source {
                let (healthy, reason) = match &source.health {
                    Some(h) => (h.healthy, h.reason.clone().unwrap_or_default()),
                    None => (false, String::new()),
                };
                println!(
                    "{:<16} {:>8} {:>8}  {}",
                    source.name, source.priority, healthy, reason
                );
            }
            println!(
                "healthy: {}/{}",
                stats.healthy_sources,
                stats.per_source.len()
            );
            if let (Some(date), Some(available)) = (date, available) {
                println!("{} available: {}", date, available);
            }
        }
    }

    Ok(stats)
}
