//! 퍼즐 조회 및 소스 비교 명령.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use puzzle_core::{PuzzleRecord, ScoredCandidate};
use puzzle_fetch::PuzzleOrchestrator;
use tracing::info;

use super::OutputFormat;

/// 조회 대상 날짜.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTarget {
    /// 로컬 기준 오늘
    Today,
    /// 지정 날짜 (`YYYY-MM-DD`)
    Date(String),
}

impl FetchTarget {
    pub fn from_arg(date: Option<String>) -> Self {
        match date {
            Some(date) if !date.eq_ignore_ascii_case("today") => Self::Date(date),
            _ => Self::Today,
        }
    }
}

/// 퍼즐을 조회해 출력하거나 파일로 저장합니다.
pub async fn fetch(
    orchestrator: &PuzzleOrchestrator,
    target: &FetchTarget,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<PuzzleRecord> {
    let record = match target {
        FetchTarget::Today => orchestrator.fetch_today().await?,
        FetchTarget::Date(date) => orchestrator.fetch_puzzle(date).await?,
    };

    info!(
        date = %record.date(),
        game_id = record.game_id(),
        source = record.source(),
        "퍼즐 조회 완료"
    );

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&record)?,
        OutputFormat::Text => render_record(&record),
    };

    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("파일 저장 실패: {}", path.display()))?;
            info!(path = %path.display(), "저장 완료");
        }
        None => println!("{}", rendered),
    }

    Ok(record)
}

/// 사람이 읽기 쉬운 형식으로 레코드 렌더링.
pub fn render_record(record: &PuzzleRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "#{} ({}) - source: {}",
        record.game_id(),
        record.date(),
        record.source()
    );

    let mut groups: Vec<_> = record.groups().iter().collect();
    groups.sort_by_key(|g| g.level);
    for group in groups {
        let _ = writeln!(
            out,
            "  [{}] {:<24} {}",
            group.level,
            group.name,
            group.words.join(", ")
        );
    }
    out
}

/// 등록된 모든 소스의 후보를 품질 점수순으로 출력합니다.
pub async fn compare(
    orchestrator: &PuzzleOrchestrator,
    date: &str,
    format: OutputFormat,
) -> Result<Vec<ScoredCandidate>> {
    let ranked = orchestrator.compare_sources(date).await?;
    if ranked.is_empty() {
        anyhow::bail!("{}: 후보를 반환한 소스가 없습니다", date);
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ranked)?),
        OutputFormat::Text => {
            println!(
                "{:<4} {:<16} {:>5}  {:>6} {:>5} {:>6} {:>5} {:>5}",
                "#", "source", "total", "groups", "words", "levels", "hints", "names"
            );
            for (i, c) in ranked.iter().enumerate() {
                println!(
                    "{:<4} {:<16} {:>5}  {:>6} {:>5} {:>6} {:>5} {:>5}",
                    i + 1,
                    c.source,
                    c.total,
                    c.score.groups,
                    c.score.words,
                    c.score.levels,
                    c.score.hints,
                    c.score.names
                );
            }
        }
    }

    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use puzzle_core::PuzzleGroup;

    #[test]
    fn test_fetch_target_from_arg() {
        assert_eq!(FetchTarget::from_arg(None), FetchTarget::Today);
        assert_eq!(FetchTarget::from_arg(Some("TODAY".into())), FetchTarget::Today);
        assert_eq!(
            FetchTarget::from_arg(Some("2025-08-20".into())),
            FetchTarget::Date("2025-08-20".into())
        );
    }

    #[test]
    fn test_render_record_sorted_by_level() {
        let groups = vec![
            PuzzleGroup::new("HARD", 3, vec!["A".into(), "B".into(), "C".into(), "D".into()], None),
            PuzzleGroup::new("EASY", 0, vec!["E".into(), "F".into(), "G".into(), "H".into()], None),
        ];
        let record = PuzzleRecord::new(
            NaiveDate::from_ymd_opt(2025, 8, 20).unwrap(),
            801,
            groups,
            "archive",
        );

        let text = render_record(&record);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("#801 (2025-08-20)"));
        assert!(lines[1].contains("EASY"));
        assert!(lines[2].contains("A, B, C, D"));
    }
}
