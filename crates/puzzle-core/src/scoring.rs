//! 소스 간 구조적 품질 점수.
//!
//! 여러 소스에서 이미 가져온 후보를 구조적 완성도로 비교합니다.
//! 진단용이며 오케스트레이터의 응답 경로(first-success-wins)에는 관여하지 않습니다.

use std::collections::HashSet;

use serde::Serialize;

use crate::record::{PuzzleRecord, GROUP_COUNT, WORDS_PER_GROUP};

/// 그룹 이름의 적정 길이 범위 (문자 수).
const NAME_LEN_RANGE: std::ops::RangeInclusive<usize> = 1..=40;

/// 품질 점수 세부 항목.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QualityScore {
    /// 그룹 4개 (+25)
    pub groups: u32,
    /// 서로 다른 단어 16개 (+25)
    pub words: u32,
    /// 레벨 0~3 모두 존재 (+20)
    pub levels: u32,
    /// 이름과 다른 힌트 존재 (+15, 그룹별 비례)
    pub hints: u32,
    /// 이름 길이 적정 (+15, 그룹별 비례)
    pub names: u32,
}

impl QualityScore {
    /// 만점.
    pub const MAX: u32 = 100;

    /// 합계.
    pub fn total(&self) -> u32 {
        self.groups + self.words + self.levels + self.hints + self.names
    }
}

/// 점수가 매겨진 후보.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub source: String,
    pub score: QualityScore,
    pub total: u32,
    pub record: PuzzleRecord,
}

/// 레코드의 구조적 품질 점수 계산.
pub fn score_record(record: &PuzzleRecord) -> QualityScore {
    let groups = record.groups();
    let mut score = QualityScore::default();

    if groups.len() == GROUP_COUNT
        && groups.iter().all(|g| g.words.len() == WORDS_PER_GROUP)
    {
        score.groups = 25;
    }

    let distinct: HashSet<String> = record
        .words()
        .iter()
        .filter(|w| !w.trim().is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    if distinct.len() == GROUP_COUNT * WORDS_PER_GROUP {
        score.words = 25;
    }

    let levels: HashSet<u8> = groups.iter().map(|g| g.level).collect();
    if levels == (0..GROUP_COUNT as u8).collect::<HashSet<_>>() {
        score.levels = 20;
    }

    if !groups.is_empty() {
        let plausible_hints = groups
            .iter()
            .filter(|g| !g.hint.trim().is_empty() && g.hint != g.name)
            .count() as u32;
        let good_names = groups
            .iter()
            .filter(|g| NAME_LEN_RANGE.contains(&g.name.chars().count()))
            .count() as u32;
        let n = groups.len() as u32;
        score.hints = 15 * plausible_hints / n;
        score.names = 15 * good_names / n;
    }

    score
}

/// 후보 목록을 점수 내림차순으로 정렬 (동점이면 입력 순서 유지).
pub fn rank_candidates(records: Vec<PuzzleRecord>) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = records
        .into_iter()
        .map(|record| {
            let score = score_record(&record);
            ScoredCandidate {
                source: record.source().to_string(),
                total: score.total(),
                score,
                record,
            }
        })
        .collect();

    scored.sort_by(|a, b| b.total.cmp(&a.total));
    scored
}
