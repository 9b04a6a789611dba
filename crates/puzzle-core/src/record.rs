//! 정규 퍼즐 레코드.
//!
//! 모든 소스가 최종적으로 만들어야 하는 단일 형태입니다. 파생 필드(`words`,
//! `category`)는 생성 시 그룹에서 다시 계산되며 독립적으로 변경할 수 없습니다.

use chrono::NaiveDate;
use serde::Serialize;

/// 퍼즐당 그룹 수.
pub const GROUP_COUNT: usize = 4;

/// 그룹당 단어 수.
pub const WORDS_PER_GROUP: usize = 4;

/// `category` 필드의 그룹 이름 구분자.
pub const CATEGORY_SEPARATOR: &str = " | ";

/// 퍼즐 그룹.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleGroup {
    /// 그룹 이름
    pub name: String,
    /// 난이도 (0~3)
    pub level: u8,
    /// 단어 4개
    pub words: Vec<String>,
    /// 힌트 (없으면 이름과 동일)
    pub hint: String,
}

impl PuzzleGroup {
    /// 새 그룹 생성. 힌트가 없으면 이름을 힌트로 사용합니다.
    pub fn new(
        name: impl Into<String>,
        level: u8,
        words: Vec<String>,
        hint: Option<String>,
    ) -> Self {
        let name = name.into();
        let hint = hint.unwrap_or_else(|| name.clone());
        Self {
            name,
            level,
            words,
            hint,
        }
    }
}

/// 검증된 퍼즐 레코드.
///
/// 생성 이후에는 불변이며, 캐시에 저장하거나 반환할 때는 복사본이 전달됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleRecord {
    date: NaiveDate,
    game_id: u32,
    groups: Vec<PuzzleGroup>,
    source: String,
    words: Vec<String>,
    category: String,
}

impl PuzzleRecord {
    /// 새 레코드 생성 (파생 필드 계산 포함).
    ///
    /// 불변식 검증은 하지 않습니다. 외부 입력은 `validation::validate_and_sanitize`를 거쳐야 합니다.
    pub fn new(
        date: NaiveDate,
        game_id: u32,
        groups: Vec<PuzzleGroup>,
        source: impl Into<String>,
    ) -> Self {
        let words = groups
            .iter()
            .flat_map(|g| g.words.iter().cloned())
            .collect();
        let category = groups
            .iter()
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>()
            .join(CATEGORY_SEPARATOR);

        Self {
            date,
            game_id,
            groups,
            source: source.into(),
            words,
            category,
        }
    }

    /// 소스 이름을 바꾼 레코드 반환.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn game_id(&self) -> u32 {
        self.game_id
    }

    pub fn groups(&self) -> &[PuzzleGroup] {
        &self.groups
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// 16개 단어 (그룹 순서, 그룹 내 순서).
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// 그룹 이름을 구분자로 연결한 문자열.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// 검증기 입력 형태(JSON)로 변환.
    pub fn to_candidate(&self) -> serde_json::Value {
        serde_json::json!({
            "date": self.date.format("%Y-%m-%d").to_string(),
            "gameId": self.game_id,
            "source": self.source,
            "groups": self.groups.iter().map(|g| serde_json::json!({
                "name": g.name,
                "level": g.level,
                "words": g.words,
                "hint": g.hint,
            })).collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_groups() -> Vec<PuzzleGroup> {
        let names = ["FISH", "PLANETS", "COLORS", "___BALL"];
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                PuzzleGroup::new(
                    *name,
                    i as u8,
                    (0..4).map(|j| format!("W{}{}", i, j)).collect(),
                    None,
                )
            })
            .collect()
    }

    #[test]
    fn test_derived_fields() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 20).unwrap();
        let record = PuzzleRecord::new(date, 801, sample_groups(), "static");

        assert_eq!(record.words().len(), 16);
        assert_eq!(record.words()[0], "W00");
        assert_eq!(record.words()[15], "W33");
        assert_eq!(record.category(), "FISH | PLANETS | COLORS | ___BALL");
        assert_eq!(record.groups()[0].hint, "FISH");
    }

    #[test]
    fn test_serialized_wire_shape() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 20).unwrap();
        let record = PuzzleRecord::new(date, 801, sample_groups(), "static");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["date"], "2025-08-20");
        assert_eq!(json["gameId"], 801);
        assert_eq!(json["source"], "static");
        assert_eq!(json["words"].as_array().unwrap().len(), 16);
        assert_eq!(json["groups"][3]["level"], 3);
    }
}
