//! NYT Connections v2 응답 형식 변환.
//!
//! ```json
//! {
//!   "status": "OK",
//!   "id": 801,
//!   "print_date": "2025-08-20",
//!   "categories": [
//!     {"title": "FISH", "cards": [{"content": "BASS", "position": 3}, ...]},
//!     ...
//!   ]
//! }
//! ```
//!
//! 카테고리 순서가 난이도(레벨 0~3)입니다. 힌트는 제공되지 않습니다.

use chrono::NaiveDate;
use puzzle_core::{game_id_for, PuzzleError, PuzzleResult};
use serde_json::{json, Value};

/// v2 응답을 정규 후보 JSON으로 변환.
///
/// `id`가 없으면 날짜에서 게임 번호를 계산합니다.
pub fn nyt_to_candidate(raw: &Value, requested: NaiveDate) -> PuzzleResult<Value> {
    if let Some(status) = raw.get("status").and_then(Value::as_str) {
        if status != "OK" {
            return Err(PuzzleError::NotFound(format!(
                "{} 퍼즐 없음 (status: {})",
                requested, status
            )));
        }
    }

    let categories = raw
        .get("categories")
        .and_then(Value::as_array)
        .ok_or_else(|| PuzzleError::MalformedData("categories 배열이 없습니다".into()))?;

    let groups: Vec<Value> = categories
        .iter()
        .enumerate()
        .map(|(level, category)| {
            let words: Vec<Value> = category
                .get("cards")
                .and_then(Value::as_array)
                .map(|cards| {
                    cards
                        .iter()
                        .filter_map(|card| card.get("content").cloned())
                        .collect()
                })
                .unwrap_or_default();
            json!({
                "name": category.get("title").cloned().unwrap_or(Value::Null),
                "level": level,
                "words": words,
            })
        })
        .collect();

    let date = raw
        .get("print_date")
        .cloned()
        .unwrap_or_else(|| json!(requested.format("%Y-%m-%d").to_string()));
    let game_id = raw
        .get("id")
        .cloned()
        .or_else(|| game_id_for(requested).map(|id| json!(id)))
        .unwrap_or(Value::Null);

    Ok(json!({
        "date": date,
        "gameId": game_id,
        "groups": groups,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 20).unwrap()
    }

    #[test]
    fn test_convert_categories_to_groups() {
        let raw = json!({
            "status": "OK",
            "id": 801,
            "print_date": "2025-08-20",
            "categories": [
                {"title": "FISH", "cards": [{"content": "BASS", "position": 3}, {"content": "PIKE", "position": 7}]},
                {"title": "KEYS", "cards": [{"content": "TAB", "position": 0}]}
            ]
        });

        let candidate = nyt_to_candidate(&raw, day()).unwrap();
        assert_eq!(candidate["gameId"], json!(801));
        assert_eq!(candidate["date"], json!("2025-08-20"));
        assert_eq!(candidate["groups"][0]["name"], json!("FISH"));
        assert_eq!(candidate["groups"][0]["words"], json!(["BASS", "PIKE"]));
        assert_eq!(candidate["groups"][1]["level"], json!(1));
    }

    #[test]
    fn test_missing_id_uses_date() {
        let raw = json!({"categories": []});
        let candidate = nyt_to_candidate(&raw, day()).unwrap();
        assert_eq!(candidate["gameId"], json!(801));
        assert_eq!(candidate["date"], json!("2025-08-20"));
    }

    #[test]
    fn test_error_status_is_not_found() {
        let raw = json!({"status": "ERROR", "errors": ["Not found"]});
        assert!(matches!(
            nyt_to_candidate(&raw, day()),
            Err(PuzzleError::NotFound(_))
        ));
    }
}
