//! 후보 레코드 검증 및 정규화.
//!
//! 소스 어댑터가 만든 느슨한 JSON 후보를 정규 [`PuzzleRecord`]로 바꾸는 단계입니다.
//!
//! - [`validate`]: 모든 불변식을 검사하고 문제를 목록으로 반환 (첫 에러에서 멈추지 않음)
//! - [`sanitize`]: 문자열 trim, 숫자 문자열 → 정수 변환, 배열 복사
//! - [`validate_and_sanitize`]: 두 단계를 합성하며 검증에 실패한 레코드는 절대 반환하지 않음
//!
//! 엄격(strict) 모드에서는 경고가 에러로 승격됩니다.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::date::{check_date_range, game_id_for, launch_date, parse_puzzle_date, today_utc};
use crate::record::{PuzzleGroup, PuzzleRecord, GROUP_COUNT, WORDS_PER_GROUP};
use crate::PuzzleError;

/// 그룹 이름 길이 경고 기준.
const MAX_NAME_LEN: usize = 80;

/// 단어 길이 경고 기준.
const MAX_WORD_LEN: usize = 30;

/// 검증 옵션.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// 경고를 에러로 승격
    pub strict: bool,
    /// 미래 날짜 허용 (오늘 퍼즐을 대상으로 하는 동적 경로용)
    pub allow_future: bool,
    /// 기준 날짜
    pub today: NaiveDate,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            strict: false,
            allow_future: false,
            today: today_utc(),
        }
    }
}

impl ValidationOptions {
    /// 엄격 모드 설정.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// 미래 날짜 허용 여부 설정.
    pub fn allow_future(mut self, allow: bool) -> Self {
        self.allow_future = allow;
        self
    }

    /// 기준 날짜 설정.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }
}

/// 검증 결과.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn finish(mut self, strict: bool) -> Self {
        if strict {
            let promoted = std::mem::take(&mut self.warnings);
            self.errors.extend(promoted);
        }
        self.valid = self.errors.is_empty();
        self
    }
}

/// 정규화 실패.
///
/// 검증 에러와 달리 레코드를 만들 수 없을 만큼 구조가 깨진 경우입니다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    #[error("레코드가 객체가 아닙니다")]
    NotAnObject,

    #[error("필수 필드 누락: {0}")]
    MissingField(&'static str),

    #[error("필드 '{field}' 값이 잘못되었습니다: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("groups가 배열이 아닙니다")]
    GroupsNotArray,

    #[error("groups[{0}]가 객체가 아닙니다")]
    GroupNotObject(usize),
}

impl From<SanitizeError> for PuzzleError {
    fn from(err: SanitizeError) -> Self {
        PuzzleError::MalformedData(err.to_string())
    }
}

/// 검증 + 정규화 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeOutcome {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// 유효한 경우에만 `Some`
    pub data: Option<PuzzleRecord>,
}

impl SanitizeOutcome {
    /// 레코드 또는 모든 에러를 합친 `MalformedData` 반환.
    pub fn into_result(self) -> Result<PuzzleRecord, PuzzleError> {
        match self.data {
            Some(record) if self.valid => Ok(record),
            _ => Err(PuzzleError::MalformedData(self.errors.join("; "))),
        }
    }
}

// ==================== 값 변환 헬퍼 ====================

/// 정수 또는 숫자 문자열을 정수로 변환.
fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

// ==================== 검증 ====================

/// 후보 레코드 검증.
///
/// 모든 불변식 위반을 각각 별도의 메시지로 수집합니다.
pub fn validate(candidate: &Value, options: &ValidationOptions) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(obj) = candidate.as_object() else {
        report.errors.push("레코드가 객체가 아닙니다".to_string());
        return report.finish(options.strict);
    };

    let date = validate_date(obj, options, &mut report);
    validate_game_id(obj, date, &mut report);
    validate_groups(obj, &mut report);

    report.finish(options.strict)
}

fn validate_date(
    obj: &Map<String, Value>,
    options: &ValidationOptions,
    report: &mut ValidationReport,
) -> Option<NaiveDate> {
    let Some(raw) = obj.get("date") else {
        report.errors.push("date 필드가 없습니다".to_string());
        return None;
    };
    let Some(text) = raw.as_str() else {
        report.errors.push("date는 문자열이어야 합니다".to_string());
        return None;
    };

    let date = match parse_puzzle_date(text.trim()) {
        Ok(date) => date,
        Err(e) => {
            report.errors.push(e.to_string());
            return None;
        }
    };

    if date < launch_date() {
        report
            .warnings
            .push(format!("{}은(는) 출시일 {} 이전입니다", date, launch_date()));
    } else if let Err(e) = check_date_range(date, options.today, options.allow_future) {
        report.errors.push(e.to_string());
    }

    Some(date)
}

fn validate_game_id(
    obj: &Map<String, Value>,
    date: Option<NaiveDate>,
    report: &mut ValidationReport,
) {
    let Some(raw) = obj.get("gameId") else {
        report.errors.push("gameId 필드가 없습니다".to_string());
        return;
    };

    match as_int(raw) {
        Some(id) if id > 0 => {
            if let Some(expected) = date.and_then(game_id_for) {
                if i64::from(expected) != id {
                    report.warnings.push(format!(
                        "gameId {}이(가) 날짜 기준 예상값 {}과(와) 다릅니다",
                        id, expected
                    ));
                }
            }
        }
        Some(id) => report
            .errors
            .push(format!("gameId는 양의 정수여야 합니다 (현재 {})", id)),
        None => report
            .errors
            .push(format!("gameId는 양의 정수여야 합니다 (현재 {})", raw)),
    }
}

fn validate_groups(obj: &Map<String, Value>, report: &mut ValidationReport) {
    let Some(groups) = obj.get("groups").and_then(Value::as_array) else {
        report.errors.push("groups 배열이 없습니다".to_string());
        return;
    };

    if groups.len() != GROUP_COUNT {
        report.errors.push(format!(
            "groups는 정확히 {}개여야 합니다 (현재 {}개)",
            GROUP_COUNT,
            groups.len()
        ));
    }

    let mut names: Vec<String> = Vec::new();
    let mut words: Vec<String> = Vec::new();
    let mut levels: Vec<i64> = Vec::new();
    let mut levels_complete = true;

    for (i, group) in groups.iter().enumerate() {
        let Some(group) = group.as_object() else {
            report.errors.push(format!("groups[{}]가 객체가 아닙니다", i));
            levels_complete = false;
            continue;
        };

        match non_empty_str(group.get("name")) {
            Some(name) => {
                if name.chars().count() > MAX_NAME_LEN {
                    report.warnings.push(format!(
                        "groups[{}] 이름이 비정상적으로 깁니다 ({}자)",
                        i,
                        name.chars().count()
                    ));
                }
                names.push(name.to_string());
            }
            None => report
                .errors
                .push(format!("groups[{}] 이름이 비어 있습니다", i)),
        }

        match group.get("level").and_then(as_int) {
            Some(level) if (0..=3).contains(&level) => levels.push(level),
            Some(level) => {
                report.errors.push(format!(
                    "groups[{}] level은 0~3이어야 합니다 (현재 {})",
                    i, level
                ));
                levels_complete = false;
            }
            None => {
                report
                    .errors
                    .push(format!("groups[{}] level이 정수가 아닙니다", i));
                levels_complete = false;
            }
        }

        if let Some(hint) = group.get("hint") {
            if !hint.is_null() && !hint.is_string() {
                report
                    .errors
                    .push(format!("groups[{}] hint는 문자열이어야 합니다", i));
            }
        }

        let Some(group_words) = group.get("words").and_then(Value::as_array) else {
            report
                .errors
                .push(format!("groups[{}] words 배열이 없습니다", i));
            continue;
        };

        if group_words.len() != WORDS_PER_GROUP {
            report.errors.push(format!(
                "groups[{}] 단어는 정확히 {}개여야 합니다 (현재 {}개)",
                i,
                WORDS_PER_GROUP,
                group_words.len()
            ));
        }

        for (j, word) in group_words.iter().enumerate() {
            match non_empty_str(Some(word)) {
                Some(word) => {
                    if word.chars().count() > MAX_WORD_LEN {
                        report.warnings.push(format!(
                            "groups[{}].words[{}]가 비정상적으로 깁니다 ({}자)",
                            i,
                            j,
                            word.chars().count()
                        ));
                    }
                    words.push(word.to_string());
                }
                None => report
                    .errors
                    .push(format!("groups[{}].words[{}]가 비어 있거나 문자열이 아닙니다", i, j)),
            }
        }
    }

    let duplicate_words = case_insensitive_duplicates(&words);
    if !duplicate_words.is_empty() {
        report
            .errors
            .push(format!("중복 단어: {}", duplicate_words.join(", ")));
    }

    let duplicate_names = case_insensitive_duplicates(&names);
    if !duplicate_names.is_empty() {
        report
            .errors
            .push(format!("중복 그룹 이름: {}", duplicate_names.join(", ")));
    }

    if levels_complete && groups.len() == GROUP_COUNT {
        check_level_set(&levels, report);
    }
}

/// 레벨 집합이 정확히 {0,1,2,3}인지 확인.
///
/// 중복과 누락을 하나의 에러로 보고합니다.
fn check_level_set(levels: &[i64], report: &mut ValidationReport) {
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for level in levels {
        if !seen.insert(*level) {
            duplicates.insert(*level);
        }
    }
    let missing: Vec<i64> = (0..GROUP_COUNT as i64)
        .filter(|l| !seen.contains(l))
        .collect();

    if !duplicates.is_empty() || !missing.is_empty() {
        report.errors.push(format!(
            "레벨 집합이 {{0,1,2,3}}이 아닙니다 (중복: {:?}, 누락: {:?})",
            duplicates.into_iter().collect::<Vec<_>>(),
            missing
        ));
        return;
    }

    if levels.windows(2).any(|w| w[0] > w[1]) {
        report
            .warnings
            .push(format!("비표준 레벨 순서: {:?}", levels));
    }
}

/// 대소문자 무시 중복 항목 (첫 등장 표기, 등장 순서).
fn case_insensitive_duplicates(items: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut duplicates = Vec::new();

    for item in items {
        let key = item.to_lowercase();
        if !seen.insert(key.clone()) && reported.insert(key) {
            duplicates.push(item.clone());
        }
    }
    duplicates
}

// ==================== 정규화 ====================

/// 후보 레코드 정규화.
///
/// 문자열을 trim하고 숫자 문자열을 정수로 바꾸며 배열을 복사합니다.
/// 힌트가 없으면 그룹 이름으로 채우고 파생 필드를 다시 계산합니다.
/// 불변식 검사는 하지 않으므로 단독으로 쓰지 말고 [`validate_and_sanitize`]를 사용하세요.
pub fn sanitize(candidate: &Value) -> Result<PuzzleRecord, SanitizeError> {
    let obj = candidate.as_object().ok_or(SanitizeError::NotAnObject)?;

    let date_text = obj
        .get("date")
        .and_then(Value::as_str)
        .ok_or(SanitizeError::MissingField("date"))?;
    let date = parse_puzzle_date(date_text.trim()).map_err(|e| SanitizeError::InvalidField {
        field: "date".to_string(),
        reason: e.to_string(),
    })?;

    let game_id_raw = obj
        .get("gameId")
        .ok_or(SanitizeError::MissingField("gameId"))?;
    let game_id = as_int(game_id_raw)
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| SanitizeError::InvalidField {
            field: "gameId".to_string(),
            reason: game_id_raw.to_string(),
        })?;

    let groups = obj
        .get("groups")
        .ok_or(SanitizeError::MissingField("groups"))?
        .as_array()
        .ok_or(SanitizeError::GroupsNotArray)?
        .iter()
        .enumerate()
        .map(|(i, group)| sanitize_group(i, group))
        .collect::<Result<Vec<_>, _>>()?;

    let source = obj
        .get("source")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("unknown");

    Ok(PuzzleRecord::new(date, game_id, groups, source))
}

fn sanitize_group(index: usize, group: &Value) -> Result<PuzzleGroup, SanitizeError> {
    let obj = group
        .as_object()
        .ok_or(SanitizeError::GroupNotObject(index))?;

    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let level_raw = obj.get("level").unwrap_or(&Value::Null);
    let level = as_int(level_raw)
        .and_then(|l| u8::try_from(l).ok())
        .ok_or_else(|| SanitizeError::InvalidField {
            field: format!("groups[{}].level", index),
            reason: level_raw.to_string(),
        })?;

    let words = match obj.get("words") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(j, w)| match w {
                Value::String(s) => Ok(s.trim().to_string()),
                other => Err(SanitizeError::InvalidField {
                    field: format!("groups[{}].words[{}]", index, j),
                    reason: other.to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => Vec::new(),
    };

    let hint = match obj.get("hint") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        Some(other) => {
            return Err(SanitizeError::InvalidField {
                field: format!("groups[{}].hint", index),
                reason: other.to_string(),
            })
        }
    };

    Ok(PuzzleGroup::new(name, level, words, hint))
}

/// 검증 + 정규화.
///
/// 원본 후보를 먼저 검증하고, 통과한 경우에만 정규화합니다.
/// 정규화 결과도 다시 검증하므로 `data`는 두 검증을 모두 통과한 레코드만 담습니다.
pub fn validate_and_sanitize(candidate: &Value, options: &ValidationOptions) -> SanitizeOutcome {
    let raw = validate(candidate, options);
    if !raw.valid {
        return SanitizeOutcome {
            valid: false,
            errors: raw.errors,
            warnings: raw.warnings,
            data: None,
        };
    }

    let record = match sanitize(candidate) {
        Ok(record) => record,
        Err(e) => {
            return SanitizeOutcome {
                valid: false,
                errors: vec![e.to_string()],
                warnings: raw.warnings,
                data: None,
            }
        }
    };

    let report = validate(&record.to_candidate(), options);
    SanitizeOutcome {
        valid: report.valid,
        data: report.valid.then_some(record),
        errors: report.errors,
        warnings: report.warnings,
    }
}

/// 타입이 있는 레코드 검증.
pub fn validate_record(record: &PuzzleRecord, options: &ValidationOptions) -> ValidationReport {
    validate(&record.to_candidate(), options)
}
