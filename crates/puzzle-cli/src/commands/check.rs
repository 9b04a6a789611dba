//! 후보 JSON 검증 명령.
//!
//! 단일 객체 또는 객체 배열을 받아 후보마다 모든 에러와 경고를 출력합니다.

use std::path::Path;

use anyhow::{Context, Result};
use puzzle_core::{validate_and_sanitize, ValidationOptions};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

/// 검증 요약.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub warnings: usize,
}

/// 파일을 읽어 검증합니다.
pub fn check_file(path: &Path, options: &ValidationOptions) -> Result<CheckSummary> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("파일 읽기 실패: {}", path.display()))?;
    let summary = check_candidates(&text, options)?;

    info!(
        path = %path.display(),
        total = summary.total,
        valid = summary.valid,
        invalid = summary.invalid,
        warnings = summary.warnings,
        "검증 완료"
    );
    Ok(summary)
}

/// JSON 문자열의 후보를 검증하고 결과를 출력합니다.
pub fn check_candidates(text: &str, options: &ValidationOptions) -> Result<CheckSummary> {
    let parsed: Value = serde_json::from_str(text).context("JSON 파싱 실패")?;
    let candidates = match parsed {
        Value::Array(items) => items,
        other => vec![other],
    };

    let mut summary = CheckSummary {
        total: candidates.len(),
        ..Default::default()
    };

    for (i, candidate) in candidates.iter().enumerate() {
        let label = candidate
            .get("date")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", i));
        let outcome = validate_and_sanitize(candidate, options);

        summary.warnings += outcome.warnings.len();
        if outcome.valid {
            summary.valid += 1;
            println!("✓ {}", label);
        } else {
            summary.invalid += 1;
            println!("✗ {}", label);
            warn!(candidate = %label, errors = outcome.errors.len(), "검증 실패");
        }
        for error in &outcome.errors {
            println!("    error: {}", error);
        }
        for warning in &outcome.warnings {
            println!("    warn:  {}", warning);
        }
    }

    Ok(summary)
}
