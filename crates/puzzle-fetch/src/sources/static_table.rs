//! 정적 테이블 소스.
//!
//! 미리 준비된 날짜별 후보 JSON을 메모리에 들고 있는 소스입니다.
//! 아카이브 파일을 최후의 대체 소스로 쓰거나 테스트 픽스처로 사용합니다.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use puzzle_core::{parse_puzzle_date, PuzzleError, PuzzleRecord, PuzzleResult};
use serde_json::Value;
use tracing::info;

use crate::fetcher::PuzzleSource;

/// 정적 테이블 소스.
#[derive(Debug, Clone, Default)]
pub struct StaticTableSource {
    name: String,
    table: BTreeMap<NaiveDate, Value>,
}

impl StaticTableSource {
    /// 빈 테이블 생성.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: BTreeMap::new(),
        }
    }

    /// 레코드 목록으로 테이블 생성.
    pub fn from_records<'a>(
        name: impl Into<String>,
        records: impl IntoIterator<Item = &'a PuzzleRecord>,
    ) -> Self {
        let mut source = Self::new(name);
        for record in records {
            source.insert(record.date(), record.to_candidate());
        }
        source
    }

    /// 후보 추가 (같은 날짜는 덮어씀).
    pub fn insert(&mut self, date: NaiveDate, candidate: Value) {
        self.table.insert(date, candidate);
    }

    /// 후보 추가 (빌더).
    pub fn with_candidate(mut self, date: NaiveDate, candidate: Value) -> Self {
        self.insert(date, candidate);
        self
    }

    /// JSON 배열 파일에서 로드.
    ///
    /// 각 원소는 `date` 문자열 필드를 가진 후보 객체여야 합니다.
    pub fn load(name: impl Into<String>, path: impl AsRef<Path>) -> PuzzleResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PuzzleError::Config(format!("정적 테이블 읽기 실패 ({}): {}", path.display(), e))
        })?;
        let mut source = Self::new(name);
        source.extend_from_json(&text)?;

        info!(
            source = %source.name,
            path = %path.display(),
            entries = source.len(),
            "정적 테이블 로드"
        );
        Ok(source)
    }

    /// JSON 배열 문자열의 후보를 추가.
    pub fn extend_from_json(&mut self, text: &str) -> PuzzleResult<usize> {
        let entries: Vec<Value> = serde_json::from_str(text)?;
        let count = entries.len();

        for (i, entry) in entries.into_iter().enumerate() {
            let date = entry
                .get("date")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    PuzzleError::MalformedData(format!("{}번째 항목에 date가 없습니다", i))
                })
                .and_then(|s| parse_puzzle_date(s.trim()))?;
            self.table.insert(date, entry);
        }
        Ok(count)
    }

    /// 항목 수.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// 보유 날짜 범위.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.table.keys().next()?;
        let last = self.table.keys().next_back()?;
        Some((*first, *last))
    }
}

#[async_trait]
impl PuzzleSource for StaticTableSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_raw(&self, date: NaiveDate) -> PuzzleResult<Value> {
        self.table
            .get(&date)
            .cloned()
            .ok_or_else(|| PuzzleError::NotFound(format!("{}: {} 항목 없음", self.name, date)))
    }

    async fn probe(&self, date: NaiveDate) -> PuzzleResult<bool> {
        Ok(self.table.contains_key(&date))
    }
}
