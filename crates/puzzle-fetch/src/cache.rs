//! 날짜별 퍼즐 TTL 캐시.
//!
//! 만료된 항목은 조회 시 미스로 취급되고 즉시 제거됩니다.
//! 조회/저장은 복제본을 주고받으므로 호출자가 캐시 내용을 변경할 수 없습니다.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use puzzle_core::PuzzleRecord;
use tokio::time::Instant;
use tracing::debug;

use crate::{read, write};

struct CacheEntry {
    record: PuzzleRecord,
    cached_at: Instant,
    stored_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }
}

/// 퍼즐 캐시.
pub struct PuzzleCache {
    ttl: Duration,
    entries: RwLock<HashMap<NaiveDate, CacheEntry>>,
}

impl PuzzleCache {
    /// 새 캐시 생성.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// TTL 반환.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 캐시 조회.
    ///
    /// 만료된 항목은 제거하고 `None`을 반환합니다.
    pub fn get(&self, date: NaiveDate) -> Option<PuzzleRecord> {
        {
            let entries = read(&self.entries);
            match entries.get(&date) {
                None => return None,
                Some(entry) if !entry.is_expired(self.ttl) => return Some(entry.record.clone()),
                Some(_) => {}
            }
        }

        let mut entries = write(&self.entries);
        // 읽기 잠금을 놓은 사이 새 항목이 들어왔을 수 있음
        if let Some(entry) = entries.get(&date) {
            if !entry.is_expired(self.ttl) {
                return Some(entry.record.clone());
            }
            entries.remove(&date);
            debug!(date = %date, "만료된 캐시 항목 제거");
        }
        None
    }

    /// 캐시 저장 (같은 날짜는 덮어씀).
    pub fn put(&self, record: &PuzzleRecord) {
        let entry = CacheEntry {
            record: record.clone(),
            cached_at: Instant::now(),
            stored_at: Utc::now(),
        };
        write(&self.entries).insert(record.date(), entry);
    }

    /// 만료되지 않은 항목 존재 여부.
    pub fn contains(&self, date: NaiveDate) -> bool {
        read(&self.entries)
            .get(&date)
            .is_some_and(|entry| !entry.is_expired(self.ttl))
    }

    /// 항목이 저장된 시각.
    pub fn stored_at(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        read(&self.entries).get(&date).map(|entry| entry.stored_at)
    }

    /// 만료된 항목 일괄 제거, 제거된 개수 반환.
    pub fn clear_expired(&self) -> usize {
        let mut entries = write(&self.entries);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(self.ttl));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed = removed, remaining = entries.len(), "만료 캐시 정리");
        }
        removed
    }

    /// 전체 삭제.
    pub fn clear_all(&self) {
        write(&self.entries).clear();
    }

    /// 저장된 항목 수 (만료 여부 무관).
    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.entries).is_empty()
    }
}
