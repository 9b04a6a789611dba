//! 통합 테스트용 모의 소스.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use puzzle_core::{game_id_for, PuzzleError, PuzzleResult};
use puzzle_fetch::{Fetcher, FetcherOptions, PuzzleOrchestrator, PuzzleSource};
use serde_json::{json, Value};
use tokio::sync::Notify;

pub const DATE: &str = "2025-08-20";

/// 모의 소스 응답.
#[derive(Clone)]
pub enum Reply {
    /// 요청 날짜의 정상 퍼즐
    Puzzle,
    /// 힌트가 없는 정상 퍼즐
    PuzzleWithoutHints,
    /// 고정 에러
    Fail(PuzzleError),
    /// 고정 JSON
    Raw(Value),
    /// 신호를 받은 뒤 정상 퍼즐
    Gate(Arc<Notify>),
}

pub struct MockSource {
    name: String,
    reply: Reply,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl PuzzleSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_raw(&self, date: NaiveDate) -> PuzzleResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Puzzle => Ok(puzzle_json(date, true)),
            Reply::PuzzleWithoutHints => Ok(puzzle_json(date, false)),
            Reply::Fail(e) => Err(e.clone()),
            Reply::Raw(v) => Ok(v.clone()),
            Reply::Gate(gate) => {
                gate.notified().await;
                Ok(puzzle_json(date, true))
            }
        }
    }
}

/// 모의 소스 등록 결과.
pub struct Mock {
    pub fetcher: Arc<Fetcher>,
    pub calls: Arc<AtomicUsize>,
}

impl Mock {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// 모의 소스를 만들어 등록합니다.
pub fn register(orch: &PuzzleOrchestrator, name: &str, priority: i32, reply: Reply) -> Mock {
    let calls = Arc::new(AtomicUsize::new(0));
    let source = MockSource {
        name: name.to_string(),
        reply,
        calls: calls.clone(),
    };
    let fetcher = Arc::new(Fetcher::new(source, FetcherOptions::default()));
    orch.register_fetcher(fetcher.clone(), priority)
        .expect("register");
    Mock { fetcher, calls }
}

pub fn puzzle_json(date: NaiveDate, with_hints: bool) -> Value {
    let groups = [
        ("FISH", ["BASS", "PIKE", "SOLE", "CARP"], "물고기"),
        ("KEYBOARD KEYS", ["TAB", "SHIFT", "ALT", "ESC"], "키보드"),
        ("PLANETS", ["MARS", "VENUS", "EARTH", "SATURN"], "행성"),
        ("___BALL", ["FOOT", "BASE", "HAND", "SNOW"], "공"),
    ];

    let groups: Vec<Value> = groups
        .iter()
        .enumerate()
        .map(|(level, (name, words, hint))| {
            let mut group = json!({"name": name, "level": level, "words": words});
            if with_hints {
                group["hint"] = json!(hint);
            }
            group
        })
        .collect();

    json!({
        "date": date.format("%Y-%m-%d").to_string(),
        "gameId": game_id_for(date).unwrap_or(1),
        "groups": groups,
    })
}

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 20).unwrap()
}
