//! # Puzzle Core
//!
//! 일일 단어 퍼즐 수집 시스템의 핵심 도메인 모델 및 공용 인프라를 제공합니다.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 정규 퍼즐 레코드 (`PuzzleRecord`) 및 그룹 타입
//! - 날짜 규칙 (출시일, 게임 번호 계산, 미래 날짜 거부)
//! - 후보 레코드 검증 및 정규화
//! - 소스 간 구조적 품질 점수
//! - 에러 분류 체계
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod date;
pub mod error;
pub mod logging;
pub mod record;
pub mod scoring;
pub mod validation;

pub use crate::config::*;
pub use date::{
    check_date_range, date_for_game_id, game_id_for, launch_date, parse_puzzle_date,
    resolve_request_date, today_utc, BASE_GAME_ID, LAUNCH_DATE,
};
pub use error::*;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use record::{PuzzleGroup, PuzzleRecord, CATEGORY_SEPARATOR, GROUP_COUNT, WORDS_PER_GROUP};
pub use scoring::{rank_candidates, score_record, QualityScore, ScoredCandidate};
pub use validation::{
    sanitize, validate, validate_and_sanitize, validate_record, SanitizeError, SanitizeOutcome,
    ValidationOptions, ValidationReport,
};
