//! 퍼즐 수집 CLI 도구 모음.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 날짜별 퍼즐 조회
//! - 후보 JSON 파일 검증
//! - 소스 간 품질 비교
//! - 소스 헬스 점검
//! - 데몬 모드

pub mod commands;

pub use commands::*;
