//! 퍼즐 수집 시스템의 에러 타입.
//!
//! 소스 어댑터, 재시도 실행기, 오케스트레이터가 공유하는 에러 분류 체계를 정의합니다.
//! 검증 에러는 여기 포함되지 않으며 `validation` 모듈이 목록 형태로 반환합니다.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 퍼즐 수집 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PuzzleError {
    /// `YYYY-MM-DD` 형식이 아니거나 존재하지 않는 날짜
    #[error("잘못된 날짜 형식: {0}")]
    InvalidDateFormat(String),

    /// 미래 날짜 또는 출시일 이전 날짜
    #[error("허용 범위를 벗어난 날짜: {0}")]
    DateOutOfRange(String),

    /// 소스가 해당 날짜의 퍼즐이 없다고 응답
    #[error("퍼즐을 찾을 수 없음: {0}")]
    NotFound(String),

    /// 타임아웃, 연결 재설정 등 재시도 가능한 네트워크 에러
    #[error("일시적 네트워크 에러: {0}")]
    TransientNetwork(String),

    /// 접근 거부, 반복되는 서버 에러 등 지속적인 소스 장애
    #[error("소스 장애: {0}")]
    PersistentSource(String),

    /// 응답은 받았으나 구조가 올바르지 않음
    #[error("잘못된 데이터: {0}")]
    MalformedData(String),

    /// 같은 날짜의 요청이 이미 진행 중
    #[error("이미 진행 중인 요청: {0}")]
    InProgress(NaiveDate),

    /// 동시에 처리 중인 날짜 수가 한도에 도달
    #[error("동시 요청 한도 초과 (최대 {0}개)")]
    TooManyInFlight(usize),

    /// 모든 소스가 실패
    #[error("모든 소스 실패 ({date}, {tried}개 시도): {}", describe_last(.last))]
    Exhausted {
        date: NaiveDate,
        tried: usize,
        last: Option<Box<PuzzleError>>,
    },

    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),
}

fn describe_last(last: &Option<Box<PuzzleError>>) -> String {
    match last {
        Some(err) => err.to_string(),
        None => "정상 상태의 소스가 없습니다".to_string(),
    }
}

/// 퍼즐 작업을 위한 Result 타입.
pub type PuzzleResult<T> = Result<T, PuzzleError>;

/// 에러 분류.
///
/// 오케스트레이터는 이 분류에 따라 다음 소스로 넘어갈지,
/// 소스를 비정상으로 표시할지, 즉시 반환할지 결정합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// 입력 오류 (I/O 이전에 실패, 재시도/헬스 영향 없음)
    InvalidInput,
    /// 데이터 없음 (헬스 신호 아님)
    NotFound,
    /// 일시적 네트워크 에러
    TransientNetwork,
    /// 지속적 소스 장애
    PersistentSource,
    /// 구조 불량 데이터
    MalformedData,
    /// 동시성 가드에 의한 거부
    Rejected,
    /// 모든 소스 소진
    Exhausted,
    /// 설정 에러
    Config,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorClass::InvalidInput => write!(f, "invalid_input"),
            ErrorClass::NotFound => write!(f, "not_found"),
            ErrorClass::TransientNetwork => write!(f, "transient_network"),
            ErrorClass::PersistentSource => write!(f, "persistent_source"),
            ErrorClass::MalformedData => write!(f, "malformed_data"),
            ErrorClass::Rejected => write!(f, "rejected"),
            ErrorClass::Exhausted => write!(f, "exhausted"),
            ErrorClass::Config => write!(f, "config"),
        }
    }
}

impl PuzzleError {
    /// 에러 분류 반환.
    pub fn class(&self) -> ErrorClass {
        match self {
            PuzzleError::InvalidDateFormat(_) | PuzzleError::DateOutOfRange(_) => {
                ErrorClass::InvalidInput
            }
            PuzzleError::NotFound(_) => ErrorClass::NotFound,
            PuzzleError::TransientNetwork(_) => ErrorClass::TransientNetwork,
            PuzzleError::PersistentSource(_) => ErrorClass::PersistentSource,
            PuzzleError::MalformedData(_) => ErrorClass::MalformedData,
            PuzzleError::InProgress(_) | PuzzleError::TooManyInFlight(_) => ErrorClass::Rejected,
            PuzzleError::Exhausted { .. } => ErrorClass::Exhausted,
            PuzzleError::Config(_) => ErrorClass::Config,
        }
    }

    /// 같은 소스에 재시도할 가치가 있는 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PuzzleError::TransientNetwork(_))
    }

    /// 한 번으로 소스를 즉시 비정상 전환하는 에러인지 확인합니다.
    ///
    /// `TransientNetwork`는 단독으로는 헬스에 영향을 주지 않으며
    /// 연속 횟수가 임계치에 도달할 때만 전환됩니다.
    pub fn is_health_signal(&self) -> bool {
        matches!(self, PuzzleError::PersistentSource(_))
    }

    /// I/O 이전에 거부된 입력 에러인지 확인합니다.
    pub fn is_invalid_input(&self) -> bool {
        self.class() == ErrorClass::InvalidInput
    }

    /// 재시도 횟수를 메시지에 덧붙인 에러 반환.
    ///
    /// 분류는 유지됩니다.
    pub fn with_attempts(self, attempts: u32) -> Self {
        let note = |msg: String| format!("{} ({}회 시도 후)", msg, attempts);
        match self {
            PuzzleError::InvalidDateFormat(m) => PuzzleError::InvalidDateFormat(note(m)),
            PuzzleError::DateOutOfRange(m) => PuzzleError::DateOutOfRange(note(m)),
            PuzzleError::NotFound(m) => PuzzleError::NotFound(note(m)),
            PuzzleError::TransientNetwork(m) => PuzzleError::TransientNetwork(note(m)),
            PuzzleError::PersistentSource(m) => PuzzleError::PersistentSource(note(m)),
            PuzzleError::MalformedData(m) => PuzzleError::MalformedData(note(m)),
            PuzzleError::Config(m) => PuzzleError::Config(note(m)),
            other => other,
        }
    }
}

impl From<serde_json::Error> for PuzzleError {
    fn from(err: serde_json::Error) -> Self {
        PuzzleError::MalformedData(err.to_string())
    }
}
