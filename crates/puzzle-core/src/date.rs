//! 퍼즐 날짜 규칙.
//!
//! - 요청 날짜는 엄격한 `YYYY-MM-DD` 형식이어야 합니다.
//! - 출시일 이전 날짜와 (명시적으로 허용하지 않는 한) 미래 날짜는 거부합니다.
//! - 게임 번호는 `BASE_GAME_ID + (date - 출시일)` 공식으로 날짜에서 유도됩니다.

use chrono::{NaiveDate, Utc};

use crate::{PuzzleError, PuzzleResult};

/// 출시일 (`YYYY-MM-DD`).
pub const LAUNCH_DATE: &str = "2023-06-12";

/// 출시일의 게임 번호.
pub const BASE_GAME_ID: u32 = 1;

/// 출시일 반환.
pub fn launch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 6, 12).unwrap_or(NaiveDate::MIN)
}

/// 오늘 날짜 (UTC).
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// `YYYY-MM-DD` 문자열을 날짜로 파싱.
///
/// `2025-8-1` 처럼 자릿수가 맞지 않는 입력과 `2025-02-30` 처럼
/// 달력에 없는 날짜는 모두 `InvalidDateFormat`으로 거부합니다.
pub fn parse_puzzle_date(input: &str) -> PuzzleResult<NaiveDate> {
    let bytes = input.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });

    if !well_formed {
        return Err(PuzzleError::InvalidDateFormat(format!(
            "'{}' (YYYY-MM-DD 형식이 필요합니다)",
            input
        )));
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| {
        PuzzleError::InvalidDateFormat(format!("'{}' (존재하지 않는 날짜)", input))
    })
}

/// 날짜 범위 확인.
///
/// 출시일 이전 날짜는 항상 거부하고, 미래 날짜는 `allow_future`가 아니면 거부합니다.
pub fn check_date_range(date: NaiveDate, today: NaiveDate, allow_future: bool) -> PuzzleResult<()> {
    let launch = launch_date();
    if date < launch {
        return Err(PuzzleError::DateOutOfRange(format!(
            "{}은(는) 출시일 {} 이전입니다",
            date, launch
        )));
    }
    if !allow_future && date > today {
        return Err(PuzzleError::DateOutOfRange(format!(
            "{}은(는) 미래 날짜입니다 (오늘: {})",
            date, today
        )));
    }
    Ok(())
}

/// 파싱과 범위 확인을 한 번에 수행.
pub fn resolve_request_date(
    input: &str,
    today: NaiveDate,
    allow_future: bool,
) -> PuzzleResult<NaiveDate> {
    let date = parse_puzzle_date(input)?;
    check_date_range(date, today, allow_future)?;
    Ok(date)
}

/// 날짜에 해당하는 게임 번호.
///
/// 출시일 이전이면 `None`.
pub fn game_id_for(date: NaiveDate) -> Option<u32> {
    let days = (date - launch_date()).num_days();
    if days < 0 {
        return None;
    }
    u32::try_from(days).ok().map(|d| BASE_GAME_ID + d)
}

/// 게임 번호에 해당하는 날짜.
pub fn date_for_game_id(game_id: u32) -> Option<NaiveDate> {
    if game_id < BASE_GAME_ID {
        return None;
    }
    launch_date().checked_add_days(chrono::Days::new(u64::from(game_id - BASE_GAME_ID)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_puzzle_date() {
        assert_eq!(parse_puzzle_date("2025-08-20").unwrap(), ymd(2025, 8, 20));
        assert!(matches!(
            parse_puzzle_date("2025-8-20"),
            Err(PuzzleError::InvalidDateFormat(_))
        ));
        assert!(matches!(
            parse_puzzle_date("2025/08/20"),
            Err(PuzzleError::InvalidDateFormat(_))
        ));
        assert!(matches!(
            parse_puzzle_date("2025-02-30"),
            Err(PuzzleError::InvalidDateFormat(_))
        ));
        assert!(matches!(
            parse_puzzle_date(""),
            Err(PuzzleError::InvalidDateFormat(_))
        ));
    }

    #[test]
    fn test_check_date_range() {
        let today = ymd(2025, 8, 20);
        assert!(check_date_range(today, today, false).is_ok());
        assert!(matches!(
            check_date_range(ymd(2025, 8, 21), today, false),
            Err(PuzzleError::DateOutOfRange(_))
        ));
        assert!(check_date_range(ymd(2025, 8, 21), today, true).is_ok());
        assert!(matches!(
            check_date_range(ymd(2023, 6, 11), today, true),
            Err(PuzzleError::DateOutOfRange(_))
        ));
    }

    #[test]
    fn test_game_id_formula() {
        assert_eq!(game_id_for(launch_date()), Some(BASE_GAME_ID));
        assert_eq!(game_id_for(ymd(2023, 6, 13)), Some(2));
        assert_eq!(game_id_for(ymd(2023, 6, 11)), None);

        let date = ymd(2025, 8, 20);
        let id = game_id_for(date).unwrap();
        assert_eq!(date_for_game_id(id), Some(date));
        assert_eq!(date_for_game_id(0), None);
    }

    #[test]
    fn test_launch_date_constant_matches() {
        assert_eq!(parse_puzzle_date(LAUNCH_DATE).unwrap(), launch_date());
    }
}
