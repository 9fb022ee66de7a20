//! Date, time, and interval checks for reservation writes.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

use crate::model::ReservationDraft;

pub const MAX_TEAM_NAME_CHARS: usize = 30;
pub const MAX_USER_NAME_CHARS: usize = 20;

// ASCII digits only: stored times are compared lexically.
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid date regex"));

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("valid time regex"));

static PASSWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}$").expect("valid password regex"));

/// Business-rule rejections for reservation input.
///
/// These are returned to the client as `success: false` with HTTP 200.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("날짜 형식이 올바르지 않습니다.")]
    InvalidDate,

    #[error("시간 형식이 올바르지 않습니다.")]
    InvalidTime,

    #[error("시간은 30분 단위로 입력해야 합니다.")]
    OffGrid,

    #[error("종료시간은 시작시간보다 늦어야 합니다.")]
    EndNotAfterStart,

    #[error("팀명은 {MAX_TEAM_NAME_CHARS}자 이하여야 합니다.")]
    TeamNameTooLong,

    #[error("예약자 이름은 {MAX_USER_NAME_CHARS}자 이하여야 합니다.")]
    UserNameTooLong,

    #[error("비밀번호는 숫자 4자리여야 합니다.")]
    InvalidPassword,
}

/// `YYYY-MM-DD` that is also a real calendar date.
pub fn validate_date(date: &str) -> Result<NaiveDate, ValidationError> {
    if !DATE_RE.is_match(date) {
        return Err(ValidationError::InvalidDate);
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate)
}

/// Zero-padded `HH:MM` on the half-hour grid.
pub fn validate_time(time: &str) -> Result<(), ValidationError> {
    if !TIME_RE.is_match(time) {
        return Err(ValidationError::InvalidTime);
    }
    if !(time.ends_with(":00") || time.ends_with(":30")) {
        return Err(ValidationError::OffGrid);
    }
    Ok(())
}

/// Exactly four ASCII digits.
pub fn validate_password_format(password: &str) -> Result<(), ValidationError> {
    if PASSWORD_RE.is_match(password) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPassword)
    }
}

/// Check a draft in order: date, times, ordering, name lengths.
///
/// Room activity and overlap need the datastore and are checked by the caller.
pub fn validate_draft(draft: &ReservationDraft) -> Result<(), ValidationError> {
    validate_date(&draft.date)?;
    validate_time(&draft.start_time)?;
    validate_time(&draft.end_time)?;
    // Lexical comparison is sound for zero-padded HH:MM.
    if draft.start_time >= draft.end_time {
        return Err(ValidationError::EndNotAfterStart);
    }
    if draft.team_name.chars().count() > MAX_TEAM_NAME_CHARS {
        return Err(ValidationError::TeamNameTooLong);
    }
    if draft.user_name.chars().count() > MAX_USER_NAME_CHARS {
        return Err(ValidationError::UserNameTooLong);
    }
    Ok(())
}

/// Half-open interval overlap: `[a_start, a_end)` and `[b_start, b_end)`.
pub fn intervals_overlap(a_start: &str, a_end: &str, b_start: &str, b_end: &str) -> bool {
    a_start < b_end && a_end > b_start
}

/// Floor codes are compared trimmed and upper-cased.
pub fn normalize_floor(floor: &str) -> String {
    floor.trim().to_uppercase()
}
