//! Client-facing business messages.
//!
//! These travel in `{success: false, error}` replies. The admin console
//! matches on the substrings `비밀번호` and `토큰`, so credential messages
//! must keep them.

pub const OVERLAP: &str = "이미 예약된 시간입니다. 다른 시간을 선택해주세요.";
pub const ROOM_UNAVAILABLE: &str = "사용할 수 없는 회의실입니다.";
pub const RESERVATION_NOT_FOUND: &str = "예약을 찾을 수 없습니다.";
pub const PASSWORD_MISMATCH: &str = "비밀번호가 일치하지 않습니다.";
pub const PASSWORD_RESET_REQUIRED: &str =
    "비밀번호 재설정이 필요한 예약입니다. 관리자에게 문의해주세요.";
pub const ADMIN_CODE_MISMATCH: &str = "관리자 코드가 올바르지 않습니다.";
pub const ROOM_EXISTS: &str = "이미 존재하는 회의실입니다.";
pub const ROOM_NOT_FOUND: &str = "회의실을 찾을 수 없습니다.";
pub const NOTHING_TO_UPDATE: &str = "변경할 항목이 없습니다.";
pub const SAVE_FAILED: &str = "예약을 저장하지 못했습니다. 다시 시도해주세요.";
pub const REPORT_WEBHOOK_MISSING: &str = "리포트 전송 대상이 설정되지 않았습니다.";
pub const REPORT_SEND_FAILED: &str = "리포트 전송에 실패했습니다.";
