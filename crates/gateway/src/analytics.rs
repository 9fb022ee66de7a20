//! Operational metrics derived from the event log.
//!
//! Everything here is pure: callers fetch events, rooms, and reservations
//! and pass them in together with the current time.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use roombook_core::{EventKind, OperationalEvent};
use serde::Serialize;

/// Days covered by [`OperationalMetrics`].
pub const METRICS_WINDOW_DAYS: i64 = 30;
/// Daily buckets in a [`Trend`].
pub const TREND_DAYS: usize = 14;
/// Window for [`SecurityAlerts`].
pub const ALERT_WINDOW_MINUTES: i64 = 60;

const MOVING_AVERAGE_DAYS: usize = 7;
const SPIKE_MIN_FAILURES: u64 = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationalMetrics {
    pub reservation_create: u64,
    pub reservation_update: u64,
    pub reservation_delete: u64,
    pub password_fail: u64,
    pub admin_fail: u64,
    pub room_changes: u64,
    pub active_rooms: u64,
    pub upcoming_reservations: u64,
    pub window_days: i64,
}

pub fn compute_metrics(
    events: &[OperationalEvent],
    active_rooms: usize,
    upcoming_reservations: usize,
    now: DateTime<Utc>,
) -> OperationalMetrics {
    let since = now - Duration::days(METRICS_WINDOW_DAYS);
    let count = |kind: EventKind| -> u64 {
        events
            .iter()
            .filter(|e| e.kind == kind && e.created_at >= since && e.created_at <= now)
            .count() as u64
    };
    OperationalMetrics {
        reservation_create: count(EventKind::ReservationCreate),
        reservation_update: count(EventKind::ReservationUpdate),
        reservation_delete: count(EventKind::ReservationDelete),
        password_fail: count(EventKind::PasswordFail),
        admin_fail: count(EventKind::AdminFail),
        room_changes: count(EventKind::RoomChange),
        active_rooms: active_rooms as u64,
        upcoming_reservations: upcoming_reservations as u64,
        window_days: METRICS_WINDOW_DAYS,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSeries {
    pub reservation_create: Vec<u64>,
    pub auth_fail: Vec<u64>,
    pub auth_fail_moving_avg7: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomalies {
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub days: Vec<String>,
    pub series: TrendSeries,
    pub anomalies: Anomalies,
}

/// Local calendar day of `at` in `offset`.
pub fn local_day(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// Daily buckets for the last [`TREND_DAYS`] local days ending today.
#[allow(clippy::cast_possible_wrap)]
pub fn compute_trend(events: &[OperationalEvent], now: DateTime<Utc>, offset: FixedOffset) -> Trend {
    let today = local_day(now, offset);
    let days: Vec<NaiveDate> = (0..TREND_DAYS)
        .rev()
        .map(|back| today - Duration::days(back as i64))
        .collect();

    let mut creates = vec![0u64; TREND_DAYS];
    let mut auth_fail = vec![0u64; TREND_DAYS];
    for event in events {
        let day = local_day(event.created_at, offset);
        let Some(idx) = days.iter().position(|d| *d == day) else {
            continue;
        };
        match event.kind {
            EventKind::ReservationCreate => creates[idx] += 1,
            kind if kind.is_auth_failure() => auth_fail[idx] += 1,
            _ => {}
        }
    }

    let moving = moving_average(&auth_fail, MOVING_AVERAGE_DAYS);
    let messages = detect_anomalies(&auth_fail, &moving);

    Trend {
        days: days.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect(),
        series: TrendSeries {
            reservation_create: creates,
            auth_fail,
            auth_fail_moving_avg7: moving,
        },
        anomalies: Anomalies { messages },
    }
}

/// Trailing mean over up to `window` points, rounded to two decimals.
#[allow(clippy::cast_precision_loss)]
fn moving_average(values: &[u64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            let sum: u64 = slice.iter().sum();
            let mean = sum as f64 / slice.len() as f64;
            (mean * 100.0).round() / 100.0
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn detect_anomalies(auth_fail: &[u64], moving: &[f64]) -> Vec<String> {
    let mut messages = Vec::new();
    let n = auth_fail.len();

    if n >= 3 && auth_fail[n - 3] < auth_fail[n - 2] && auth_fail[n - 2] < auth_fail[n - 1] {
        messages.push("최근 3일 연속으로 인증 실패가 증가했습니다.".to_owned());
    }

    if let (Some(&last), Some(&avg)) = (auth_fail.last(), moving.last())
        && last >= SPIKE_MIN_FAILURES
        && (last as f64) > avg * 2.0
    {
        messages.push(format!(
            "오늘 인증 실패 {last}건이 7일 평균({avg:.2}건)의 2배를 넘었습니다."
        ));
    }

    messages
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAlerts {
    pub window_minutes: i64,
    pub admin_fail_count: u64,
    pub reservation_fail_count: u64,
    pub threshold: u64,
    pub alert: bool,
}

pub fn compute_alerts(
    events: &[OperationalEvent],
    now: DateTime<Utc>,
    threshold: u64,
) -> SecurityAlerts {
    let since = now - Duration::minutes(ALERT_WINDOW_MINUTES);
    let recent = |kind: EventKind| -> u64 {
        events
            .iter()
            .filter(|e| e.kind == kind && e.created_at >= since && e.created_at <= now)
            .count() as u64
    };
    let admin_fail_count = recent(EventKind::AdminFail);
    let reservation_fail_count = recent(EventKind::PasswordFail);
    SecurityAlerts {
        window_minutes: ALERT_WINDOW_MINUTES,
        admin_fail_count,
        reservation_fail_count,
        threshold,
        alert: threshold > 0 && admin_fail_count + reservation_fail_count >= threshold,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Check {
    pub key: &'static str,
    pub ok: bool,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckList {
    pub total: usize,
    pub ok_count: usize,
    pub fail_count: usize,
    pub checks: Vec<Check>,
}

impl CheckList {
    pub fn new(checks: Vec<Check>) -> Self {
        let ok_count = checks.iter().filter(|c| c.ok).count();
        Self {
            total: checks.len(),
            ok_count,
            fail_count: checks.len() - ok_count,
            checks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub report_text: String,
    pub recipients: Vec<String>,
    pub has_alert: bool,
}

pub fn build_report(
    metrics: &OperationalMetrics,
    trend: &Trend,
    alerts: &SecurityAlerts,
    recipients: &[String],
    today: NaiveDate,
) -> Report {
    let mut lines = vec![
        format!("[회의실 예약 운영 리포트] {}", today.format("%Y-%m-%d")),
        format!(
            "최근 {}일 예약 생성 {}건 / 수정 {}건 / 삭제 {}건",
            metrics.window_days,
            metrics.reservation_create,
            metrics.reservation_update,
            metrics.reservation_delete
        ),
        format!(
            "인증 실패: 비밀번호 {}건, 관리자 {}건",
            metrics.password_fail, metrics.admin_fail
        ),
        format!(
            "회의실 변경 {}건, 활성 회의실 {}개, 예정된 예약 {}건",
            metrics.room_changes, metrics.active_rooms, metrics.upcoming_reservations
        ),
    ];
    if alerts.alert {
        lines.push(format!(
            "보안 경고: 최근 {}분 인증 실패 {}건 (기준 {}건)",
            alerts.window_minutes,
            alerts.admin_fail_count + alerts.reservation_fail_count,
            alerts.threshold
        ));
    }
    if trend.anomalies.messages.is_empty() {
        lines.push("이상 징후 없음".to_owned());
    } else {
        for message in &trend.anomalies.messages {
            lines.push(format!("이상 징후: {message}"));
        }
    }

    Report {
        report_text: lines.join("\n"),
        recipients: recipients.to_vec(),
        has_alert: alerts.alert || !trend.anomalies.messages.is_empty(),
    }
}
