use chrono::Duration;
use roombook_core::{OperationalEvent, Reply, ReservationFilter};
use tracing::{info, warn};

use super::ManagedStore;
use crate::analytics::{
    self, ALERT_WINDOW_MINUTES, Check, CheckList, METRICS_WINDOW_DAYS, OperationalMetrics, Report,
    TREND_DAYS,
};
use crate::error::GatewayError;
use crate::messages;
use crate::request::GatewayRequest;

fn configured(ok: bool) -> String {
    if ok { "설정됨" } else { "설정되지 않음" }.to_owned()
}

impl ManagedStore {
    async fn events_since_days(&self, days: i64) -> Result<Vec<OperationalEvent>, GatewayError> {
        let since = self.clock.now() - Duration::days(days);
        Ok(self.db.list_events_since(since).await?)
    }

    async fn metrics(&self) -> Result<OperationalMetrics, GatewayError> {
        let now = self.clock.now();
        let events = self.events_since_days(METRICS_WINDOW_DAYS).await?;
        let active_rooms = self.db.list_rooms(false).await?.len();
        let today = analytics::local_day(now, self.settings.report.utc_offset);
        let upcoming = self
            .db
            .list_reservations(&ReservationFilter {
                from_date: Some(today.format("%Y-%m-%d").to_string()),
                ..ReservationFilter::default()
            })
            .await?
            .len();
        Ok(analytics::compute_metrics(&events, active_rooms, upcoming, now))
    }

    async fn trend(&self) -> Result<analytics::Trend, GatewayError> {
        // One extra day so the oldest local day is complete under any offset.
        #[allow(clippy::cast_possible_wrap)]
        let events = self.events_since_days(TREND_DAYS as i64 + 1).await?;
        Ok(analytics::compute_trend(
            &events,
            self.clock.now(),
            self.settings.report.utc_offset,
        ))
    }

    async fn alerts(&self) -> Result<analytics::SecurityAlerts, GatewayError> {
        let now = self.clock.now();
        let events = self
            .db
            .list_events_since(now - Duration::minutes(ALERT_WINDOW_MINUTES))
            .await?;
        Ok(analytics::compute_alerts(
            &events,
            now,
            self.settings.report.alert_threshold,
        ))
    }

    async fn report(&self) -> Result<Report, GatewayError> {
        let metrics = self.metrics().await?;
        let trend = self.trend().await?;
        let alerts = self.alerts().await?;
        let today = analytics::local_day(self.clock.now(), self.settings.report.utc_offset);
        Ok(analytics::build_report(
            &metrics,
            &trend,
            &alerts,
            &self.settings.report.recipients,
            today,
        ))
    }

    /// Configuration and health probes. Datastore failures become failed
    /// checks rather than errors.
    async fn checks(&self) -> CheckList {
        let mut checks = vec![
            Check {
                key: "legacyUrl",
                ok: self.legacy.is_configured(),
                detail: configured(self.legacy.is_configured()),
            },
            Check {
                key: "signingSecret",
                ok: self.codec.is_configured(),
                detail: configured(self.codec.is_configured()),
            },
            Check {
                key: "passwordPepper",
                ok: self.hasher.has_pepper(),
                detail: configured(self.hasher.has_pepper()),
            },
        ];

        checks.push(match self.db.ping().await {
            Ok(()) => Check {
                key: "database",
                ok: true,
                detail: "연결 정상".to_owned(),
            },
            Err(e) => {
                warn!(error = %e, "database check failed");
                Check {
                    key: "database",
                    ok: false,
                    detail: "연결 실패".to_owned(),
                }
            }
        });

        checks.push(match self.db.list_rooms(false).await {
            Ok(rooms) => Check {
                key: "activeRooms",
                ok: !rooms.is_empty(),
                detail: format!("활성 회의실 {}개", rooms.len()),
            },
            Err(e) => {
                warn!(error = %e, check = "activeRooms", "check query failed");
                Check {
                    key: "activeRooms",
                    ok: false,
                    detail: "조회 실패".to_owned(),
                }
            }
        });

        let strict = self.settings.strict_password_hash;
        checks.push(match self.db.count_placeholder_hashes().await {
            Ok(pending) => Check {
                key: "passwordHashMigration",
                ok: pending == 0 || !strict,
                detail: format!(
                    "미전환 {pending}건 (strict 모드: {})",
                    if strict { "on" } else { "off" }
                ),
            },
            Err(e) => {
                warn!(error = %e, check = "passwordHashMigration", "check query failed");
                Check {
                    key: "passwordHashMigration",
                    ok: false,
                    detail: "조회 실패".to_owned(),
                }
            }
        });

        CheckList::new(checks)
    }

    pub(super) async fn operational_metrics(
        &self,
        request: &GatewayRequest,
    ) -> Result<Reply, GatewayError> {
        if !self.require_admin(request).await? {
            return Ok(Self::denied());
        }
        Ok(Reply::data(self.metrics().await?))
    }

    pub(super) async fn operational_trend(
        &self,
        request: &GatewayRequest,
    ) -> Result<Reply, GatewayError> {
        if !self.require_admin(request).await? {
            return Ok(Self::denied());
        }
        Ok(Reply::data(self.trend().await?))
    }

    pub(super) async fn security_alerts(
        &self,
        request: &GatewayRequest,
    ) -> Result<Reply, GatewayError> {
        if !self.require_admin(request).await? {
            return Ok(Self::denied());
        }
        Ok(Reply::data(self.alerts().await?))
    }

    pub(super) async fn operational_checks(
        &self,
        request: &GatewayRequest,
    ) -> Result<Reply, GatewayError> {
        if !self.require_admin(request).await? {
            return Ok(Self::denied());
        }
        Ok(Reply::data(self.checks().await))
    }

    pub(super) async fn operational_report(
        &self,
        request: &GatewayRequest,
    ) -> Result<Reply, GatewayError> {
        if !self.require_admin(request).await? {
            return Ok(Self::denied());
        }
        Ok(Reply::data(self.report().await?))
    }

    /// Build the report and deliver it to the report webhook.
    pub(super) async fn send_operational_report(
        &self,
        request: &GatewayRequest,
    ) -> Result<Reply, GatewayError> {
        if !self.require_admin(request).await? {
            return Ok(Self::denied());
        }
        let Some(webhook) = self.settings.report.webhook_url.as_deref() else {
            return Ok(Reply::fail(messages::REPORT_WEBHOOK_MISSING));
        };
        let report = self.report().await?;

        match self.http.post(webhook).json(&report).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(recipients = report.recipients.len(), "operational report sent");
                Ok(Reply::data(report))
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "report webhook rejected the report");
                Ok(Reply::fail(messages::REPORT_SEND_FAILED))
            }
            Err(e) => {
                warn!(error = %e, "report webhook unreachable");
                Ok(Reply::fail(messages::REPORT_SEND_FAILED))
            }
        }
    }
}
