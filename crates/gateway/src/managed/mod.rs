//! The managed-datastore backend.
//!
//! Applies the business rules (validation, room activity, overlap checks,
//! credentials, operational events) in the gateway and talks to the
//! datastore through the [`Datastore`] trait.

mod operations;
mod reservations;
mod rooms;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{FixedOffset, Offset, Utc};
use roombook_core::{EventKind, GatewayAction, OperationalEvent, Reply};
use roombook_crypto::{PasswordHasher, TokenCodec, TokenError};
use roombook_state::Datastore;
use tracing::{instrument, warn};

use crate::admin::AdminAuthority;
use crate::clock::Clock;
use crate::error::GatewayError;
use crate::legacy::LegacyForwarder;
use crate::request::{GatewayRequest, GatewayResponse};
use crate::store::ReservationStore;

/// Operational report delivery and alerting settings.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    /// Receives the report as JSON on `sendOperationalMetricsReport`.
    pub webhook_url: Option<String>,
    pub recipients: Vec<String>,
    /// Auth failures within the alert window that raise an alert. Zero disables.
    pub alert_threshold: u64,
    /// Offset used to cut calendar days for trends and "upcoming".
    pub utc_offset: FixedOffset,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            recipients: Vec::new(),
            alert_threshold: 5,
            utc_offset: FixedOffset::east_opt(9 * 3600).unwrap_or_else(|| Utc.fix()),
        }
    }
}

/// Settings specific to the managed path.
#[derive(Debug, Clone, Default)]
pub struct ManagedSettings {
    /// Refuse legacy fallback for reservations whose hash was never migrated.
    pub strict_password_hash: bool,
    pub report: ReportSettings,
}

/// [`ReservationStore`] backed by the managed datastore.
#[derive(Debug)]
pub struct ManagedStore {
    db: Arc<dyn Datastore>,
    codec: TokenCodec,
    hasher: PasswordHasher,
    admin: Arc<AdminAuthority>,
    legacy: Arc<LegacyForwarder>,
    clock: Arc<dyn Clock>,
    settings: ManagedSettings,
    http: reqwest::Client,
}

impl ManagedStore {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<dyn Datastore>,
        codec: TokenCodec,
        hasher: PasswordHasher,
        admin: Arc<AdminAuthority>,
        legacy: Arc<LegacyForwarder>,
        clock: Arc<dyn Clock>,
        settings: ManagedSettings,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GatewayError::Misconfiguration(e.to_string()))?;
        Ok(Self {
            db,
            codec,
            hasher,
            admin,
            legacy,
            clock,
            settings,
            http,
        })
    }

    pub fn datastore(&self) -> &Arc<dyn Datastore> {
        &self.db
    }

    /// Append an operational event. Failures are logged and swallowed.
    pub async fn record(&self, kind: EventKind, subject: &str) {
        let event = OperationalEvent {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            subject: subject.to_owned(),
            created_at: self.clock.now(),
        };
        if let Err(e) = self.db.record_event(&event).await {
            warn!(error = %e, %kind, "failed to record operational event");
        }
    }

    /// Check the request's `adminToken`, recording a failure when denied.
    async fn require_admin(&self, request: &GatewayRequest) -> Result<bool, GatewayError> {
        let token = request.text("adminToken");
        let granted = self.admin.verify_admin_access(token.as_deref()).await?;
        if !granted {
            warn!(client = %request.client_ip, action = %request.action, "admin access denied");
            self.record(EventKind::AdminFail, &request.client_ip).await;
        }
        Ok(granted)
    }

    /// The uniform credential rejection.
    fn denied() -> Reply {
        Reply::fail(TokenError.to_string())
    }

    fn issue_reservation_token(&self, id: &str) -> Result<String, GatewayError> {
        self.codec
            .issue_reservation_token(id, self.clock.now())
            .map_err(|_| GatewayError::Misconfiguration("signing secret is not set.".to_owned()))
    }

    async fn dispatch(&self, request: &GatewayRequest) -> Result<Reply, GatewayError> {
        use GatewayAction as A;

        match request.action {
            A::GetReservations => self.get_reservations(request).await,
            A::GetReservationById => self.get_reservation_by_id(request).await,
            A::CreateReservation => self.create_reservation(request).await,
            A::UpdateReservation => self.update_reservation(request).await,
            A::DeleteReservation => self.delete_reservation(request).await,
            A::VerifyPassword => self.verify_password(request).await,

            A::GetRooms => self.get_rooms(request).await,
            A::AddRoom => self.add_room(request).await,
            A::UpdateRoom => self.update_room(request).await,
            A::DeleteRoom => self.delete_room(request).await,

            A::GetSecurityAlerts => self.security_alerts(request).await,
            A::GetOperationalChecks => self.operational_checks(request).await,
            A::GetOperationalMetrics => self.operational_metrics(request).await,
            A::GetOperationalMetricsReport => self.operational_report(request).await,
            A::GetOperationalMetricsTrend => self.operational_trend(request).await,
            A::SendOperationalMetricsReport => self.send_operational_report(request).await,

            A::VerifyAdmin => match request.text("code") {
                Some(code) => match self.admin.exchange_code(&code) {
                    Some(result) => result,
                    None => self.legacy.call(request.verb, request.query_pairs.clone()).await,
                },
                None => Ok(Self::denied()),
            },
        }
    }
}

#[async_trait]
impl ReservationStore for ManagedStore {
    fn name(&self) -> &'static str {
        "managed"
    }

    #[instrument(name = "managed.execute", skip_all, fields(action = %request.action))]
    async fn execute(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let reply = self.dispatch(request).await?;
        Ok(GatewayResponse::reply(&reply))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{TimeZone, Utc};
    use roombook_core::{Params, Room};
    use roombook_crypto::SecretString;
    use roombook_state_memory::MemoryDatastore;
    use serde_json::{Value, json};

    use super::*;
    use crate::clock::ManualClock;
    use crate::legacy::LegacyConfig;

    pub(crate) const ADMIN_CODE: &str = "123456";

    pub(crate) struct Fixture {
        pub store: ManagedStore,
        pub db: Arc<MemoryDatastore>,
        pub clock: Arc<ManualClock>,
        pub codec: TokenCodec,
    }

    pub(crate) fn codec() -> TokenCodec {
        TokenCodec::new(Some(&SecretString::new("sign".into())))
    }

    pub(crate) fn fixture_with(legacy_url: Option<String>, admin_code: Option<&str>, strict: bool) -> Fixture {
        let db = Arc::new(MemoryDatastore::with_rooms([
            Room {
                id: "6F".into(),
                floor: "6F".into(),
                name: "Main".into(),
                is_active: true,
            },
            Room {
                id: "7F".into(),
                floor: "7F".into(),
                name: "Closed".into(),
                is_active: false,
            },
        ]));
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 9, 1, 0, 0).unwrap(),
        ));
        let legacy = Arc::new(
            LegacyForwarder::new(&LegacyConfig {
                url: legacy_url,
                ..LegacyConfig::default()
            })
            .unwrap(),
        );
        let admin = Arc::new(AdminAuthority::new(
            codec(),
            admin_code.map(|c| SecretString::new(c.to_owned())),
            Arc::clone(&legacy),
            clock.clone(),
        ));
        let store = ManagedStore::new(
            db.clone(),
            codec(),
            PasswordHasher::new(SecretString::new("pepper".into())),
            admin,
            legacy,
            clock.clone(),
            ManagedSettings {
                strict_password_hash: strict,
                report: ReportSettings::default(),
            },
        )
        .unwrap();
        Fixture {
            store,
            db,
            clock,
            codec: codec(),
        }
    }

    pub(crate) fn fixture() -> Fixture {
        fixture_with(None, Some(ADMIN_CODE), false)
    }

    pub(crate) fn post(action: GatewayAction, body: Value) -> GatewayRequest {
        let Value::Object(map) = body else {
            unreachable!("test bodies are objects")
        };
        GatewayRequest::post(action, Params::from_object(map), "10.0.0.1")
    }

    pub(crate) fn get(action: GatewayAction, pairs: &[(&str, &str)]) -> GatewayRequest {
        let pairs = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        GatewayRequest::get(action, pairs, "10.0.0.1")
    }

    pub(crate) fn create_body() -> Value {
        json!({
            "action": "createReservation",
            "date": "2025-06-10",
            "floor": "6F",
            "startTime": "10:00",
            "endTime": "11:00",
            "teamName": "Eng",
            "userName": "Kim",
            "password": "1234",
        })
    }

    impl Fixture {
        pub(crate) async fn run(&self, request: GatewayRequest) -> Reply {
            self.store.dispatch(&request).await.unwrap()
        }

        pub(crate) fn admin_token(&self) -> String {
            self.codec.issue_admin_token(self.clock.now()).unwrap()
        }
    }

    #[tokio::test]
    async fn events_are_recorded_best_effort() {
        let f = fixture();
        f.store.record(EventKind::RoomChange, "6F").await;
        let events = f
            .db
            .list_events_since(f.clock.now() - chrono::Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::RoomChange);
    }

    #[tokio::test]
    async fn verify_admin_exchanges_local_code() {
        let f = fixture();
        let reply = f
            .run(get(GatewayAction::VerifyAdmin, &[("action", "verifyAdmin"), ("code", ADMIN_CODE)]))
            .await;
        assert!(reply.success);
        assert!(reply.token.is_some());
    }
}
