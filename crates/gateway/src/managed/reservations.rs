use roombook_core::{
    EventKind, GatewayAction, Reply, Reservation, ReservationDraft, ReservationFilter, Verb,
    normalize_floor, reservation_id, validate_date, validate_draft, validate_password_format,
};
use roombook_state::StateError;
use tracing::{info, warn};

use super::ManagedStore;
use crate::error::GatewayError;
use crate::messages;
use crate::request::GatewayRequest;

fn draft_from(request: &GatewayRequest) -> ReservationDraft {
    let field = |key: &str| request.text(key).unwrap_or_default();
    ReservationDraft {
        date: field("date"),
        floor: normalize_floor(&field("floor")),
        start_time: field("startTime"),
        end_time: field("endTime"),
        team_name: field("teamName"),
        user_name: field("userName"),
    }
}

impl ManagedStore {
    pub(super) async fn get_reservations(
        &self,
        request: &GatewayRequest,
    ) -> Result<Reply, GatewayError> {
        let date = request.text("date");
        if let Some(d) = &date
            && let Err(e) = validate_date(d)
        {
            return Ok(Reply::fail(e.to_string()));
        }
        let filter = ReservationFilter {
            date,
            floor: request.text("floor").map(|f| normalize_floor(&f)),
            from_date: None,
        };
        let rows = self.db.list_reservations(&filter).await?;
        Ok(Reply::data(
            rows.iter().map(Reservation::to_wire).collect::<Vec<_>>(),
        ))
    }

    pub(super) async fn get_reservation_by_id(
        &self,
        request: &GatewayRequest,
    ) -> Result<Reply, GatewayError> {
        let id = request.text("id").unwrap_or_default();
        Ok(match self.db.get_reservation(&id).await? {
            Some(r) => Reply::data(r.to_wire()),
            None => Reply::fail(messages::RESERVATION_NOT_FOUND),
        })
    }

    async fn room_is_active(&self, floor: &str) -> Result<bool, GatewayError> {
        Ok(self
            .db
            .get_room(floor)
            .await?
            .is_some_and(|room| room.is_active))
    }

    /// Validation, room and overlap checks shared by create and update.
    async fn check_slot(
        &self,
        draft: &ReservationDraft,
        exclude_id: Option<&str>,
    ) -> Result<Option<Reply>, GatewayError> {
        if let Err(e) = validate_draft(draft) {
            return Ok(Some(Reply::fail(e.to_string())));
        }
        if !self.room_is_active(&draft.floor).await? {
            return Ok(Some(Reply::fail(messages::ROOM_UNAVAILABLE)));
        }
        let clashes = self
            .db
            .find_overlapping(
                &draft.floor,
                &draft.date,
                &draft.start_time,
                &draft.end_time,
                exclude_id,
            )
            .await?;
        if !clashes.is_empty() {
            return Ok(Some(Reply::fail(messages::OVERLAP)));
        }
        Ok(None)
    }

    pub(super) async fn create_reservation(
        &self,
        request: &GatewayRequest,
    ) -> Result<Reply, GatewayError> {
        let draft = draft_from(request);
        let password = request.text("password").unwrap_or_default();
        if let Err(e) = validate_password_format(&password) {
            return Ok(Reply::fail(e.to_string()));
        }
        if let Some(rejection) = self.check_slot(&draft, None).await? {
            return Ok(rejection);
        }

        let now = self.clock.now();
        let reservation = Reservation {
            id: reservation_id(&draft, now),
            date: draft.date,
            floor: draft.floor,
            start_time: draft.start_time,
            end_time: draft.end_time,
            team_name: draft.team_name,
            user_name: draft.user_name,
            password_hash: self.hasher.hash(&password),
            created_at: now,
        };
        match self.db.insert_reservation(&reservation).await {
            Ok(()) => {}
            Err(StateError::Conflict(_)) => return Ok(Reply::fail(messages::OVERLAP)),
            Err(StateError::AlreadyExists(id)) => {
                warn!(%id, "reservation id collision");
                return Ok(Reply::fail(messages::SAVE_FAILED));
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            id = %reservation.id,
            floor = %reservation.floor,
            date = %reservation.date,
            "reservation created"
        );
        self.record(EventKind::ReservationCreate, &reservation.id)
            .await;
        Ok(Reply::data(reservation.to_wire()))
    }

    /// An `adminToken` takes precedence over a reservation `token`.
    async fn authorize_edit(&self, request: &GatewayRequest, id: &str) -> Result<bool, GatewayError> {
        if request.params.has("adminToken") {
            return self.require_admin(request).await;
        }
        let Some(token) = request.text("token") else {
            return Ok(false);
        };
        Ok(self
            .codec
            .verify_reservation_token(&token, id, self.clock.now())
            .is_ok())
    }

    pub(super) async fn update_reservation(
        &self,
        request: &GatewayRequest,
    ) -> Result<Reply, GatewayError> {
        let id = request.text("id").unwrap_or_default();
        if !self.authorize_edit(request, &id).await? {
            return Ok(Self::denied());
        }
        if self.db.get_reservation(&id).await?.is_none() {
            return Ok(Reply::fail(messages::RESERVATION_NOT_FOUND));
        }

        let draft = draft_from(request);
        if let Some(rejection) = self.check_slot(&draft, Some(&id)).await? {
            return Ok(rejection);
        }
        let updated = match self.db.update_reservation(&id, &draft).await {
            Ok(Some(r)) => r,
            Ok(None) => return Ok(Reply::fail(messages::RESERVATION_NOT_FOUND)),
            Err(StateError::Conflict(_)) => return Ok(Reply::fail(messages::OVERLAP)),
            Err(e) => return Err(e.into()),
        };

        info!(%id, "reservation updated");
        self.record(EventKind::ReservationUpdate, &id).await;
        Ok(Reply::data(updated.to_wire()))
    }

    pub(super) async fn delete_reservation(
        &self,
        request: &GatewayRequest,
    ) -> Result<Reply, GatewayError> {
        let id = request.text("id").unwrap_or_default();
        if !self.authorize_edit(request, &id).await? {
            return Ok(Self::denied());
        }
        if !self.db.delete_reservation(&id).await? {
            return Ok(Reply::fail(messages::RESERVATION_NOT_FOUND));
        }
        info!(%id, "reservation deleted");
        self.record(EventKind::ReservationDelete, &id).await;
        Ok(Reply::ok())
    }

    /// Check a reservation password and issue an edit token.
    ///
    /// Reservations still carrying the placeholder hash are checked against
    /// the legacy backend once; on success the peppered hash is stored so
    /// later checks stay local. Strict mode refuses the fallback.
    pub(super) async fn verify_password(
        &self,
        request: &GatewayRequest,
    ) -> Result<Reply, GatewayError> {
        let id = request.text("id").unwrap_or_default();
        let password = request.text("password").unwrap_or_default();
        let Some(reservation) = self.db.get_reservation(&id).await? else {
            return Ok(Reply::fail(messages::RESERVATION_NOT_FOUND));
        };

        if reservation.needs_password_migration() {
            if self.settings.strict_password_hash {
                warn!(%id, "unmigrated password hash refused in strict mode");
                return Ok(Reply::fail(messages::PASSWORD_RESET_REQUIRED));
            }
            let probe = vec![
                (
                    "action".to_owned(),
                    GatewayAction::VerifyPassword.as_str().to_owned(),
                ),
                ("id".to_owned(), id.clone()),
                ("password".to_owned(), password.clone()),
            ];
            let reply = self.legacy.call(Verb::Post, probe).await?;
            if !reply.success {
                self.record(EventKind::PasswordFail, &id).await;
                return Ok(Reply::fail(messages::PASSWORD_MISMATCH));
            }
            self.db
                .set_password_hash(&id, &self.hasher.hash(&password))
                .await?;
            info!(%id, "password hash migrated from legacy backend");
        } else if !self.hasher.verify(&password, &reservation.password_hash) {
            self.record(EventKind::PasswordFail, &id).await;
            return Ok(Reply::fail(messages::PASSWORD_MISMATCH));
        }

        Ok(Reply::token(self.issue_reservation_token(&id)?))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use roombook_core::{PLACEHOLDER_PASSWORD_HASH, Reservation};
    use roombook_state::Datastore;
    use serde_json::{Value, json};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use crate::clock::Clock;

    use crate::managed::tests::{create_body, fixture, fixture_with, get, post};
    use roombook_core::GatewayAction as A;

    fn created_id(reply: &roombook_core::Reply) -> String {
        reply.data.as_ref().unwrap()["예약ID"]
            .as_str()
            .unwrap()
            .to_owned()
    }

    #[tokio::test]
    async fn create_returns_wire_view() {
        let f = fixture();
        let reply = f.run(post(A::CreateReservation, create_body())).await;
        assert!(reply.success, "{reply:?}");
        let data = reply.data.unwrap();
        assert_eq!(data["층"], "6F");
        assert_eq!(data["시작시간"], "10:00");
        assert_eq!(data["예약ID"].as_str().unwrap().len(), 12);
        assert!(data.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn overlapping_create_is_refused_and_touching_is_fine() {
        let f = fixture();
        assert!(f.run(post(A::CreateReservation, create_body())).await.success);

        let mut clash = create_body();
        clash["startTime"] = json!("10:30");
        clash["endTime"] = json!("11:30");
        let reply = f.run(post(A::CreateReservation, clash)).await;
        assert!(!reply.success);
        assert_eq!(reply.error.as_deref(), Some(crate::messages::OVERLAP));

        let mut touching = create_body();
        touching["startTime"] = json!("11:00");
        touching["endTime"] = json!("12:00");
        assert!(f.run(post(A::CreateReservation, touching)).await.success);
    }

    #[tokio::test]
    async fn create_validates_before_touching_storage() {
        let f = fixture();
        let mut off_grid = create_body();
        off_grid["startTime"] = json!("10:15");
        let reply = f.run(post(A::CreateReservation, off_grid)).await;
        assert_eq!(reply.error.as_deref(), Some("시간은 30분 단위로 입력해야 합니다."));

        let mut weak = create_body();
        weak["password"] = json!("12a4");
        assert!(!f.run(post(A::CreateReservation, weak)).await.success);

        let mut inactive = create_body();
        inactive["floor"] = json!("7f");
        let reply = f.run(post(A::CreateReservation, inactive)).await;
        assert_eq!(reply.error.as_deref(), Some(crate::messages::ROOM_UNAVAILABLE));

        assert!(
            f.db.list_reservations(&Default::default())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn password_token_authorizes_update_of_that_reservation_only() {
        let f = fixture();
        let id = created_id(&f.run(post(A::CreateReservation, create_body())).await);

        let verified = f
            .run(post(A::VerifyPassword, json!({"id": id, "password": "1234"})))
            .await;
        let token = verified.token.unwrap();

        let mut edit = create_body();
        edit["id"] = json!(id);
        edit["token"] = json!(token);
        edit["startTime"] = json!("10:30");
        edit["endTime"] = json!("11:30");
        let reply = f.run(post(A::UpdateReservation, edit)).await;
        assert!(reply.success, "{reply:?}");
        assert_eq!(reply.data.unwrap()["시작시간"], "10:30");

        // Token is bound to the reservation id.
        let mut other = create_body();
        other["startTime"] = json!("14:00");
        other["endTime"] = json!("15:00");
        let other_id = created_id(&f.run(post(A::CreateReservation, other)).await);
        let reply = f
            .run(post(A::DeleteReservation, json!({"id": other_id, "token": token})))
            .await;
        assert!(!reply.success);
        assert!(reply.error.unwrap().contains("토큰"));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let f = fixture();
        let id = created_id(&f.run(post(A::CreateReservation, create_body())).await);
        let token = f
            .run(post(A::VerifyPassword, json!({"id": id, "password": "1234"})))
            .await
            .token
            .unwrap();
        f.clock.advance(Duration::seconds(600));
        let reply = f
            .run(post(A::DeleteReservation, json!({"id": id, "token": token})))
            .await;
        assert!(!reply.success);
        assert!(f.db.get_reservation(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_excludes_itself_from_overlap() {
        let f = fixture();
        let id = created_id(&f.run(post(A::CreateReservation, create_body())).await);
        let mut edit = create_body();
        edit["id"] = json!(id);
        edit["adminToken"] = json!(f.admin_token());
        edit["teamName"] = json!("Ops");
        let reply = f.run(post(A::UpdateReservation, edit)).await;
        assert!(reply.success, "{reply:?}");
        assert_eq!(reply.data.unwrap()["팀명"], "Ops");
    }

    #[tokio::test]
    async fn admin_delete_and_failed_admin_is_recorded() {
        let f = fixture();
        let id = created_id(&f.run(post(A::CreateReservation, create_body())).await);

        let reply = f
            .run(post(A::DeleteReservation, json!({"id": id, "adminToken": "forged"})))
            .await;
        assert!(!reply.success);
        let events = f
            .db
            .list_events_since(f.clock.now() - Duration::minutes(1))
            .await
            .unwrap();
        assert!(events.iter().any(|e| e.kind == roombook_core::EventKind::AdminFail));

        let reply = f
            .run(post(
                A::DeleteReservation,
                json!({"id": id, "adminToken": f.admin_token()}),
            ))
            .await;
        assert!(reply.success);
        assert!(f.db.get_reservation(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wrong_password_yields_no_token() {
        let f = fixture();
        let id = created_id(&f.run(post(A::CreateReservation, create_body())).await);
        let reply = f
            .run(post(A::VerifyPassword, json!({"id": id, "password": "9999"})))
            .await;
        assert!(!reply.success);
        assert!(reply.token.is_none());
        assert!(reply.error.unwrap().contains("비밀번호"));
    }

    fn placeholder_row() -> Reservation {
        Reservation {
            id: "legacy000001".into(),
            date: "2025-06-10".into(),
            floor: "6F".into(),
            start_time: "09:00".into(),
            end_time: "09:30".into(),
            team_name: "Eng".into(),
            user_name: "Lee".into(),
            password_hash: PLACEHOLDER_PASSWORD_HASH.into(),
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn strict_mode_refuses_placeholder_hash() {
        let f = fixture_with(None, None, true);
        f.db.insert_reservation(&placeholder_row()).await.unwrap();
        let reply = f
            .run(post(
                A::VerifyPassword,
                json!({"id": "legacy000001", "password": "1234"}),
            ))
            .await;
        assert_eq!(
            reply.error.as_deref(),
            Some(crate::messages::PASSWORD_RESET_REQUIRED)
        );
    }

    #[tokio::test]
    async fn placeholder_hash_migrates_through_legacy() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = stream.read(&mut buf).await.unwrap();
            let body = r#"{"success":true,"token":"legacy"}"#;
            let resp = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(resp.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });

        let f = fixture_with(Some(format!("http://127.0.0.1:{port}/exec")), None, false);
        f.db.insert_reservation(&placeholder_row()).await.unwrap();
        let reply = f
            .run(post(
                A::VerifyPassword,
                json!({"id": "legacy000001", "password": "1234"}),
            ))
            .await;
        assert!(reply.success, "{reply:?}");
        assert_ne!(reply.token.as_deref(), Some("legacy"));

        let seen = server.await.unwrap();
        assert!(seen.contains(r#""action":"verifyPassword""#));
        let stored = f.db.get_reservation("legacy000001").await.unwrap().unwrap();
        assert!(!stored.needs_password_migration());

        // Second check is local: no mock server is listening any more.
        let again = f
            .run(post(
                A::VerifyPassword,
                json!({"id": "legacy000001", "password": "1234"}),
            ))
            .await;
        assert!(again.success);
    }

    #[tokio::test]
    async fn listing_filters_by_date_and_floor() {
        let f = fixture();
        f.run(post(A::CreateReservation, create_body())).await;
        let mut next_day = create_body();
        next_day["date"] = json!("2025-06-11");
        f.run(post(A::CreateReservation, next_day)).await;

        let all = f.run(get(A::GetReservations, &[("action", "getReservations")])).await;
        assert_eq!(all.data.unwrap().as_array().unwrap().len(), 2);

        let one = f
            .run(get(
                A::GetReservations,
                &[("action", "getReservations"), ("date", "2025-06-11"), ("floor", "6f")],
            ))
            .await;
        let rows = one.data.unwrap();
        assert_eq!(rows.as_array().unwrap().len(), 1);
        assert_eq!(rows[0]["날짜"], Value::from("2025-06-11"));

        let bad = f
            .run(get(A::GetReservations, &[("action", "getReservations"), ("date", "06/11")]))
            .await;
        assert!(!bad.success);
    }
}
