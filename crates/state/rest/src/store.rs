use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::{DeserializeOwned, IgnoredAny};

use roombook_core::{
    OperationalEvent, PLACEHOLDER_PASSWORD_HASH, Reservation, ReservationDraft,
    ReservationFilter, Room, RoomPatch,
};
use roombook_state::error::StateError;
use roombook_state::store::Datastore;

use crate::config::RestDatastoreConfig;

const ROOMS: &str = "rooms";
const RESERVATIONS: &str = "reservations";
const EVENTS: &str = "operational_events";

/// Postgres error codes surfaced by PostgREST in the JSON error body.
const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_EXCLUSION_VIOLATION: &str = "23P01";

/// [`Datastore`] over the managed database's REST API via `reqwest`.
///
/// Reservation writes check for overlaps before writing. The database is
/// expected to carry an exclusion constraint over `(floor, date, time range)`
/// so that concurrent writers racing past the check are rejected with
/// HTTP 409, which maps to [`StateError::Conflict`].
pub struct RestDatastore {
    client: reqwest::Client,
    base_url: String,
    service_key: SecretString,
    timeout: Duration,
}

impl std::fmt::Debug for RestDatastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestDatastore")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(serde::Deserialize)]
struct PgError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl RestDatastore {
    pub fn new(config: &RestDatastoreConfig) -> Result<Self, StateError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StateError::Connection(e.to_string()))?;

        let base_url = format!(
            "{}/{}",
            config.url.trim_end_matches('/'),
            config.rest_path.trim_matches('/')
        );

        Ok(Self {
            client,
            base_url,
            service_key: config.service_key.clone(),
            timeout: config.timeout,
        })
    }

    /// Build a request for `table` with the service key attached.
    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/{table}", self.base_url);
        let key = self.service_key.expose_secret();
        self.client
            .request(method, &url)
            .header("apikey", key)
            .bearer_auth(key)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, StateError> {
        req.send().await.map_err(|e| {
            if e.is_timeout() {
                StateError::Timeout(self.timeout)
            } else {
                StateError::Connection(e.to_string())
            }
        })
    }

    /// Map a non-success response to a [`StateError`].
    async fn error_for(resp: Response) -> StateError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let pg: Option<PgError> = serde_json::from_str(&body).ok();
        match (status, pg) {
            (StatusCode::CONFLICT, Some(pg)) if pg.code == PG_UNIQUE_VIOLATION => {
                StateError::AlreadyExists(pg.message)
            }
            (StatusCode::CONFLICT, Some(pg)) if pg.code == PG_EXCLUSION_VIOLATION => {
                StateError::Conflict(pg.message)
            }
            (StatusCode::CONFLICT, _) => StateError::Conflict(body),
            _ => StateError::Backend(format!("HTTP {status}: {body}")),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Vec<T>, StateError> {
        let resp = self.send(req).await?;
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        resp.json::<Vec<T>>()
            .await
            .map_err(|e| StateError::Serialization(e.to_string()))
    }

    async fn execute(&self, req: RequestBuilder) -> Result<(), StateError> {
        let resp = self.send(req).await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_for(resp).await)
        }
    }

    fn returning(req: RequestBuilder) -> RequestBuilder {
        req.header("Prefer", "return=representation")
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl Datastore for RestDatastore {
    async fn ping(&self) -> Result<(), StateError> {
        let req = self
            .request(Method::GET, ROOMS)
            .query(&[("select", "id"), ("limit", "1")]);
        self.fetch::<IgnoredAny>(req).await.map(|_| ())
    }

    async fn list_rooms(&self, include_inactive: bool) -> Result<Vec<Room>, StateError> {
        let mut req = self
            .request(Method::GET, ROOMS)
            .query(&[("select", "*"), ("order", "id.asc")]);
        if !include_inactive {
            req = req.query(&[("is_active", "eq.true")]);
        }
        self.fetch(req).await
    }

    async fn get_room(&self, id: &str) -> Result<Option<Room>, StateError> {
        let req = self
            .request(Method::GET, ROOMS)
            .query(&[("select", "*".to_owned()), ("id", eq(id))]);
        Ok(self.fetch::<Room>(req).await?.into_iter().next())
    }

    async fn insert_room(&self, room: &Room) -> Result<(), StateError> {
        let req = self.request(Method::POST, ROOMS).json(room);
        self.execute(req).await?;
        tracing::debug!(room = %room.id, "room inserted");
        Ok(())
    }

    async fn update_room(&self, id: &str, patch: &RoomPatch) -> Result<Option<Room>, StateError> {
        if patch.is_empty() {
            return self.get_room(id).await;
        }
        let req = Self::returning(
            self.request(Method::PATCH, ROOMS)
                .query(&[("id", eq(id))])
                .json(patch),
        );
        Ok(self.fetch::<Room>(req).await?.into_iter().next())
    }

    async fn delete_room(&self, id: &str) -> Result<bool, StateError> {
        let req = Self::returning(self.request(Method::DELETE, ROOMS).query(&[("id", eq(id))]));
        Ok(!self.fetch::<IgnoredAny>(req).await?.is_empty())
    }

    async fn list_reservations(
        &self,
        filter: &ReservationFilter,
    ) -> Result<Vec<Reservation>, StateError> {
        let mut query: Vec<(&str, String)> = vec![
            ("select", "*".to_owned()),
            ("order", "date.asc,start_time.asc,floor.asc".to_owned()),
        ];
        if let Some(date) = &filter.date {
            query.push(("date", eq(date)));
        }
        if let Some(floor) = &filter.floor {
            query.push(("floor", eq(floor)));
        }
        if let Some(from) = &filter.from_date {
            query.push(("date", format!("gte.{from}")));
        }
        let req = self.request(Method::GET, RESERVATIONS).query(&query);
        self.fetch(req).await
    }

    async fn get_reservation(&self, id: &str) -> Result<Option<Reservation>, StateError> {
        let req = self
            .request(Method::GET, RESERVATIONS)
            .query(&[("select", "*".to_owned()), ("id", eq(id))]);
        Ok(self.fetch::<Reservation>(req).await?.into_iter().next())
    }

    async fn find_overlapping(
        &self,
        floor: &str,
        date: &str,
        start: &str,
        end: &str,
        exclude_id: Option<&str>,
    ) -> Result<Vec<Reservation>, StateError> {
        // existing.start < end AND existing.end > start
        let mut query: Vec<(&str, String)> = vec![
            ("select", "*".to_owned()),
            ("floor", eq(floor)),
            ("date", eq(date)),
            ("start_time", format!("lt.{end}")),
            ("end_time", format!("gt.{start}")),
            ("order", "start_time.asc".to_owned()),
        ];
        if let Some(id) = exclude_id {
            query.push(("id", format!("neq.{id}")));
        }
        let req = self.request(Method::GET, RESERVATIONS).query(&query);
        self.fetch(req).await
    }

    async fn insert_reservation(&self, reservation: &Reservation) -> Result<(), StateError> {
        let clash = self
            .find_overlapping(
                &reservation.floor,
                &reservation.date,
                &reservation.start_time,
                &reservation.end_time,
                None,
            )
            .await?;
        if let Some(existing) = clash.first() {
            return Err(StateError::Conflict(existing.id.clone()));
        }
        let req = self.request(Method::POST, RESERVATIONS).json(reservation);
        self.execute(req).await
    }

    async fn update_reservation(
        &self,
        id: &str,
        draft: &ReservationDraft,
    ) -> Result<Option<Reservation>, StateError> {
        let clash = self
            .find_overlapping(
                &draft.floor,
                &draft.date,
                &draft.start_time,
                &draft.end_time,
                Some(id),
            )
            .await?;
        if let Some(existing) = clash.first() {
            return Err(StateError::Conflict(existing.id.clone()));
        }
        let body = serde_json::json!({
            "date": draft.date,
            "floor": draft.floor,
            "start_time": draft.start_time,
            "end_time": draft.end_time,
            "team_name": draft.team_name,
            "user_name": draft.user_name,
        });
        let req = Self::returning(
            self.request(Method::PATCH, RESERVATIONS)
                .query(&[("id", eq(id))])
                .json(&body),
        );
        Ok(self.fetch::<Reservation>(req).await?.into_iter().next())
    }

    async fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<bool, StateError> {
        let req = Self::returning(
            self.request(Method::PATCH, RESERVATIONS)
                .query(&[("id", eq(id)), ("select", "id".to_owned())])
                .json(&serde_json::json!({ "password_hash": password_hash })),
        );
        Ok(!self.fetch::<IgnoredAny>(req).await?.is_empty())
    }

    async fn delete_reservation(&self, id: &str) -> Result<bool, StateError> {
        let req = Self::returning(
            self.request(Method::DELETE, RESERVATIONS)
                .query(&[("id", eq(id)), ("select", "id".to_owned())]),
        );
        Ok(!self.fetch::<IgnoredAny>(req).await?.is_empty())
    }

    async fn count_placeholder_hashes(&self) -> Result<usize, StateError> {
        let req = self.request(Method::GET, RESERVATIONS).query(&[
            ("select", "id".to_owned()),
            ("password_hash", eq(PLACEHOLDER_PASSWORD_HASH)),
        ]);
        Ok(self.fetch::<IgnoredAny>(req).await?.len())
    }

    async fn record_event(&self, event: &OperationalEvent) -> Result<(), StateError> {
        let req = self.request(Method::POST, EVENTS).json(event);
        self.execute(req).await
    }

    async fn list_events_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<OperationalEvent>, StateError> {
        let req = self.request(Method::GET, EVENTS).query(&[
            ("select", "*".to_owned()),
            (
                "created_at",
                format!("gte.{}", since.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ),
            ("order", "created_at.asc".to_owned()),
        ]);
        self.fetch(req).await
    }
}
