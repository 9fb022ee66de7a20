use roombook_core::{EventKind, Reply, Room, RoomPatch, normalize_floor};
use roombook_state::StateError;
use tracing::info;

use super::ManagedStore;
use crate::error::GatewayError;
use crate::messages;
use crate::request::GatewayRequest;

impl ManagedStore {
    /// Active rooms, or every room for an admin asking with `includeInactive`.
    pub(super) async fn get_rooms(&self, request: &GatewayRequest) -> Result<Reply, GatewayError> {
        let include_inactive = request.params.flag("includeInactive").unwrap_or(false);
        if include_inactive && !self.require_admin(request).await? {
            return Ok(Self::denied());
        }
        let rooms = self.db.list_rooms(include_inactive).await?;
        Ok(Reply::data(rooms.iter().map(Room::to_wire).collect::<Vec<_>>()))
    }

    pub(super) async fn add_room(&self, request: &GatewayRequest) -> Result<Reply, GatewayError> {
        if !self.require_admin(request).await? {
            return Ok(Self::denied());
        }
        let floor = normalize_floor(&request.text("floor").unwrap_or_default());
        let room = Room {
            id: floor.clone(),
            floor,
            name: request.text("name").unwrap_or_default(),
            is_active: request.params.flag("active").unwrap_or(true),
        };
        match self.db.insert_room(&room).await {
            Ok(()) => {}
            Err(StateError::AlreadyExists(_)) => return Ok(Reply::fail(messages::ROOM_EXISTS)),
            Err(e) => return Err(e.into()),
        }
        info!(id = %room.id, "room added");
        self.record(EventKind::RoomChange, &room.id).await;
        Ok(Reply::data(room.to_wire()))
    }

    pub(super) async fn update_room(&self, request: &GatewayRequest) -> Result<Reply, GatewayError> {
        if !self.require_admin(request).await? {
            return Ok(Self::denied());
        }
        let id = normalize_floor(&request.text("roomId").unwrap_or_default());
        let patch = RoomPatch {
            name: request.text("name"),
            is_active: request.params.flag("active"),
        };
        if patch.is_empty() {
            return Ok(Reply::fail(messages::NOTHING_TO_UPDATE));
        }
        let Some(room) = self.db.update_room(&id, &patch).await? else {
            return Ok(Reply::fail(messages::ROOM_NOT_FOUND));
        };
        info!(%id, "room updated");
        self.record(EventKind::RoomChange, &id).await;
        Ok(Reply::data(room.to_wire()))
    }

    pub(super) async fn delete_room(&self, request: &GatewayRequest) -> Result<Reply, GatewayError> {
        if !self.require_admin(request).await? {
            return Ok(Self::denied());
        }
        let id = normalize_floor(&request.text("roomId").unwrap_or_default());
        if !self.db.delete_room(&id).await? {
            return Ok(Reply::fail(messages::ROOM_NOT_FOUND));
        }
        info!(%id, "room deleted");
        self.record(EventKind::RoomChange, &id).await;
        Ok(Reply::ok())
    }
}

#[cfg(test)]
mod tests {
    use roombook_core::GatewayAction as A;
    use serde_json::json;

    use crate::managed::tests::{fixture, get, post};

    #[tokio::test]
    async fn public_listing_hides_inactive_rooms() {
        let f = fixture();
        let reply = f.run(get(A::GetRooms, &[("action", "getRooms")])).await;
        let rooms = reply.data.unwrap();
        assert_eq!(rooms.as_array().unwrap().len(), 1);
        assert_eq!(rooms[0]["회의실ID"], "6F");
        assert_eq!(rooms[0]["활성화"], true);
    }

    #[tokio::test]
    async fn inactive_listing_requires_admin() {
        let f = fixture();
        let denied = f
            .run(get(A::GetRooms, &[("action", "getRooms"), ("includeInactive", "true")]))
            .await;
        assert!(!denied.success);

        let token = f.admin_token();
        let reply = f
            .run(get(
                A::GetRooms,
                &[("action", "getRooms"), ("includeInactive", "1"), ("adminToken", &token)],
            ))
            .await;
        assert_eq!(reply.data.unwrap().as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn room_lifecycle() {
        let f = fixture();
        let token = f.admin_token();

        let added = f
            .run(post(A::AddRoom, json!({"floor": "8f", "name": "Lab", "adminToken": token})))
            .await;
        assert!(added.success, "{added:?}");
        assert_eq!(added.data.unwrap()["회의실ID"], "8F");

        let dup = f
            .run(post(A::AddRoom, json!({"floor": "8F", "name": "Lab", "adminToken": token})))
            .await;
        assert_eq!(dup.error.as_deref(), Some(crate::messages::ROOM_EXISTS));

        let empty = f
            .run(post(A::UpdateRoom, json!({"roomId": "8F", "adminToken": token})))
            .await;
        assert_eq!(empty.error.as_deref(), Some(crate::messages::NOTHING_TO_UPDATE));

        let off = f
            .run(post(
                A::UpdateRoom,
                json!({"roomId": "8F", "active": false, "adminToken": token}),
            ))
            .await;
        assert_eq!(off.data.unwrap()["활성화"], false);

        let gone = f
            .run(post(A::DeleteRoom, json!({"roomId": "8F", "adminToken": token})))
            .await;
        assert!(gone.success);
        let missing = f
            .run(post(A::DeleteRoom, json!({"roomId": "8F", "adminToken": token})))
            .await;
        assert_eq!(missing.error.as_deref(), Some(crate::messages::ROOM_NOT_FOUND));
    }

    #[tokio::test]
    async fn room_changes_require_admin() {
        let f = fixture();
        let reply = f
            .run(post(A::AddRoom, json!({"floor": "9F", "name": "X", "adminToken": "nope"})))
            .await;
        assert!(!reply.success);
        assert!(reply.error.unwrap().contains("토큰"));
    }
}
