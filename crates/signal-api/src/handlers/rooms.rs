//! Room handlers
//!
//! Endpoints for room administration. The caller is assumed to be
//! authenticated upstream; `ownerId` in the body names the acting peer.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use signal_core::{PeerId, Room, RoomId, RoomRules};
use signal_service::RoomService;

use crate::response::{ApiResult, Created};
use crate::state::AppState;

/// Request body for room creation
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[validate(length(min = 1))]
    pub owner_id: String,
    #[validate(range(min = 1))]
    pub max_players: u32,
    pub allow_relay: bool,
    pub latency_target_ms: u32,
    pub opus_bitrate: u32,
}

impl CreateRoomRequest {
    fn rules(&self) -> RoomRules {
        RoomRules {
            max_players: self.max_players,
            allow_relay: self.allow_relay,
            latency_target_ms: self.latency_target_ms,
            opus_bitrate: self.opus_bitrate,
        }
    }
}

/// Request body for rule updates
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRulesRequest {
    #[validate(length(min = 1))]
    pub owner_id: String,
    #[validate(range(min = 1))]
    pub max_players: u32,
    pub allow_relay: bool,
    pub latency_target_ms: u32,
    pub opus_bitrate: u32,
}

/// Request body naming the acting owner
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRequest {
    #[validate(length(min = 1))]
    pub owner_id: String,
}

/// Response body for room creation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub room_id: RoomId,
}

/// Room snapshot for API responses
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomBody {
    pub room_id: RoomId,
    pub owner_id: PeerId,
    pub players: Vec<PeerId>,
    pub rules: RoomRules,
    pub active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Room> for RoomBody {
    fn from(room: &Room) -> Self {
        Self {
            room_id: room.id.clone(),
            owner_id: room.owner_id.clone(),
            players: room.members.clone(),
            rules: room.rules.clone(),
            active: room.active,
            created_at: room.created_at,
            updated_at: room.updated_at,
        }
    }
}

/// Response wrapper for single-room endpoints
#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub room: RoomBody,
}

/// Create a new room
///
/// POST /rooms
pub async fn create_room(
    State(state): State<AppState>,
    Json(request): Json<CreateRoomRequest>,
) -> ApiResult<Created<Json<CreateRoomResponse>>> {
    request.validate()?;

    let service = RoomService::new(state.service_context());
    let room = service
        .create_room(PeerId::new(request.owner_id.clone()), request.rules())
        .await?;

    Ok(Created(Json(CreateRoomResponse { room_id: room.id })))
}

/// Get a room by id
///
/// GET /rooms/{room_id}
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> ApiResult<Json<RoomResponse>> {
    let service = RoomService::new(state.service_context());
    let room = service.get_room(&RoomId::new(room_id)).await?;

    Ok(Json(RoomResponse {
        room: RoomBody::from(&room),
    }))
}

/// Replace a room's rules
///
/// PATCH /rooms/{room_id}/rules
pub async fn update_rules(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<UpdateRulesRequest>,
) -> ApiResult<Json<RoomResponse>> {
    request.validate()?;

    let rules = RoomRules {
        max_players: request.max_players,
        allow_relay: request.allow_relay,
        latency_target_ms: request.latency_target_ms,
        opus_bitrate: request.opus_bitrate,
    };

    let service = RoomService::new(state.service_context());
    let room = service
        .update_rules(
            &RoomId::new(room_id),
            &PeerId::new(request.owner_id),
            rules,
        )
        .await?;

    Ok(Json(RoomResponse {
        room: RoomBody::from(&room),
    }))
}

/// Close a room
///
/// DELETE /rooms/{room_id}
pub async fn delete_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<OwnerRequest>,
) -> ApiResult<Json<RoomResponse>> {
    request.validate()?;

    let service = RoomService::new(state.service_context());
    let room = service
        .close_room(&RoomId::new(room_id), &PeerId::new(request.owner_id))
        .await?;

    Ok(Json(RoomResponse {
        room: RoomBody::from(&room),
    }))
}
