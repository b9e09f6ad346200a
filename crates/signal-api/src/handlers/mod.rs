//! API endpoint handlers

mod health;
mod rooms;

pub use health::health_check;
pub use rooms::{
    create_room, delete_room, get_room, update_rules, CreateRoomRequest, CreateRoomResponse,
    OwnerRequest, RoomBody, RoomResponse, UpdateRulesRequest,
};
