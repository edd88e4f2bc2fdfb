//! WebSocket infrastructure for real-time communication.
//!
//! Provides the connection registry, the room membership index, the manager
//! that guards both, heartbeat pings, and the HTTP upgrade handler.

mod handler;
mod heartbeat;
pub mod manager;
pub mod registry;
pub mod rooms;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::{RoomMove, WsManager};
