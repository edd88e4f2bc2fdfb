//! Planning poker domain logic.
//!
//! This crate has no internal dependencies and performs no I/O. It holds the
//! rules shared by the store, the real-time coordinator, and the REST layer:
//! id/time aliases, role names, room codes, session and round lifecycles,
//! score tokens, and chat message validation.

pub mod chat;
pub mod error;
pub mod planning;
pub mod roles;
pub mod room_code;
pub mod types;
pub mod voting;
