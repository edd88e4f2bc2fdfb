//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A create DTO for inserts where the core writes that table
//! - Joined read models (`*Info`) for lists shown to clients

pub mod chat_message;
pub mod participant;
pub mod planning_session;
pub mod project;
pub mod topic;
pub mod user;
pub mod vote;
pub mod voting_round;
