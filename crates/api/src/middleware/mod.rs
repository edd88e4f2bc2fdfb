//! Authentication extractors.
//!
//! - [`auth::AuthUser`] -- Bearer token from the `Authorization` header.
//! - [`auth::WsAuthUser`] -- Bearer token from the header or the `token`
//!   query parameter, for WebSocket upgrades.

pub mod auth;
