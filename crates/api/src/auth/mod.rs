//! Authentication primitives.
//!
//! - [`jwt`] -- bearer token verification.

pub mod jwt;
