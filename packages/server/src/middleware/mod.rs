//! Request extractors that run before handler logic.

pub mod auth;
