//! services/api/src/lib.rs
//!
//! The HTTP and WebSocket service for the notice board: the Postgres adapter,
//! configuration, and the axum router.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
