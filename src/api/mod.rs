//! HTTP API for the video generation gateway.

pub mod models;
pub mod routes;
pub mod videos;

pub use routes::{serve, AppState};
