//! KVDB Web server library.
//!
//! Server-rendered UI for browsing and editing a remote KVDB key/value
//! store. The binary in `main.rs` loads [`config::AppConfig`], builds an
//! [`state::AppState`] and serves [`routes::app`].

pub mod config;
pub mod error;
pub mod metrics;
pub mod request;
pub mod routes;
pub mod state;
