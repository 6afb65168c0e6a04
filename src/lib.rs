//! threatdeck - console client for a threat-intelligence backend
//!
//! The library is a thin typed HTTP client plus one subsystem with real
//! semantics: authentication. Tokens persist in a [`auth::store::TokenStore`],
//! the logged-in user is observable through [`auth::session::SessionContext`],
//! and every resource call goes through the [`api::ApiClient`] transport,
//! which transparently refreshes an expired access token once and retries
//! once. Access control is a pure decision in [`routes`].

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod errors;
pub mod routes;

pub use auth::{AuthClient, SessionContext};
pub use config::Config;
pub use errors::{ApiError, AuthError};
