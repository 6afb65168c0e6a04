//! Authentication and session management
//!
//! Token store, observable session state and the identity-API client.
//! The state machine is small: `Anonymous` → authenticated on login,
//! authenticated → `Anonymous` on logout, refresh failure or terminal 401.
//! Navigation never mutates it.

pub mod client;
pub mod session;
pub mod store;
pub mod types;

pub use client::AuthClient;
pub use session::SessionContext;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use types::{Role, User};
