//! Observable session state
//!
//! A single holder of "current user or none", published over a watch
//! channel. The auth client is the only writer; the shell and guards are
//! readers. Constructed once at startup and passed down explicitly.

use tokio::sync::watch;

use crate::auth::types::{Role, User};

/// Session context: the in-memory answer to "who is logged in right now".
pub struct SessionContext {
    tx: watch::Sender<Option<User>>,
    rx: watch::Receiver<Option<User>>,
}

impl SessionContext {
    /// Empty (anonymous) session.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        Self { tx, rx }
    }

    /// Session pre-populated from a cached profile, as at app start when a
    /// previous session was persisted.
    pub fn with_user(user: Option<User>) -> Self {
        let (tx, rx) = watch::channel(user);
        Self { tx, rx }
    }

    /// Synchronous read of the current user. Never touches the network.
    pub fn current_user(&self) -> Option<User> {
        self.rx.borrow().clone()
    }

    pub fn current_role(&self) -> Option<Role> {
        self.rx.borrow().as_ref().map(|u| u.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Subscribe to session changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.tx.subscribe()
    }

    /// Publish a new current user. Writer: auth client only.
    pub(crate) fn publish(&self, user: Option<User>) {
        // send() only fails with no receivers; we always hold one.
        let _ = self.tx.send(user);
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::Role;

    fn user(role: Role) -> User {
        User {
            id: 1,
            username: "u".to_string(),
            email: "u@example.com".to_string(),
            role,
            first_name: None,
            last_name: None,
            is_active: Some(true),
            date_joined: None,
            last_login: None,
        }
    }

    #[test]
    fn starts_anonymous() {
        let ctx = SessionContext::new();
        assert!(!ctx.is_authenticated());
        assert!(ctx.current_user().is_none());
        assert!(ctx.current_role().is_none());
    }

    #[test]
    fn restored_session_starts_populated() {
        let ctx = SessionContext::with_user(Some(user(Role::Admin)));
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.current_role(), Some(Role::Admin));

        let ctx = SessionContext::with_user(None);
        assert!(!ctx.is_authenticated());
    }

    #[test]
    fn publish_and_reset() {
        let ctx = SessionContext::new();
        ctx.publish(Some(user(Role::Admin)));
        assert_eq!(ctx.current_role(), Some(Role::Admin));

        ctx.publish(None);
        assert!(!ctx.is_authenticated());
    }

    #[tokio::test]
    async fn subscribers_observe_changes() {
        let ctx = SessionContext::new();
        let mut rx = ctx.subscribe();
        ctx.publish(Some(user(Role::Analyst)));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().map(|u| u.role), Some(Role::Analyst));
    }
}
