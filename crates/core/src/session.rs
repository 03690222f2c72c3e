//! Session — the authenticated identity of one client instance.
//!
//! A [`Session`] is plain data. Ownership and state transitions belong to the
//! client's session manager; everything else only reads snapshots.

use serde::{Deserialize, Serialize};

/// The authenticated user's profile, as returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl User {
    /// Name to show in greetings: full name when set, else the username.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

/// Lifecycle state of the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}

/// The authenticated-identity state.
#[derive(Clone, Default, PartialEq)]
pub struct Session {
    /// Opaque bearer token, when one is held.
    pub token: Option<String>,

    /// Profile of the signed-in user; populated only when authenticated.
    pub user: Option<User>,

    pub status: SessionStatus,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("user", &self.user)
            .field("status", &self.status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            full_name: Some("Alice Liddell".into()),
        }
    }

    #[test]
    fn default_session_is_unauthenticated() {
        let session = Session::default();
        assert_eq!(session.status, SessionStatus::Unauthenticated);
        assert!(session.token.is_none());
        assert!(session.user.is_none());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn debug_output_redacts_token() {
        let session = Session {
            token: Some("secret-jwt".into()),
            user: Some(alice()),
            status: SessionStatus::Authenticated,
        };
        let debug = format!("{session:?}");
        assert!(!debug.contains("secret-jwt"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let mut user = alice();
        assert_eq!(user.display_name(), "Alice Liddell");
        user.full_name = Some("  ".into());
        assert_eq!(user.display_name(), "alice");
        user.full_name = None;
        assert_eq!(user.display_name(), "alice");
    }

    #[test]
    fn user_deserializes_without_full_name() {
        let user: User = serde_json::from_str(
            r#"{"id": 7, "username": "bob", "email": "bob@example.com", "full_name": null}"#,
        )
        .unwrap();
        assert_eq!(user.id, 7);
        assert!(user.full_name.is_none());
    }
}
