//! Session manager — owns the authenticated-identity lifecycle.
//!
//! ```text
//! Unauthenticated ──login/hydrate──▶ Authenticating ──profile ok──▶ Authenticated
//!        ▲                                 │                             │
//!        └──────────── any failure ────────┘◀──── logout / 401 policy ───┘
//! ```
//!
//! The [`Session`] itself lives in a [`SessionHandle`] shared with the request
//! gateway, which only reads the token. Writes happen here and nowhere else.

use mlstudio_config::UnauthorizedPolicy;
use mlstudio_core::error::{ClientError, Result};
use mlstudio_core::resource::{NewUser, TokenResponse};
use mlstudio_core::session::{Session, SessionStatus, User};
use mlstudio_core::token::TokenStore;
use mlstudio_core::transport::{Method, RequestBody};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::gateway::RequestGateway;

/// Shared, read-mostly view of the session.
///
/// Cloning yields another handle to the same session.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Session>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Session {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .token
            .clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    /// Mutate the session atomically. Crate-private: only the session
    /// manager transitions state.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut session)
    }
}

/// Result of a login attempt that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Authenticated(User),
    /// Another login or hydration was already running; this one was dropped.
    AlreadyInProgress,
}

pub struct SessionManager {
    gateway: Arc<RequestGateway>,
    session: SessionHandle,
    tokens: Arc<dyn TokenStore>,
    on_unauthorized: UnauthorizedPolicy,
}

impl SessionManager {
    pub fn new(
        gateway: Arc<RequestGateway>,
        session: SessionHandle,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            gateway,
            session,
            tokens,
            on_unauthorized: UnauthorizedPolicy::default(),
        }
    }

    pub fn with_unauthorized_policy(mut self, policy: UnauthorizedPolicy) -> Self {
        self.on_unauthorized = policy;
        self
    }

    pub fn session(&self) -> Session {
        self.session.snapshot()
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    /// Restore the session from the persisted token.
    ///
    /// With no persisted token this settles on `Unauthenticated` without a
    /// network call. Any failure fetching the profile clears the token.
    pub async fn hydrate(&self) -> SessionStatus {
        let token = match self.tokens.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(store = self.tokens.name(), error = %e, "Could not read persisted token");
                self.reset();
                return SessionStatus::Unauthenticated;
            }
        };

        let Some(token) = token else {
            debug!("No persisted token, starting unauthenticated");
            self.session.update(|s| *s = Session::default());
            return SessionStatus::Unauthenticated;
        };

        self.session.update(|s| {
            s.token = Some(token);
            s.user = None;
            s.status = SessionStatus::Authenticating;
        });

        match self.fetch_profile().await {
            Ok(user) => {
                info!(username = %user.username, "Session restored");
                self.authenticated(user);
                SessionStatus::Authenticated
            }
            Err(e) => {
                warn!(error = %e, "Persisted token rejected, clearing session");
                self.reset();
                SessionStatus::Unauthenticated
            }
        }
    }

    /// Exchange credentials for a token, persist it, and load the profile.
    ///
    /// Rejected as a no-op while another attempt is authenticating.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let acquired = self.session.update(|s| {
            if s.status == SessionStatus::Authenticating {
                false
            } else {
                s.status = SessionStatus::Authenticating;
                true
            }
        });
        if !acquired {
            debug!(%username, "Login ignored, authentication already in progress");
            return Ok(LoginOutcome::AlreadyInProgress);
        }

        match self.authenticate(username, password).await {
            Ok(user) => {
                info!(username = %user.username, "Logged in");
                Ok(LoginOutcome::Authenticated(user))
            }
            Err(e) => {
                warn!(%username, error = %e, "Login failed");
                self.reset();
                Err(e)
            }
        }
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let form = vec![
            ("username".to_string(), username.to_string()),
            ("password".to_string(), password.to_string()),
        ];
        let token: TokenResponse = self
            .gateway
            .send(Method::Post, "/auth/login", RequestBody::Form(form))
            .await?
            .json()?;

        if let Err(e) = self.tokens.save(&token.access_token) {
            warn!(store = self.tokens.name(), error = %e, "Could not persist token");
        }
        self.session.update(|s| s.token = Some(token.access_token));

        let user = self.fetch_profile().await?;
        self.authenticated(user.clone());
        Ok(user)
    }

    /// Create an account. Does not sign in.
    pub async fn register(&self, profile: &NewUser) -> Result<User> {
        let body = RequestBody::json(profile)
            .map_err(|e| ClientError::Decode(format!("could not encode registration: {e}")))?;
        let user: User = self
            .gateway
            .send(Method::Post, "/auth/register", body)
            .await?
            .json()?;
        info!(username = %user.username, "Registered account");
        Ok(user)
    }

    /// Drop the token and reset to `Unauthenticated`. Idempotent.
    pub fn logout(&self) {
        let was = self.status();
        self.reset();
        if was != SessionStatus::Unauthenticated {
            info!("Logged out");
        }
    }

    /// Apply the configured reaction to an error returned by any request.
    ///
    /// Returns `true` if the session was reset.
    pub fn handle_error(&self, error: &ClientError) -> bool {
        if !error.is_auth()
            || self.on_unauthorized != UnauthorizedPolicy::Logout
            || self.status() == SessionStatus::Unauthenticated
        {
            return false;
        }
        warn!("Server rejected credentials, resetting session");
        self.reset();
        true
    }

    async fn fetch_profile(&self) -> Result<User> {
        self.gateway.get("/auth/me").await
    }

    fn authenticated(&self, user: User) {
        self.session.update(|s| {
            s.user = Some(user);
            s.status = SessionStatus::Authenticated;
        });
    }

    fn reset(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!(store = self.tokens.name(), error = %e, "Could not clear persisted token");
        }
        self.session.update(|s| *s = Session::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedTransport, gateway, user_json};
    use mlstudio_core::transport::TransportError;
    use mlstudio_store::InMemoryTokenStore;
    use serde_json::json;

    fn manager(
        transport: &Arc<ScriptedTransport>,
        tokens: Arc<InMemoryTokenStore>,
    ) -> SessionManager {
        let session = SessionHandle::new();
        SessionManager::new(gateway(transport, &session), session, tokens)
    }

    #[tokio::test]
    async fn hydrate_with_valid_token() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Get, "/auth/me", 200, user_json());
        let tokens = Arc::new(InMemoryTokenStore::with_token("jwt-valid"));
        let manager = manager(&transport, tokens.clone());

        assert_eq!(manager.hydrate().await, SessionStatus::Authenticated);

        let session = manager.session();
        assert_eq!(session.token.as_deref(), Some("jwt-valid"));
        assert_eq!(session.user.unwrap().username, "alice");
        assert_eq!(transport.calls(), 1);
        assert_eq!(
            transport.last_request().unwrap().header("authorization"),
            Some("Bearer jwt-valid")
        );
    }

    #[tokio::test]
    async fn hydrate_with_rejected_token_clears_it() {
        let transport = ScriptedTransport::new();
        transport.respond(
            Method::Get,
            "/auth/me",
            401,
            json!({"detail": "Could not validate credentials"}),
        );
        let tokens = Arc::new(InMemoryTokenStore::with_token("jwt-expired"));
        let manager = manager(&transport, tokens.clone());

        assert_eq!(manager.hydrate().await, SessionStatus::Unauthenticated);
        assert_eq!(manager.session(), Session::default());
        assert_eq!(tokens.load().unwrap(), None);
    }

    #[tokio::test]
    async fn hydrate_network_failure_also_clears() {
        let transport = ScriptedTransport::new();
        transport.fail(Method::Get, "/auth/me", TransportError::Connect("refused".into()));
        let tokens = Arc::new(InMemoryTokenStore::with_token("jwt"));
        let manager = manager(&transport, tokens.clone());

        assert_eq!(manager.hydrate().await, SessionStatus::Unauthenticated);
        assert_eq!(tokens.load().unwrap(), None);
    }

    #[tokio::test]
    async fn hydrate_without_token_makes_no_call() {
        let transport = ScriptedTransport::new();
        let manager = manager(&transport, Arc::new(InMemoryTokenStore::new()));

        assert_eq!(manager.hydrate().await, SessionStatus::Unauthenticated);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn login_persists_token_and_loads_profile() {
        let transport = ScriptedTransport::new();
        transport.respond(
            Method::Post,
            "/auth/login",
            200,
            json!({"access_token": "jwt-new", "token_type": "bearer"}),
        );
        transport.respond(Method::Get, "/auth/me", 200, user_json());
        let tokens = Arc::new(InMemoryTokenStore::new());
        let manager = manager(&transport, tokens.clone());

        let outcome = manager.login("alice", "wonderland").await.unwrap();
        let LoginOutcome::Authenticated(user) = outcome else {
            panic!("expected authenticated outcome");
        };
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(manager.status(), SessionStatus::Authenticated);
        assert_eq!(tokens.load().unwrap().as_deref(), Some("jwt-new"));
        assert_eq!(transport.calls_to(Method::Post, "/auth/login"), 1);
        assert_eq!(
            transport.last_request().unwrap().header("Authorization"),
            Some("Bearer jwt-new")
        );
    }

    #[tokio::test]
    async fn login_sends_form_fields() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Post, "/auth/login", 200, json!({"access_token": "t"}));
        transport.respond(Method::Get, "/auth/me", 200, user_json());
        let manager = manager(&transport, Arc::new(InMemoryTokenStore::new()));

        manager.login("alice", "wonderland").await.unwrap();

        assert_eq!(transport.calls(), 2);
        let login = transport.requests_to(Method::Post, "/auth/login").remove(0);
        assert_eq!(
            login.body,
            RequestBody::Form(vec![
                ("username".into(), "alice".into()),
                ("password".into(), "wonderland".into()),
            ])
        );
        assert_eq!(login.header("authorization"), None);
    }

    #[tokio::test]
    async fn bad_credentials_propagate_and_reset() {
        let transport = ScriptedTransport::new();
        transport.respond(
            Method::Post,
            "/auth/login",
            401,
            json!({"detail": "Incorrect username or password"}),
        );
        let tokens = Arc::new(InMemoryTokenStore::new());
        let manager = manager(&transport, tokens.clone());

        let err = manager.login("alice", "wrong").await.unwrap_err();
        assert!(err.is_auth());
        assert_eq!(err.user_message(), "Incorrect username or password");
        assert_eq!(manager.status(), SessionStatus::Unauthenticated);
        assert_eq!(tokens.load().unwrap(), None);
    }

    #[tokio::test]
    async fn profile_failure_after_login_clears_saved_token() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Post, "/auth/login", 200, json!({"access_token": "jwt"}));
        transport.respond(Method::Get, "/auth/me", 500, json!({"detail": "boom"}));
        let tokens = Arc::new(InMemoryTokenStore::new());
        let manager = manager(&transport, tokens.clone());

        let err = manager.login("alice", "pw").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(manager.session(), Session::default());
        assert_eq!(tokens.load().unwrap(), None);
    }

    #[tokio::test]
    async fn concurrent_login_is_rejected() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Post, "/auth/login", 200, json!({"access_token": "jwt"}));
        transport.respond(Method::Get, "/auth/me", 200, user_json());
        let manager = manager(&transport, Arc::new(InMemoryTokenStore::new()));

        let (first, second) = tokio::join!(
            manager.login("alice", "pw"),
            manager.login("alice", "pw")
        );

        assert!(matches!(first.unwrap(), LoginOutcome::Authenticated(_)));
        assert_eq!(second.unwrap(), LoginOutcome::AlreadyInProgress);
        assert_eq!(transport.calls_to(Method::Post, "/auth/login"), 1);
    }

    #[tokio::test]
    async fn register_does_not_touch_session() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Post, "/auth/register", 201, user_json());
        let manager = manager(&transport, Arc::new(InMemoryTokenStore::new()));

        let user = manager
            .register(&NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password: "wonderland".into(),
                full_name: Some("Alice Liddell".into()),
            })
            .await
            .unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(manager.status(), SessionStatus::Unauthenticated);
        let request = transport.last_request().unwrap();
        assert!(matches!(request.body, RequestBody::Json(ref v) if v["username"] == "alice"));
    }

    #[tokio::test]
    async fn logout_twice_is_harmless() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Get, "/auth/me", 200, user_json());
        let tokens = Arc::new(InMemoryTokenStore::with_token("jwt"));
        let manager = manager(&transport, tokens.clone());
        manager.hydrate().await;
        let calls_before = transport.calls();

        manager.logout();
        manager.logout();

        assert_eq!(manager.status(), SessionStatus::Unauthenticated);
        assert_eq!(manager.session().token, None);
        assert_eq!(tokens.load().unwrap(), None);
        assert_eq!(transport.calls(), calls_before);
    }

    #[tokio::test]
    async fn auth_error_keeps_session_by_default() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Get, "/auth/me", 200, user_json());
        let tokens = Arc::new(InMemoryTokenStore::with_token("jwt"));
        let manager = manager(&transport, tokens.clone());
        manager.hydrate().await;

        let err = ClientError::Auth { message: "expired".into() };
        assert!(!manager.handle_error(&err));
        assert_eq!(manager.status(), SessionStatus::Authenticated);
        assert!(tokens.load().unwrap().is_some());
    }

    #[tokio::test]
    async fn auth_error_resets_session_under_logout_policy() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Get, "/auth/me", 200, user_json());
        let tokens = Arc::new(InMemoryTokenStore::with_token("jwt"));
        let manager =
            manager(&transport, tokens.clone()).with_unauthorized_policy(UnauthorizedPolicy::Logout);
        manager.hydrate().await;

        let http = ClientError::Http { status: 500, message: "boom".into() };
        assert!(!manager.handle_error(&http));
        assert_eq!(manager.status(), SessionStatus::Authenticated);

        let auth = ClientError::Auth { message: "expired".into() };
        assert!(manager.handle_error(&auth));
        assert_eq!(manager.status(), SessionStatus::Unauthenticated);
        assert_eq!(tokens.load().unwrap(), None);
    }
}
