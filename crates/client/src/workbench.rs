//! Workbench — the client facade front ends talk to.
//!
//! Wires one gateway, session manager, query cache, mutation pipeline and
//! upload validator together. Every result flows back through the session
//! manager's unauthorized policy before it reaches the caller.

use futures::FutureExt;
use futures::future::BoxFuture;
use mlstudio_config::ClientConfig;
use mlstudio_core::error::{ClientError, Result};
use mlstudio_core::resource::{
    ChatReply, ChatRequest, Dataset, Model, NewModel, NewProject, NewUser, Project, ResourceKey,
    TrainingAccepted, TrainingRequest,
};
use mlstudio_core::session::{Session, SessionStatus, User};
use mlstudio_core::token::TokenStore;
use mlstudio_core::transport::{Method, RequestBody, Transport};
use mlstudio_store::{FileTokenStore, InMemoryTokenStore};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::QueryCache;
use crate::gateway::RequestGateway;
use crate::http::ReqwestTransport;
use crate::mutation::{MutationPipeline, PendingMutation};
use crate::session::{LoginOutcome, SessionHandle, SessionManager};
use crate::upload::{UploadCandidate, UploadValidator};

pub struct Workbench {
    config: ClientConfig,
    gateway: Arc<RequestGateway>,
    session: SessionManager,
    cache: QueryCache,
    mutations: MutationPipeline,
    uploads: UploadValidator,
}

impl Workbench {
    /// Build a workbench that talks HTTP and persists its token as
    /// configured.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.current_origin.clone(), config.request_timeout())
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;

        let tokens: Arc<dyn TokenStore> = match config.session.store.as_str() {
            "memory" => Arc::new(InMemoryTokenStore::new()),
            _ => Arc::new(FileTokenStore::new(config.token_path())),
        };

        Ok(Self::new(config, Arc::new(transport), tokens))
    }

    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>, tokens: Arc<dyn TokenStore>) -> Self {
        let handle = SessionHandle::new();
        let gateway = Arc::new(RequestGateway::from_config(&config, transport, handle.clone()));
        let session = SessionManager::new(Arc::clone(&gateway), handle, Arc::clone(&tokens))
            .with_unauthorized_policy(config.on_unauthorized);
        let cache = QueryCache::new();
        let mutations = MutationPipeline::new(Arc::clone(&gateway), cache.clone());
        let uploads = UploadValidator::from_config(&config.upload);

        debug!(
            base_url = gateway.base_url(),
            token_store = tokens.name(),
            on_unauthorized = ?config.on_unauthorized,
            "Workbench ready"
        );

        Self {
            config,
            gateway,
            session,
            cache,
            mutations,
            uploads,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn uploads(&self) -> &UploadValidator {
        &self.uploads
    }

    pub fn session(&self) -> Session {
        self.session.session()
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    // ── Session ───────────────────────────────────────────────

    /// Restore the persisted session. Call once at startup.
    pub async fn hydrate(&self) -> SessionStatus {
        self.session.hydrate().await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let outcome = self.session.login(username, password).await?;
        if matches!(outcome, LoginOutcome::Authenticated(_)) {
            // Anything cached belonged to whoever was signed in before.
            self.cache.clear();
        }
        Ok(outcome)
    }

    pub async fn register(&self, profile: &NewUser) -> Result<User> {
        self.session.register(profile).await
    }

    /// Sign out and forget every cached collection. Idempotent.
    pub fn logout(&self) {
        self.session.logout();
        self.cache.clear();
    }

    // ── Reads ─────────────────────────────────────────────────

    /// Read a collection through the cache.
    pub async fn read<T: DeserializeOwned>(&self, key: &ResourceKey) -> Result<T> {
        let result = self.cache.get(key, self.fetcher(key)).await;
        self.observe(result)
    }

    /// Read a collection, bypassing any ready cached value.
    pub async fn refresh<T: DeserializeOwned>(&self, key: &ResourceKey) -> Result<T> {
        let result = self.cache.refetch(key, self.fetcher(key)).await;
        self.observe(result)
    }

    /// Read on behalf of a consumer that may be torn down; `None` once
    /// `token` is cancelled.
    pub async fn read_cancellable<T: DeserializeOwned>(
        &self,
        key: &ResourceKey,
        token: &CancellationToken,
    ) -> Option<Result<T>> {
        let result = self.cache.get_cancellable(key, self.fetcher(key), token).await?;
        Some(self.observe(result))
    }

    pub async fn projects(&self) -> Result<Vec<Project>> {
        self.read(&ResourceKey::PROJECTS).await
    }

    pub async fn datasets(&self) -> Result<Vec<Dataset>> {
        self.read(&ResourceKey::DATASETS).await
    }

    pub async fn models(&self) -> Result<Vec<Model>> {
        self.read(&ResourceKey::MODELS).await
    }

    fn fetcher(&self, key: &ResourceKey) -> impl FnOnce() -> BoxFuture<'static, Result<Value>> + use<> {
        let gateway = Arc::clone(&self.gateway);
        let path = key.collection_path();
        move || async move { gateway.get_value(&path).await }.boxed()
    }

    // ── Writes ────────────────────────────────────────────────

    pub async fn create_project(&self, project: &NewProject) -> Result<Project> {
        self.mutate(PendingMutation::create_project(project)?).await
    }

    pub async fn delete_project(&self, id: i64) -> Result<()> {
        self.mutate(PendingMutation::delete_project(id)).await
    }

    pub async fn create_model(&self, model: &NewModel) -> Result<Model> {
        self.mutate(PendingMutation::create_model(model)?).await
    }

    pub async fn delete_model(&self, id: i64) -> Result<()> {
        self.mutate(PendingMutation::delete_model(id)).await
    }

    pub async fn train_model(&self, id: i64, request: &TrainingRequest) -> Result<TrainingAccepted> {
        self.mutate(PendingMutation::train_model(id, request)?).await
    }

    /// Validate `candidate` and, only if it passes, upload `bytes` as a new
    /// dataset called `name`.
    pub async fn upload_dataset(
        &self,
        candidate: &UploadCandidate,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Dataset> {
        let upload = self.uploads.approve(candidate)?;
        info!(
            file = upload.file_name(),
            size = upload.size(),
            mime = upload.mime(),
            "Uploading dataset"
        );
        self.mutate(PendingMutation::upload_dataset(&upload, name, bytes)).await
    }

    pub async fn delete_dataset(&self, id: i64) -> Result<()> {
        self.mutate(PendingMutation::delete_dataset(id)).await
    }

    async fn mutate<T: DeserializeOwned>(&self, mutation: PendingMutation) -> Result<T> {
        let result = self.mutations.mutate(mutation).await;
        self.observe(result)
    }

    // ── AI tools ──────────────────────────────────────────────

    /// Send one chat message. `model` defaults to the configured one.
    pub async fn chat(&self, message: &str, model: Option<&str>) -> Result<ChatReply> {
        let request = ChatRequest {
            message: message.to_string(),
            model: model.unwrap_or(&self.config.chat.default_model).to_string(),
            max_tokens: self.config.chat.max_tokens,
            temperature: None,
        };
        let body = RequestBody::json(&request)
            .map_err(|e| ClientError::Decode(format!("failed to encode chat request: {e}")))?;

        let result = match self.gateway.send(Method::Post, "/ai-tools/chat", body).await {
            Ok(response) => response.json(),
            Err(e) => Err(e),
        };
        self.observe(result)
    }

    /// Route an error through the unauthorized policy; a reset session also
    /// drops the cache.
    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result
            && self.session.handle_error(e)
        {
            self.cache.clear();
        }
        result
    }
}
