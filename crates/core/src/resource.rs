//! Remote resources — projects, datasets, models — and the keys they are
//! cached under.
//!
//! Shapes follow the workbench server's response schemas. Timestamps are
//! naive UTC, matching what the server emits.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Identifier under which a resource collection is cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(Cow<'static, str>);

impl ResourceKey {
    pub const PROJECTS: ResourceKey = ResourceKey(Cow::Borrowed("projects"));
    pub const DATASETS: ResourceKey = ResourceKey(Cow::Borrowed("datasets"));
    pub const MODELS: ResourceKey = ResourceKey(Cow::Borrowed("models"));

    pub fn new(key: impl Into<String>) -> Self {
        Self(Cow::Owned(key.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Collection path on the server (`/projects`, `/datasets`, ...).
    pub fn collection_path(&self) -> String {
        format!("/{}", self.0)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ResourceKey {
    fn from(key: &'static str) -> Self {
        Self(Cow::Borrowed(key))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub project_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: String,
    pub owner_id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub project_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// csv, json, excel, parquet
    pub file_format: String,
    /// Size in bytes
    pub file_size: u64,
    #[serde(default)]
    pub row_count: Option<u64>,
    #[serde(default)]
    pub column_count: Option<u64>,
    /// Column names, dtypes and shape as reported by the server
    #[serde(default)]
    pub schema: Option<serde_json::Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub project_id: Option<i64>,
    pub owner_id: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// classification, regression, clustering, ...
    pub model_type: String,
    /// random_forest, xgboost, neural_network, ...
    pub algorithm: String,
    /// draft, training, trained, deployed, archived
    pub status: String,
    #[serde(default)]
    pub project_id: Option<i64>,
    pub owner_id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewModel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub model_type: String,
    pub algorithm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
}

/// Body of `POST /models/{id}/train`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRequest {
    pub dataset_id: i64,
    pub target_column: String,
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_random_state")]
    pub random_state: u64,
    #[serde(default)]
    pub hyperparameters: serde_json::Map<String, serde_json::Value>,
}

fn default_test_size() -> f64 {
    0.2
}
fn default_random_state() -> u64 {
    42
}

impl TrainingRequest {
    pub fn new(dataset_id: i64, target_column: impl Into<String>) -> Self {
        Self {
            dataset_id,
            target_column: target_column.into(),
            test_size: default_test_size(),
            random_state: default_random_state(),
            hyperparameters: serde_json::Map::new(),
        }
    }
}

/// Acknowledgement returned when training is queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingAccepted {
    pub message: String,
    pub model_id: i64,
    pub status: String,
}

/// Registration profile for `POST /auth/register`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("full_name", &self.full_name)
            .finish()
    }
}

/// Response of `POST /auth/login`.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".into()
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Body of `POST /ai-tools/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub model: String,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub cost: f64,
}
