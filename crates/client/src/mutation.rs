//! Mutation pipeline — writes that invalidate the cache on success.
//!
//! A [`PendingMutation`] describes one write: method, path, body and the
//! resource keys it makes stale. The pipeline sends it once (no retry) and
//! only drops the affected keys when the server accepted the write.

use mlstudio_core::error::{ClientError, Result};
use mlstudio_core::resource::{NewModel, NewProject, ResourceKey, TrainingRequest};
use mlstudio_core::transport::{Method, MultipartField, RequestBody};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::QueryCache;
use crate::gateway::RequestGateway;
use crate::upload::ValidatedUpload;

/// One write, described but not yet sent.
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
    pub affected: Vec<ResourceKey>,
}

impl PendingMutation {
    pub fn new(method: Method, path: impl Into<String>, body: RequestBody, affected: Vec<ResourceKey>) -> Self {
        Self {
            method,
            path: path.into(),
            body,
            affected,
        }
    }

    fn json<T: Serialize>(method: Method, path: String, payload: &T, affected: ResourceKey) -> Result<Self> {
        let body = RequestBody::json(payload)
            .map_err(|e| ClientError::Decode(format!("failed to encode request body: {e}")))?;
        Ok(Self::new(method, path, body, vec![affected]))
    }

    pub fn create_project(project: &NewProject) -> Result<Self> {
        Self::json(Method::Post, "/projects".into(), project, ResourceKey::PROJECTS)
    }

    pub fn delete_project(id: i64) -> Self {
        Self::new(
            Method::Delete,
            format!("/projects/{id}"),
            RequestBody::Empty,
            vec![ResourceKey::PROJECTS],
        )
    }

    pub fn create_model(model: &NewModel) -> Result<Self> {
        Self::json(Method::Post, "/models".into(), model, ResourceKey::MODELS)
    }

    pub fn delete_model(id: i64) -> Self {
        Self::new(
            Method::Delete,
            format!("/models/{id}"),
            RequestBody::Empty,
            vec![ResourceKey::MODELS],
        )
    }

    /// Queue training; the model's status changes server-side.
    pub fn train_model(id: i64, request: &TrainingRequest) -> Result<Self> {
        Self::json(Method::Post, format!("/models/{id}/train"), request, ResourceKey::MODELS)
    }

    /// Multipart upload of a validated file under the dataset `name`.
    pub fn upload_dataset(upload: &ValidatedUpload, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let fields = vec![
            MultipartField::File {
                name: "file".into(),
                file_name: upload.file_name().to_string(),
                mime: Some(upload.mime().to_string()),
                bytes,
            },
            MultipartField::Text {
                name: "name".into(),
                value: name.into(),
            },
        ];
        Self::new(
            Method::Post,
            "/datasets/upload",
            RequestBody::Multipart(fields),
            vec![ResourceKey::DATASETS],
        )
    }

    pub fn delete_dataset(id: i64) -> Self {
        Self::new(
            Method::Delete,
            format!("/datasets/{id}"),
            RequestBody::Empty,
            vec![ResourceKey::DATASETS],
        )
    }
}

pub struct MutationPipeline {
    gateway: Arc<RequestGateway>,
    cache: QueryCache,
}

impl MutationPipeline {
    pub fn new(gateway: Arc<RequestGateway>, cache: QueryCache) -> Self {
        Self { gateway, cache }
    }

    /// Send the write once. On success the affected keys are invalidated
    /// before the server's result is decoded; on failure the cache is untouched.
    pub async fn mutate<T: DeserializeOwned>(&self, mutation: PendingMutation) -> Result<T> {
        let PendingMutation {
            method,
            path,
            body,
            affected,
        } = mutation;

        debug!(method = %method, path = %path, "Submitting mutation");
        let response = self.gateway.send(method, &path, body).await?;

        self.cache.invalidate_all(&affected);
        info!(
            method = %method,
            path = %path,
            invalidated = ?affected.iter().map(ResourceKey::as_str).collect::<Vec<_>>(),
            "Mutation applied"
        );

        response.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FetchStatus;
    use crate::session::SessionHandle;
    use crate::test_support::{ScriptedTransport, dataset_json, gateway};
    use crate::upload::{UploadCandidate, UploadValidator};
    use futures::FutureExt;
    use mlstudio_core::resource::{Dataset, Model};
    use serde_json::{Value, json};

    fn fetch_datasets(
        gw: &Arc<RequestGateway>,
    ) -> impl FnOnce() -> futures::future::BoxFuture<'static, Result<Value>> + use<> {
        let gw = Arc::clone(gw);
        move || async move { gw.get_value("/datasets").await }.boxed()
    }

    #[tokio::test]
    async fn successful_delete_forces_fresh_read() {
        let transport = ScriptedTransport::new();
        transport.respond(
            Method::Get,
            "/datasets",
            200,
            json!([dataset_json(1, "a.csv"), dataset_json(2, "b.csv")]),
        );
        transport.respond(Method::Get, "/datasets", 200, json!([dataset_json(2, "b.csv")]));
        transport.respond_raw(Method::Delete, "/datasets/1", 204, "");
        let gw = gateway(&transport, &SessionHandle::new());
        let cache = QueryCache::new();
        let pipeline = MutationPipeline::new(Arc::clone(&gw), cache.clone());

        let before: Vec<Dataset> = cache.get(&ResourceKey::DATASETS, fetch_datasets(&gw)).await.unwrap();
        assert_eq!(before.len(), 2);

        let () = pipeline.mutate(PendingMutation::delete_dataset(1)).await.unwrap();
        assert_eq!(cache.status(&ResourceKey::DATASETS), FetchStatus::Idle);

        let after: Vec<Dataset> = cache.get(&ResourceKey::DATASETS, fetch_datasets(&gw)).await.unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(transport.calls_to(Method::Get, "/datasets"), 2);
    }

    #[tokio::test]
    async fn failed_mutation_leaves_cache_intact() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Get, "/datasets", 200, json!([dataset_json(1, "a.csv")]));
        transport.respond(Method::Delete, "/datasets/1", 404, json!({"detail": "Dataset not found"}));
        let gw = gateway(&transport, &SessionHandle::new());
        let cache = QueryCache::new();
        let pipeline = MutationPipeline::new(Arc::clone(&gw), cache.clone());

        let _: Vec<Dataset> = cache.get(&ResourceKey::DATASETS, fetch_datasets(&gw)).await.unwrap();

        let err = pipeline
            .mutate::<()>(PendingMutation::delete_dataset(1))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Dataset not found");
        assert_eq!(transport.calls_to(Method::Delete, "/datasets/1"), 1);

        assert_eq!(cache.status(&ResourceKey::DATASETS), FetchStatus::Ready);
        let _: Vec<Dataset> = cache.get(&ResourceKey::DATASETS, fetch_datasets(&gw)).await.unwrap();
        assert_eq!(transport.calls_to(Method::Get, "/datasets"), 1);
    }

    #[tokio::test]
    async fn create_model_returns_server_record() {
        let transport = ScriptedTransport::new();
        transport.respond(
            Method::Post,
            "/models",
            201,
            json!({
                "id": 7,
                "name": "churn",
                "description": null,
                "model_type": "classification",
                "algorithm": "random_forest",
                "status": "draft",
                "project_id": null,
                "owner_id": 1,
                "created_at": "2025-03-01T10:15:30",
                "updated_at": "2025-03-01T10:15:30"
            }),
        );
        let gw = gateway(&transport, &SessionHandle::new());
        let pipeline = MutationPipeline::new(gw, QueryCache::new());

        let mutation = PendingMutation::create_model(&NewModel {
            name: "churn".into(),
            description: None,
            model_type: "classification".into(),
            algorithm: "random_forest".into(),
            project_id: None,
        })
        .unwrap();
        assert_eq!(mutation.affected, vec![ResourceKey::MODELS]);

        let model: Model = pipeline.mutate(mutation).await.unwrap();
        assert_eq!(model.id, 7);

        let sent = transport.last_request().unwrap();
        let RequestBody::Json(body) = &sent.body else {
            panic!("expected JSON body, got {}", sent.body.kind());
        };
        assert_eq!(body["algorithm"], "random_forest");
        assert!(body.get("project_id").is_none());
    }

    #[tokio::test]
    async fn no_retry_on_network_failure() {
        let transport = ScriptedTransport::new();
        transport.fail(
            Method::Post,
            "/models/3/train",
            mlstudio_core::transport::TransportError::Connect("refused".into()),
        );
        let gw = gateway(&transport, &SessionHandle::new());
        let pipeline = MutationPipeline::new(gw, QueryCache::new());

        let mutation = PendingMutation::train_model(3, &TrainingRequest::new(1, "churned")).unwrap();
        let err = pipeline.mutate::<Value>(mutation).await.unwrap_err();
        assert!(err.is_network());
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn upload_builds_multipart_fields() {
        let upload = UploadValidator::default()
            .approve(&UploadCandidate::new("iris.csv", 3, Some("text/csv".into())))
            .unwrap();
        let mutation = PendingMutation::upload_dataset(&upload, "Iris", b"a,b".to_vec());

        assert_eq!(mutation.method, Method::Post);
        assert_eq!(mutation.path, "/datasets/upload");
        assert_eq!(mutation.affected, vec![ResourceKey::DATASETS]);
        let RequestBody::Multipart(fields) = mutation.body else {
            panic!("expected multipart body");
        };
        assert!(matches!(
            &fields[0],
            MultipartField::File { name, file_name, mime: Some(mime), bytes }
                if name == "file" && file_name == "iris.csv" && mime == "text/csv" && bytes == b"a,b"
        ));
        assert!(matches!(
            &fields[1],
            MultipartField::Text { name, value } if name == "name" && value == "Iris"
        ));
    }
}
