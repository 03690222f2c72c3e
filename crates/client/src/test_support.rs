//! Scripted transport shared by the unit tests in this crate.

use async_trait::async_trait;
use mlstudio_core::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::gateway::RequestGateway;
use crate::session::SessionHandle;

#[derive(Clone)]
enum Scripted {
    Respond(HttpResponse),
    Fail(TransportError),
    Hang,
}

/// A transport that answers from a per-route script and records every call.
///
/// Each route replays its responses in order; the last one repeats.
/// Unscripted routes answer 404 like the server would.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, method: Method, path: &str, scripted: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(scripted);
    }

    pub(crate) fn respond(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        self.push(method, path, Scripted::Respond(HttpResponse::json(status, &body)));
    }

    pub(crate) fn respond_raw(&self, method: Method, path: &str, status: u16, body: &str) {
        self.push(method, path, Scripted::Respond(HttpResponse::new(status, body)));
    }

    pub(crate) fn fail(&self, method: Method, path: &str, error: TransportError) {
        self.push(method, path, Scripted::Fail(error));
    }

    pub(crate) fn hang(&self, method: Method, path: &str) {
        self.push(method, path, Scripted::Hang);
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn calls_to(&self, method: Method, path: &str) -> usize {
        self.requests_to(method, path).len()
    }

    pub(crate) fn requests_to(&self, method: Method, path: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && strip_base(&r.url) == path)
            .cloned()
            .collect()
    }

    pub(crate) fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

fn strip_base(url: &str) -> &str {
    url.strip_prefix("/api/v1").unwrap_or(url)
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let key = (request.method, strip_base(&request.url).to_string());
        self.requests.lock().unwrap().push(request);

        // Suspend like a real network round-trip would.
        tokio::task::yield_now().await;

        let next = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match next {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(error)) => Err(error),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Ok(HttpResponse::json(
                404,
                &serde_json::json!({ "detail": "Not Found" }),
            )),
        }
    }
}

/// A gateway over `transport` with the default base path and timeout.
pub(crate) fn gateway(transport: &Arc<ScriptedTransport>, session: &SessionHandle) -> Arc<RequestGateway> {
    Arc::new(RequestGateway::new(
        transport.clone(),
        session.clone(),
        "/api/v1",
        std::time::Duration::from_secs(30),
    ))
}

pub(crate) fn user_json() -> serde_json::Value {
    serde_json::json!({
        "id": 1,
        "username": "alice",
        "email": "alice@example.com",
        "full_name": "Alice Liddell"
    })
}

pub(crate) fn dataset_json(id: i64, name: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "description": null,
        "file_format": "csv",
        "file_size": 1024,
        "row_count": 10,
        "column_count": 3,
        "schema": null,
        "tags": [],
        "project_id": null,
        "owner_id": 1,
        "created_at": "2025-03-01T10:15:30"
    })
}
