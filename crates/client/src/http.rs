//! `reqwest`-backed transport.
//!
//! Relative URLs (`/api/v1/...`) are resolved against the configured current
//! origin; absolute URLs are sent as-is.

use async_trait::async_trait;
use mlstudio_core::transport::{
    HttpRequest, HttpResponse, Method, MultipartField, RequestBody, Transport, TransportError,
};
use std::time::Duration;
use tracing::trace;

/// A transport that talks to the workbench server over HTTP.
pub struct ReqwestTransport {
    client: reqwest::Client,
    current_origin: String,
}

impl ReqwestTransport {
    /// Create a transport. `timeout` is the client-wide ceiling; each request
    /// also carries its own.
    pub fn new(current_origin: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            current_origin: current_origin.into().trim_end_matches('/').to_string(),
        })
    }

    fn resolve(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.current_origin, url)
        } else {
            url.to_string()
        }
    }

    fn to_method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }

    fn to_multipart(fields: Vec<MultipartField>) -> Result<reqwest::multipart::Form, TransportError> {
        let mut form = reqwest::multipart::Form::new();
        for field in fields {
            form = match field {
                MultipartField::Text { name, value } => form.text(name, value),
                MultipartField::File {
                    name,
                    file_name,
                    mime,
                    bytes,
                } => {
                    let mut part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
                    if let Some(mime) = mime {
                        part = part.mime_str(&mime).map_err(|e| {
                            TransportError::InvalidRequest(format!("Invalid mime type '{mime}': {e}"))
                        })?;
                    }
                    form.part(name, part)
                }
            };
        }
        Ok(form)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn name(&self) -> &str {
        "reqwest"
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.resolve(&request.url);
        trace!(method = %request.method, url = %url, "Dispatching over reqwest");

        let mut builder = self
            .client
            .request(Self::to_method(request.method), &url)
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::Multipart(fields) => builder.multipart(Self::to_multipart(fields)?),
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(request.timeout)
            } else {
                TransportError::Connect(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(request.timeout)
            } else {
                TransportError::Connect(format!("Failed to read response body: {e}"))
            }
        })?;

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}
