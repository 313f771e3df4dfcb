//! Remote task service client.
//!
//! [`TaskService`] is the seam the store talks through; [`HttpTaskService`]
//! implements it against the REST backend. Every failure, whether transport,
//! status or body, comes back as one [`ApiError`].

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::session::Session;
use crate::types::{CompletionPayload, HealthStatus, Task, TaskFormData, TaskPayload};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Operations the task store needs from the backend.
#[async_trait]
pub trait TaskService: Send + Sync {
    /// List tasks, optionally constrained by completion status.
    async fn list(&self, completed: Option<bool>) -> Result<Vec<Task>, ApiError>;

    async fn get(&self, id: &str) -> Result<Task, ApiError>;

    async fn create(&self, data: &TaskFormData) -> Result<Task, ApiError>;

    /// Full update: title and description are both sent.
    async fn update(&self, id: &str, data: &TaskFormData) -> Result<Task, ApiError>;

    async fn delete(&self, id: &str) -> Result<(), ApiError>;

    /// Dedicated completion patch, so toggling never resends title/description.
    async fn set_completed(&self, id: &str, completed: bool) -> Result<Task, ApiError>;
}

/// Build a reqwest client honouring the configured timeout.
pub(crate) fn build_http_client(config: &ApiConfig) -> Result<reqwest::Client, ApiError> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = config.timeout_seconds {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().map_err(ApiError::transport)
}

/// Join a base URL and an absolute path without doubling the slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Send a request and normalize the outcome.
///
/// The status code decides success. A successful empty body becomes an empty
/// JSON object so callers that ignore the body never see a parse failure.
pub(crate) async fn send(request: RequestBuilder) -> Result<Value, ApiError> {
    let response = request.send().await.map_err(|err| {
        warn!(error = %err, "Request failed before a response arrived");
        ApiError::transport(err)
    })?;
    handle_response(response).await
}

async fn handle_response(response: Response) -> Result<Value, ApiError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|err| ApiError::transport(err).with_status(status.as_u16()))?;

    if !status.is_success() {
        let err = ApiError::from_response(status, &text);
        debug!(status = status.as_u16(), detail = %err.detail, "Backend returned an error");
        return Err(err);
    }

    if text.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(&text).map_err(|err| ApiError::decode(Some(status.as_u16()), err))
}

/// Decode a normalized body into the record type an endpoint promises.
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|err| ApiError::decode(None, err))
}

/// reqwest-backed [`TaskService`].
#[derive(Debug, Clone)]
pub struct HttpTaskService {
    http: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
}

impl HttpTaskService {
    pub fn new(config: &ApiConfig, session: Arc<Session>) -> Result<Self, ApiError> {
        Ok(Self {
            http: build_http_client(config)?,
            base_url: config.base_url.clone(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn task_path(id: &str) -> String {
        format!("/api/tasks/{}", urlencoding::encode(id))
    }

    /// Attach JSON content type and, when present, the bearer token.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(method = method.as_str(), path, "Sending request");
        let mut request = self
            .http
            .request(method, join_url(&self.base_url, path))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Backend liveness. Sent without credentials.
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        let body = send(self.http.get(join_url(&self.base_url, "/health"))).await?;
        decode(body)
    }
}

#[async_trait]
impl TaskService for HttpTaskService {
    async fn list(&self, completed: Option<bool>) -> Result<Vec<Task>, ApiError> {
        let mut request = self.request(Method::GET, "/api/tasks");
        if let Some(completed) = completed {
            request = request.query(&[("completed", completed)]);
        }
        decode(send(request).await?)
    }

    async fn get(&self, id: &str) -> Result<Task, ApiError> {
        decode(send(self.request(Method::GET, &Self::task_path(id))).await?)
    }

    async fn create(&self, data: &TaskFormData) -> Result<Task, ApiError> {
        let request = self
            .request(Method::POST, "/api/tasks")
            .json(&TaskPayload::from(data));
        decode(send(request).await?)
    }

    async fn update(&self, id: &str, data: &TaskFormData) -> Result<Task, ApiError> {
        let request = self
            .request(Method::PUT, &Self::task_path(id))
            .json(&TaskPayload::from(data));
        decode(send(request).await?)
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        send(self.request(Method::DELETE, &Self::task_path(id))).await?;
        Ok(())
    }

    async fn set_completed(&self, id: &str, completed: bool) -> Result<Task, ApiError> {
        let path = format!("{}/complete", Self::task_path(id));
        let request = self
            .request(Method::PATCH, &path)
            .json(&CompletionPayload { completed });
        decode(send(request).await?)
    }
}
