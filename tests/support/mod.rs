//! In-process mock of the todo REST backend.
//!
//! Serves the task, auth and health endpoints from memory, records every
//! request it sees, and can be told to answer the next request(s) with a
//! canned status and body.

#![allow(dead_code)]

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use todo_board::config::ApiConfig;
use todo_board::types::Task;

pub const TOKEN: &str = "test-token";
pub const PASSWORD: &str = "Passw0rdOk";
pub const TAKEN_EMAIL: &str = "taken@example.com";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
struct BackendState {
    /// Newest first, as the backend orders by creation time descending.
    tasks: Vec<Task>,
    next_id: u64,
    requests: Vec<RecordedRequest>,
    canned: VecDeque<(StatusCode, String)>,
}

type Shared = Arc<Mutex<BackendState>>;

pub struct MockBackend {
    pub base_url: String,
    state: Shared,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(BackendState::default()));
        let app = Router::new()
            .route("/api/tasks", get(list_tasks).post(create_task))
            .route(
                "/api/tasks/{id}",
                get(get_task).put(update_task).delete(delete_task),
            )
            .route("/api/tasks/{id}/complete", patch(complete_task))
            .route("/api/auth/signin", post(sign_in))
            .route("/api/auth/signup", post(sign_up))
            .route("/health", get(health))
            .layer(middleware::from_fn_with_state(state.clone(), intercept))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock backend crashed");
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            timeout_seconds: Some(5),
        }
    }

    /// Insert a task as if created earlier. Returns the stored record.
    pub fn seed(&self, title: &str, description: Option<&str>, completed: bool) -> Task {
        let mut state = self.state.lock().unwrap();
        let task = new_task(&mut state, title, description);
        let task = Task { completed, ..task };
        state.tasks.insert(0, task.clone());
        task
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().unwrap().tasks.clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.state.lock().unwrap().requests.clear();
    }

    /// Answer the next request with `status` and a raw `body`.
    pub fn respond_next(&self, status: u16, body: &str) {
        let status = StatusCode::from_u16(status).expect("valid status");
        self.state
            .lock()
            .unwrap()
            .canned
            .push_back((status, body.to_string()));
    }
}

fn new_task(state: &mut BackendState, title: &str, description: Option<&str>) -> Task {
    state.next_id += 1;
    let stamp = format!("2025-01-01T00:00:{:02}", state.next_id % 60);
    Task {
        id: format!("task-{}", state.next_id),
        title: title.to_string(),
        description: description.map(String::from),
        completed: false,
        due_date: None,
        user_id: Some("user-1".to_string()),
        created_at: stamp.clone(),
        updated_at: stamp,
    }
}

async fn intercept(State(shared): State<Shared>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, usize::MAX).await.unwrap_or_default();
    let header_str = |name: header::HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };

    let canned = {
        let mut state = shared.lock().unwrap();
        state.requests.push(RecordedRequest {
            method: parts.method.to_string(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(String::from),
            authorization: header_str(header::AUTHORIZATION),
            content_type: header_str(header::CONTENT_TYPE),
            body: serde_json::from_slice(&bytes).ok(),
        });
        state.canned.pop_front()
    };

    if let Some((status, body)) = canned {
        return (status, body).into_response();
    }
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn unauthorized(headers: &HeaderMap) -> Option<Response> {
    let expected = format!("Bearer {}", TOKEN);
    let given = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if given == Some(expected.as_str()) {
        None
    } else {
        Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "detail": "Not authenticated" })),
            )
                .into_response(),
        )
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "detail": "Task not found" })),
    )
        .into_response()
}

/// Mirrors the backend's title/description constraints.
fn invalid_body(body: &Value) -> Option<Response> {
    let title = body.get("title").and_then(Value::as_str).unwrap_or("");
    let description = body.get("description").and_then(Value::as_str).unwrap_or("");
    let msg = if title.is_empty() {
        "String should have at least 1 character"
    } else if title.chars().count() > 100 {
        "String should have at most 100 characters"
    } else if description.chars().count() > 1000 {
        "String should have at most 1000 characters"
    } else {
        return None;
    };
    Some(
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": [{ "loc": ["body", "title"], "msg": msg }] })),
        )
            .into_response(),
    )
}

#[derive(Deserialize)]
struct ListQuery {
    completed: Option<bool>,
}

async fn list_tasks(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response {
    if let Some(resp) = unauthorized(&headers) {
        return resp;
    }
    let state = shared.lock().unwrap();
    let tasks: Vec<Task> = state
        .tasks
        .iter()
        .filter(|t| query.completed.is_none_or(|c| t.completed == c))
        .cloned()
        .collect();
    Json(tasks).into_response()
}

async fn create_task(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(resp) = unauthorized(&headers).or_else(|| invalid_body(&body)) {
        return resp;
    }
    let mut state = shared.lock().unwrap();
    let task = new_task(
        &mut state,
        body["title"].as_str().unwrap_or_default(),
        body.get("description").and_then(Value::as_str),
    );
    state.tasks.insert(0, task.clone());
    (StatusCode::CREATED, Json(task)).into_response()
}

async fn get_task(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Some(resp) = unauthorized(&headers) {
        return resp;
    }
    let state = shared.lock().unwrap();
    match state.tasks.iter().find(|t| t.id == id) {
        Some(task) => Json(task.clone()).into_response(),
        None => not_found(),
    }
}

async fn update_task(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Some(resp) = unauthorized(&headers).or_else(|| invalid_body(&body)) {
        return resp;
    }
    let mut state = shared.lock().unwrap();
    let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) else {
        return not_found();
    };
    task.title = body["title"].as_str().unwrap_or_default().to_string();
    task.description = body
        .get("description")
        .and_then(Value::as_str)
        .map(String::from);
    task.updated_at = "2025-02-01T00:00:00".to_string();
    Json(task.clone()).into_response()
}

async fn delete_task(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Some(resp) = unauthorized(&headers) {
        return resp;
    }
    let mut state = shared.lock().unwrap();
    let before = state.tasks.len();
    state.tasks.retain(|t| t.id != id);
    if state.tasks.len() == before {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

#[derive(Deserialize)]
struct CompleteBody {
    completed: bool,
}

async fn complete_task(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<CompleteBody>,
) -> Response {
    if let Some(resp) = unauthorized(&headers) {
        return resp;
    }
    let mut state = shared.lock().unwrap();
    let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) else {
        return not_found();
    };
    task.completed = body.completed;
    Json(task.clone()).into_response()
}

fn auth_response(email: &str, name: Option<&str>) -> Value {
    json!({
        "access_token": TOKEN,
        "token_type": "bearer",
        "user": { "id": "user-1", "email": email, "name": name }
    })
}

async fn sign_in(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    if body["password"].as_str() != Some(PASSWORD) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid email or password" })),
        )
            .into_response();
    }
    Json(auth_response(email, None)).into_response()
}

async fn sign_up(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    if email == TAKEN_EMAIL {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Email already registered" })),
        )
            .into_response();
    }
    let name = body.get("name").and_then(Value::as_str);
    (StatusCode::CREATED, Json(auth_response(email, name))).into_response()
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
