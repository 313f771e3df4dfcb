//! Core types shared by the task store, the remote service client and the CLI.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A task record as returned by the backend.
///
/// The backend emits `snake_case` field names; the camelCase aliases let the
/// same type read records produced by JavaScript clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, alias = "dueDate", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, alias = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(alias = "createdAt")]
    pub created_at: String,
    #[serde(alias = "updatedAt")]
    pub updated_at: String,
}

impl Task {
    /// Case-insensitive substring match over title and description.
    ///
    /// `needle` must already be lowercased.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
    }
}

/// Input used to create or fully update a task. Never stored directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFormData {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl TaskFormData {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }
}

/// Partial update. Missing fields keep the locally known value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
}

impl TaskPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Some(description.into()));
        self
    }

    pub fn clear_description(mut self) -> Self {
        self.description = Some(None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }

    /// Merge this patch over `base`, producing the body of a full update.
    pub fn merge_over(&self, base: Option<&Task>) -> Option<TaskFormData> {
        let title = match (&self.title, base) {
            (Some(title), _) => title.clone(),
            (None, Some(task)) => task.title.clone(),
            (None, None) => return None,
        };
        let description = match &self.description {
            Some(change) => change.clone(),
            None => base.and_then(|t| t.description.clone()),
        };
        Some(TaskFormData {
            title,
            description,
            due_date: base.and_then(|t| t.due_date),
        })
    }
}

/// Wire body for create and full update requests.
#[derive(Debug, Serialize)]
pub struct TaskPayload<'a> {
    pub title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
}

impl<'a> From<&'a TaskFormData> for TaskPayload<'a> {
    fn from(data: &'a TaskFormData) -> Self {
        Self {
            title: &data.title,
            description: data.description.as_deref(),
        }
    }
}

/// Wire body for the completion toggle endpoint.
#[derive(Debug, Serialize)]
pub struct CompletionPayload {
    pub completed: bool,
}

/// View filter over completion status. Not persisted server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl TaskFilter {
    /// The `completed` query constraint sent to the backend.
    pub fn completed_param(&self) -> Option<bool> {
        match self {
            TaskFilter::All => None,
            TaskFilter::Active => Some(false),
            TaskFilter::Completed => Some(true),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskFilter::All => "all",
            TaskFilter::Active => "active",
            TaskFilter::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(TaskFilter::All),
            "active" | "open" => Ok(TaskFilter::Active),
            "completed" | "done" => Ok(TaskFilter::Completed),
            other => Err(format!(
                "unknown filter '{}', expected all, active or completed",
                other
            )),
        }
    }
}

/// Sign-in request body.
#[derive(Debug, Clone, Serialize)]
pub struct SignInCredentials {
    pub email: String,
    pub password: String,
}

/// Sign-up request body.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpCredentials {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// User summary returned alongside an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Response of the sign-in and sign-up endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: UserSummary,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Response of the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(title: &str, description: Option<&str>) -> Task {
        Task {
            id: "t1".into(),
            title: title.into(),
            description: description.map(String::from),
            completed: false,
            due_date: None,
            user_id: None,
            created_at: "2025-01-01T00:00:00".into(),
            updated_at: "2025-01-01T00:00:00".into(),
        }
    }

    #[test]
    fn test_task_reads_backend_and_camel_case_fields() {
        let backend: Task = serde_json::from_value(json!({
            "id": "a",
            "user_id": "u",
            "title": "Buy milk",
            "description": null,
            "completed": true,
            "created_at": "2025-01-01T10:00:00",
            "updated_at": "2025-01-01T10:00:00"
        }))
        .unwrap();
        assert!(backend.completed);
        assert_eq!(backend.user_id.as_deref(), Some("u"));

        let camel: Task = serde_json::from_value(json!({
            "id": "b",
            "title": "Write report",
            "completed": false,
            "dueDate": "2025-03-04",
            "createdAt": "2025-01-01T10:00:00",
            "updatedAt": "2025-01-02T10:00:00"
        }))
        .unwrap();
        assert_eq!(camel.due_date, NaiveDate::from_ymd_opt(2025, 3, 4));
        assert_eq!(camel.updated_at, "2025-01-02T10:00:00");
    }

    #[test]
    fn test_matches_lowercase_checks_title_and_description() {
        assert!(task("Buy FOOD", None).matches_lowercase("foo"));
        assert!(task("Errand", Some("get Food")).matches_lowercase("foo"));
        assert!(!task("Errand", None).matches_lowercase("foo"));
    }

    #[test]
    fn test_filter_completed_param() {
        assert_eq!(TaskFilter::All.completed_param(), None);
        assert_eq!(TaskFilter::Active.completed_param(), Some(false));
        assert_eq!(TaskFilter::Completed.completed_param(), Some(true));
        assert_eq!("Completed".parse::<TaskFilter>(), Ok(TaskFilter::Completed));
        assert!("later".parse::<TaskFilter>().is_err());
    }

    #[test]
    fn test_patch_merge_keeps_local_fields() {
        let base = task("Old", Some("keep me"));
        let merged = TaskPatch::title("New").merge_over(Some(&base)).unwrap();
        assert_eq!(merged.title, "New");
        assert_eq!(merged.description.as_deref(), Some("keep me"));

        assert!(TaskPatch::default().merge_over(None).is_none());
    }

    #[test]
    fn test_patch_can_clear_description() {
        let base = task("Old", Some("stale"));
        let patch = TaskPatch::default().clear_description();
        assert!(!patch.is_empty());
        let merged = patch.merge_over(Some(&base)).unwrap();
        assert_eq!(merged.title, "Old");
        assert_eq!(merged.description, None);

        let body = serde_json::to_value(TaskPayload::from(&merged)).unwrap();
        assert_eq!(body, json!({ "title": "Old" }));
    }

    #[test]
    fn test_payload_omits_missing_description() {
        let data = TaskFormData::new("Buy milk");
        let body = serde_json::to_value(TaskPayload::from(&data)).unwrap();
        assert_eq!(body, json!({ "title": "Buy milk" }));
    }
}
