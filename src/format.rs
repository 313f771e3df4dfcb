//! Output formatting utilities for markdown and JSON.

use crate::store::StoreState;
use crate::types::Task;
use serde_json::{Value, json};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    Markdown,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

/// Format a single task as markdown.
pub fn format_task_markdown(task: &Task) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Task: {}\n", task.title));
    md.push_str(&format!("- **id**: `{}`\n", task.id));
    md.push_str(&format!(
        "- **status**: {}\n",
        if task.completed { "completed" } else { "active" }
    ));

    if let Some(due) = task.due_date {
        md.push_str(&format!("- **due**: {}\n", due));
    }
    md.push_str(&format!("- **created**: {}\n", task.created_at));
    md.push_str(&format!("- **updated**: {}\n", task.updated_at));

    if let Some(ref desc) = task.description {
        md.push_str("\n### Description\n");
        md.push_str(desc);
        md.push('\n');
    }

    md
}

/// Format the visible list as markdown, active tasks before completed ones.
pub fn format_tasks_markdown(state: &StoreState) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Tasks ({})\n", state.tasks.len()));
    let mut scope = format!("filter: {}", state.filter);
    if !state.search_term.trim().is_empty() {
        scope.push_str(&format!(", search: \"{}\"", state.search_term.trim()));
    }
    md.push_str(&format!("_{}_\n\n", scope));

    if let Some(ref error) = state.error {
        md.push_str(&format!("> **Error**: {}\n\n", error));
    }

    if state.tasks.is_empty() {
        md.push_str("No tasks found.\n");
        return md;
    }

    for (heading, completed) in [("Active", false), ("Completed", true)] {
        let group: Vec<&Task> = state
            .tasks
            .iter()
            .filter(|t| t.completed == completed)
            .collect();
        if group.is_empty() {
            continue;
        }
        md.push_str(&format!("## {}\n\n", heading));
        for task in group {
            md.push_str(&format_task_short(task));
        }
        md.push('\n');
    }

    md
}

/// Format a task in short form for lists.
fn format_task_short(task: &Task) -> String {
    let check = if task.completed { "[x]" } else { "[ ]" };

    let due = task
        .due_date
        .map(|d| format!(" (due {})", d))
        .unwrap_or_default();

    format!(
        "- {} {} `{}`{}\n",
        check,
        task.title,
        task.id.chars().take(8).collect::<String>(),
        due,
    )
}

/// JSON view of the store state for `--format json`.
pub fn state_to_json(state: &StoreState) -> Value {
    json!({
        "filter": state.filter,
        "search_term": state.search_term,
        "error": state.error,
        "count": state.tasks.len(),
        "tasks": state.tasks,
    })
}
