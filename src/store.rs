//! Client-side task store.
//!
//! Single source of truth for the task list a UI shows, and the only place
//! that reconciles optimistic edits with the backend.
//!
//! ## Mutation protocol
//! - `create` and `update` wait for the server record before touching state.
//! - `delete` removes the task at once, then calls the backend.
//! - `toggle_complete` flips the flag at once, then calls the backend.
//!
//! Every optimistic change records a [`Snapshot`] first. On failure the
//! snapshot (not a value re-derived at failure time) is what gets restored.
//! Whether a failed delete is restored is governed by [`DeleteRollback`].
//!
//! ## Fetch ordering
//! Each fetch takes the next sequence number. A response is applied only if
//! its number is still the latest, so a slow response to an old filter can
//! never overwrite the list for a newer one.
//!
//! Failed operations record a message in [`StoreState::error`], publish an
//! error [`Notification`], and return the error to the caller.

use crate::api::TaskService;
use crate::error::{StoreError, StoreResult};
use crate::notifications::{DEFAULT_CAPACITY, Notification, Notifier};
use crate::types::{Task, TaskFilter, TaskFormData, TaskPatch};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{OwnedMutexGuard, broadcast};
use tracing::{debug, info, warn};

const FETCH_FAILED: &str = "Failed to fetch tasks";
const CREATE_FAILED: &str = "Failed to create task";
const UPDATE_FAILED: &str = "Failed to update task";
const DELETE_FAILED: &str = "Failed to delete task";

/// What a failed delete does with the task it already removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteRollback {
    /// Leave it removed; the caller only learns through the error.
    #[default]
    KeepRemoved,
    /// Put it back where it was, unless the backend says it is gone.
    RestoreOnFailure,
}

/// How mutations on the same task id interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameTaskPolicy {
    /// One update/delete/toggle per id at a time, in arrival order.
    #[default]
    Serialize,
    /// No per-id exclusion; the last response to land wins.
    LastWriteWins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub delete_rollback: DeleteRollback,
    pub same_task: SameTaskPolicy,
    pub notification_capacity: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            delete_rollback: DeleteRollback::default(),
            same_task: SameTaskPolicy::default(),
            notification_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Everything a view renders from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreState {
    /// Server order, with locally created tasks prepended.
    pub tasks: Vec<Task>,
    pub loading: bool,
    pub error: Option<String>,
    pub filter: TaskFilter,
    pub search_term: String,
}

impl StoreState {
    fn new() -> Self {
        Self {
            tasks: Vec::new(),
            loading: true,
            error: None,
            filter: TaskFilter::All,
            search_term: String::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Whether `task` belongs in the list under the current filter and search.
    fn shows(&self, task: &Task) -> bool {
        let needle = self.search_term.trim().to_lowercase();
        self.filter.completed_param().is_none_or(|c| task.completed == c)
            && (needle.is_empty() || task.matches_lowercase(&needle))
    }
}

/// Prior state captured before an optimistic change.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Snapshot {
    /// `completed` as it was before the toggle flipped it.
    Completed { id: String, previous: bool },
    Removed { index: usize, task: Task },
}

impl Snapshot {
    /// Undo the captured change. Returns false if there was nothing to
    /// restore into (task gone, or already re-inserted by a fetch).
    ///
    /// A completion restore undoes this toggle's own flip, so overlapping
    /// failed toggles on one id unwind in any order.
    fn restore(self, state: &mut StoreState) -> bool {
        match self {
            Snapshot::Completed { id, previous } => {
                match state.tasks.iter_mut().find(|t| t.id == id) {
                    Some(task) if task.completed != previous => {
                        task.completed = previous;
                        true
                    }
                    Some(task) => {
                        // Overtaken by a later toggle; unwind ours on top of it.
                        task.completed = !previous;
                        true
                    }
                    None => false,
                }
            }
            Snapshot::Removed { index, task } => {
                if state.get(&task.id).is_some() {
                    return false;
                }
                let index = index.min(state.tasks.len());
                state.tasks.insert(index, task);
                true
            }
        }
    }
}

type LockMap = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

/// Per-task-id async locks. Entries are dropped once nobody holds or waits.
#[derive(Default)]
struct TaskLocks {
    locks: LockMap,
}

impl TaskLocks {
    async fn acquire(&self, id: &str) -> TaskLockGuard {
        let lock = {
            let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(id.to_string()).or_default())
        };
        let guard = lock.lock_owned().await;
        TaskLockGuard {
            id: id.to_string(),
            locks: Arc::clone(&self.locks),
            guard: Some(guard),
        }
    }

    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

struct TaskLockGuard {
    id: String,
    locks: LockMap,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TaskLockGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if map
            .get(&self.id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.id);
        }
    }
}

struct Inner {
    view: StoreState,
    latest_fetch: u64,
}

/// The task store. Cheap to share behind an `Arc`; every method takes `&self`.
pub struct TaskStore {
    service: Arc<dyn TaskService>,
    inner: Mutex<Inner>,
    task_locks: TaskLocks,
    options: StoreOptions,
    notifier: Notifier,
}

impl TaskStore {
    pub fn new(service: Arc<dyn TaskService>) -> Self {
        Self::with_options(service, StoreOptions::default())
    }

    pub fn with_options(service: Arc<dyn TaskService>, options: StoreOptions) -> Self {
        Self {
            service,
            inner: Mutex::new(Inner {
                view: StoreState::new(),
                latest_fetch: 0,
            }),
            task_locks: TaskLocks::default(),
            notifier: Notifier::new(options.notification_capacity),
            options,
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Copy of the current state.
    pub fn state(&self) -> StoreState {
        self.inner().view.clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.inner().view.tasks.clone()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.inner().view.get(id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.inner().view.loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner().view.error.clone()
    }

    pub fn filter(&self) -> TaskFilter {
        self.inner().view.filter
    }

    pub fn search_term(&self) -> String {
        self.inner().view.search_term.clone()
    }

    /// Receive success/failure notifications for mutations.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    /// Fetch with `filter`, keeping the current search term.
    pub async fn list(&self, filter: TaskFilter) -> StoreResult<()> {
        self.inner().view.filter = filter;
        self.refresh().await
    }

    /// Re-fetch with the current filter and search term.
    ///
    /// On failure the previous list is kept. A response overtaken by a newer
    /// fetch is discarded and reported as `Ok`.
    pub async fn refresh(&self) -> StoreResult<()> {
        let (seq, filter, term) = {
            let mut inner = self.inner();
            inner.latest_fetch += 1;
            inner.view.loading = true;
            inner.view.error = None;
            (
                inner.latest_fetch,
                inner.view.filter,
                inner.view.search_term.clone(),
            )
        };
        debug!(seq, filter = %filter, search = %term, "Fetching tasks");

        let result = self.service.list(filter.completed_param()).await;

        let mut inner = self.inner();
        if inner.latest_fetch != seq {
            debug!(seq, latest = inner.latest_fetch, "Discarding stale task list");
            return Ok(());
        }
        inner.view.loading = false;
        match result {
            Ok(tasks) => {
                inner.view.tasks = apply_search(tasks, &term);
                debug!(seq, count = inner.view.tasks.len(), "Task list applied");
                Ok(())
            }
            Err(err) => {
                let err = StoreError::from(err);
                let message = err.user_message(FETCH_FAILED);
                warn!(seq, error = %message, "Fetching tasks failed");
                inner.view.error = Some(message);
                Err(err)
            }
        }
    }

    /// Set the filter; re-fetches when it changed.
    pub async fn set_filter(&self, filter: TaskFilter) -> StoreResult<()> {
        let changed = {
            let mut inner = self.inner();
            let changed = inner.view.filter != filter;
            inner.view.filter = filter;
            changed
        };
        if changed { self.refresh().await } else { Ok(()) }
    }

    /// Set the search term; re-fetches when it changed.
    pub async fn set_search_term(&self, term: impl Into<String>) -> StoreResult<()> {
        let term = term.into();
        let changed = {
            let mut inner = self.inner();
            let changed = inner.view.search_term != term;
            inner.view.search_term = term;
            changed
        };
        if changed { self.refresh().await } else { Ok(()) }
    }

    /// Set filter and search term together and fetch once.
    pub async fn set_view(&self, filter: TaskFilter, term: impl Into<String>) -> StoreResult<()> {
        {
            let mut inner = self.inner();
            inner.view.filter = filter;
            inner.view.search_term = term.into();
        }
        self.refresh().await
    }

    pub fn clear_error(&self) {
        self.inner().view.error = None;
    }

    /// Fetch one task and reconcile it into the list.
    ///
    /// A task already listed is replaced in place. An unlisted one is
    /// appended only if it fits the current filter and search term.
    pub async fn fetch_task(&self, id: &str) -> StoreResult<Task> {
        match self.service.get(id).await {
            Ok(task) => {
                let mut inner = self.inner();
                let view = &mut inner.view;
                match view.position(id) {
                    Some(index) => view.tasks[index] = task.clone(),
                    None if view.shows(&task) => view.tasks.push(task.clone()),
                    None => debug!(id, "Fetched task is outside the current view"),
                }
                Ok(task)
            }
            Err(err) => Err(self.record_failure(StoreError::for_task(id, err), FETCH_FAILED)),
        }
    }

    /// Create on the server, then prepend the confirmed record.
    pub async fn create(&self, data: &TaskFormData) -> StoreResult<Task> {
        self.clear_error();
        match self.service.create(data).await {
            Ok(task) => {
                {
                    let mut inner = self.inner();
                    inner.view.tasks.retain(|t| t.id != task.id);
                    inner.view.tasks.insert(0, task.clone());
                }
                info!(id = %task.id, "Task created");
                self.notifier.publish(
                    Notification::success("Task created").with_message("Your new task has been added."),
                );
                Ok(task)
            }
            Err(err) => Err(self.record_failure(StoreError::from(err), CREATE_FAILED)),
        }
    }

    /// Full update built from `patch` over the local record; the server's
    /// answer replaces the task in place.
    pub async fn update(&self, id: &str, patch: &TaskPatch) -> StoreResult<Task> {
        let _guard = self.lock_task(id).await;
        let data = {
            let mut inner = self.inner();
            inner.view.error = None;
            patch.merge_over(inner.view.get(id))
        };
        let Some(data) = data else {
            return Err(self.record_failure(StoreError::not_found(id), UPDATE_FAILED));
        };

        match self.service.update(id, &data).await {
            Ok(task) => {
                {
                    let mut inner = self.inner();
                    if let Some(slot) = inner.view.tasks.iter_mut().find(|t| t.id == id) {
                        *slot = task.clone();
                    }
                }
                info!(id, "Task updated");
                self.notifier.publish(
                    Notification::success("Task updated").with_message("Your changes have been saved."),
                );
                Ok(task)
            }
            Err(err) => Err(self.record_failure(StoreError::for_task(id, err), UPDATE_FAILED)),
        }
    }

    /// Remove locally, then delete on the server.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let _guard = self.lock_task(id).await;
        let snapshot = {
            let mut inner = self.inner();
            inner.view.error = None;
            inner.view.position(id).map(|index| Snapshot::Removed {
                index,
                task: inner.view.tasks.remove(index),
            })
        };

        match self.service.delete(id).await {
            Ok(()) => {
                info!(id, "Task deleted");
                self.notifier.publish(
                    Notification::success("Task deleted").with_message("The task has been removed."),
                );
                Ok(())
            }
            Err(err) => {
                let err = StoreError::for_task(id, err);
                let restore = self.options.delete_rollback == DeleteRollback::RestoreOnFailure
                    && !matches!(err, StoreError::NotFound { .. });
                if let Some(snapshot) = snapshot.filter(|_| restore) {
                    if self.restore(snapshot) {
                        warn!(id, "Delete failed, task restored");
                    }
                }
                Err(self.record_failure(err, DELETE_FAILED))
            }
        }
    }

    /// Flip `completed` locally, then patch it on the server.
    ///
    /// Returns the new value. An id not in the list fails without a request.
    pub async fn toggle_complete(&self, id: &str) -> StoreResult<bool> {
        let _guard = self.lock_task(id).await;
        let flipped = {
            let mut inner = self.inner();
            inner.view.error = None;
            inner.view.tasks.iter_mut().find(|t| t.id == id).map(|task| {
                let snapshot = Snapshot::Completed {
                    id: task.id.clone(),
                    previous: task.completed,
                };
                task.completed = !task.completed;
                (task.completed, snapshot)
            })
        };
        let Some((completed, snapshot)) = flipped else {
            return Err(self.record_failure(StoreError::not_found(id), UPDATE_FAILED));
        };

        match self.service.set_completed(id, completed).await {
            Ok(_) => {
                info!(id, completed, "Task completion changed");
                let notification = if completed {
                    Notification::success("Task completed!").with_message("Great job!")
                } else {
                    Notification::success("Task marked as incomplete")
                        .with_message("You can continue working on it.")
                };
                self.notifier.publish(notification);
                Ok(completed)
            }
            Err(err) => {
                if self.restore(snapshot) {
                    warn!(id, undone = completed, "Toggle failed, completion rolled back");
                }
                Err(self.record_failure(StoreError::for_task(id, err), UPDATE_FAILED))
            }
        }
    }

    async fn lock_task(&self, id: &str) -> Option<TaskLockGuard> {
        match self.options.same_task {
            SameTaskPolicy::Serialize => Some(self.task_locks.acquire(id).await),
            SameTaskPolicy::LastWriteWins => None,
        }
    }

    fn restore(&self, snapshot: Snapshot) -> bool {
        snapshot.restore(&mut self.inner().view)
    }

    /// Record the failure in state and notify; hands the error back.
    fn record_failure(&self, err: StoreError, fallback: &str) -> StoreError {
        let message = err.user_message(fallback);
        warn!(error = %message, "{}", fallback);
        self.inner().view.error = Some(message.clone());
        self.notifier.publish(Notification::error("Error", message));
        err
    }
}

/// Case-insensitive substring filter on title and description.
fn apply_search(tasks: Vec<Task>, term: &str) -> Vec<Task> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return tasks;
    }
    tasks
        .into_iter()
        .filter(|t| t.matches_lowercase(&needle))
        .collect()
}
