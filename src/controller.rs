//! Task list controller.
//!
//! Owns the signed-in user's task collection and the filtered view derived
//! from it. Every change to the collection recomputes the view before
//! returning, so callers never see the two out of step.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result, StoreError};
use crate::filter::{apply_filters, group_by_status, TaskFilter};
use crate::optimistic::{MutationLedger, PendingMutation};
use crate::session::Session;
use crate::store::TaskStore;
use crate::task::{NewTask, Task, TaskPatch, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    SetStatus(TaskStatus),
    Delete,
}

/// Per-item outcome of a bulk action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

impl BulkReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct TaskListController<S> {
    store: S,
    owner: String,
    tasks: Vec<Task>,
    filter: TaskFilter,
    search: String,
    filtered: Vec<Task>,
    selected: Vec<String>,
    ledger: MutationLedger,
}

impl<S: TaskStore> TaskListController<S> {
    pub fn new(store: S, session: &Session) -> Self {
        Self::for_owner(store, session.owner_id())
    }

    pub fn for_owner(store: S, owner: impl Into<String>) -> Self {
        Self {
            store,
            owner: owner.into(),
            tasks: Vec::new(),
            filter: TaskFilter::default(),
            search: String::new(),
            filtered: Vec::new(),
            selected: Vec::new(),
            ledger: MutationLedger::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replace the collection with the owner's tasks from the store.
    ///
    /// A failed fetch leaves an empty collection.
    pub async fn load(&mut self) -> usize {
        self.tasks = match self.store.fetch_tasks(&self.owner).await {
            Ok(tasks) => tasks,
            Err(err) => {
                error!(owner = %self.owner, error = %err, "failed to fetch tasks");
                Vec::new()
            }
        };
        self.ledger = MutationLedger::new();
        self.recompute();
        info!(owner = %self.owner, count = self.tasks.len(), "loaded tasks");
        self.tasks.len()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// The collection after the current filter and search text.
    pub fn filtered(&self) -> &[Task] {
        &self.filtered
    }

    /// The filtered view split into board columns.
    pub fn grouped(&self) -> [(TaskStatus, Vec<&Task>); 3] {
        group_by_status(&self.filtered)
    }

    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
        self.recompute();
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
        self.recompute();
    }

    pub fn clear_filters(&mut self) {
        self.filter = TaskFilter::default();
        self.search.clear();
        self.recompute();
    }

    /// Create a task through the guarded path and add it to the collection.
    pub async fn add_task(&mut self, task: NewTask) -> Result<Task> {
        task.validate()?;
        let created = self
            .store
            .create_task(&self.owner, task)
            .await
            .map_err(|err| {
                error!(error = %err, "failed to add task");
                err
            })?;
        info!(task_id = %created.id, "task added");
        self.tasks.push(created.clone());
        self.recompute();
        Ok(created)
    }

    /// Apply `patch` locally and return the handle to settle once the remote
    /// call finishes.
    pub fn begin_update(&mut self, task_id: &str, patch: TaskPatch) -> Result<PendingMutation> {
        if patch.is_empty() {
            return Err(Error::EmptyPatch(task_id.to_string()));
        }
        patch.validate()?;
        let pending = self.ledger.begin(&mut self.tasks, task_id, patch, Utc::now())?;
        self.recompute();
        Ok(pending)
    }

    /// Commit or revert a mutation started with [`Self::begin_update`].
    pub fn settle(
        &mut self,
        pending: PendingMutation,
        remote: std::result::Result<(), StoreError>,
    ) -> Result<Task> {
        let result = self.ledger.settle(&mut self.tasks, pending, remote);
        self.recompute();
        result
    }

    /// Optimistically edit a task, reverting if the store rejects the change.
    pub async fn update_task(&mut self, task_id: &str, patch: TaskPatch) -> Result<Task> {
        let pending = self.begin_update(task_id, patch)?;
        let remote = self
            .store
            .update_task(pending.task_id(), pending.patch(), pending.at())
            .await;
        self.settle(pending, remote)
    }

    /// Move a task to another column. Moving onto its own column is a no-op.
    pub async fn move_task(&mut self, task_id: &str, status: TaskStatus) -> Result<Task> {
        let current = self
            .task(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        if current.status == status {
            return Ok(current.clone());
        }
        debug!(task_id, from = %current.status, to = %status, "moving task");
        self.update_task(task_id, TaskPatch::status(status)).await
    }

    /// Delete remotely, then drop the task locally.
    pub async fn delete_task(&mut self, task_id: &str) -> Result<()> {
        if self.task(task_id).is_none() {
            return Err(Error::TaskNotFound(task_id.to_string()));
        }
        if let Err(err) = self.store.delete_task(task_id).await {
            error!(task_id, error = %err, "failed to delete task");
            return Err(err.into());
        }
        self.remove_local(task_id);
        self.recompute();
        info!(task_id, "task deleted");
        Ok(())
    }

    /// Apply `action` to each id in turn. Failures are logged and reported,
    /// never rolled back.
    pub async fn bulk_apply(&mut self, task_ids: &[String], action: BulkAction) -> BulkReport {
        let mut report = BulkReport::default();
        for task_id in task_ids {
            match self.apply_one(task_id, action).await {
                Ok(()) => report.succeeded.push(task_id.clone()),
                Err(err) => {
                    warn!(task_id = %task_id, ?action, error = %err, "bulk action failed");
                    report.failed.push(task_id.clone());
                }
            }
        }
        self.recompute();
        info!(
            ?action,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "bulk action finished"
        );
        report
    }

    async fn apply_one(&mut self, task_id: &str, action: BulkAction) -> Result<()> {
        if self.task(task_id).is_none() {
            return Err(Error::TaskNotFound(task_id.to_string()));
        }
        match action {
            BulkAction::SetStatus(status) => {
                let patch = TaskPatch::status(status);
                let now = Utc::now();
                self.store.update_task(task_id, &patch, now).await?;
                self.ledger.commit(&mut self.tasks, task_id, patch, now)?;
            }
            BulkAction::Delete => {
                self.store.delete_task(task_id).await?;
                self.remove_local(task_id);
            }
        }
        Ok(())
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, task_id: &str) -> bool {
        self.selected.iter().any(|id| id == task_id)
    }

    /// Returns whether the task is selected afterwards.
    pub fn toggle_selection(&mut self, task_id: &str) -> bool {
        if let Some(pos) = self.selected.iter().position(|id| id == task_id) {
            self.selected.remove(pos);
            false
        } else if self.task(task_id).is_some() {
            self.selected.push(task_id.to_string());
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Run `action` over the selection and clear it.
    pub async fn bulk_apply_selected(&mut self, action: BulkAction) -> BulkReport {
        let selected = std::mem::take(&mut self.selected);
        self.bulk_apply(&selected, action).await
    }

    fn remove_local(&mut self, task_id: &str) {
        self.tasks.retain(|t| t.id != task_id);
        self.ledger.forget(task_id);
    }

    fn recompute(&mut self) {
        self.filtered = apply_filters(&self.tasks, &self.filter, &self.search);
        let tasks = &self.tasks;
        self.selected.retain(|id| tasks.iter().any(|t| &t.id == id));
    }
}
