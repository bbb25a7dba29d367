//! Persistence collaborator.
//!
//! [`TaskStore`] is the seam the controller talks to. [`JsonFileStore`] keeps
//! the whole collection in one pretty-printed JSON file; [`MemoryStore`] keeps
//! it in process.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::task::{NewTask, Task, TaskPatch};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Every task whose owner is `owner`.
    async fn fetch_tasks(&self, owner: &str) -> StoreResult<Vec<Task>>;

    /// Persist a new task and return it with its id and timestamps.
    async fn create_task(&self, owner: &str, task: NewTask) -> StoreResult<Task>;

    /// Write the fields present in `patch` and record `updated_at` as the
    /// last-update time, so the caller's local copy matches what is stored.
    async fn update_task(
        &self,
        task_id: &str,
        patch: &TaskPatch,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn delete_task(&self, task_id: &str) -> StoreResult<()>;
}

fn new_task_id() -> String {
    Uuid::new_v4().to_string()
}

fn patch_in(
    tasks: &mut [Task],
    task_id: &str,
    patch: &TaskPatch,
    updated_at: DateTime<Utc>,
) -> StoreResult<()> {
    let task = tasks
        .iter_mut()
        .find(|t| t.id == task_id)
        .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?;
    patch.apply_to(task, updated_at);
    Ok(())
}

fn remove_from(tasks: &mut Vec<Task>, task_id: &str) -> StoreResult<()> {
    let before = tasks.len();
    tasks.retain(|t| t.id != task_id);
    if tasks.len() == before {
        return Err(StoreError::NotFound(task_id.to_string()));
    }
    Ok(())
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: Mutex<Vec<Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
        }
    }

    pub async fn snapshot(&self) -> Vec<Task> {
        self.tasks.lock().await.clone()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn fetch_tasks(&self, owner: &str) -> StoreResult<Vec<Task>> {
        let tasks = self.tasks.lock().await;
        Ok(tasks.iter().filter(|t| t.created_by == owner).cloned().collect())
    }

    async fn create_task(&self, owner: &str, task: NewTask) -> StoreResult<Task> {
        let task = task.into_task(new_task_id(), owner, Utc::now());
        self.tasks.lock().await.push(task.clone());
        Ok(task)
    }

    async fn update_task(
        &self,
        task_id: &str,
        patch: &TaskPatch,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        patch_in(&mut self.tasks.lock().await, task_id, patch, updated_at)
    }

    async fn delete_task(&self, task_id: &str) -> StoreResult<()> {
        remove_from(&mut *self.tasks.lock().await, task_id)
    }
}

/// Store backed by a single JSON document on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Serialises read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> StoreResult<Vec<Task>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(data) if data.trim().is_empty() => Ok(Vec::new()),
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, tasks: &[Task]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_string_pretty(tasks)?;
        tokio::fs::write(&self.path, data).await?;
        debug!(path = %self.path.display(), count = tasks.len(), "saved tasks");
        Ok(())
    }
}

#[async_trait]
impl TaskStore for JsonFileStore {
    async fn fetch_tasks(&self, owner: &str) -> StoreResult<Vec<Task>> {
        let _guard = self.lock.lock().await;
        let tasks = self.load().await?;
        Ok(tasks.into_iter().filter(|t| t.created_by == owner).collect())
    }

    async fn create_task(&self, owner: &str, task: NewTask) -> StoreResult<Task> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.load().await?;
        let task = task.into_task(new_task_id(), owner, Utc::now());
        tasks.push(task.clone());
        self.save(&tasks).await?;
        Ok(task)
    }

    async fn update_task(
        &self,
        task_id: &str,
        patch: &TaskPatch,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.load().await?;
        patch_in(&mut tasks, task_id, patch, updated_at)?;
        self.save(&tasks).await
    }

    async fn delete_task(&self, task_id: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.load().await?;
        remove_from(&mut tasks, task_id)?;
        self.save(&tasks).await
    }
}
