use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use taskbuddy::error::StoreError;
use taskbuddy::store::{MemoryStore, StoreResult, TaskStore};
use taskbuddy::task::{Category, NewTask, Task, TaskPatch, TaskStatus};

pub const OWNER: &str = "Ada Lovelace";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn task(id: &str, title: &str, status: TaskStatus, categories: &[Category]) -> Task {
    let mut task = NewTask::new(title, date(2025, 4, 1), categories.iter().copied())
        .with_status(status)
        .into_task(id.to_string(), OWNER, Utc::now() - chrono::Duration::hours(1));
    task.description = format!("{title} details");
    task
}

/// Store double that rejects calls for chosen task ids.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: Mutex<HashSet<String>>,
    fail_fetch: bool,
    calls: Mutex<Vec<String>>,
}

impl FlakyStore {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            inner: MemoryStore::with_tasks(tasks),
            ..Self::default()
        }
    }

    pub fn failing_fetch() -> Self {
        Self {
            fail_fetch: true,
            ..Self::default()
        }
    }

    pub fn fail_for(&self, task_id: &str) {
        self.failing.lock().unwrap().insert(task_id.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub async fn stored(&self) -> Vec<Task> {
        self.inner.snapshot().await
    }

    fn check(&self, call: &str, task_id: &str) -> StoreResult<()> {
        self.calls.lock().unwrap().push(format!("{call}:{task_id}"));
        if self.failing.lock().unwrap().contains(task_id) {
            return Err(StoreError::Unavailable(format!("{call} rejected")));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for FlakyStore {
    async fn fetch_tasks(&self, owner: &str) -> StoreResult<Vec<Task>> {
        if self.fail_fetch {
            return Err(StoreError::Unavailable("fetch rejected".into()));
        }
        self.inner.fetch_tasks(owner).await
    }

    async fn create_task(&self, owner: &str, task: NewTask) -> StoreResult<Task> {
        self.check("create", &task.title)?;
        self.inner.create_task(owner, task).await
    }

    async fn update_task(
        &self,
        task_id: &str,
        patch: &TaskPatch,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.check("update", task_id)?;
        self.inner.update_task(task_id, patch, updated_at).await
    }

    async fn delete_task(&self, task_id: &str) -> StoreResult<()> {
        self.check("delete", task_id)?;
        self.inner.delete_task(task_id).await
    }
}
