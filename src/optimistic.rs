//! Optimistic mutations with rollback.
//!
//! A mutation is applied to the local collection first ([`MutationLedger::begin`]),
//! then settled with the result of the remote call ([`MutationLedger::settle`]).
//!
//! While a task has mutations in flight the ledger keeps its last confirmed
//! value (the base) and every patch issued since, in issue order. The local
//! task is always the base with the surviving patches replayed on top: a
//! failed patch is dropped, a successful one stays in place until every older
//! patch has settled and is then folded into the base. So a failure only ever
//! removes its own change, whatever order the remote calls finish in.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{Error, Result, StoreError};
use crate::task::{Task, TaskPatch};

/// Handle for a mutation whose remote call is still in flight.
#[derive(Debug, Clone)]
#[must_use = "a pending mutation must be settled"]
pub struct PendingMutation {
    task_id: String,
    seq: u64,
    at: DateTime<Utc>,
    patch: TaskPatch,
}

impl PendingMutation {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn patch(&self) -> &TaskPatch {
        &self.patch
    }

    /// Last-update time written locally; the store must record the same one.
    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }
}

#[derive(Debug)]
struct Entry {
    seq: u64,
    patch: TaskPatch,
    at: DateTime<Utc>,
    committed: bool,
}

#[derive(Debug)]
struct TaskLog {
    base: Task,
    entries: Vec<Entry>,
}

impl TaskLog {
    /// Fold the committed prefix into the base.
    fn collapse(&mut self) {
        while self.entries.first().is_some_and(|entry| entry.committed) {
            let entry = self.entries.remove(0);
            entry.patch.apply_to(&mut self.base, entry.at);
        }
    }

    fn current(&self) -> Task {
        let mut task = self.base.clone();
        for entry in &self.entries {
            entry.patch.apply_to(&mut task, entry.at);
        }
        task
    }

    fn pending(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.committed).count()
    }
}

#[derive(Debug, Default)]
pub struct MutationLedger {
    next_seq: u64,
    logs: HashMap<String, TaskLog>,
}

impl MutationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `patch` to the task in place and record it as in flight.
    pub fn begin(
        &mut self,
        tasks: &mut [Task],
        task_id: &str,
        patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<PendingMutation> {
        let task = find(tasks, task_id)?;
        let log = self
            .logs
            .entry(task_id.to_string())
            .or_insert_with(|| TaskLog {
                base: task.clone(),
                entries: Vec::new(),
            });

        patch.apply_to(task, now);
        self.next_seq += 1;
        log.entries.push(Entry {
            seq: self.next_seq,
            patch: patch.clone(),
            at: now,
            committed: false,
        });

        Ok(PendingMutation {
            task_id: task_id.to_string(),
            seq: self.next_seq,
            at: now,
            patch,
        })
    }

    /// Commit or revert a pending mutation.
    ///
    /// On failure only this mutation's patch is withdrawn; the store error is
    /// returned after the task has been rebuilt.
    pub fn settle(
        &mut self,
        tasks: &mut [Task],
        pending: PendingMutation,
        remote: std::result::Result<(), StoreError>,
    ) -> Result<Task> {
        let Some(log) = self.logs.get_mut(&pending.task_id) else {
            // Task was removed while the call was in flight.
            return match remote {
                Ok(()) => Err(Error::TaskNotFound(pending.task_id)),
                Err(err) => {
                    warn!(task_id = %pending.task_id, error = %err, "remote update failed for a removed task");
                    Err(Error::Store(err))
                }
            };
        };

        let position = log.entries.iter().position(|entry| entry.seq == pending.seq);
        let failure = match (remote, position) {
            (Ok(()), Some(pos)) => {
                log.entries[pos].committed = true;
                None
            }
            (Err(err), Some(pos)) => {
                log.entries.remove(pos);
                Some(err)
            }
            (Ok(()), None) => None,
            (Err(err), None) => Some(err),
        };

        log.collapse();
        let rebuilt = log.current();
        let in_flight = log.pending();
        if log.entries.is_empty() {
            self.logs.remove(&pending.task_id);
        }

        let task = find(tasks, &pending.task_id)?;
        *task = rebuilt;

        match failure {
            None => {
                debug!(task_id = %pending.task_id, "mutation committed");
                Ok(task.clone())
            }
            Some(err) => {
                warn!(
                    task_id = %pending.task_id,
                    error = %err,
                    in_flight,
                    status = %task.status,
                    "remote update failed, change withdrawn"
                );
                Err(Error::Store(err))
            }
        }
    }

    /// Record a change the store has already accepted.
    ///
    /// Any mutations still in flight stay replayed on top of it.
    pub fn commit(
        &mut self,
        tasks: &mut [Task],
        task_id: &str,
        patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<Task> {
        let task = find(tasks, task_id)?;
        match self.logs.get_mut(task_id) {
            Some(log) => {
                self.next_seq += 1;
                log.entries.push(Entry {
                    seq: self.next_seq,
                    patch,
                    at: now,
                    committed: true,
                });
                log.collapse();
                *task = log.current();
                if log.entries.is_empty() {
                    self.logs.remove(task_id);
                }
            }
            None => patch.apply_to(task, now),
        }
        Ok(task.clone())
    }

    /// Drop tracking for a removed task.
    pub fn forget(&mut self, task_id: &str) {
        self.logs.remove(task_id);
    }
}

fn find<'a>(tasks: &'a mut [Task], task_id: &str) -> Result<&'a mut Task> {
    tasks
        .iter_mut()
        .find(|t| t.id == task_id)
        .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))
}
