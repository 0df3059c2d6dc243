use super::types::{Task, TaskSummary};
use crate::error::{Error, Result};
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Task collection with per-task locking.
///
/// Each task sits behind its own mutex, so work on one task never waits
/// on another. `running` records which tasks currently have a driver.
#[derive(Default)]
pub(crate) struct TaskStore {
    tasks: DashMap<String, Arc<Mutex<Task>>>,
    running: Arc<DashSet<String>>,
}

/// Exclusive right to drive one task; released on drop
pub(crate) struct DriverClaim {
    running: Arc<DashSet<String>>,
    task_id: String,
}

impl Drop for DriverClaim {
    fn drop(&mut self) {
        self.running.remove(&self.task_id);
    }
}

impl TaskStore {
    pub(crate) fn insert(&self, task: Task) -> Arc<Mutex<Task>> {
        let id = task.id.clone();
        let handle = Arc::new(Mutex::new(task));
        self.tasks.insert(id, Arc::clone(&handle));
        handle
    }

    pub(crate) fn get(&self, task_id: &str) -> Result<Arc<Mutex<Task>>> {
        self.tasks
            .get(task_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::NotFound(format!("task '{}'", task_id)))
    }

    pub(crate) async fn snapshot(&self, task_id: &str) -> Result<Task> {
        let handle = self.get(task_id)?;
        let task = handle.lock().await;
        Ok(task.clone())
    }

    /// Summaries, newest first
    pub(crate) async fn list(&self) -> Vec<TaskSummary> {
        // collect handles first; no shard guard is held across an await
        let handles: Vec<Arc<Mutex<Task>>> =
            self.tasks.iter().map(|e| Arc::clone(e.value())).collect();
        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            summaries.push(handle.lock().await.summary());
        }
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        summaries
    }

    /// Claim the driver slot for `task_id`; `None` if a driver holds it
    pub(crate) fn try_claim(&self, task_id: &str) -> Option<DriverClaim> {
        self.running.insert(task_id.to_string()).then(|| DriverClaim {
            running: Arc::clone(&self.running),
            task_id: task_id.to_string(),
        })
    }

    pub(crate) fn is_driving(&self, task_id: &str) -> bool {
        self.running.contains(task_id)
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }
}
