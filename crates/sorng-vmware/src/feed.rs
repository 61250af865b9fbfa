//! Task change feed for the REST backend.
//!
//! The REST API has no property-collector long poll, so the feed polls
//! `GET /api/cis/tasks/{id}` for exactly the subscribed tasks and only
//! hands back a batch once something differs from what it last reported.
//! Each batch carries a fresh, monotonically increasing cursor.
//!
//! Operations the REST API finished synchronously never get a server task;
//! their handles sit in a [`CompletedTasks`] set shared with the inventory
//! and are reported as succeeded without a request.

use crate::error::{VmwareError, VmwareErrorKind, VmwareResult};
use crate::inventory::TaskSubscription;
use crate::types::*;
use crate::vsphere::VsphereClient;

use async_trait::async_trait;
use log::{debug, trace};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Handles of operations that already completed when they were issued.
pub type CompletedTasks = Arc<RwLock<HashSet<TaskHandle>>>;

pub struct PollingTaskFeed {
    client: Arc<VsphereClient>,
    tasks: Vec<TaskHandle>,
    completed: CompletedTasks,
    reported: HashMap<TaskHandle, TaskState>,
    version: u64,
    interval: Duration,
    released: bool,
}

impl PollingTaskFeed {
    pub fn new(
        client: Arc<VsphereClient>,
        tasks: Vec<TaskHandle>,
        interval: Duration,
        completed: CompletedTasks,
    ) -> Self {
        Self {
            client,
            tasks,
            completed,
            reported: HashMap::new(),
            version: 0,
            interval,
            released: false,
        }
    }

    async fn poll_once(&self) -> VmwareResult<Vec<(TaskHandle, TaskState)>> {
        let mut polled = Vec::with_capacity(self.tasks.len());
        for task in &self.tasks {
            if self.completed.read().await.contains(task) {
                polled.push((task.clone(), TaskState::Success));
                continue;
            }
            let info: TaskInfo = self.client.get(&format!("/api/cis/tasks/{}", task.id())).await?;
            trace!("Task {} status {:?}", task, info.status);
            polled.push((task.clone(), info.state()));
        }
        Ok(polled)
    }
}

/// Changes between what was last reported and what was just polled.
/// `reported` is updated in place.
fn diff_states(
    reported: &mut HashMap<TaskHandle, TaskState>,
    polled: Vec<(TaskHandle, TaskState)>,
) -> Vec<TaskChange> {
    polled
        .into_iter()
        .filter_map(|(task, state)| {
            if reported.get(&task) == Some(&state) {
                return None;
            }
            reported.insert(task.clone(), state.clone());
            Some(TaskChange { task, state })
        })
        .collect()
}

#[async_trait]
impl TaskSubscription for PollingTaskFeed {
    async fn wait_for_updates(&mut self, cursor: Option<&ChangeCursor>) -> VmwareResult<UpdateBatch> {
        if self.released {
            return Err(VmwareError::new(
                VmwareErrorKind::Other,
                "Change-feed subscription already released",
            ));
        }
        if let Some(c) = cursor {
            if c.0 != self.version.to_string() {
                debug!("Cursor {} is behind feed version {}", c.0, self.version);
            }
        }

        loop {
            let polled = self.poll_once().await?;
            let changes = diff_states(&mut self.reported, polled);
            if !changes.is_empty() {
                self.version += 1;
                return Ok(UpdateBatch {
                    cursor: ChangeCursor(self.version.to_string()),
                    changes,
                });
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    fn release(&mut self) {
        self.released = true;
        self.reported.clear();
        debug!("Stopped polling {} task(s)", self.tasks.len());
    }
}
