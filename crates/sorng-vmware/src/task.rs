//! Fan-in wait over remote tasks via a versioned change feed.
//!
//! One subscription is opened for exactly the tasks passed in; the set
//! cannot grow while waiting. Each batch moves the cursor forward. A task
//! reaching `Success` is dropped from the pending set; the first `Error`
//! aborts the whole wait with that task's fault, leaving any siblings
//! running on the server un-awaited. There is no internal timeout: a
//! caller that needs one wraps the whole call.

use crate::error::{VmwareError, VmwareResult};
use crate::inventory::{InventoryService, SubscriptionGuard};
use crate::types::*;

use log::{debug, warn};
use std::collections::HashSet;

pub struct TaskMonitor<'a> {
    service: &'a dyn InventoryService,
}

impl<'a> TaskMonitor<'a> {
    pub fn new(service: &'a dyn InventoryService) -> Self {
        Self { service }
    }

    /// Returns once every task succeeded, or with `RemoteOperationError`
    /// as soon as any task fails.
    pub async fn wait_for_tasks(&self, tasks: &[TaskHandle]) -> VmwareResult<()> {
        let mut pending: HashSet<&TaskHandle> = tasks.iter().collect();
        if pending.is_empty() {
            return Ok(());
        }

        let subscription = self.service.subscribe_to_changes(tasks).await?;
        let mut subscription = SubscriptionGuard::new(subscription);
        let mut cursor: Option<ChangeCursor> = None;

        while !pending.is_empty() {
            let batch = subscription.wait_for_updates(cursor.as_ref()).await?;
            debug!(
                "Change feed batch {:?}: {} change(s), {} task(s) pending",
                batch.cursor.0,
                batch.changes.len(),
                pending.len()
            );

            for change in batch.changes {
                if !pending.contains(&change.task) {
                    continue;
                }
                match change.state {
                    TaskState::Success => {
                        debug!("Task {} succeeded", change.task);
                        pending.remove(&change.task);
                    }
                    TaskState::Error(fault) => {
                        warn!("Task {} failed: {}", change.task, fault);
                        let payload = fault.payload.unwrap_or_else(|| fault.message.clone());
                        return Err(VmwareError::remote_operation(
                            format!("Task {} failed: {}", change.task, fault.message),
                            payload,
                        ));
                    }
                    TaskState::Pending => {}
                }
            }
            cursor = Some(batch.cursor);
        }
        Ok(())
    }
}
