//! Remote-service boundary: inventory enumeration, remote operations and
//! the task change feed, plus the guards that own their scoped handles.
//!
//! Enumeration views and change-feed subscriptions are remote resources.
//! Whoever opens one wraps it in [`ViewGuard`] / [`SubscriptionGuard`],
//! which release it exactly once, on drop if nobody released it earlier.

use crate::error::VmwareResult;
use crate::types::*;

use async_trait::async_trait;
use log::{debug, warn};

/// An open enumeration over the entities of one kind below a scope.
///
/// Items are yielded one at a time; an individual item may fail with an
/// `AccessError`, which callers skip.
#[async_trait]
pub trait InventoryView: Send {
    /// Next entity, or `None` once the view is exhausted.
    async fn next_entity(&mut self) -> Option<VmwareResult<InventoryEntity>>;

    /// Release the server-side handle. Called exactly once by [`ViewGuard`].
    fn release(&mut self);
}

/// A change-feed subscription over a fixed set of tasks.
#[async_trait]
pub trait TaskSubscription: Send {
    /// Block until the server has changes newer than `cursor`.
    async fn wait_for_updates(&mut self, cursor: Option<&ChangeCursor>) -> VmwareResult<UpdateBatch>;

    /// Destroy the server-side filter. Called exactly once by [`SubscriptionGuard`].
    fn release(&mut self);
}

/// An authenticated session against the inventory.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Top-level datacenters, in server enumeration order.
    async fn list_datacenters(&self) -> VmwareResult<Vec<InventoryEntity>>;

    /// Open a recursive view of `kind` entities below `scope`. `name` is a
    /// server-side filter hint only; callers still compare names exactly.
    async fn open_view(
        &self,
        scope: Scope<'_>,
        kind: EntityKind,
        name: Option<&str>,
    ) -> VmwareResult<Box<dyn InventoryView>>;

    /// Read a datastore's capacity summary. May fail with `AccessError`.
    async fn datastore_summary(&self, datastore: &InventoryEntity) -> VmwareResult<DatastoreSummary>;

    async fn power_state(&self, vm: &InventoryEntity) -> VmwareResult<VmPowerState>;

    /// Start an asynchronous operation and return its task handle.
    async fn issue_operation(
        &self,
        target: &InventoryEntity,
        operation: OperationKind,
    ) -> VmwareResult<TaskHandle>;

    /// Subscribe to state changes of exactly `tasks`.
    async fn subscribe_to_changes(&self, tasks: &[TaskHandle]) -> VmwareResult<Box<dyn TaskSubscription>>;

    /// End the session. Errors are logged, never returned.
    async fn disconnect(&self);
}

/// Establishes sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Fails with `AuthenticationError` on bad credentials and
    /// `ConnectionError` when the endpoint cannot be reached.
    async fn connect(&self, config: &VsphereConfig) -> VmwareResult<Box<dyn InventoryService>>;
}

// ─── Guards ─────────────────────────────────────────────────────────

/// Owns an [`InventoryView`] for the duration of one search.
pub struct ViewGuard {
    view: Option<Box<dyn InventoryView>>,
    label: String,
}

impl ViewGuard {
    pub fn new(view: Box<dyn InventoryView>, label: impl Into<String>) -> Self {
        Self { view: Some(view), label: label.into() }
    }

    pub async fn next_entity(&mut self) -> Option<VmwareResult<InventoryEntity>> {
        match self.view.as_mut() {
            Some(v) => v.next_entity().await,
            None => None,
        }
    }

    /// Release now instead of at drop.
    pub fn release(&mut self) {
        if let Some(mut view) = self.view.take() {
            debug!("Releasing inventory view for {}", self.label);
            view.release();
        }
    }
}

impl Drop for ViewGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Owns a [`TaskSubscription`] for the duration of one wait.
pub struct SubscriptionGuard {
    subscription: Option<Box<dyn TaskSubscription>>,
}

impl SubscriptionGuard {
    pub fn new(subscription: Box<dyn TaskSubscription>) -> Self {
        Self { subscription: Some(subscription) }
    }

    pub async fn wait_for_updates(&mut self, cursor: Option<&ChangeCursor>) -> VmwareResult<UpdateBatch> {
        match self.subscription.as_mut() {
            Some(s) => s.wait_for_updates(cursor).await,
            None => {
                warn!("wait_for_updates called on a released subscription");
                Err(crate::error::VmwareError::new(
                    crate::error::VmwareErrorKind::Other,
                    "Change-feed subscription already released",
                ))
            }
        }
    }

    pub fn release(&mut self) {
        if let Some(mut sub) = self.subscription.take() {
            debug!("Releasing change-feed subscription");
            sub.release();
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.release();
    }
}
