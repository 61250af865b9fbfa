//! Datastore selection within a cluster.

use crate::error::{VmwareError, VmwareResult};
use crate::inventory::{InventoryService, ViewGuard};
use crate::types::*;

use log::{debug, info};

/// Placeholder used in `NotFound` when automatic selection finds nothing.
pub const ANY_ACCESSIBLE: &str = "<any accessible>";

pub struct DatastoreSelector<'a> {
    service: &'a dyn InventoryService,
}

impl<'a> DatastoreSelector<'a> {
    pub fn new(service: &'a dyn InventoryService) -> Self {
        Self { service }
    }

    /// Exact-name match. Entries whose summary cannot be read are skipped.
    pub async fn resolve_named(
        &self,
        cluster: &InventoryEntity,
        name: &str,
    ) -> VmwareResult<DatastoreSummary> {
        let mut found = None;
        self.for_each_summary(cluster, Some(name), |summary| {
            if found.is_none() && summary.name == name {
                found = Some(summary);
            }
        })
        .await?;
        found.ok_or_else(|| VmwareError::not_found(EntityKind::Datastore, name))
    }

    /// The accessible datastore with the most free space. Ties go to the
    /// first one enumerated.
    pub async fn select_largest_free(&self, cluster: &InventoryEntity) -> VmwareResult<DatastoreSummary> {
        let mut largest: Option<DatastoreSummary> = None;
        self.for_each_summary(cluster, None, |summary| {
            if !summary.accessible {
                debug!("Skipping inaccessible datastore '{}'", summary.name);
                return;
            }
            let better = largest
                .as_ref()
                .map_or(true, |best| summary.free_space_bytes > best.free_space_bytes);
            if better {
                largest = Some(summary);
            }
        })
        .await?;

        let ds = largest.ok_or_else(|| VmwareError::not_found(EntityKind::Datastore, ANY_ACCESSIBLE))?;
        info!(
            "Selected datastore '{}' with {} bytes free in cluster '{}'",
            ds.name, ds.free_space_bytes, cluster.name
        );
        Ok(ds)
    }

    /// Visit the readable summary of every datastore under `cluster`, in
    /// enumeration order.
    async fn for_each_summary<F>(
        &self,
        cluster: &InventoryEntity,
        name: Option<&str>,
        mut visit: F,
    ) -> VmwareResult<()>
    where
        F: FnMut(DatastoreSummary) + Send,
    {
        let view = self
            .service
            .open_view(Scope::Within(cluster), EntityKind::Datastore, name)
            .await?;
        let mut view = ViewGuard::new(view, format!("datastores in '{}'", cluster.name));

        while let Some(item) = view.next_entity().await {
            let summary = match item {
                Ok(entity) => self.service.datastore_summary(&entity).await,
                Err(e) => Err(e),
            };
            match summary {
                Ok(s) => visit(s),
                Err(e) if e.is_recoverable() => debug!("Ignoring datastore with issues: {e}"),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
