//! Named-entity lookup within the inventory hierarchy.
//!
//! Default selection ("first datacenter", "first cluster") follows the
//! server's enumeration order, which is implementation-defined and not
//! guaranteed stable across backends. Callers that need a specific
//! datacenter or cluster must name it.

use crate::error::{VmwareError, VmwareResult};
use crate::inventory::{InventoryService, ViewGuard};
use crate::types::*;

use log::debug;

/// Placeholder name used in `NotFound` when no specific name was requested.
pub const ANY: &str = "<any>";

pub struct InventoryResolver<'a> {
    service: &'a dyn InventoryService,
}

impl<'a> InventoryResolver<'a> {
    pub fn new(service: &'a dyn InventoryService) -> Self {
        Self { service }
    }

    /// Exact match among top-level datacenters, or the first one when
    /// `name` is `None`.
    pub async fn resolve_datacenter(&self, name: Option<&str>) -> VmwareResult<InventoryEntity> {
        let datacenters = self.service.list_datacenters().await?;
        let found = match name {
            Some(n) => datacenters.into_iter().find(|dc| dc.name == n),
            None => datacenters.into_iter().next(),
        };
        let dc = found.ok_or_else(|| {
            VmwareError::not_found(EntityKind::Datacenter, name.unwrap_or(ANY))
        })?;
        debug!("Resolved datacenter '{}' ({})", dc.name, dc.id);
        Ok(dc)
    }

    /// Recursive search for a cluster under `dc`, or the first one found
    /// when `name` is `None`.
    pub async fn resolve_cluster(
        &self,
        dc: &InventoryEntity,
        name: Option<&str>,
    ) -> VmwareResult<InventoryEntity> {
        let cluster = self
            .find_first(Scope::Within(dc), EntityKind::Cluster, name)
            .await?
            .ok_or_else(|| VmwareError::not_found(EntityKind::Cluster, name.unwrap_or(ANY)))?;
        debug!("Resolved cluster '{}' ({}) in '{}'", cluster.name, cluster.id, dc.name);
        Ok(cluster)
    }

    /// Search the entire inventory, not bounded by any datacenter or cluster.
    /// Used when deleting.
    pub async fn find_vm_globally_by_name(&self, name: &str) -> VmwareResult<Option<InventoryEntity>> {
        self.find_first(Scope::Root, EntityKind::VirtualMachine, Some(name)).await
    }

    /// Search only below `scope` (a cluster). Used for the existence check
    /// when creating, so a same-named VM elsewhere does not block deployment.
    pub async fn exists_vm_in_scope(&self, scope: &InventoryEntity, name: &str) -> VmwareResult<bool> {
        Ok(self
            .find_first(Scope::Within(scope), EntityKind::VirtualMachine, Some(name))
            .await?
            .is_some())
    }

    /// First entity of `kind` below `scope` whose name equals `name` (or the
    /// first readable one when `name` is `None`). Unreadable entries are
    /// skipped. The view is released on every return path.
    async fn find_first(
        &self,
        scope: Scope<'_>,
        kind: EntityKind,
        name: Option<&str>,
    ) -> VmwareResult<Option<InventoryEntity>> {
        let view = self.service.open_view(scope, kind, name).await?;
        let mut view = ViewGuard::new(view, format!("{kind} in {scope}"));

        while let Some(item) = view.next_entity().await {
            let entity = match item {
                Ok(e) => e,
                Err(e) if e.is_recoverable() => {
                    debug!("Skipping unreadable {kind} in {scope}: {e}");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if name.map_or(true, |n| entity.name == n) {
                return Ok(Some(entity));
            }
        }
        Ok(None)
    }
}
