//! REST-backed implementation of the remote-service traits.
//!
//! `RestConnector` opens a session; `RestInventory` owns the shared
//! `VsphereClient` and answers inventory queries through the per-area
//! managers. Listing endpoints return whole pages, so views are
//! prefetched and enumerated locally.

use crate::error::{VmwareError, VmwareErrorKind, VmwareResult};
use crate::feed::{CompletedTasks, PollingTaskFeed};
use crate::inventory::{Connector, InventoryService, InventoryView, TaskSubscription};
use crate::placement::PlacementManager;
use crate::types::*;
use crate::vm::VmManager;
use crate::vsphere::VsphereClient;

use async_trait::async_trait;
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Session factory for the vSphere REST API.
#[derive(Debug, Default, Clone, Copy)]
pub struct RestConnector;

#[async_trait]
impl Connector for RestConnector {
    async fn connect(&self, config: &VsphereConfig) -> VmwareResult<Box<dyn InventoryService>> {
        let client = VsphereClient::new(config)?;
        client.login().await?;
        info!("Logged in to {} as {}", config.host, config.username);
        Ok(Box::new(RestInventory::new(Arc::new(client))))
    }
}

/// Authenticated inventory session.
pub struct RestInventory {
    client: Arc<VsphereClient>,
    poll_interval: Duration,
    completed: CompletedTasks,
    issued: AtomicU64,
}

impl RestInventory {
    pub fn new(client: Arc<VsphereClient>) -> Self {
        let poll_interval = Duration::from_millis(client.config().task_poll_interval_ms);
        Self {
            client,
            poll_interval,
            completed: CompletedTasks::default(),
            issued: AtomicU64::new(0),
        }
    }

    /// Datacenter ids a scope covers. The REST API cannot filter
    /// datastores (or clusters) by anything narrower, so a cluster widens
    /// to the datacenter it belongs to.
    async fn datacenters_for(&self, scope: Scope<'_>) -> VmwareResult<Vec<String>> {
        match scope {
            Scope::Root => Ok(PlacementManager::new(&self.client)
                .list_datacenters()
                .await?
                .into_iter()
                .map(|dc| dc.datacenter)
                .collect()),
            Scope::Within(e) if e.kind == EntityKind::Datacenter => Ok(vec![e.id.clone()]),
            Scope::Within(e) => e.datacenter.clone().map(|dc| vec![dc]).ok_or_else(|| {
                VmwareError::invalid_request(format!("{} '{}' has no known datacenter", e.kind, e.name))
            }),
        }
    }

    async fn list_clusters(&self, scope: Scope<'_>, name: Option<&str>) -> VmwareResult<Vec<InventoryEntity>> {
        let placement = PlacementManager::new(&self.client);
        let mut out = Vec::new();
        for dc in self.datacenters_for(scope).await? {
            for c in placement.list_clusters_in_datacenter(&dc, name).await? {
                out.push(InventoryEntity::new(EntityKind::Cluster, c.cluster, c.name).in_datacenter(dc.clone()));
            }
        }
        Ok(out)
    }

    async fn list_datastores(&self, scope: Scope<'_>, name: Option<&str>) -> VmwareResult<Vec<InventoryEntity>> {
        let placement = PlacementManager::new(&self.client);
        let datacenters = self.datacenters_for(scope).await?;
        if let Scope::Within(e) = scope {
            if e.kind == EntityKind::Cluster {
                warn!(
                    "Datastores cannot be listed per cluster; considering every datastore in {} for cluster '{}', some may not be mounted on it",
                    datacenters.join(", "),
                    e.name
                );
            }
        }
        let mut out = Vec::new();
        for dc in datacenters {
            for ds in placement.list_datastores_in_datacenter(&dc, name).await? {
                out.push(InventoryEntity::new(EntityKind::Datastore, ds.datastore, ds.name).in_datacenter(dc.clone()));
            }
        }
        Ok(out)
    }

    async fn list_vms(&self, scope: Scope<'_>, name: Option<&str>) -> VmwareResult<Vec<InventoryEntity>> {
        let names: Vec<&str> = name.into_iter().collect();
        let names = (!names.is_empty()).then_some(names.as_slice());
        let vms = match scope {
            Scope::Root => VmManager::new(&self.client).list_vms(names, None, None).await?,
            Scope::Within(e) => match e.kind {
                EntityKind::Cluster => {
                    VmManager::new(&self.client)
                        .list_vms(names, Some(&[e.id.as_str()][..]), None)
                        .await?
                }
                EntityKind::Datacenter => {
                    VmManager::new(&self.client)
                        .list_vms(names, None, Some(&[e.id.as_str()][..]))
                        .await?
                }
                other => {
                    return Err(VmwareError::invalid_request(format!(
                        "Cannot enumerate virtual machines below a {other}"
                    )))
                }
            },
        };
        Ok(vms
            .into_iter()
            .map(|vm| InventoryEntity::new(EntityKind::VirtualMachine, vm.vm, vm.name))
            .collect())
    }
}

/// 404 on an entity-specific endpoint means the entity vanished.
fn entity_missing(kind: EntityKind, entity: &InventoryEntity) -> impl FnOnce(VmwareError) -> VmwareError + '_ {
    move |e| match e.kind {
        VmwareErrorKind::ApiError(404) => VmwareError::not_found(kind, entity.name.clone()),
        _ => e,
    }
}

#[async_trait]
impl InventoryService for RestInventory {
    async fn list_datacenters(&self) -> VmwareResult<Vec<InventoryEntity>> {
        Ok(PlacementManager::new(&self.client)
            .list_datacenters()
            .await?
            .into_iter()
            .map(|dc| {
                let id = dc.datacenter;
                InventoryEntity::new(EntityKind::Datacenter, id.clone(), dc.name).in_datacenter(id)
            })
            .collect())
    }

    async fn open_view(
        &self,
        scope: Scope<'_>,
        kind: EntityKind,
        name: Option<&str>,
    ) -> VmwareResult<Box<dyn InventoryView>> {
        let items = match kind {
            EntityKind::Datacenter => {
                let mut dcs = self.list_datacenters().await?;
                if let Scope::Within(e) = scope {
                    dcs.retain(|dc| dc.id == e.id);
                }
                dcs
            }
            EntityKind::Cluster => self.list_clusters(scope, name).await?,
            EntityKind::Datastore => self.list_datastores(scope, name).await?,
            EntityKind::VirtualMachine => self.list_vms(scope, name).await?,
        };
        debug!("Opened view of {} {} in {}", items.len(), kind, scope);
        Ok(Box::new(RestView::new(items, format!("{kind} in {scope}"))))
    }

    async fn datastore_summary(&self, datastore: &InventoryEntity) -> VmwareResult<DatastoreSummary> {
        let info = PlacementManager::new(&self.client)
            .get_datastore(&datastore.id)
            .await
            .map_err(|e| match e.kind {
                VmwareErrorKind::ConnectionError
                | VmwareErrorKind::AuthenticationError
                | VmwareErrorKind::Timeout => e,
                _ => VmwareError::access(format!("Cannot read summary of datastore '{}': {e}", datastore.name)),
            })?;
        Ok(DatastoreSummary {
            datastore: datastore.id.clone(),
            name: info.name,
            free_space_bytes: info.free_space.unwrap_or(0),
            accessible: info.accessible.unwrap_or(false),
        })
    }

    async fn power_state(&self, vm: &InventoryEntity) -> VmwareResult<VmPowerState> {
        VmManager::new(&self.client)
            .get_power_state(&vm.id)
            .await
            .map_err(entity_missing(EntityKind::VirtualMachine, vm))
    }

    /// Power-off and destroy finish before the REST call returns, so the
    /// handle handed back is already recorded as succeeded.
    async fn issue_operation(
        &self,
        target: &InventoryEntity,
        operation: OperationKind,
    ) -> VmwareResult<TaskHandle> {
        if target.kind != EntityKind::VirtualMachine {
            return Err(VmwareError::invalid_request(format!(
                "Cannot {operation} a {}",
                target.kind
            )));
        }
        let vms = VmManager::new(&self.client);
        let outcome = match operation {
            OperationKind::PowerOff => vms.power_off(&target.id).await,
            OperationKind::Destroy => vms.delete_vm(&target.id).await,
        };
        outcome.map_err(entity_missing(EntityKind::VirtualMachine, target))?;

        let seq = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        let task = TaskHandle::new(format!("{}:{operation}:{seq}", target.id));
        self.completed.write().await.insert(task.clone());
        debug!("{operation} of {} completed as {task}", target.id);
        Ok(task)
    }

    async fn subscribe_to_changes(&self, tasks: &[TaskHandle]) -> VmwareResult<Box<dyn TaskSubscription>> {
        Ok(Box::new(PollingTaskFeed::new(
            self.client.clone(),
            tasks.to_vec(),
            self.poll_interval,
            self.completed.clone(),
        )))
    }

    async fn disconnect(&self) {
        match self.client.logout().await {
            Ok(()) => info!("Disconnected from {}", self.client.config().host),
            Err(e) => warn!("Logout from {} failed: {e}", self.client.config().host),
        }
    }
}

/// Prefetched enumeration.
pub struct RestView {
    items: VecDeque<InventoryEntity>,
    label: String,
    released: bool,
}

impl RestView {
    pub fn new(items: Vec<InventoryEntity>, label: String) -> Self {
        Self { items: items.into(), label, released: false }
    }
}

#[async_trait]
impl InventoryView for RestView {
    async fn next_entity(&mut self) -> Option<VmwareResult<InventoryEntity>> {
        if self.released {
            return None;
        }
        self.items.pop_front().map(Ok)
    }

    fn release(&mut self) {
        self.released = true;
        self.items.clear();
        debug!("Released view of {}", self.label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskMonitor;
    use crate::testing::StubServer;

    fn client() -> Arc<VsphereClient> {
        Arc::new(VsphereClient::new(&VsphereConfig { task_poll_interval_ms: 250, ..VsphereConfig::default() }).unwrap())
    }

    #[tokio::test]
    async fn view_yields_in_order_and_stops_after_release() {
        let mut view = RestView::new(
            vec![
                InventoryEntity::new(EntityKind::Cluster, "domain-c1", "A"),
                InventoryEntity::new(EntityKind::Cluster, "domain-c2", "B"),
            ],
            "clusters".into(),
        );
        assert_eq!(view.next_entity().await.unwrap().unwrap().name, "A");
        view.release();
        assert!(view.next_entity().await.is_none());
    }

    #[tokio::test]
    async fn cluster_scope_widens_to_its_datacenter() {
        let inv = RestInventory::new(client());
        assert_eq!(inv.poll_interval, Duration::from_millis(250));

        let cluster = InventoryEntity::new(EntityKind::Cluster, "domain-c7", "Alpha").in_datacenter("datacenter-3");
        let dcs = inv.datacenters_for(Scope::Within(&cluster)).await.unwrap();
        assert_eq!(dcs, vec!["datacenter-3".to_string()]);

        let orphan = InventoryEntity::new(EntityKind::Cluster, "domain-c8", "Beta");
        let err = inv.datacenters_for(Scope::Within(&orphan)).await.unwrap_err();
        assert_eq!(err.kind, VmwareErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn operations_only_target_vms() {
        let inv = RestInventory::new(client());
        let ds = InventoryEntity::new(EntityKind::Datastore, "datastore-1", "DS1");
        let err = inv.issue_operation(&ds, OperationKind::Destroy).await.unwrap_err();
        assert_eq!(err.kind, VmwareErrorKind::InvalidRequest);
    }

    #[test]
    fn missing_entity_maps_404_only() {
        let vm = InventoryEntity::new(EntityKind::VirtualMachine, "vm-1", "ctl");
        let err = entity_missing(EntityKind::VirtualMachine, &vm)(VmwareError::api(404, "gone"));
        assert_eq!(err.kind, VmwareErrorKind::NotFound(EntityKind::VirtualMachine));

        let err = entity_missing(EntityKind::VirtualMachine, &vm)(VmwareError::api(500, "boom"));
        assert_eq!(err.kind, VmwareErrorKind::ApiError(500));
    }

    fn session_or(method: &str, target: &str, rest: (u16, String)) -> (u16, String) {
        match (method, target) {
            ("POST", "/api/session") => (201, "\"sid-1\"".into()),
            _ => rest,
        }
    }

    #[tokio::test]
    async fn power_off_and_destroy_complete_without_server_tasks() {
        let stub = StubServer::start(|method, target| {
            let rest = match (method, target) {
                ("POST", "/api/vcenter/vm/vm-1/power?action=stop") => (204, String::new()),
                ("DELETE", "/api/vcenter/vm/vm-1") => (204, String::new()),
                _ => (404, String::new()),
            };
            session_or(method, target, rest)
        })
        .await;
        let inv = RestInventory::new(stub.client().await);
        let vm = InventoryEntity::new(EntityKind::VirtualMachine, "vm-1", "ctl");

        let off = inv.issue_operation(&vm, OperationKind::PowerOff).await.unwrap();
        TaskMonitor::new(&inv).wait_for_tasks(&[off]).await.unwrap();
        let destroy = inv.issue_operation(&vm, OperationKind::Destroy).await.unwrap();
        TaskMonitor::new(&inv).wait_for_tasks(&[destroy]).await.unwrap();

        assert!(stub.requests().iter().all(|r| !r.contains("/api/cis/tasks")));
        assert_eq!(stub.requests().len(), 3);
    }

    #[tokio::test]
    async fn operation_on_vanished_vm_is_not_found() {
        let stub = StubServer::start(|method, target| session_or(method, target, (404, String::new()))).await;
        let inv = RestInventory::new(stub.client().await);
        let vm = InventoryEntity::new(EntityKind::VirtualMachine, "vm-7", "ctl");

        let err = inv.issue_operation(&vm, OperationKind::PowerOff).await.unwrap_err();
        assert_eq!(err.kind, VmwareErrorKind::NotFound(EntityKind::VirtualMachine));
    }

    #[tokio::test]
    async fn unreadable_datastore_summary_is_an_access_error() {
        let stub = StubServer::start(|method, target| {
            let rest = match target {
                "/api/vcenter/datastore/datastore-1" => (500, r#"{"error_type":"ERROR"}"#.into()),
                "/api/vcenter/datastore/datastore-2" => {
                    (200, r#"{"name":"DS2","accessible":true,"free_space":1024}"#.into())
                }
                "/api/vcenter/datastore/datastore-3" => (401, String::new()),
                _ => (404, String::new()),
            };
            session_or(method, target, rest)
        })
        .await;
        let inv = RestInventory::new(stub.client().await);
        let ds = |id: &str| InventoryEntity::new(EntityKind::Datastore, id, id);

        let err = inv.datastore_summary(&ds("datastore-1")).await.unwrap_err();
        assert_eq!(err.kind, VmwareErrorKind::AccessError);
        assert!(err.is_recoverable());

        let summary = inv.datastore_summary(&ds("datastore-2")).await.unwrap();
        assert_eq!(summary.name, "DS2");
        assert_eq!(summary.free_space_bytes, 1024);
        assert!(summary.accessible);

        let err = inv.datastore_summary(&ds("datastore-3")).await.unwrap_err();
        assert_eq!(err.kind, VmwareErrorKind::AuthenticationError);
    }

    #[tokio::test]
    async fn cluster_datastores_are_listed_from_its_datacenter() {
        let stub = StubServer::start(|method, target| {
            let rest = match target {
                "/api/vcenter/datastore?datacenters=datacenter-3" => (
                    200,
                    r#"[{"datastore":"datastore-1","name":"DS1"},{"datastore":"datastore-2","name":"DS2"}]"#.into(),
                ),
                _ => (404, String::new()),
            };
            session_or(method, target, rest)
        })
        .await;
        let inv = RestInventory::new(stub.client().await);
        let cluster = InventoryEntity::new(EntityKind::Cluster, "domain-c7", "Alpha").in_datacenter("datacenter-3");

        let mut view = inv.open_view(Scope::Within(&cluster), EntityKind::Datastore, None).await.unwrap();
        let first = view.next_entity().await.unwrap().unwrap();
        assert_eq!(first.id, "datastore-1");
        assert_eq!(first.datacenter.as_deref(), Some("datacenter-3"));
        assert_eq!(view.next_entity().await.unwrap().unwrap().name, "DS2");
        assert!(view.next_entity().await.is_none());
        view.release();
    }
}
