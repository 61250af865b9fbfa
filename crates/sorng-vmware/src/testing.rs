//! In-memory inventory, connector and deployer used by the unit tests,
//! plus a plain-HTTP stub for exercising the REST backend.

use crate::deployer::{DeployInvocation, DeployOutput, Deployer};
use crate::error::{VmwareError, VmwareErrorKind, VmwareResult};
use crate::inventory::*;
use crate::types::*;
use crate::vsphere::VsphereClient;

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

pub(crate) struct FakeEntry {
    pub entity: InventoryEntity,
    pub ancestors: Vec<String>,
    pub unreadable: bool,
}

#[derive(Default)]
pub(crate) struct FakeState {
    pub datacenters: Vec<InventoryEntity>,
    pub entries: Vec<FakeEntry>,
    pub summaries: HashMap<String, VmwareResult<DatastoreSummary>>,
    pub power: HashMap<String, VmPowerState>,
    pub outcomes: HashMap<OperationKind, TaskState>,
    pub scripted_batches: VecDeque<Vec<TaskChange>>,
    pub issued: Vec<(OperationKind, String, TaskHandle)>,
    pub events: Vec<String>,
    pub cursors_seen: Vec<Option<ChangeCursor>>,
    pub subscribed: Vec<Vec<TaskHandle>>,
    pub views_opened: usize,
    pub views_released: usize,
    pub subs_opened: usize,
    pub subs_released: usize,
    pub waits: usize,
    pub disconnects: usize,
}

#[derive(Clone, Default)]
pub(crate) struct FakeInventory {
    state: Arc<Mutex<FakeState>>,
}

impl FakeInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn ancestors_of(&self, parent: &str) -> Vec<String> {
        let st = self.state();
        let mut chain = st
            .entries
            .iter()
            .find(|e| e.entity.id == parent)
            .map(|e| e.ancestors.clone())
            .unwrap_or_default();
        chain.push(parent.to_string());
        chain
    }

    fn push(&self, parent: &str, entity: InventoryEntity, unreadable: bool) {
        let ancestors = self.ancestors_of(parent);
        self.state().entries.push(FakeEntry { entity, ancestors, unreadable });
    }

    pub fn with_datacenter(self, id: &str, name: &str) -> Self {
        self.state()
            .datacenters
            .push(InventoryEntity::new(EntityKind::Datacenter, id, name));
        self
    }

    pub fn with_cluster(self, dc: &str, id: &str, name: &str) -> Self {
        self.push(dc, InventoryEntity::new(EntityKind::Cluster, id, name).in_datacenter(dc), false);
        self
    }

    pub fn with_datastore(self, cluster: &str, id: &str, name: &str, free: u64, accessible: bool) -> Self {
        self.push(cluster, InventoryEntity::new(EntityKind::Datastore, id, name), false);
        self.state().summaries.insert(
            id.to_string(),
            Ok(DatastoreSummary {
                datastore: id.to_string(),
                name: name.to_string(),
                free_space_bytes: free,
                accessible,
            }),
        );
        self
    }

    /// Datastore whose summary read fails with `AccessError`.
    pub fn with_broken_datastore(self, cluster: &str, id: &str, name: &str) -> Self {
        self.push(cluster, InventoryEntity::new(EntityKind::Datastore, id, name), false);
        self.state().summaries.insert(
            id.to_string(),
            Err(VmwareError::access(format!("Cannot read summary of {name}"))),
        );
        self
    }

    /// Entry that fails with `AccessError` while being enumerated.
    pub fn with_unreadable(self, parent: &str, kind: EntityKind, id: &str) -> Self {
        self.push(parent, InventoryEntity::new(kind, id, ""), true);
        self
    }

    pub fn with_vm(self, cluster: &str, id: &str, name: &str, power: VmPowerState) -> Self {
        self.push(cluster, InventoryEntity::new(EntityKind::VirtualMachine, id, name), false);
        self.state().power.insert(id.to_string(), power);
        self
    }

    pub fn with_outcome(self, op: OperationKind, state: TaskState) -> Self {
        self.state().outcomes.insert(op, state);
        self
    }

    pub fn with_batches(self, batches: Vec<Vec<TaskChange>>) -> Self {
        self.state().scripted_batches.extend(batches);
        self
    }
}

pub(crate) struct FakeView {
    items: VecDeque<VmwareResult<InventoryEntity>>,
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl InventoryView for FakeView {
    async fn next_entity(&mut self) -> Option<VmwareResult<InventoryEntity>> {
        self.items.pop_front()
    }

    fn release(&mut self) {
        let mut st = self.state.lock().unwrap();
        st.views_released += 1;
        st.events.push("release-view".into());
    }
}

pub(crate) struct FakeSubscription {
    batches: VecDeque<Vec<TaskChange>>,
    version: u64,
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl TaskSubscription for FakeSubscription {
    async fn wait_for_updates(&mut self, cursor: Option<&ChangeCursor>) -> VmwareResult<UpdateBatch> {
        {
            let mut st = self.state.lock().unwrap();
            st.waits += 1;
            st.cursors_seen.push(cursor.cloned());
        }
        match self.batches.pop_front() {
            Some(changes) => {
                self.version += 1;
                Ok(UpdateBatch {
                    cursor: ChangeCursor(self.version.to_string()),
                    changes,
                })
            }
            None => Err(VmwareError::new(VmwareErrorKind::Other, "fake change feed exhausted")),
        }
    }

    fn release(&mut self) {
        let mut st = self.state.lock().unwrap();
        st.subs_released += 1;
        st.events.push("release-sub".into());
    }
}

#[async_trait]
impl InventoryService for FakeInventory {
    async fn list_datacenters(&self) -> VmwareResult<Vec<InventoryEntity>> {
        Ok(self.state().datacenters.clone())
    }

    async fn open_view(
        &self,
        scope: Scope<'_>,
        kind: EntityKind,
        name: Option<&str>,
    ) -> VmwareResult<Box<dyn InventoryView>> {
        let mut st = self.state();
        st.views_opened += 1;
        let items = st
            .entries
            .iter()
            .filter(|e| e.entity.kind == kind)
            .filter(|e| match scope {
                Scope::Root => true,
                Scope::Within(root) => e.ancestors.iter().any(|a| *a == root.id),
            })
            .filter(|e| e.unreadable || name.map_or(true, |n| e.entity.name == n))
            .map(|e| {
                if e.unreadable {
                    Err(VmwareError::access(format!("Cannot read {}", e.entity.id)))
                } else {
                    Ok(e.entity.clone())
                }
            })
            .collect();
        Ok(Box::new(FakeView { items, state: self.state.clone() }))
    }

    async fn datastore_summary(&self, datastore: &InventoryEntity) -> VmwareResult<DatastoreSummary> {
        self.state()
            .summaries
            .get(&datastore.id)
            .cloned()
            .unwrap_or_else(|| Err(VmwareError::access("no summary")))
    }

    async fn power_state(&self, vm: &InventoryEntity) -> VmwareResult<VmPowerState> {
        Ok(self.state().power.get(&vm.id).copied().unwrap_or_default())
    }

    async fn issue_operation(
        &self,
        target: &InventoryEntity,
        operation: OperationKind,
    ) -> VmwareResult<TaskHandle> {
        let mut st = self.state();
        let task = TaskHandle::new(format!("task-{}", st.issued.len() + 1));
        st.issued.push((operation, target.id.clone(), task.clone()));
        st.events.push(format!("issue:{operation}:{}", target.id));
        Ok(task)
    }

    async fn subscribe_to_changes(&self, tasks: &[TaskHandle]) -> VmwareResult<Box<dyn TaskSubscription>> {
        let mut st = self.state();
        st.subs_opened += 1;
        st.subscribed.push(tasks.to_vec());
        st.events.push("subscribe".into());
        let batches = if st.scripted_batches.is_empty() {
            let changes = tasks
                .iter()
                .map(|t| {
                    let op = st.issued.iter().find(|(_, _, h)| h == t).map(|(op, _, _)| *op);
                    let state = op
                        .and_then(|op| st.outcomes.get(&op).cloned())
                        .unwrap_or(TaskState::Success);
                    TaskChange { task: t.clone(), state }
                })
                .collect();
            VecDeque::from(vec![changes])
        } else {
            std::mem::take(&mut st.scripted_batches)
        };
        Ok(Box::new(FakeSubscription { batches, version: 0, state: self.state.clone() }))
    }

    async fn disconnect(&self) {
        self.state().disconnects += 1;
    }
}

pub(crate) struct FakeConnector {
    pub inventory: FakeInventory,
    pub failure: Option<VmwareError>,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _config: &VsphereConfig) -> VmwareResult<Box<dyn InventoryService>> {
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(Box::new(self.inventory.clone())),
        }
    }
}

#[derive(Clone)]
pub(crate) struct FakeDeployer {
    pub output: DeployOutput,
    pub calls: Arc<Mutex<Vec<DeployInvocation>>>,
}

impl FakeDeployer {
    pub fn succeeding(stdout: &str) -> Self {
        Self::with_output(0, stdout, "")
    }

    pub fn with_output(exit_code: i32, stdout: &str, stderr: &str) -> Self {
        Self {
            output: DeployOutput {
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Deployer for FakeDeployer {
    async fn deploy(&self, invocation: &DeployInvocation) -> VmwareResult<DeployOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        Ok(self.output.clone())
    }
}

// ─── HTTP stub ──────────────────────────────────────────────────────

type Responder = dyn Fn(&str, &str) -> (u16, String) + Send + Sync;

/// One-request-per-connection HTTP server on a loopback port. The
/// responder gets the method and request target (path plus query) and
/// returns status and JSON body.
pub(crate) struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    accept_loop: tokio::task::JoinHandle<()>,
}

impl StubServer {
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&str, &str) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let respond: Arc<Responder> = Arc::new(respond);
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = requests.clone();
        let accept_loop = tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else { return };
                let respond = respond.clone();
                let seen = seen.clone();
                tokio::spawn(async move {
                    let _ = serve_one(socket, respond.as_ref(), &seen).await;
                });
            }
        });

        Self { base_url: format!("http://{addr}"), requests, accept_loop }
    }

    /// A client logged in against this stub. The responder must accept
    /// `POST /api/session`.
    pub async fn client(&self) -> Arc<VsphereClient> {
        let config = VsphereConfig {
            host: "stub".into(),
            username: "administrator@vsphere.local".into(),
            password: "secret".into(),
            task_poll_interval_ms: 5,
            ..VsphereConfig::default()
        };
        let client = VsphereClient::new(&config).unwrap().with_base_url(self.base_url.clone());
        client.login().await.unwrap();
        Arc::new(client)
    }

    /// `"METHOD target"` for every request served so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}

async fn serve_one(
    mut socket: tokio::net::TcpStream,
    respond: &Responder,
    seen: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        head.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&head);
    let mut line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = line.next().unwrap_or_default().to_string();
    let target = line.next().unwrap_or_default().to_string();
    seen.lock().unwrap().push(format!("{method} {target}"));

    let (status, body) = respond(&method, &target);
    let response = format!(
        "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}
