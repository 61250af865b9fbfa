//! Shared types for vSphere inventory resolution and appliance deployment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Connection / Config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Top-level configuration for connecting to a vCenter / ESXi host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VsphereConfig {
    /// vCenter or ESXi hostname / IP (e.g. "vcenter.lab.local")
    pub host: String,
    /// Port (default 443)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username (e.g. "administrator@vsphere.local")
    pub username: String,
    /// Password
    pub password: String,
    /// Skip TLS certificate verification (self-signed labs)
    #[serde(default)]
    pub insecure: bool,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Interval between task status polls while waiting on the change feed
    #[serde(default = "default_poll_interval")]
    pub task_poll_interval_ms: u64,
}

fn default_port() -> u16 { 443 }
fn default_timeout() -> u64 { 30 }
fn default_poll_interval() -> u64 { 1000 }

impl Default for VsphereConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: String::new(),
            password: String::new(),
            port: 443,
            insecure: false,
            timeout_secs: 30,
            task_poll_interval_ms: 1000,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Inventory
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Datacenter,
    Cluster,
    Datastore,
    VirtualMachine,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Datacenter => "datacenter",
            Self::Cluster => "cluster",
            Self::Datastore => "datastore",
            Self::VirtualMachine => "virtual machine",
        };
        f.write_str(s)
    }
}

/// A named object in the inventory, referenced by its managed-object ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntity {
    /// vSphere managed-object ID (e.g. "domain-c8")
    pub id: String,
    pub name: String,
    pub kind: EntityKind,
    /// ID of the datacenter this entity lives in, when known.
    #[serde(default)]
    pub datacenter: Option<String>,
}

impl InventoryEntity {
    pub fn new(kind: EntityKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            datacenter: None,
        }
    }

    pub fn in_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.datacenter = Some(datacenter.into());
        self
    }
}

/// Subtree root bounding a search.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    /// The whole inventory.
    Root,
    /// Everything below the given entity.
    Within(&'a InventoryEntity),
}

impl fmt::Display for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("<root>"),
            Self::Within(e) => write!(f, "{} '{}'", e.kind, e.name),
        }
    }
}

/// Capacity snapshot of a datastore.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DatastoreSummary {
    pub datastore: String,
    pub name: String,
    pub free_space_bytes: u64,
    pub accessible: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VmPowerState {
    PoweredOn,
    PoweredOff,
    Suspended,
    #[serde(other)]
    Unknown,
}

impl Default for VmPowerState {
    fn default() -> Self { Self::Unknown }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tasks / change feed
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Remote operations that can be issued against an entity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    PowerOff,
    Destroy,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PowerOff => f.write_str("power-off"),
            Self::Destroy => f.write_str("destroy"),
        }
    }
}

/// Opaque identity of an issued remote operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TaskHandle(pub String);

impl TaskHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fault reported by a failed task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskFault {
    pub message: String,
    /// Raw fault payload as returned by the server.
    #[serde(default)]
    pub payload: Option<String>,
}

impl TaskFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), payload: None }
    }
}

impl fmt::Display for TaskFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// `Pending -> Success | Error`. Both end states are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Success,
    Error(TaskFault),
}

/// Read position in a change feed. `None` (no cursor) means "from the beginning".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeCursor(pub String);

/// A single state change of a watched task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskChange {
    pub task: TaskHandle,
    pub state: TaskState,
}

/// One batch returned by `wait_for_updates`.
#[derive(Debug, Clone)]
pub struct UpdateBatch {
    pub cursor: ChangeCursor,
    pub changes: Vec<TaskChange>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Deployment workflow
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    #[default]
    Present,
    Absent,
}

/// How the appliance's OVF networks map onto inventory networks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NetworkMapping {
    /// Every OVF network maps to this one.
    Single(String),
    /// OVF network name → target network name.
    PerNetwork(BTreeMap<String, String>),
}

/// Everything the caller wants from one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    pub vm_name: String,
    #[serde(default)]
    pub state: DesiredState,
    #[serde(default = "default_true")]
    pub power_on: bool,
    #[serde(default)]
    pub datacenter: Option<String>,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub datastore: Option<String>,
    pub network: NetworkMapping,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default = "default_disk_mode")]
    pub disk_mode: String,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_true() -> bool { true }
fn default_disk_mode() -> String { "thin".into() }

impl DeploymentRequest {
    pub fn new(vm_name: impl Into<String>, network: NetworkMapping) -> Self {
        Self {
            vm_name: vm_name.into(),
            state: DesiredState::Present,
            power_on: true,
            datacenter: None,
            cluster: None,
            datastore: None,
            network,
            properties: BTreeMap::new(),
            folder: None,
            disk_mode: default_disk_mode(),
            dry_run: false,
        }
    }
}

/// Outcome reported back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult {
    pub changed: bool,
    #[serde(rename = "msg")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_output: Option<String>,
}

impl WorkflowResult {
    pub fn unchanged(message: impl Into<String>) -> Self {
        Self { changed: false, message: message.into(), tool_output: None }
    }

    pub fn changed(message: impl Into<String>) -> Self {
        Self { changed: true, message: message.into(), tool_output: None }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  REST wire types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatacenterSummary {
    pub datacenter: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmSummary {
    pub vm: String,
    pub name: String,
    #[serde(default)]
    pub power_state: VmPowerState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastoreListItem {
    pub datastore: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastoreInfo {
    pub name: String,
    #[serde(default)]
    pub accessible: Option<bool>,
    #[serde(default)]
    pub free_space: Option<u64>,
}

/// `GET /api/cis/tasks/{task}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInfo {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl TaskInfo {
    pub fn state(&self) -> TaskState {
        match self.status.as_deref() {
            Some("SUCCEEDED") => TaskState::Success,
            Some("FAILED") => {
                let payload = self.error.as_ref().map(|e| e.to_string());
                let message = self
                    .error
                    .as_ref()
                    .and_then(|e| e.pointer("/messages/0/default_message"))
                    .and_then(|m| m.as_str())
                    .unwrap_or("task failed")
                    .to_string();
                TaskState::Error(TaskFault { message, payload })
            }
            _ => TaskState::Pending,
        }
    }
}
