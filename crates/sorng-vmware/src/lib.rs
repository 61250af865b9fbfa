//! # sorng-vmware – vSphere appliance deployment
//!
//! Inventory resolution, datastore selection, remote task monitoring and an
//! idempotent create / delete workflow for a single appliance VM on vCenter.
//! Provisioning itself is delegated to an external [`deployer::Deployer`].
//!
//! ## Modules
//!
//! - **types** — Shared data structures (entities, tasks, requests, REST wire types)
//! - **error** — Crate-specific error types
//! - **vsphere** — vSphere REST API HTTP client with session-based auth
//! - **inventory** — Remote-service traits and the scoped view / subscription guards
//! - **resolver** — Datacenter, cluster and VM lookup
//! - **storage** — Datastore selection (named or largest free space)
//! - **task** — Fan-in wait over remote tasks via a change feed
//! - **deployer** — The external deployment collaborator
//! - **orchestrator** — Create / delete workflow
//! - **vm** / **placement** — Per-area REST managers
//! - **feed** — Polling change feed for the REST backend
//! - **service** — REST-backed `Connector` and `InventoryService`

pub mod types;
pub mod error;
pub mod vsphere;
pub mod inventory;
pub mod resolver;
pub mod storage;
pub mod task;
pub mod deployer;
pub mod orchestrator;
pub mod vm;
pub mod placement;
pub mod feed;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use deployer::{ConnectionTarget, DeployInvocation, DeployOutput, Deployer};
pub use error::{VmwareError, VmwareErrorKind, VmwareResult};
pub use orchestrator::DeploymentOrchestrator;
pub use service::RestConnector;
