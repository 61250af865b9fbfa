//! The external deployment collaborator.
//!
//! The orchestrator never imports an appliance itself; it assembles a
//! [`DeployInvocation`] and hands it to a [`Deployer`] (in production the
//! `ovftool` runner).

use crate::error::VmwareResult;
use crate::types::NetworkMapping;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where the deployer should connect.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTarget {
    pub host: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Fully assembled deployment descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployInvocation {
    pub target: ConnectionTarget,
    pub datacenter: String,
    pub cluster: String,
    pub disk_mode: String,
    pub datastore: String,
    pub vm_name: String,
    pub network: NetworkMapping,
    pub properties: BTreeMap<String, String>,
    pub folder: Option<String>,
    pub power_on: bool,
    pub dry_run: bool,
}

impl DeployInvocation {
    /// `<datacenter>/host/<cluster>`
    pub fn inventory_path(&self) -> String {
        format!("{}/host/{}", self.datacenter, self.cluster)
    }
}

/// What the deployer process reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl DeployOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// The text shown to the user when the deployment fails.
    pub fn diagnostic(&self) -> &str {
        if self.stdout.trim().is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}

#[async_trait]
pub trait Deployer: Send + Sync {
    /// Run one deployment. `Err` only when the deployer could not be run at
    /// all; a non-zero exit is reported through [`DeployOutput`].
    async fn deploy(&self, invocation: &DeployInvocation) -> VmwareResult<DeployOutput>;
}
