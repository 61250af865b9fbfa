//! Idempotent "ensure present / ensure absent" workflow for one appliance VM.
//!
//! `Connecting → Resolving → {CreateFlow | DeleteFlow} → Done | Failed`
//!
//! Delete looks the VM up across the whole inventory; create checks for
//! an existing VM only inside the resolved cluster. The two lookups are
//! deliberately kept distinct.

use crate::deployer::{ConnectionTarget, DeployInvocation, Deployer};
use crate::error::{VmwareError, VmwareResult};
use crate::inventory::{Connector, InventoryService};
use crate::resolver::InventoryResolver;
use crate::storage::DatastoreSelector;
use crate::task::TaskMonitor;
use crate::types::*;

use log::{debug, info, warn};
use std::fmt;

/// Workflow phases, logged as the orchestrator moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Resolving,
    CreateFlow,
    DeleteFlow,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub struct DeploymentOrchestrator<'a> {
    connector: &'a dyn Connector,
    deployer: &'a dyn Deployer,
    config: &'a VsphereConfig,
}

impl<'a> DeploymentOrchestrator<'a> {
    pub fn new(
        connector: &'a dyn Connector,
        deployer: &'a dyn Deployer,
        config: &'a VsphereConfig,
    ) -> Self {
        Self { connector, deployer, config }
    }

    /// Run the whole workflow. `Err` is the `Failed` state.
    pub async fn run(&self, request: &DeploymentRequest) -> VmwareResult<WorkflowResult> {
        if request.vm_name.trim().is_empty() {
            return Err(VmwareError::invalid_request("vm_name must not be empty"));
        }

        enter(Phase::Connecting, &request.vm_name);
        let service = match self.connector.connect(self.config).await {
            Ok(s) => s,
            Err(e) => {
                enter(Phase::Failed, &request.vm_name);
                return Err(e);
            }
        };
        info!("Connected to {}", self.config.host);

        let outcome = self.run_connected(service.as_ref(), request).await;
        service.disconnect().await;

        match &outcome {
            Ok(result) => {
                enter(Phase::Done, &request.vm_name);
                info!("{} (changed={})", result.message, result.changed);
            }
            Err(e) => {
                enter(Phase::Failed, &request.vm_name);
                warn!("{e}");
            }
        }
        outcome
    }

    async fn run_connected(
        &self,
        service: &dyn InventoryService,
        request: &DeploymentRequest,
    ) -> VmwareResult<WorkflowResult> {
        enter(Phase::Resolving, &request.vm_name);
        match request.state {
            DesiredState::Absent => {
                enter(Phase::DeleteFlow, &request.vm_name);
                self.delete_flow(service, request).await
            }
            DesiredState::Present => {
                enter(Phase::CreateFlow, &request.vm_name);
                self.create_flow(service, request).await
            }
        }
    }

    async fn delete_flow(
        &self,
        service: &dyn InventoryService,
        request: &DeploymentRequest,
    ) -> VmwareResult<WorkflowResult> {
        let name = &request.vm_name;
        let vm = match InventoryResolver::new(service).find_vm_globally_by_name(name).await? {
            Some(vm) => vm,
            None => return Ok(WorkflowResult::unchanged(format!("A VM with the name {name} not found"))),
        };

        if request.dry_run {
            return Ok(WorkflowResult::changed(format!("A VM with the name {name} found")));
        }

        let monitor = TaskMonitor::new(service);
        if service.power_state(&vm).await? == VmPowerState::PoweredOn {
            let task = service.issue_operation(&vm, OperationKind::PowerOff).await?;
            info!("Powering off '{}' ({}), task {}", name, vm.id, task);
            monitor.wait_for_tasks(&[task]).await?;
        }

        let task = service.issue_operation(&vm, OperationKind::Destroy).await?;
        info!("Destroying '{}' ({}), task {}", name, vm.id, task);
        monitor.wait_for_tasks(&[task]).await?;

        Ok(WorkflowResult::changed(format!("A VM with the name {name} deleted successfully")))
    }

    async fn create_flow(
        &self,
        service: &dyn InventoryService,
        request: &DeploymentRequest,
    ) -> VmwareResult<WorkflowResult> {
        let name = &request.vm_name;
        let resolver = InventoryResolver::new(service);

        let dc = resolver.resolve_datacenter(request.datacenter.as_deref()).await?;
        let cluster = resolver.resolve_cluster(&dc, request.cluster.as_deref()).await?;
        let selector = DatastoreSelector::new(service);
        let datastore = match request.datastore.as_deref() {
            Some(ds) => selector.resolve_named(&cluster, ds).await?,
            None => selector.select_largest_free(&cluster).await?,
        };

        if resolver.exists_vm_in_scope(&cluster, name).await? {
            return Ok(WorkflowResult::unchanged(format!(
                "A VM with the name {name} is already present"
            )));
        }

        let invocation = DeployInvocation {
            target: ConnectionTarget {
                host: self.config.host.clone(),
                username: self.config.username.clone(),
                password: self.config.password.clone(),
            },
            datacenter: dc.name,
            cluster: cluster.name,
            disk_mode: request.disk_mode.clone(),
            datastore: datastore.name,
            vm_name: name.clone(),
            network: request.network.clone(),
            properties: request.properties.clone(),
            folder: request.folder.clone(),
            power_on: request.power_on,
            dry_run: request.dry_run,
        };
        debug!("Deploying to {} on datastore '{}'", invocation.inventory_path(), invocation.datastore);

        let output = self.deployer.deploy(&invocation).await?;
        if !output.success() {
            let diagnostic = output.diagnostic().to_string();
            return Err(VmwareError::delegate(format!(
                "Failed to deploy OVA, error message from ovftool is: {diagnostic}"
            ))
            .with_details(diagnostic));
        }

        let verb = if request.dry_run { "verified" } else { "deployed" };
        let mut result = WorkflowResult::changed(format!("A VM with the name {name} {verb} successfully"));
        result.tool_output = Some(output.stdout);
        Ok(result)
    }
}

fn enter(phase: Phase, vm_name: &str) {
    debug!("[{vm_name}] -> {phase}");
}
