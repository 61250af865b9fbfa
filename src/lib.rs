//! # appliance-deploy
//!
//! Command-line front end for the vSphere appliance workflow: loads module
//! parameters, assembles the request, runs the orchestrator against vCenter
//! with ovftool as the deployer and renders the outcome as JSON.

pub mod cli;
pub mod logging;
pub mod output;
pub mod params;
pub mod request;

use cli::Cli;
use params::ModuleParams;
use request::Invocation;

use sorng_ovftool::OvfToolDeployer;
use sorng_vmware::inventory::Connector;
use sorng_vmware::types::WorkflowResult;
use sorng_vmware::{Deployer, DeploymentOrchestrator, RestConnector, VmwareError, VmwareResult};
use std::time::Duration;
use tracing::info;

/// Merge the parameter file (if any) with the command line.
pub fn load_params(cli: &Cli) -> VmwareResult<ModuleParams> {
    let base = match &cli.params {
        Some(path) => ModuleParams::from_file(path)?,
        None => ModuleParams::default(),
    };
    Ok(base.overlay(cli.to_params()))
}

/// Full run against vCenter.
pub async fn run(cli: &Cli) -> VmwareResult<WorkflowResult> {
    let invocation = Invocation::from_params(load_params(cli)?)?;
    let deployer = OvfToolDeployer::new(invocation.ovftool.clone());
    info!(
        vm = %invocation.request.vm_name,
        host = %invocation.vsphere.host,
        dry_run = invocation.request.dry_run,
        "Starting appliance workflow"
    );
    execute(&invocation, &RestConnector, &deployer, cli.timeout_secs.map(Duration::from_secs)).await
}

/// Run the workflow with explicit collaborators. A timeout cancels the
/// whole invocation, including a running deployer process.
pub async fn execute(
    invocation: &Invocation,
    connector: &dyn Connector,
    deployer: &dyn Deployer,
    timeout: Option<Duration>,
) -> VmwareResult<WorkflowResult> {
    let orchestrator = DeploymentOrchestrator::new(connector, deployer, &invocation.vsphere);
    let workflow = orchestrator.run(&invocation.request);
    match timeout {
        Some(limit) => tokio::time::timeout(limit, workflow).await.map_err(|_| {
            VmwareError::timeout(format!("Workflow did not finish within {}s", limit.as_secs()))
        })?,
        None => workflow.await,
    }
}
