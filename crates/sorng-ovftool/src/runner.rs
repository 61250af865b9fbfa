//! ovftool process execution.
//!
//! Wraps `tokio::process::Command` the same way for every deployment:
//! piped output, child killed if the future is dropped (which is how an
//! outer timeout cancels a running import).

use crate::command::{build_args, redacted_args};
use crate::types::OvfToolConfig;

use async_trait::async_trait;
use log::{debug, info, trace, warn};
use sorng_vmware::{DeployInvocation, DeployOutput, Deployer, VmwareError, VmwareResult};
use std::process::Stdio;
use tokio::process::Command;

/// [`Deployer`] that imports the configured OVA with ovftool.
pub struct OvfToolDeployer {
    config: OvfToolConfig,
}

impl OvfToolDeployer {
    pub fn new(config: OvfToolConfig) -> Self {
        Self { config }
    }

    /// The source must be a regular file we can open.
    async fn check_source(&self) -> VmwareResult<()> {
        let source = self.config.source();
        let readable = match tokio::fs::metadata(source).await {
            Ok(meta) if meta.is_file() => tokio::fs::File::open(source).await.is_ok(),
            _ => false,
        };
        if !readable {
            return Err(VmwareError::delegate("OVA not found or not readable")
                .with_details(source.display().to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Deployer for OvfToolDeployer {
    async fn deploy(&self, invocation: &DeployInvocation) -> VmwareResult<DeployOutput> {
        self.check_source().await?;

        let binary = self.config.binary();
        info!(
            "Running {} {}",
            binary.display(),
            redacted_args(&self.config, invocation).join(" ")
        );

        let child = Command::new(&binary)
            .args(build_args(&self.config, invocation))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                VmwareError::delegate(format!("Failed to start {}", binary.display()))
                    .with_details(e.to_string())
            })?;

        let output = child.wait_with_output().await.map_err(|e| {
            VmwareError::delegate("ovftool process failed").with_details(e.to_string())
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        trace!("ovftool stdout ({} bytes): {}", stdout.len(), stdout);
        if !stderr.is_empty() {
            warn!("ovftool stderr: {}", stderr.trim_end());
        }
        debug!("ovftool exited with {exit_code}");

        Ok(DeployOutput { exit_code, stdout, stderr })
    }
}
