//! VM lookup and lifecycle operations via the vSphere REST API.
//!
//! Only what the deployment workflow needs: filtered listing, power
//! state, hard power-off and destroy. The last two complete before the
//! response comes back.

use crate::error::VmwareResult;
use crate::types::*;
use crate::vsphere::VsphereClient;

/// VM operations backed by `VsphereClient`.
pub struct VmManager<'a> {
    client: &'a VsphereClient,
}

impl<'a> VmManager<'a> {
    pub fn new(client: &'a VsphereClient) -> Self {
        Self { client }
    }

    // ── List / Get ──────────────────────────────────────────────────

    /// List VMs, optionally filtered by exact name, cluster or datacenter.
    pub async fn list_vms(
        &self,
        filter_names: Option<&[&str]>,
        filter_clusters: Option<&[&str]>,
        filter_datacenters: Option<&[&str]>,
    ) -> VmwareResult<Vec<VmSummary>> {
        let mut params: Vec<(String, String)> = Vec::new();

        if let Some(names) = filter_names {
            for n in names {
                params.push(("names".into(), n.to_string()));
            }
        }
        if let Some(clusters) = filter_clusters {
            for c in clusters {
                params.push(("clusters".into(), c.to_string()));
            }
        }
        if let Some(dcs) = filter_datacenters {
            for d in dcs {
                params.push(("datacenters".into(), d.to_string()));
            }
        }

        self.client
            .get_with_params::<Vec<VmSummary>>("/api/vcenter/vm", &params)
            .await
    }

    /// Get current power state.
    pub async fn get_power_state(&self, vm_id: &str) -> VmwareResult<VmPowerState> {
        #[derive(serde::Deserialize)]
        struct PowerInfo {
            state: VmPowerState,
        }
        let path = format!("/api/vcenter/vm/{vm_id}/power");
        let info: PowerInfo = self.client.get(&path).await?;
        Ok(info.state)
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Power off a VM (hard).
    pub async fn power_off(&self, vm_id: &str) -> VmwareResult<()> {
        let path = format!("/api/vcenter/vm/{vm_id}/power?action=stop");
        self.client.post_empty(&path).await
    }

    /// Unregister the VM and delete its files.
    pub async fn delete_vm(&self, vm_id: &str) -> VmwareResult<()> {
        let path = format!("/api/vcenter/vm/{vm_id}");
        self.client.delete(&path).await
    }
}
