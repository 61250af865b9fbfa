//! Datacenter, cluster and datastore listing via the vSphere REST API.

use crate::error::VmwareResult;
use crate::types::*;
use crate::vsphere::VsphereClient;

/// Placement-related inventory queries.
pub struct PlacementManager<'a> {
    client: &'a VsphereClient,
}

impl<'a> PlacementManager<'a> {
    pub fn new(client: &'a VsphereClient) -> Self {
        Self { client }
    }

    /// List all datacenters.
    pub async fn list_datacenters(&self) -> VmwareResult<Vec<DatacenterSummary>> {
        self.client
            .get::<Vec<DatacenterSummary>>("/api/vcenter/datacenter")
            .await
    }

    /// List clusters in a datacenter, optionally by exact name.
    pub async fn list_clusters_in_datacenter(
        &self,
        datacenter: &str,
        name: Option<&str>,
    ) -> VmwareResult<Vec<ClusterSummary>> {
        let mut params = vec![("datacenters".to_string(), datacenter.to_string())];
        if let Some(n) = name {
            params.push(("names".into(), n.to_string()));
        }
        self.client
            .get_with_params::<Vec<ClusterSummary>>("/api/vcenter/cluster", &params)
            .await
    }

    /// List datastores in a datacenter, optionally by exact name.
    pub async fn list_datastores_in_datacenter(
        &self,
        datacenter: &str,
        name: Option<&str>,
    ) -> VmwareResult<Vec<DatastoreListItem>> {
        let mut params = vec![("datacenters".to_string(), datacenter.to_string())];
        if let Some(n) = name {
            params.push(("names".into(), n.to_string()));
        }
        self.client
            .get_with_params::<Vec<DatastoreListItem>>("/api/vcenter/datastore", &params)
            .await
    }

    /// Get datastore details (capacity, accessibility).
    pub async fn get_datastore(&self, datastore_id: &str) -> VmwareResult<DatastoreInfo> {
        let path = format!("/api/vcenter/datastore/{datastore_id}");
        self.client.get::<DatastoreInfo>(&path).await
    }
}
