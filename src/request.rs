//! Turns merged module parameters into a deployment request plus the
//! vSphere and ovftool configuration.

use crate::params::ModuleParams;

use sorng_ovftool::OvfToolConfig;
use sorng_vmware::types::{DeploymentRequest, DesiredState, NetworkMapping, VsphereConfig};
use sorng_vmware::{VmwareError, VmwareResult};
use std::collections::BTreeMap;
use std::path::Path;

pub const PROP_MGMT_IP: &str = "avi.mgmt-ip.CONTROLLER";
pub const PROP_MGMT_MASK: &str = "avi.mgmt-mask.CONTROLLER";
pub const PROP_DEFAULT_GW: &str = "avi.default-gw.CONTROLLER";
pub const PROP_SYSADMIN_KEY: &str = "avi.sysadmin-public-key.CONTROLLER";

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub request: DeploymentRequest,
    pub vsphere: VsphereConfig,
    pub ovftool: OvfToolConfig,
}

impl Invocation {
    pub fn from_params(params: ModuleParams) -> VmwareResult<Self> {
        let missing = params.missing_required();
        if !missing.is_empty() {
            return Err(VmwareError::invalid_request(format!(
                "missing required arguments: {}",
                missing.join(", ")
            )));
        }
        let required = |v: Option<String>| v.unwrap_or_default();

        let state = parse_state(params.state.as_deref())?;
        let mgmt_network = required(params.mgmt_network);
        let network = parse_network(params.ovf_network_name.as_deref(), &mgmt_network);
        let properties = appliance_properties(
            params.mgmt_ip,
            params.mgmt_mask,
            params.default_gw,
            params.sysadmin_public_key.as_deref(),
            params.props.unwrap_or_default(),
        )?;

        let mut request = DeploymentRequest::new(required(params.vm_name), network);
        request.state = state;
        request.power_on = params.power_on.unwrap_or(true);
        request.datacenter = params.datacenter;
        request.cluster = params.cluster;
        request.datastore = params.datastore;
        request.properties = properties;
        request.folder = params.vcenter_folder;
        if let Some(mode) = params.disk_mode {
            request.disk_mode = mode;
        }
        request.dry_run = params.check_mode.unwrap_or(false);

        let ssl_verify = params.ssl_verify.unwrap_or(false);
        let mut vsphere = VsphereConfig {
            host: required(params.vcenter_host),
            username: required(params.vcenter_user),
            password: required(params.vcenter_password),
            insecure: !ssl_verify,
            ..VsphereConfig::default()
        };
        if let Some(port) = params.vcenter_port {
            vsphere.port = port;
        }
        if let Some(ms) = params.task_poll_interval_ms {
            vsphere.task_poll_interval_ms = ms;
        }

        let mut ovftool = OvfToolConfig::new(
            required(params.ovftool_path),
            required(params.controller_ova_path),
        );
        ovftool.ssl_verify = ssl_verify;

        Ok(Self { request, vsphere, ovftool })
    }
}

fn parse_state(state: Option<&str>) -> VmwareResult<DesiredState> {
    match state.map(str::trim) {
        None | Some("present") => Ok(DesiredState::Present),
        Some("absent") => Ok(DesiredState::Absent),
        Some(other) => Err(VmwareError::invalid_request(format!(
            "state must be 'present' or 'absent', got '{other}'"
        ))),
    }
}

/// `ovf_network_name` is either a JSON object (single quotes allowed) of
/// OVF network → target, or the one OVF network that maps to the
/// management network. Without it every OVF network maps there.
pub fn parse_network(ovf_network_name: Option<&str>, mgmt_network: &str) -> NetworkMapping {
    match ovf_network_name.filter(|s| !s.is_empty()) {
        None => NetworkMapping::Single(mgmt_network.to_string()),
        Some(raw) => {
            let json = raw.replace('\'', "\"");
            match serde_json::from_str::<BTreeMap<String, serde_json::Value>>(&json) {
                Ok(map) => NetworkMapping::PerNetwork(
                    map.into_iter().map(|(ovf, target)| (ovf, network_name(target))).collect(),
                ),
                Err(_) => NetworkMapping::PerNetwork(BTreeMap::from([(
                    raw.to_string(),
                    mgmt_network.to_string(),
                )])),
            }
        }
    }
}

/// Target network names are usually strings; numbers and booleans keep
/// their JSON spelling.
fn network_name(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// The controller's well-known OVF properties, with `extra` merged on top.
pub fn appliance_properties(
    mgmt_ip: Option<String>,
    mgmt_mask: Option<String>,
    default_gw: Option<String>,
    sysadmin_public_key: Option<&str>,
    extra: BTreeMap<String, String>,
) -> VmwareResult<BTreeMap<String, String>> {
    let mut props = BTreeMap::new();
    let known = [
        (PROP_MGMT_IP, mgmt_ip),
        (PROP_MGMT_MASK, mgmt_mask),
        (PROP_DEFAULT_GW, default_gw),
    ];
    for (key, value) in known {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            props.insert(key.to_string(), v);
        }
    }
    if let Some(path) = sysadmin_public_key.filter(|p| !p.is_empty()) {
        props.insert(PROP_SYSADMIN_KEY.to_string(), read_key(Path::new(path))?);
    }
    props.extend(extra);
    Ok(props)
}

fn read_key(path: &Path) -> VmwareResult<String> {
    let data = std::fs::read_to_string(path).map_err(|e| {
        VmwareError::invalid_request(format!("Cannot read sysadmin public key {}: {e}", path.display()))
    })?;
    Ok(data.trim_end_matches('\n').to_string())
}
