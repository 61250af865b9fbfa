//! Module parameters: loaded from a JSON / YAML file, overridden by flags.

use serde::{Deserialize, Serialize};
use sorng_vmware::{VmwareError, VmwareResult};
use std::collections::BTreeMap;
use std::path::Path;

/// Every parameter is optional here; required ones are checked once the
/// file and the command line have been merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleParams {
    pub ovftool_path: Option<String>,
    pub vcenter_host: Option<String>,
    pub vcenter_port: Option<u16>,
    pub vcenter_user: Option<String>,
    pub vcenter_password: Option<String>,
    pub datacenter: Option<String>,
    pub cluster: Option<String>,
    pub datastore: Option<String>,
    pub mgmt_network: Option<String>,
    pub ovf_network_name: Option<String>,
    pub disk_mode: Option<String>,
    pub controller_ova_path: Option<String>,
    pub vm_name: Option<String>,
    pub power_on: Option<bool>,
    pub vcenter_folder: Option<String>,
    pub ssl_verify: Option<bool>,
    pub state: Option<String>,
    pub mgmt_ip: Option<String>,
    pub mgmt_mask: Option<String>,
    pub default_gw: Option<String>,
    pub sysadmin_public_key: Option<String>,
    pub props: Option<BTreeMap<String, String>>,
    pub check_mode: Option<bool>,
    pub task_poll_interval_ms: Option<u64>,
}

macro_rules! overlay {
    ($base:ident, $top:ident; $($field:ident),* $(,)?) => {
        ModuleParams { $($field: $top.$field.or($base.$field)),* }
    };
}

impl ModuleParams {
    /// Parse a parameter file; `.yml` / `.yaml` are read as YAML,
    /// anything else as JSON.
    pub fn from_file(path: &Path) -> VmwareResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            VmwareError::invalid_request(format!("Cannot read parameter file {}: {e}", path.display()))
        })?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yml") | Some("yaml")
        );
        if is_yaml {
            serde_yaml::from_str(&text).map_err(|e| {
                VmwareError::parse(format!("Invalid YAML in {}: {e}", path.display()))
            })
        } else {
            serde_json::from_str(&text).map_err(|e| {
                VmwareError::parse(format!("Invalid JSON in {}: {e}", path.display()))
            })
        }
    }

    /// Values set in `top` win over values in `self`. `props` maps are
    /// merged key by key.
    pub fn overlay(self, top: ModuleParams) -> ModuleParams {
        let props = match (self.props.clone(), top.props.clone()) {
            (Some(mut base), Some(extra)) => {
                base.extend(extra);
                Some(base)
            }
            (base, extra) => extra.or(base),
        };
        let base = self;
        let merged = overlay!(base, top;
            ovftool_path, vcenter_host, vcenter_port, vcenter_user, vcenter_password,
            datacenter, cluster, datastore, mgmt_network, ovf_network_name, disk_mode,
            controller_ova_path, vm_name, power_on, vcenter_folder, ssl_verify, state,
            mgmt_ip, mgmt_mask, default_gw, sysadmin_public_key, props, check_mode,
            task_poll_interval_ms,
        );
        ModuleParams { props, ..merged }
    }

    /// Names of required parameters that are missing or blank.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let required: [(&'static str, &Option<String>); 7] = [
            ("ovftool_path", &self.ovftool_path),
            ("vcenter_host", &self.vcenter_host),
            ("vcenter_user", &self.vcenter_user),
            ("vcenter_password", &self.vcenter_password),
            ("mgmt_network", &self.mgmt_network),
            ("controller_ova_path", &self.controller_ova_path),
            ("vm_name", &self.vm_name),
        ];
        required
            .iter()
            .filter(|(_, v)| v.as_deref().map_or(true, |s| s.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_prefers_top_and_merges_props() {
        let base = ModuleParams {
            vcenter_host: Some("vc-a".into()),
            vm_name: Some("ctl".into()),
            props: Some(BTreeMap::from([
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
            ])),
            ..ModuleParams::default()
        };
        let top = ModuleParams {
            vcenter_host: Some("vc-b".into()),
            props: Some(BTreeMap::from([("b".to_string(), "3".to_string())])),
            ..ModuleParams::default()
        };
        let merged = base.overlay(top);
        assert_eq!(merged.vcenter_host.as_deref(), Some("vc-b"));
        assert_eq!(merged.vm_name.as_deref(), Some("ctl"));
        let props = merged.props.unwrap();
        assert_eq!(props["a"], "1");
        assert_eq!(props["b"], "3");
    }

    #[test]
    fn blank_required_values_count_as_missing() {
        let params = ModuleParams {
            vcenter_host: Some("vc".into()),
            vm_name: Some("  ".into()),
            ..ModuleParams::default()
        };
        let missing = params.missing_required();
        assert!(missing.contains(&"vm_name"));
        assert!(!missing.contains(&"vcenter_host"));
        assert_eq!(missing.len(), 6);
    }
}
