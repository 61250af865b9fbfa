//! Command-line arguments.

use crate::params::ModuleParams;

use clap::{ArgAction, Parser};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "appliance-deploy")]
#[command(about = "Deploy or remove an appliance VM on vCenter", long_about = None)]
pub struct Cli {
    /// Parameter file (JSON, or YAML with a .yml/.yaml extension)
    #[arg(long, short = 'p')]
    pub params: Option<PathBuf>,

    /// Directory holding the ovftool binary, or the binary itself
    #[arg(long)]
    pub ovftool_path: Option<String>,

    /// vCenter hostname or IP
    #[arg(long)]
    pub vcenter_host: Option<String>,

    /// vCenter HTTPS port
    #[arg(long)]
    pub vcenter_port: Option<u16>,

    /// vCenter user
    #[arg(long)]
    pub vcenter_user: Option<String>,

    /// vCenter password
    #[arg(long, env = "VCENTER_PASSWORD", hide_env_values = true)]
    pub vcenter_password: Option<String>,

    /// Datacenter name (default: the first one)
    #[arg(long)]
    pub datacenter: Option<String>,

    /// Cluster name (default: the first one in the datacenter)
    #[arg(long)]
    pub cluster: Option<String>,

    /// Datastore name (default: the accessible one with most free space)
    #[arg(long)]
    pub datastore: Option<String>,

    /// Management network
    #[arg(long)]
    pub mgmt_network: Option<String>,

    /// OVF network name, or a JSON object of OVF network → target network
    #[arg(long)]
    pub ovf_network_name: Option<String>,

    /// Disk provisioning mode
    #[arg(long)]
    pub disk_mode: Option<String>,

    /// Path to the appliance OVA
    #[arg(long)]
    pub controller_ova_path: Option<String>,

    /// Name of the VM to create or delete
    #[arg(long)]
    pub vm_name: Option<String>,

    /// Power the VM on after deployment
    #[arg(long, action = ArgAction::Set)]
    pub power_on: Option<bool>,

    /// Destination VM folder
    #[arg(long)]
    pub vcenter_folder: Option<String>,

    /// Verify the vCenter TLS certificate
    #[arg(long, action = ArgAction::Set)]
    pub ssl_verify: Option<bool>,

    /// present or absent
    #[arg(long)]
    pub state: Option<String>,

    #[arg(long)]
    pub mgmt_ip: Option<String>,

    #[arg(long)]
    pub mgmt_mask: Option<String>,

    #[arg(long)]
    pub default_gw: Option<String>,

    /// Path to the sysadmin public key file
    #[arg(long)]
    pub sysadmin_public_key: Option<String>,

    /// Extra OVF property, KEY=VALUE (repeatable)
    #[arg(long = "prop", value_parser = parse_key_value)]
    pub props: Vec<(String, String)>,

    /// Report what would change without changing anything
    #[arg(long)]
    pub check: bool,

    /// Abort the whole run after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Debug logging
    #[arg(long, short)]
    pub verbose: bool,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}

impl Cli {
    /// The parameters given on the command line.
    pub fn to_params(&self) -> ModuleParams {
        ModuleParams {
            ovftool_path: self.ovftool_path.clone(),
            vcenter_host: self.vcenter_host.clone(),
            vcenter_port: self.vcenter_port,
            vcenter_user: self.vcenter_user.clone(),
            vcenter_password: self.vcenter_password.clone(),
            datacenter: self.datacenter.clone(),
            cluster: self.cluster.clone(),
            datastore: self.datastore.clone(),
            mgmt_network: self.mgmt_network.clone(),
            ovf_network_name: self.ovf_network_name.clone(),
            disk_mode: self.disk_mode.clone(),
            controller_ova_path: self.controller_ova_path.clone(),
            vm_name: self.vm_name.clone(),
            power_on: self.power_on,
            vcenter_folder: self.vcenter_folder.clone(),
            ssl_verify: self.ssl_verify,
            state: self.state.clone(),
            mgmt_ip: self.mgmt_ip.clone(),
            mgmt_mask: self.mgmt_mask.clone(),
            default_gw: self.default_gw.clone(),
            sysadmin_public_key: self.sysadmin_public_key.clone(),
            props: (!self.props.is_empty()).then(|| self.props.iter().cloned().collect::<BTreeMap<_, _>>()),
            check_mode: self.check.then_some(true),
            task_poll_interval_ms: None,
        }
    }
}
