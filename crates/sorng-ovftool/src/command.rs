//! ovftool command-line assembly.
//!
//! Argument order is fixed: flags, placement, naming, networks,
//! properties, folder, then the source and the `vi://` locator last.

use crate::types::OvfToolConfig;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sorng_vmware::types::NetworkMapping;
use sorng_vmware::DeployInvocation;

/// Userinfo encoding: everything but RFC 3986 unreserved characters.
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

const REDACTED: &str = "****";

/// `vi://user:password@host/<dc>/host/<cluster>` with user and password
/// percent-encoded.
pub fn locator(invocation: &DeployInvocation) -> String {
    let password = utf8_percent_encode(&invocation.target.password, USERINFO).to_string();
    build_locator(invocation, &password)
}

fn build_locator(invocation: &DeployInvocation, encoded_password: &str) -> String {
    format!(
        "vi://{}:{}@{}/{}",
        utf8_percent_encode(&invocation.target.username, USERINFO),
        encoded_password,
        invocation.target.host,
        invocation.inventory_path(),
    )
}

/// Every argument after the binary.
pub fn build_args(config: &OvfToolConfig, invocation: &DeployInvocation) -> Vec<String> {
    let mut args = flag_args(config, invocation);
    args.push(config.source().display().to_string());
    args.push(locator(invocation));
    args
}

/// Same as [`build_args`] with the password masked, for logging.
pub fn redacted_args(config: &OvfToolConfig, invocation: &DeployInvocation) -> Vec<String> {
    let mut args = flag_args(config, invocation);
    args.push(config.source().display().to_string());
    args.push(build_locator(invocation, REDACTED));
    args
}

fn flag_args(config: &OvfToolConfig, inv: &DeployInvocation) -> Vec<String> {
    let mut args = Vec::new();
    if inv.power_on {
        args.push("--powerOn".to_string());
    }
    if !config.ssl_verify {
        args.push("--noSSLVerify".to_string());
    }
    if inv.dry_run {
        args.push("--verifyOnly".to_string());
    }
    args.extend(
        ["--acceptAllEulas", "--skipManifestCheck", "--allowExtraConfig"]
            .iter()
            .map(|s| s.to_string()),
    );
    args.push(format!("--diskMode={}", inv.disk_mode));
    args.push(format!("--datastore={}", inv.datastore));
    args.push(format!("--name={}", inv.vm_name));

    match &inv.network {
        NetworkMapping::Single(target) => args.push(format!("--network={target}")),
        NetworkMapping::PerNetwork(map) => {
            for (ovf, target) in map {
                args.push(format!("--net:{ovf}={target}"));
            }
        }
    }
    for (key, value) in &inv.properties {
        args.push(format!("--prop:{key}={value}"));
    }
    if let Some(folder) = &inv.folder {
        args.push(format!("--vmFolder={folder}"));
    }
    args
}
