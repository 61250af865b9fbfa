//! Configuration for the ovftool runner.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Binary name appended when `ovftool_path` points at a directory.
pub const OVFTOOL_BINARY: &str = "ovftool";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OvfToolConfig {
    /// Directory holding the `ovftool` binary, or the binary itself.
    pub ovftool_path: PathBuf,
    /// The appliance OVA to import.
    pub source: PathBuf,
    /// Verify the vCenter TLS certificate.
    #[serde(default)]
    pub ssl_verify: bool,
}

impl OvfToolConfig {
    pub fn new(ovftool_path: impl Into<PathBuf>, source: impl Into<PathBuf>) -> Self {
        Self {
            ovftool_path: ovftool_path.into(),
            source: source.into(),
            ssl_verify: false,
        }
    }

    /// The executable to run.
    pub fn binary(&self) -> PathBuf {
        if self.ovftool_path.is_dir() {
            self.ovftool_path.join(OVFTOOL_BINARY)
        } else {
            self.ovftool_path.clone()
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_gets_binary_name_appended() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = OvfToolConfig::new(dir.path(), "/tmp/controller.ova");
        assert_eq!(cfg.binary(), dir.path().join("ovftool"));

        let cfg = OvfToolConfig::new("/opt/vmware/ovftool/ovftool", "/tmp/controller.ova");
        assert_eq!(cfg.binary(), PathBuf::from("/opt/vmware/ovftool/ovftool"));
    }

    #[test]
    fn ssl_verify_defaults_off() {
        let cfg: OvfToolConfig =
            serde_json::from_str(r#"{"ovftoolPath":"/opt/ovftool","source":"/tmp/c.ova"}"#).unwrap();
        assert!(!cfg.ssl_verify);
    }
}
