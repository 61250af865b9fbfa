//! # sorng-ovftool – OVA import via VMware ovftool
//!
//! The production [`sorng_vmware::Deployer`]: turns a deployment descriptor
//! into an `ovftool` command line and runs it.
//!
//! ## Modules
//!
//! - **types** — Runner configuration
//! - **command** — Argument assembly, `vi://` locator, redaction
//! - **runner** — Process execution

pub mod types;
pub mod command;
pub mod runner;

pub use runner::OvfToolDeployer;
pub use types::OvfToolConfig;
