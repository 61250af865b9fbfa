//! Log output for the binary.
//!
//! Library crates log through `log`; the `tracing-log` bridge picks those
//! records up. Everything goes to stderr so stdout carries only the result.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "appliance_deploy=info,app_lib=info,sorng_vmware=info,sorng_ovftool=info";
const VERBOSE_FILTER: &str = "appliance_deploy=debug,app_lib=debug,sorng_vmware=debug,sorng_ovftool=debug";

/// Install the global subscriber. `RUST_LOG` wins over `verbose`.
pub fn init(verbose: bool) {
    let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
