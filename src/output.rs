//! JSON result rendering.

use serde_json::json;
use sorng_vmware::types::WorkflowResult;
use sorng_vmware::VmwareError;

pub fn render_success(result: &WorkflowResult) -> String {
    serde_json::to_string_pretty(result).unwrap_or_else(|e| render_message(&format!("Cannot render result: {e}")))
}

/// `{"failed": true, "msg": …}` plus the error kind and any verbatim details.
pub fn render_failure(err: &VmwareError) -> String {
    let mut body = json!({
        "failed": true,
        "changed": false,
        "msg": err.message,
        "kind": format!("{:?}", err.kind),
    });
    if let Some(details) = &err.details {
        body["details"] = json!(details);
    }
    serde_json::to_string_pretty(&body).unwrap_or_else(|_| render_message(&err.message))
}

/// Failure that never reached the workflow (bad arguments, runtime setup).
pub fn render_message(msg: &str) -> String {
    json!({ "failed": true, "changed": false, "msg": msg }).to_string()
}
