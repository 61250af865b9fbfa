//! Error types for the VMware deployment crate.

use crate::types::EntityKind;
use std::fmt;

/// Categorised error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmwareErrorKind {
    /// vSphere endpoint unreachable or the transport failed
    ConnectionError,
    /// Authentication failed (401)
    AuthenticationError,
    /// A named inventory entity could not be resolved
    NotFound(EntityKind),
    /// A single inventory entry could not be read (403, stale entry, …).
    /// Recoverable: enumeration skips the entry.
    AccessError,
    /// A remote task finished in the error state
    RemoteOperationError,
    /// The external deployer exited non-zero or could not be started
    DelegateError,
    /// HTTP / API error with status code
    ApiError(u16),
    /// Timeout
    Timeout,
    /// JSON parse / deserialization error
    ParseError,
    /// The caller supplied an incomplete or inconsistent request
    InvalidRequest,
    /// Generic
    Other,
}

/// Crate error type carrying a kind + human-readable message.
#[derive(Debug, Clone)]
pub struct VmwareError {
    pub kind: VmwareErrorKind,
    pub message: String,
    /// Name of the resource that failed to resolve, if any.
    pub resource: Option<String>,
    /// Fault payload or captured diagnostic text, kept verbatim.
    pub details: Option<String>,
}

impl VmwareError {
    pub fn new(kind: VmwareErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            resource: None,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::ConnectionError, msg)
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::AuthenticationError, msg)
    }

    /// `NotFound(kind, name)`.
    pub fn not_found(kind: EntityKind, name: impl Into<String>) -> Self {
        let name = name.into();
        let mut err = Self::new(
            VmwareErrorKind::NotFound(kind),
            format!("Failed to find {kind} '{name}'"),
        );
        err.resource = Some(name);
        err
    }

    pub fn access(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::AccessError, msg)
    }

    pub fn remote_operation(msg: impl Into<String>, fault: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::RemoteOperationError, msg).with_details(fault)
    }

    pub fn delegate(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::DelegateError, msg)
    }

    pub fn api(status: u16, msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::ApiError(status), msg)
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::ParseError, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::Timeout, msg)
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(VmwareErrorKind::InvalidRequest, msg)
    }

    /// Only per-entry access failures may be swallowed during enumeration.
    pub fn is_recoverable(&self) -> bool {
        self.kind == VmwareErrorKind::AccessError
    }
}

impl fmt::Display for VmwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)?;
        if let Some(ref d) = self.details {
            write!(f, " — {d}")?;
        }
        Ok(())
    }
}

impl std::error::Error for VmwareError {}

impl From<VmwareError> for String {
    fn from(e: VmwareError) -> String {
        e.to_string()
    }
}

impl From<reqwest::Error> for VmwareError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(format!("HTTP timeout: {e}"))
        } else if e.is_connect() {
            Self::connection(format!("Connection failed: {e}"))
        } else {
            Self::new(VmwareErrorKind::Other, format!("HTTP error: {e}"))
        }
    }
}

impl From<serde_json::Error> for VmwareError {
    fn from(e: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {e}"))
    }
}

/// Convenience alias.
pub type VmwareResult<T> = Result<T, VmwareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_carries_kind_and_name() {
        let err = VmwareError::not_found(EntityKind::Cluster, "<any>");
        assert_eq!(err.kind, VmwareErrorKind::NotFound(EntityKind::Cluster));
        assert_eq!(err.resource.as_deref(), Some("<any>"));
        assert!(err.to_string().contains("cluster '<any>'"));
    }

    #[test]
    fn only_access_errors_are_recoverable() {
        assert!(VmwareError::access("stale datastore").is_recoverable());
        assert!(!VmwareError::auth("bad password").is_recoverable());
        assert!(!VmwareError::not_found(EntityKind::Datastore, "ds1").is_recoverable());
    }

    #[test]
    fn display_appends_details() {
        let err = VmwareError::remote_operation("Task task-7 failed", "InvalidPowerState");
        assert_eq!(
            err.to_string(),
            "[RemoteOperationError] Task task-7 failed — InvalidPowerState"
        );
    }
}
