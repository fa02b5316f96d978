//! Collaborator seams between the flow controller and the host OS
//!
//! The controller never talks to a platform directly. A host implements these
//! traits (over JNI, a simulator, or test doubles) and injects them.

use async_trait::async_trait;
use thiserror::Error;

use crate::permission::{GrantState, PermissionId, PermissionSet, RequestOutcome};

/// Error type for host collaborator calls
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Permission query failed for {permission}: {reason}")]
    Query {
        permission: PermissionId,
        reason: String,
    },

    #[error("Permission request could not be launched: {0}")]
    Launch(String),

    #[error("Permission request was abandoned before a result was delivered")]
    ResultDropped,

    #[error("Settings navigation failed: {0}")]
    Navigation(String),
}

/// Synchronous grant and advisory queries
///
/// Both calls must read live OS state; the controller never caches them.
pub trait PermissionHost: Send + Sync {
    /// Current grant state of `permission`
    fn query_grant(&self, permission: &PermissionId) -> Result<GrantState, HostError>;

    /// Whether the OS advises explaining `permission` before asking again
    fn query_rationale_advisory(&self, permission: &PermissionId) -> Result<bool, HostError>;
}

/// Asynchronous permission request
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use permflow::host::{HostError, PermissionDispatcher};
/// use permflow::permission::{PermissionSet, RequestOutcome};
///
/// struct GrantEverything;
///
/// #[async_trait]
/// impl PermissionDispatcher for GrantEverything {
///     async fn request_permissions(
///         &self,
///         permissions: &PermissionSet,
///     ) -> Result<RequestOutcome, HostError> {
///         Ok(permissions.iter().map(|p| (p.clone(), true)).collect())
///     }
/// }
/// ```
#[async_trait]
pub trait PermissionDispatcher: Send + Sync {
    /// Ask the OS for `permissions` and resolve once with its answer
    ///
    /// Never called with an empty set.
    async fn request_permissions(
        &self,
        permissions: &PermissionSet,
    ) -> Result<RequestOutcome, HostError>;
}

/// Navigation to the OS settings page for this application
pub trait SettingsNavigator: Send + Sync {
    fn navigate_to_app_settings(&self, package: &str) -> Result<(), HostError>;
}

/// URI identifying the application details page for `package`
pub fn app_settings_uri(package: &str) -> String {
    format!("package:{}", package)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_settings_uri() {
        assert_eq!(app_settings_uri("com.example.app"), "package:com.example.app");
    }

    #[test]
    fn test_error_display() {
        let err = HostError::Query {
            permission: PermissionId::new("android.permission.CAMERA"),
            reason: "jni".into(),
        };
        assert_eq!(
            err.to_string(),
            "Permission query failed for android.permission.CAMERA: jni"
        );
    }
}
