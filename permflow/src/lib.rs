//! permflow: runtime-permission request flow, independent of any UI host
//!
//! Given a permission set and live OS state, the flow controller decides
//! whether nothing needs doing, whether to request directly, whether to
//! explain first, or whether only the settings page can help. The host OS is
//! reached exclusively through the traits in [`host`].

pub mod audit;
pub mod config;
pub mod dispatch;
pub mod flow;
pub mod host;
pub mod permission;
pub mod platform;
pub mod simulated;
#[cfg(feature = "subscriber")]
pub mod tracing_support;

pub use config::{ConfigError, FlowConfig, FlowMessages};
pub use flow::{FlowError, FlowState, FlowStep, Notice, PermissionFlowController};
pub use host::{HostError, PermissionDispatcher, PermissionHost, SettingsNavigator};
pub use permission::{GrantState, PermissionId, PermissionSet, RequestOutcome};
pub use platform::{select_permission_set, FlowKind, PlatformVersion};
