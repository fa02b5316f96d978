//! Runtime-permission request flow
//!
//! One user action (e.g. "take a photo") drives one flow through the slot:
//!
//! ```text
//!            ┌──────────┐  all granted   ┌───────────┐
//!  request ─▶│ Checking │───────────────▶│ Satisfied │
//!            └────┬─────┘                └───────────┘
//!     advisory?   │ no advisory               ▲
//!      ┌──────────┴──────────┐                │ none denied
//!      ▼                     ▼                │
//! ┌────────────────┐ confirm ┌────────────┐───┘
//! │ NeedsRationale │────────▶│ Requesting │
//! └────────────────┘◀────────└─────┬──────┘
//!    denied, OS still advising     │ denied, no advisory
//!                                  ▼
//!                           ┌───────────────┐
//!                           │ NeedsSettings │
//!                           └───────────────┘
//! ```
//!
//! Cancelling either dialog returns the slot to `Idle` without an OS call.
//!
//! # Example
//!
//! ```rust,ignore
//! use permflow::flow::{FlowStep, PermissionFlowController};
//!
//! let controller = PermissionFlowController::builder()
//!     .with_host(host)
//!     .config(config)
//!     .build()?;
//!
//! match controller.request_single().await? {
//!     FlowStep::Satisfied(notice) => toast(notice.text(&controller.config().messages)),
//!     FlowStep::ShowRationale(dialog) => show_rationale(dialog),
//!     FlowStep::ShowSettings(dialog) => show_settings(dialog),
//!     _ => {}
//! }
//! ```

mod controller;
mod state;

pub use controller::{FlowControllerBuilder, FlowError, PermissionFlowController};
pub use state::{
    FlowState, FlowStep, Notice, PendingRationale, RationaleDialog, RationaleWording,
    SettingsDialog,
};
