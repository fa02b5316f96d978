//! The permission flow state machine

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use super::state::{
    FlowState, FlowStep, Notice, PendingRationale, RationaleDialog, RationaleWording,
    SettingsDialog,
};
use crate::audit::{AuditSink, FlowEvent, FlowEventType, NullAuditSink};
use crate::config::FlowConfig;
use crate::host::{HostError, PermissionDispatcher, PermissionHost, SettingsNavigator};
use crate::permission::PermissionSet;
use crate::platform::FlowKind;

/// Error type for flow operations
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Refusing to dispatch an empty permission request")]
    EmptyRequest,

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("Flow controller is missing its {0}")]
    MissingComponent(&'static str),
}

/// Decides whether to request, explain, or redirect to settings
///
/// Holds a single flow slot. Entry points and dialog callbacks advance it and
/// report a [`FlowStep`] for the UI to render.
pub struct PermissionFlowController {
    host: Arc<dyn PermissionHost>,
    dispatcher: Arc<dyn PermissionDispatcher>,
    navigator: Arc<dyn SettingsNavigator>,
    audit: Arc<dyn AuditSink>,
    config: FlowConfig,
    state: Mutex<FlowState>,
}

impl fmt::Debug for PermissionFlowController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionFlowController")
            .field("config", &self.config)
            .field("state", &*self.slot())
            .finish_non_exhaustive()
    }
}

impl PermissionFlowController {
    pub fn builder() -> FlowControllerBuilder {
        FlowControllerBuilder::new()
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Snapshot of the flow slot
    pub fn state(&self) -> FlowState {
        self.slot().clone()
    }

    /// Permissions the given entry point asks for on the configured platform
    pub fn permissions_for(&self, kind: FlowKind) -> PermissionSet {
        kind.permissions(self.config.platform)
    }

    /// Entry point for the camera-only flow
    pub async fn request_single(&self) -> Result<FlowStep, FlowError> {
        self.request(FlowKind::Single).await
    }

    /// Entry point for the camera-and-storage flow
    pub async fn request_multiple(&self) -> Result<FlowStep, FlowError> {
        self.request(FlowKind::Multiple).await
    }

    /// Start a flow of `kind`
    ///
    /// Returns [`FlowStep::Busy`] without touching the host while another flow
    /// is checking or waiting on the OS. A pending dialog is discarded.
    pub async fn request(&self, kind: FlowKind) -> Result<FlowStep, FlowError> {
        if !self.try_begin(kind) {
            return Ok(FlowStep::Busy);
        }
        let guard = SlotGuard::new(self);
        let step = self.check(kind).await?;
        guard.disarm();
        Ok(step)
    }

    /// The user accepted the rationale dialog
    pub async fn on_rationale_confirm(&self) -> Result<FlowStep, FlowError> {
        let Some(pending) = self.take_pending_rationale() else {
            return Ok(FlowStep::NoPendingDialog);
        };
        let guard = SlotGuard::new(self);
        let step = self.confirm_rationale(pending).await?;
        guard.disarm();
        Ok(step)
    }

    /// The user dismissed the rationale dialog
    pub fn on_rationale_cancel(&self) -> FlowStep {
        let Some(pending) = self.take_pending_rationale() else {
            return FlowStep::NoPendingDialog;
        };
        self.reset();
        tracing::info!(flow = ?pending.kind, "Rationale dismissed");
        self.record(FlowEventType::FlowCancelled, pending.kind, &pending.permissions);
        FlowStep::Dismissed
    }

    /// The user chose to open the app settings page
    pub fn on_settings_confirm(&self) -> Result<FlowStep, FlowError> {
        let Some((kind, denied)) = self.take_pending_settings() else {
            return Ok(FlowStep::NoPendingDialog);
        };
        self.navigator
            .navigate_to_app_settings(&self.config.package)?;
        tracing::info!(package = %self.config.package, "Opened app settings");
        self.record(FlowEventType::SettingsOpened, kind, &denied);
        Ok(FlowStep::SettingsOpened)
    }

    /// The user dismissed the settings guidance dialog
    pub fn on_settings_cancel(&self) -> FlowStep {
        let Some((kind, denied)) = self.take_pending_settings() else {
            return FlowStep::NoPendingDialog;
        };
        tracing::info!(flow = ?kind, "Settings guidance dismissed");
        self.record(FlowEventType::FlowCancelled, kind, &denied);
        FlowStep::Dismissed
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    async fn check(&self, kind: FlowKind) -> Result<FlowStep, FlowError> {
        let permissions = self.permissions_for(kind);
        let missing = self.missing(&permissions)?;
        tracing::debug!(flow = ?kind, %permissions, %missing, "Checked grant state");

        if missing.is_empty() {
            return Ok(self.satisfied(kind, Notice::AlreadyGranted(kind), &permissions));
        }

        if self.any_rationale(&missing)? {
            return Ok(self.await_rationale(PendingRationale {
                kind,
                wording: RationaleWording::for_flow(kind),
                permissions: missing,
            }));
        }

        self.dispatch(kind, missing).await
    }

    async fn confirm_rationale(&self, pending: PendingRationale) -> Result<FlowStep, FlowError> {
        // Grant state may have changed while the dialog was up
        let still_missing = self.missing(&pending.permissions)?;
        if still_missing.is_empty() {
            return Ok(self.satisfied(
                pending.kind,
                Notice::AlreadyGranted(pending.kind),
                &pending.permissions,
            ));
        }
        self.dispatch(pending.kind, still_missing).await
    }

    async fn dispatch(
        &self,
        kind: FlowKind,
        permissions: PermissionSet,
    ) -> Result<FlowStep, FlowError> {
        if permissions.is_empty() {
            return Err(FlowError::EmptyRequest);
        }

        self.set_state(FlowState::Requesting {
            kind,
            permissions: permissions.clone(),
        });
        tracing::info!(flow = ?kind, %permissions, "Requesting permissions");
        self.record(FlowEventType::PermissionsRequested, kind, &permissions);

        let outcome = self.dispatcher.request_permissions(&permissions).await?;
        let denied = outcome.denied_in(&permissions);

        if denied.is_empty() {
            return Ok(self.satisfied(kind, Notice::AllGranted, &permissions));
        }

        tracing::info!(flow = ?kind, %denied, "Permissions denied");
        self.record(FlowEventType::PermissionsDenied, kind, &denied);

        if self.any_permanently_denied(&denied)? {
            tracing::debug!(flow = ?kind, "Denied without rationale advisory, directing to settings");
            self.set_state(FlowState::NeedsSettings {
                kind,
                denied: denied.clone(),
            });
            self.record(FlowEventType::SettingsShown, kind, &denied);
            return Ok(FlowStep::ShowSettings(SettingsDialog::new(
                &self.config.package,
                &self.config.messages,
            )));
        }

        Ok(self.await_rationale(PendingRationale {
            kind,
            wording: RationaleWording::for_denied(&denied),
            permissions: denied,
        }))
    }

    fn satisfied(&self, kind: FlowKind, notice: Notice, permissions: &PermissionSet) -> FlowStep {
        self.reset();
        let event_type = match notice {
            Notice::AlreadyGranted(_) => FlowEventType::AlreadyGranted,
            Notice::AllGranted => FlowEventType::PermissionsGranted,
        };
        tracing::info!(flow = ?kind, %permissions, "Permissions satisfied");
        self.record(event_type, kind, permissions);
        FlowStep::Satisfied(notice)
    }

    fn await_rationale(&self, pending: PendingRationale) -> FlowStep {
        let dialog = RationaleDialog::new(&pending, &self.config.messages);
        tracing::debug!(
            flow = ?pending.kind,
            wording = ?pending.wording,
            permissions = %pending.permissions,
            "Showing rationale"
        );
        self.record(FlowEventType::RationaleShown, pending.kind, &pending.permissions);
        self.set_state(FlowState::NeedsRationale(pending));
        FlowStep::ShowRationale(dialog)
    }

    // ------------------------------------------------------------------------
    // Host queries
    // ------------------------------------------------------------------------

    fn missing(&self, permissions: &PermissionSet) -> Result<PermissionSet, HostError> {
        permissions.try_filter(|p| -> Result<bool, HostError> {
            Ok(!self.host.query_grant(p)?.is_granted())
        })
    }

    fn any_rationale(&self, permissions: &PermissionSet) -> Result<bool, HostError> {
        for p in permissions {
            if self.host.query_rationale_advisory(p)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The OS stops advising rationale once it will no longer prompt
    fn any_permanently_denied(&self, denied: &PermissionSet) -> Result<bool, HostError> {
        for p in denied {
            if !self.host.query_rationale_advisory(p)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    // ------------------------------------------------------------------------
    // Slot bookkeeping
    // ------------------------------------------------------------------------

    fn slot(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: FlowState) {
        *self.slot() = state;
    }

    fn reset(&self) {
        self.set_state(FlowState::Idle);
    }

    fn try_begin(&self, kind: FlowKind) -> bool {
        let mut state = self.slot();
        if state.is_busy() {
            tracing::debug!(flow = ?kind, current = ?state.kind(), "Flow busy, ignoring request");
            return false;
        }
        if !state.is_idle() {
            tracing::debug!(flow = ?kind, "Discarding pending dialog for new flow");
        }
        *state = FlowState::Checking { kind };
        true
    }

    fn take_pending_rationale(&self) -> Option<PendingRationale> {
        let mut state = self.slot();
        match std::mem::take(&mut *state) {
            FlowState::NeedsRationale(pending) => {
                *state = FlowState::Checking { kind: pending.kind };
                Some(pending)
            }
            other => {
                *state = other;
                None
            }
        }
    }

    /// Leaves the slot idle when a settings dialog was pending
    fn take_pending_settings(&self) -> Option<(FlowKind, PermissionSet)> {
        let mut state = self.slot();
        match std::mem::take(&mut *state) {
            FlowState::NeedsSettings { kind, denied } => Some((kind, denied)),
            other => {
                *state = other;
                None
            }
        }
    }

    fn record(&self, event_type: FlowEventType, kind: FlowKind, permissions: &PermissionSet) {
        let event = FlowEvent::new(event_type, kind, permissions.clone());
        if let Err(e) = self.audit.record(event) {
            tracing::warn!(error = %e, ?event_type, "Failed to record flow event");
        }
    }
}

/// Returns the slot to `Idle` if a busy flow ends without settling it
///
/// Covers both the error path and a caller dropping the future mid-await.
struct SlotGuard<'a> {
    controller: &'a PermissionFlowController,
    armed: bool,
}

impl<'a> SlotGuard<'a> {
    fn new(controller: &'a PermissionFlowController) -> Self {
        Self {
            controller,
            armed: true,
        }
    }

    /// The flow reached a settled state; leave the slot as it is
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let abandoned = self.controller.slot().kind();
            tracing::debug!(flow = ?abandoned, "Flow ended unsettled, resetting slot");
            self.controller.reset();
        }
    }
}

/// Builder for [`PermissionFlowController`]
pub struct FlowControllerBuilder {
    host: Option<Arc<dyn PermissionHost>>,
    dispatcher: Option<Arc<dyn PermissionDispatcher>>,
    navigator: Option<Arc<dyn SettingsNavigator>>,
    audit: Option<Arc<dyn AuditSink>>,
    config: FlowConfig,
}

impl FlowControllerBuilder {
    pub fn new() -> Self {
        Self {
            host: None,
            dispatcher: None,
            navigator: None,
            audit: None,
            config: FlowConfig::default(),
        }
    }

    /// Use one object for grant queries, requests and settings navigation
    pub fn with_host<H>(self, host: Arc<H>) -> Self
    where
        H: PermissionHost + PermissionDispatcher + SettingsNavigator + 'static,
    {
        self.host(host.clone())
            .dispatcher(host.clone())
            .navigator(host)
    }

    pub fn host(mut self, host: Arc<dyn PermissionHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn PermissionDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn SettingsNavigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Defaults to [`NullAuditSink`]
    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<PermissionFlowController, FlowError> {
        Ok(PermissionFlowController {
            host: self
                .host
                .ok_or(FlowError::MissingComponent("permission host"))?,
            dispatcher: self
                .dispatcher
                .ok_or(FlowError::MissingComponent("permission dispatcher"))?,
            navigator: self
                .navigator
                .ok_or(FlowError::MissingComponent("settings navigator"))?,
            audit: self.audit.unwrap_or_else(|| Arc::new(NullAuditSink)),
            config: self.config,
            state: Mutex::new(FlowState::Idle),
        })
    }
}

impl Default for FlowControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
