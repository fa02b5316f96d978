//! Flow slot states and the steps reported back to the UI

use serde::Serialize;

use crate::config::FlowMessages;
use crate::host::app_settings_uri;
use crate::permission::PermissionSet;
use crate::platform::FlowKind;

/// The controller's single in-flight slot
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FlowState {
    /// No flow running
    #[default]
    Idle,
    /// Grant state is being queried
    Checking { kind: FlowKind },
    /// A rationale dialog is waiting for the user
    NeedsRationale(PendingRationale),
    /// The OS request is in flight
    Requesting {
        kind: FlowKind,
        permissions: PermissionSet,
    },
    /// The settings guidance dialog is waiting for the user
    NeedsSettings {
        kind: FlowKind,
        denied: PermissionSet,
    },
}

impl FlowState {
    /// A new entry-point call must not start while busy
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Checking { .. } | Self::Requesting { .. })
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn kind(&self) -> Option<FlowKind> {
        match self {
            Self::Idle => None,
            Self::Checking { kind }
            | Self::Requesting { kind, .. }
            | Self::NeedsSettings { kind, .. } => Some(*kind),
            Self::NeedsRationale(pending) => Some(pending.kind),
        }
    }
}

/// What a confirmed rationale dialog will request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRationale {
    pub kind: FlowKind,
    pub wording: RationaleWording,
    pub permissions: PermissionSet,
}

/// Selects single- or multi-permission rationale text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RationaleWording {
    Single,
    Multiple,
}

impl RationaleWording {
    /// Wording for the first rationale of a flow
    pub fn for_flow(kind: FlowKind) -> Self {
        match kind {
            FlowKind::Single => Self::Single,
            FlowKind::Multiple => Self::Multiple,
        }
    }

    /// Wording when re-explaining after a denial
    pub fn for_denied(denied: &PermissionSet) -> Self {
        if denied.len() == 1 {
            Self::Single
        } else {
            Self::Multiple
        }
    }
}

/// Outcome of one controller call, for the UI to render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStep {
    /// Everything needed is granted; show the notice
    Satisfied(Notice),
    /// Present a rationale dialog, then call `on_rationale_confirm` or `on_rationale_cancel`
    ShowRationale(RationaleDialog),
    /// Present settings guidance, then call `on_settings_confirm` or `on_settings_cancel`
    ShowSettings(SettingsDialog),
    /// The user dismissed a dialog; the flow ended without an OS call
    Dismissed,
    /// Settings navigation was triggered
    SettingsOpened,
    /// A flow is already checking or requesting; this call was ignored
    Busy,
    /// A dialog callback arrived with no matching dialog pending
    NoPendingDialog,
}

/// Short transient notice (a toast on Android)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Nothing was missing when the flow started
    AlreadyGranted(FlowKind),
    /// The OS granted everything that was requested
    AllGranted,
}

impl Notice {
    pub fn text<'a>(&self, messages: &'a FlowMessages) -> &'a str {
        match self {
            Self::AlreadyGranted(FlowKind::Single) => messages.single_already_granted.as_str(),
            Self::AlreadyGranted(FlowKind::Multiple) => messages.multiple_already_granted.as_str(),
            Self::AllGranted => messages.all_granted.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RationaleDialog {
    pub kind: FlowKind,
    pub wording: RationaleWording,
    /// Permissions a confirm will request (before re-checking grant state)
    pub permissions: PermissionSet,
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    pub cancel_label: String,
}

impl RationaleDialog {
    pub(crate) fn new(pending: &PendingRationale, messages: &FlowMessages) -> Self {
        let message = match pending.wording {
            RationaleWording::Single => &messages.rationale_single,
            RationaleWording::Multiple => &messages.rationale_multiple,
        };
        Self {
            kind: pending.kind,
            wording: pending.wording,
            permissions: pending.permissions.clone(),
            title: messages.rationale_title.clone(),
            message: message.clone(),
            confirm_label: messages.rationale_confirm.clone(),
            cancel_label: messages.cancel.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsDialog {
    pub package: String,
    /// `package:<id>` URI for the app details page
    pub settings_uri: String,
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    pub cancel_label: String,
}

impl SettingsDialog {
    pub(crate) fn new(package: &str, messages: &FlowMessages) -> Self {
        Self {
            package: package.to_string(),
            settings_uri: app_settings_uri(package),
            title: messages.settings_title.clone(),
            message: messages.settings_message.clone(),
            confirm_label: messages.settings_confirm.clone(),
            cancel_label: messages.cancel.clone(),
        }
    }
}
