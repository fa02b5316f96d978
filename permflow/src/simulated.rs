//! In-memory host that behaves like Android's permission subsystem
//!
//! Useful for demos and tests. The rules it follows:
//!
//! - the OS advises a rationale once a permission has been denied, until it
//!   becomes permanently denied
//! - on modern Android the second denial is permanent; answering
//!   [`NativeResponse::DenyPermanently`] ("don't ask again") is permanent at once
//! - permanently denied permissions are refused without showing a prompt
//! - only [`SimulatedHost::grant_in_settings`] can grant them again

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::host::{HostError, PermissionDispatcher, PermissionHost, SettingsNavigator};
use crate::permission::{GrantState, PermissionId, PermissionSet, RequestOutcome};

/// User's answer to the OS-native permission prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeResponse {
    Allow,
    Deny,
    /// Deny and tick "don't ask again"
    DenyPermanently,
}

/// Answers native prompts on behalf of the user
pub trait NativePromptResponder: Send + Sync {
    fn respond(&self, permission: &PermissionId) -> NativeResponse;
}

/// Responder that replays queued answers per permission
#[derive(Debug)]
pub struct ScriptedResponder {
    queues: Mutex<HashMap<PermissionId, VecDeque<NativeResponse>>>,
    fallback: NativeResponse,
}

impl ScriptedResponder {
    /// Answer `fallback` whenever nothing is queued
    pub fn new(fallback: NativeResponse) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            fallback,
        }
    }

    /// Queue the next answer for `permission`
    pub fn then(self, permission: impl Into<PermissionId>, response: NativeResponse) -> Self {
        self.push(permission, response);
        self
    }

    pub fn push(&self, permission: impl Into<PermissionId>, response: NativeResponse) {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(permission.into())
            .or_default()
            .push_back(response);
    }
}

impl Default for ScriptedResponder {
    fn default() -> Self {
        Self::new(NativeResponse::Deny)
    }
}

impl NativePromptResponder for ScriptedResponder {
    fn respond(&self, permission: &PermissionId) -> NativeResponse {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(permission)
            .and_then(VecDeque::pop_front)
            .unwrap_or(self.fallback)
    }
}

/// OS-side record of one permission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulatedPermission {
    pub granted: bool,
    pub denials: u32,
    pub permanently_denied: bool,
}

impl SimulatedPermission {
    pub fn advises_rationale(&self) -> bool {
        !self.granted && self.denials > 0 && !self.permanently_denied
    }
}

/// Simulated OS implementing every collaborator seam
pub struct SimulatedHost {
    permissions: Mutex<HashMap<PermissionId, SimulatedPermission>>,
    responder: Box<dyn NativePromptResponder>,
    denials_until_permanent: u32,
    requests: Mutex<Vec<PermissionSet>>,
    navigations: Mutex<Vec<String>>,
}

impl SimulatedHost {
    /// Host whose user denies every prompt
    pub fn new() -> Self {
        Self::with_responder(ScriptedResponder::default())
    }

    pub fn with_responder(responder: impl NativePromptResponder + 'static) -> Self {
        Self {
            permissions: Mutex::new(HashMap::new()),
            responder: Box::new(responder),
            denials_until_permanent: 2,
            requests: Mutex::new(Vec::new()),
            navigations: Mutex::new(Vec::new()),
        }
    }

    /// Number of plain denials after which a permission is permanently denied
    ///
    /// Set this before seeding state with [`previously_denied`](Self::previously_denied).
    pub fn denials_until_permanent(mut self, denials: u32) -> Self {
        self.denials_until_permanent = denials.max(1);
        self
    }

    pub fn with_permission(self, id: impl Into<PermissionId>, state: SimulatedPermission) -> Self {
        self.table().insert(id.into(), state);
        self
    }

    pub fn granted(self, id: impl Into<PermissionId>) -> Self {
        self.with_permission(
            id,
            SimulatedPermission {
                granted: true,
                ..Default::default()
            },
        )
    }

    /// Seed a permission the user has already denied `times` times
    pub fn previously_denied(self, id: impl Into<PermissionId>, times: u32) -> Self {
        let permanently_denied = times >= self.denials_until_permanent;
        self.with_permission(
            id,
            SimulatedPermission {
                granted: false,
                denials: times,
                permanently_denied,
            },
        )
    }

    pub fn permission(&self, id: &PermissionId) -> SimulatedPermission {
        self.table().get(id).copied().unwrap_or_default()
    }

    /// The user flips the permission on from the settings page
    pub fn grant_in_settings(&self, id: impl Into<PermissionId>) {
        self.table().insert(
            id.into(),
            SimulatedPermission {
                granted: true,
                ..Default::default()
            },
        );
    }

    /// The user flips the permission off from the settings page
    pub fn revoke(&self, id: impl Into<PermissionId>) {
        self.table().entry(id.into()).or_default().granted = false;
    }

    /// Every set passed to the dispatcher, in order
    pub fn requests(&self) -> Vec<PermissionSet> {
        lock(&self.requests).clone()
    }

    /// Every package passed to settings navigation, in order
    pub fn navigations(&self) -> Vec<String> {
        lock(&self.navigations).clone()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<PermissionId, SimulatedPermission>> {
        lock(&self.permissions)
    }

    fn prompt(&self, id: &PermissionId) -> bool {
        let current = self.permission(id);
        if current.granted {
            return true;
        }
        if current.permanently_denied {
            tracing::debug!(permission = %id, "Permanently denied, prompt suppressed");
            return false;
        }

        let response = self.responder.respond(id);
        tracing::debug!(permission = %id, ?response, "Native prompt answered");

        let mut table = self.table();
        let entry = table.entry(id.clone()).or_default();
        match response {
            NativeResponse::Allow => {
                entry.granted = true;
            }
            NativeResponse::Deny => {
                entry.denials += 1;
                entry.permanently_denied = entry.denials >= self.denials_until_permanent;
            }
            NativeResponse::DenyPermanently => {
                entry.denials += 1;
                entry.permanently_denied = true;
            }
        }
        entry.granted
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SimulatedHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedHost")
            .field("permissions", &*self.table())
            .field("denials_until_permanent", &self.denials_until_permanent)
            .finish_non_exhaustive()
    }
}

impl PermissionHost for SimulatedHost {
    fn query_grant(&self, permission: &PermissionId) -> Result<GrantState, HostError> {
        Ok(GrantState::from(self.permission(permission).granted))
    }

    fn query_rationale_advisory(&self, permission: &PermissionId) -> Result<bool, HostError> {
        Ok(self.permission(permission).advises_rationale())
    }
}

#[async_trait]
impl PermissionDispatcher for SimulatedHost {
    async fn request_permissions(
        &self,
        permissions: &PermissionSet,
    ) -> Result<RequestOutcome, HostError> {
        lock(&self.requests).push(permissions.clone());
        Ok(permissions
            .iter()
            .map(|id| (id.clone(), self.prompt(id)))
            .collect())
    }
}

impl SettingsNavigator for SimulatedHost {
    fn navigate_to_app_settings(&self, package: &str) -> Result<(), HostError> {
        lock(&self.navigations).push(package.to_string());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
