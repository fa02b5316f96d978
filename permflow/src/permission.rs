//! Permission identifiers, sets and request outcomes
//!
//! These are the only data the flow controller works with. Nothing here is
//! persisted: grant state and rationale advisories are always re-read from the
//! host.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Well-known Android runtime permission identifiers
pub mod android {
    pub const CAMERA: &str = "android.permission.CAMERA";
    pub const READ_MEDIA_IMAGES: &str = "android.permission.READ_MEDIA_IMAGES";
    pub const READ_MEDIA_VIDEO: &str = "android.permission.READ_MEDIA_VIDEO";
    pub const READ_EXTERNAL_STORAGE: &str = "android.permission.READ_EXTERNAL_STORAGE";
    /// Only meaningful below API 33
    pub const WRITE_EXTERNAL_STORAGE: &str = "android.permission.WRITE_EXTERNAL_STORAGE";
}

/// Opaque identifier of one OS-level permission
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionId(String);

impl PermissionId {
    /// Create a permission identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Full identifier as handed to the host
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last dotted segment, e.g. `CAMERA` for `android.permission.CAMERA`
    pub fn short_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PermissionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PermissionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PermissionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Ordered, deduplicated sequence of permissions
///
/// Insertion order is preserved; a repeated identifier keeps its first
/// position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<PermissionId>", into = "Vec<PermissionId>")]
pub struct PermissionSet {
    ids: Vec<PermissionId>,
}

impl PermissionSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set holding one permission
    pub fn single(id: impl Into<PermissionId>) -> Self {
        Self {
            ids: vec![id.into()],
        }
    }

    /// Append a permission, returning `false` if it was already present
    pub fn insert(&mut self, id: impl Into<PermissionId>) -> bool {
        let id = id.into();
        if self.ids.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn contains(&self, id: &PermissionId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PermissionId> {
        self.ids.iter()
    }

    pub fn as_slice(&self) -> &[PermissionId] {
        &self.ids
    }

    /// Keep the members for which `keep` returns true, preserving order
    pub fn filter(&self, mut keep: impl FnMut(&PermissionId) -> bool) -> Self {
        Self {
            ids: self.ids.iter().filter(|id| keep(id)).cloned().collect(),
        }
    }

    /// Fallible variant of [`filter`](Self::filter); stops at the first error
    pub fn try_filter<E>(
        &self,
        mut keep: impl FnMut(&PermissionId) -> Result<bool, E>,
    ) -> Result<Self, E> {
        let mut ids = Vec::with_capacity(self.ids.len());
        for id in &self.ids {
            if keep(id)? {
                ids.push(id.clone());
            }
        }
        Ok(Self { ids })
    }
}

impl<T: Into<PermissionId>> FromIterator<T> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl From<Vec<PermissionId>> for PermissionSet {
    fn from(ids: Vec<PermissionId>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<PermissionSet> for Vec<PermissionId> {
    fn from(set: PermissionSet) -> Self {
        set.ids
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a PermissionId;
    type IntoIter = std::slice::Iter<'a, PermissionId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, id) in self.ids.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(id.short_name())?;
        }
        f.write_str("]")
    }
}

/// Current grant state of one permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantState {
    Granted,
    Denied,
}

impl GrantState {
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

impl From<bool> for GrantState {
    fn from(granted: bool) -> Self {
        if granted {
            Self::Granted
        } else {
            Self::Denied
        }
    }
}

/// Result of one permission request round trip
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOutcome {
    results: HashMap<PermissionId, bool>,
}

impl RequestOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, id: impl Into<PermissionId>, granted: bool) -> Self {
        self.insert(id, granted);
        self
    }

    pub fn insert(&mut self, id: impl Into<PermissionId>, granted: bool) {
        self.results.insert(id.into(), granted);
    }

    /// Reported result for `id`, if the host reported one
    pub fn get(&self, id: &PermissionId) -> Option<bool> {
        self.results.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Members of `requested` not reported as granted, in request order
    ///
    /// A permission missing from the outcome counts as denied: an interrupted
    /// request comes back as an empty map.
    pub fn denied_in(&self, requested: &PermissionSet) -> PermissionSet {
        requested.filter(|id| !self.get(id).unwrap_or(false))
    }
}

impl<T: Into<PermissionId>> FromIterator<(T, bool)> for RequestOutcome {
    fn from_iter<I: IntoIterator<Item = (T, bool)>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().map(|(id, g)| (id.into(), g)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name() {
        assert_eq!(PermissionId::new(android::CAMERA).short_name(), "CAMERA");
        assert_eq!(PermissionId::new("custom").short_name(), "custom");
    }

    #[test]
    fn test_set_deduplicates_preserving_order() {
        let set: PermissionSet = [android::CAMERA, android::READ_MEDIA_VIDEO, android::CAMERA]
            .into_iter()
            .collect();

        assert_eq!(set.len(), 2);
        assert_eq!(set.as_slice()[0].as_str(), android::CAMERA);
        assert_eq!(set.as_slice()[1].as_str(), android::READ_MEDIA_VIDEO);
    }

    #[test]
    fn test_set_insert_reports_duplicates() {
        let mut set = PermissionSet::single(android::CAMERA);
        assert!(!set.insert(android::CAMERA));
        assert!(set.insert(android::READ_MEDIA_IMAGES));
        assert_eq!(set.to_string(), "[CAMERA, READ_MEDIA_IMAGES]");
    }

    #[test]
    fn test_set_deserialize_deduplicates() {
        let set: PermissionSet =
            serde_json::from_str(r#"["a.B", "a.C", "a.B"]"#).unwrap();
        assert_eq!(set.len(), 2);

        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["a.B","a.C"]"#);
    }

    #[test]
    fn test_try_filter_stops_on_error() {
        let set: PermissionSet = ["a", "b", "c"].into_iter().collect();
        let mut seen = 0;
        let result: Result<PermissionSet, &str> = set.try_filter(|id| {
            seen += 1;
            if id.as_str() == "b" {
                Err("boom")
            } else {
                Ok(true)
            }
        });
        assert_eq!(result, Err("boom"));
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_denied_in_follows_request_order() {
        let requested: PermissionSet = ["x", "y", "z"].into_iter().collect();
        let outcome = RequestOutcome::new()
            .with("z", false)
            .with("y", true)
            .with("x", false);

        let denied = outcome.denied_in(&requested);
        let names: Vec<_> = denied.iter().map(|id| id.as_str()).collect();
        assert_eq!(names, vec!["x", "z"]);
    }

    #[test]
    fn test_empty_outcome_counts_as_all_denied() {
        let requested: PermissionSet = ["x", "y"].into_iter().collect();
        let denied = RequestOutcome::new().denied_in(&requested);
        assert_eq!(denied, requested);
    }

    #[test]
    fn test_grant_state_from_bool() {
        assert!(GrantState::from(true).is_granted());
        assert_eq!(GrantState::from(false), GrantState::Denied);
    }
}
