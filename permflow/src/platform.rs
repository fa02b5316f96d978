//! Platform-dependent permission set selection

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::permission::{android, PermissionSet};

/// Host platform version, expressed as an Android API level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformVersion(u32);

impl PlatformVersion {
    /// Android 13, which split storage access into granular media permissions
    pub const TIRAMISU: Self = Self(33);

    pub const fn new(api_level: u32) -> Self {
        Self(api_level)
    }

    pub const fn api_level(self) -> u32 {
        self.0
    }

    pub fn has_granular_media(self) -> bool {
        self >= Self::TIRAMISU
    }
}

impl Default for PlatformVersion {
    fn default() -> Self {
        Self::TIRAMISU
    }
}

impl fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API {}", self.0)
    }
}

/// Which entry point started a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    /// Camera only
    Single,
    /// Camera plus storage/media access
    Multiple,
}

impl FlowKind {
    /// Permission set requested by this entry point on `version`
    pub fn permissions(self, version: PlatformVersion) -> PermissionSet {
        match self {
            Self::Single => single_permission_set(),
            Self::Multiple => select_permission_set(version),
        }
    }
}

/// The single-permission flow always asks for the camera
pub fn single_permission_set() -> PermissionSet {
    PermissionSet::single(android::CAMERA)
}

/// Camera plus the storage permissions appropriate for `version`
pub fn select_permission_set(version: PlatformVersion) -> PermissionSet {
    if version.has_granular_media() {
        [
            android::CAMERA,
            android::READ_MEDIA_IMAGES,
            android::READ_MEDIA_VIDEO,
        ]
        .into_iter()
        .collect()
    } else {
        [
            android::CAMERA,
            android::READ_EXTERNAL_STORAGE,
            android::WRITE_EXTERNAL_STORAGE,
        ]
        .into_iter()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::PermissionId;

    fn names(set: &PermissionSet) -> Vec<&str> {
        set.iter().map(PermissionId::short_name).collect()
    }

    #[test]
    fn test_granular_media_from_tiramisu() {
        let set = select_permission_set(PlatformVersion::new(33));
        assert_eq!(
            names(&set),
            vec!["CAMERA", "READ_MEDIA_IMAGES", "READ_MEDIA_VIDEO"]
        );

        let set = select_permission_set(PlatformVersion::new(35));
        assert!(set.contains(&PermissionId::new(android::READ_MEDIA_VIDEO)));
    }

    #[test]
    fn test_legacy_storage_below_tiramisu() {
        let set = select_permission_set(PlatformVersion::new(32));
        assert_eq!(
            names(&set),
            vec!["CAMERA", "READ_EXTERNAL_STORAGE", "WRITE_EXTERNAL_STORAGE"]
        );
    }

    #[test]
    fn test_flow_kind_sets() {
        let v = PlatformVersion::new(28);
        assert_eq!(FlowKind::Single.permissions(v), single_permission_set());
        assert_eq!(FlowKind::Multiple.permissions(v).len(), 3);
    }

    #[test]
    fn test_version_display_and_default() {
        assert_eq!(PlatformVersion::default(), PlatformVersion::TIRAMISU);
        assert_eq!(PlatformVersion::new(30).to_string(), "API 30");
    }
}
