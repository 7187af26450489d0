//! Read-only view of the active flavor
//!
//! [`ResolvedConfig`] is the only surface application code receives. It wraps
//! the single resolved profile; the registry and every other profile are out
//! of reach. Clones share the same profile.

use crate::error::{Error, Result};
use crate::profile::{Asset, BackendSettings, Profile, Settings};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Read-only view of the active profile
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    profile: Arc<Profile>,
}

impl Serialize for ResolvedConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.profile.as_ref().serialize(serializer)
    }
}

impl ResolvedConfig {
    pub(crate) fn new(profile: Arc<Profile>) -> Self {
        Self { profile }
    }

    /// Name of the active flavor
    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// User-facing application name
    pub fn display_name(&self) -> &str {
        &self.profile.settings.display_name
    }

    /// Suffix appended to the bundle/application id; may be empty
    pub fn identifier_suffix(&self) -> &str {
        &self.profile.settings.identifier_suffix
    }

    /// Backend endpoint descriptors, if the flavor declares any
    pub fn backend(&self) -> Option<&BackendSettings> {
        self.profile.settings.backend.as_ref()
    }

    /// The typed settings record
    pub fn settings(&self) -> &Settings {
        &self.profile.settings
    }

    /// Files staged for this flavor
    pub fn assets(&self) -> &[Asset] {
        &self.profile.assets
    }

    /// Read a setting by key
    ///
    /// An undefined key is a manifest authoring defect and fails with
    /// `MissingSetting`.
    pub fn get(&self, key: &str) -> Result<&str> {
        self.profile
            .settings
            .get(key)
            .ok_or_else(|| Error::missing_setting(key, &self.profile.name))
    }

    /// Keys defined by the active flavor
    pub fn keys(&self) -> BTreeSet<String> {
        self.profile.settings.keys()
    }

    /// Whether two handles point at the same resolved profile
    pub fn ptr_eq(&self, other: &ResolvedConfig) -> bool {
        Arc::ptr_eq(&self.profile, &other.profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn config() -> ResolvedConfig {
        ResolvedConfig::new(Arc::new(Profile {
            name: "production".to_string(),
            settings: Settings::new("App", "").with_extra("greeting", "Hello"),
            assets: vec![],
        }))
    }

    #[test]
    fn test_accessors() {
        let config = config();
        assert_eq!(config.name(), "production");
        assert_eq!(config.display_name(), "App");
        assert_eq!(config.identifier_suffix(), "");
        assert!(config.backend().is_none());
        assert_eq!(config.get("greeting").unwrap(), "Hello");
    }

    #[test]
    fn test_missing_setting() {
        let err = config().get("nonexistentKey").unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingSetting);
        assert!(err.message.contains("nonexistentKey"));
        assert!(err.message.contains("production"));
    }

    #[test]
    fn test_clones_share_profile() {
        let a = config();
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&config()));
    }

    #[test]
    fn test_serializes_active_profile_only() {
        let json = serde_json::to_value(config()).unwrap();
        assert_eq!(json["name"], "production");
        assert_eq!(json["settings"]["displayName"], "App");
        assert_eq!(json["settings"]["extra"]["greeting"], "Hello");
    }

    #[test]
    fn test_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ResolvedConfig>();
    }
}
