//! Profile data model
//!
//! A profile (flavor) is an immutable bundle of settings and assets for one
//! deployment environment. Settings form a closed record shared by every
//! profile; free-form values live in `extra` and are reached by key.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Setting key for the display name
pub const KEY_DISPLAY_NAME: &str = "displayName";
/// Setting key for the bundle/application identifier suffix
pub const KEY_IDENTIFIER_SUFFIX: &str = "identifierSuffix";
/// Setting key for the backend project id
pub const KEY_BACKEND_PROJECT_ID: &str = "backend.projectId";
/// Setting key for the backend API base URL
pub const KEY_BACKEND_API_BASE_URL: &str = "backend.apiBaseUrl";
/// Setting key for the backend storage bucket
pub const KEY_BACKEND_STORAGE_BUCKET: &str = "backend.storageBucket";

/// Backend endpoint descriptors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendSettings {
    /// Backend project identifier
    pub project_id: String,
    /// Base URL of the backend API
    pub api_base_url: String,
    /// Storage bucket, if the backend has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_bucket: Option<String>,
}

/// Settings carried by every profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// User-facing application name
    pub display_name: String,
    /// Appended to the application identifier; may be empty
    pub identifier_suffix: String,
    /// Backend endpoint descriptors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendSettings>,
    /// Additional string settings; every profile declares the same keys
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Settings {
    /// Settings with the two required values and nothing else
    pub fn new(display_name: impl Into<String>, identifier_suffix: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            identifier_suffix: identifier_suffix.into(),
            backend: None,
            extra: BTreeMap::new(),
        }
    }

    /// Attach backend descriptors
    #[must_use]
    pub fn with_backend(mut self, backend: BackendSettings) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Add an extra string setting
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Look up a setting by key
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            KEY_DISPLAY_NAME => Some(&self.display_name),
            KEY_IDENTIFIER_SUFFIX => Some(&self.identifier_suffix),
            KEY_BACKEND_PROJECT_ID => self.backend.as_ref().map(|b| b.project_id.as_str()),
            KEY_BACKEND_API_BASE_URL => self.backend.as_ref().map(|b| b.api_base_url.as_str()),
            KEY_BACKEND_STORAGE_BUCKET => self
                .backend
                .as_ref()
                .and_then(|b| b.storage_bucket.as_deref()),
            other => self.extra.get(other).map(String::as_str),
        }
    }

    /// Every key this record defines
    pub fn keys(&self) -> BTreeSet<String> {
        let mut keys: BTreeSet<String> = [KEY_DISPLAY_NAME, KEY_IDENTIFIER_SUFFIX]
            .into_iter()
            .map(String::from)
            .collect();

        if let Some(backend) = &self.backend {
            keys.insert(KEY_BACKEND_PROJECT_ID.to_string());
            keys.insert(KEY_BACKEND_API_BASE_URL.to_string());
            if backend.storage_bucket.is_some() {
                keys.insert(KEY_BACKEND_STORAGE_BUCKET.to_string());
            }
        }

        keys.extend(self.extra.keys().cloned());
        keys
    }

    /// Key/value pairs in key order
    pub fn entries(&self) -> Vec<(String, String)> {
        self.keys()
            .into_iter()
            .filter_map(|k| self.get(&k).map(|v| (k.clone(), v.to_string())))
            .collect()
    }
}

/// Opaque per-profile resource file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Absolute or manifest-relative source path
    pub source: PathBuf,
    /// Relative destination inside the staging directory
    pub target: String,
}

impl Asset {
    /// Asset copied from `source` to `target`
    pub fn new(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// A named, immutable configuration profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique flavor name
    pub name: String,
    /// Values exposed once this profile is active
    pub settings: Settings,
    /// Files staged for this profile
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<Asset>,
}
