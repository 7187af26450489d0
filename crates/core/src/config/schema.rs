//! Flavor manifest schema
//!
//! The on-disk shape of `flavors.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root manifest schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FlavorManifest {
    /// `[project]` table
    #[serde(default)]
    pub project: ProjectConfig,

    /// `[selection]` table
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Declared flavors, in declaration order
    #[serde(default, rename = "flavor")]
    pub flavors: Vec<FlavorEntry>,
}

impl FlavorManifest {
    /// The static default flavor: `[selection] default`, else the first declared flavor
    pub fn default_flavor(&self) -> Option<&str> {
        self.selection
            .default
            .as_deref()
            .or_else(|| self.flavors.first().map(|f| f.name.as_str()))
    }
}

/// Project metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    #[serde(default = "default_project_name")]
    pub name: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_project_name(),
        }
    }
}

fn default_project_name() -> String {
    "App".to_string()
}

/// Where the selection input is read from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Property key used by `-P key=value` and the properties file
    #[serde(default = "default_property")]
    pub property: String,

    /// Environment variable consulted when no command-line property is given
    #[serde(default = "default_env")]
    pub env: String,

    /// Properties file, relative to the manifest directory
    #[serde(default = "default_properties_file")]
    pub properties_file: String,

    /// Explicit default flavor
    #[serde(default)]
    pub default: Option<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            property: default_property(),
            env: default_env(),
            properties_file: default_properties_file(),
            default: None,
        }
    }
}

fn default_property() -> String {
    "flavor".to_string()
}

fn default_env() -> String {
    "FLAVOR".to_string()
}

fn default_properties_file() -> String {
    "flavor.properties".to_string()
}

/// One `[[flavor]]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlavorEntry {
    /// Flavor name used for selection
    pub name: String,

    /// User-facing application name
    pub display_name: String,

    /// Application identifier suffix, e.g. `.dev`
    #[serde(default)]
    pub identifier_suffix: String,

    /// `[flavor.backend]` table
    #[serde(default)]
    pub backend: Option<BackendEntry>,

    /// `[flavor.extra]` string settings
    #[serde(default)]
    pub extra: BTreeMap<String, String>,

    /// `[[flavor.assets]]` entries
    #[serde(default)]
    pub assets: Vec<AssetEntry>,
}

/// Backend endpoint descriptors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendEntry {
    /// Backend project identifier
    pub project_id: String,
    /// Base URL of the backend API
    pub api_base_url: String,
    /// Storage bucket, if the backend has one
    #[serde(default)]
    pub storage_bucket: Option<String>,
}

/// Credential or resource file shipped with a flavor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetEntry {
    /// Source path, relative to the manifest directory
    pub source: String,

    /// Destination path inside the staging directory; defaults to the source file name
    #[serde(default)]
    pub target: Option<String>,
}
