//! Profile registry
//!
//! The closed set of declared flavors. Profiles are registered through
//! [`RegistryBuilder`]; [`RegistryBuilder::build`] consumes the builder, so no
//! profile can be added once the registry exists.

use crate::codegen::env_key;
use crate::config::{Config, FlavorEntry};
use crate::error::{Error, Result};
use crate::profile::{Asset, BackendSettings, Profile, Settings, KEY_DISPLAY_NAME};
use crate::profile::{
    KEY_BACKEND_API_BASE_URL, KEY_BACKEND_PROJECT_ID, KEY_BACKEND_STORAGE_BUCKET,
    KEY_IDENTIFIER_SUFFIX,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path};
use std::sync::Arc;

static PROFILE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("valid regex"));

static EXTRA_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid regex"));

const RESERVED_KEYS: &[&str] = &[
    KEY_DISPLAY_NAME,
    KEY_IDENTIFIER_SUFFIX,
    KEY_BACKEND_PROJECT_ID,
    KEY_BACKEND_API_BASE_URL,
    KEY_BACKEND_STORAGE_BUCKET,
];

/// Collects profiles before the registry is closed
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    profiles: Vec<Arc<Profile>>,
    index: HashMap<String, usize>,
}

impl RegistryBuilder {
    /// An empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile
    ///
    /// Fails when the name is taken or malformed, when an extra key is
    /// malformed or shadows a built-in key, or when the profile's key set
    /// differs from the first registered profile.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        settings: Settings,
        assets: Vec<Asset>,
    ) -> Result<()> {
        let name = name.into();

        if !PROFILE_NAME.is_match(&name) {
            return Err(Error::invalid_profile_name(&name));
        }
        if self.index.contains_key(&name) {
            return Err(Error::duplicate_profile(&name));
        }

        for key in settings.extra.keys() {
            if RESERVED_KEYS.contains(&key.as_str()) || !EXTRA_KEY.is_match(key) {
                return Err(Error::config_invalid(format!(
                    "Flavor '{name}' declares invalid extra setting key '{key}'"
                )));
            }
        }

        let mut exported: HashMap<String, String> = HashMap::new();
        for key in settings.keys() {
            let var = env_key(&key);
            if let Some(other) = exported.insert(var.clone(), key.clone()) {
                return Err(Error::config_invalid(format!(
                    "Flavor '{name}' settings '{other}' and '{key}' both export as FLAVOR_{var}"
                ))
                .with_suggestion("Rename one of the keys"));
            }
        }

        for asset in &assets {
            validate_target(&name, &asset.target)?;
        }

        if let Some(reference) = self.profiles.first() {
            let expected = reference.settings.keys();
            let actual = settings.keys();
            if expected != actual {
                return Err(Error::settings_mismatch(
                    &name,
                    &reference.name,
                    &describe_difference(&expected, &actual),
                ));
            }
        }

        tracing::debug!(flavor = %name, assets = assets.len(), "Registered flavor");

        self.index.insert(name.clone(), self.profiles.len());
        self.profiles.push(Arc::new(Profile {
            name,
            settings,
            assets,
        }));
        Ok(())
    }

    /// Close the registry
    pub fn build(self) -> Result<ProfileRegistry> {
        if self.profiles.is_empty() {
            return Err(Error::empty_registry());
        }

        Ok(ProfileRegistry {
            profiles: self.profiles,
            index: self.index,
        })
    }
}

/// The fixed set of known profiles, in declaration order
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: Vec<Arc<Profile>>,
    index: HashMap<String, usize>,
}

impl ProfileRegistry {
    /// Start registering profiles
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Build a registry from a loaded manifest
    ///
    /// Asset sources are expanded (`~`, `$VAR`) and resolved against the
    /// manifest directory.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = RegistryBuilder::new();

        for entry in &config.manifest.flavors {
            let assets = resolve_assets(entry, config.base_dir())?;
            builder.register(entry.name.clone(), settings_from_entry(entry), assets)?;
        }

        let registry = builder.build()?;

        if let Some(default) = &config.manifest.selection.default {
            registry.lookup(default).map_err(|e| {
                e.with_context(format!(
                    "[selection] default in {} names an undeclared flavor",
                    config.path.display()
                ))
            })?;
        }

        Ok(registry)
    }

    /// Find a profile by exact name
    pub fn lookup(&self, name: &str) -> Result<Arc<Profile>> {
        match self.index.get(name) {
            Some(&idx) => {
                tracing::debug!(flavor = %name, "Flavor lookup hit");
                Ok(Arc::clone(&self.profiles[idx]))
            }
            None => Err(Error::unknown_profile(name, &self.names())),
        }
    }

    /// Whether a profile with this exact name exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Names in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.as_str()).collect()
    }

    /// First declared profile
    pub fn first(&self) -> &Profile {
        // A registry is never empty; `build` rejects that.
        &self.profiles[0]
    }

    /// Number of declared profiles
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Always false for a built registry
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Iterate profiles in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.iter().map(AsRef::as_ref)
    }
}

fn settings_from_entry(entry: &FlavorEntry) -> Settings {
    Settings {
        display_name: entry.display_name.clone(),
        identifier_suffix: entry.identifier_suffix.clone(),
        backend: entry.backend.as_ref().map(|b| BackendSettings {
            project_id: b.project_id.clone(),
            api_base_url: b.api_base_url.clone(),
            storage_bucket: b.storage_bucket.clone(),
        }),
        extra: entry.extra.clone(),
    }
}

fn resolve_assets(entry: &FlavorEntry, base_dir: &Path) -> Result<Vec<Asset>> {
    entry
        .assets
        .iter()
        .map(|asset| {
            let expanded = shellexpand::full(&asset.source).map_err(|e| {
                Error::config_invalid(format!(
                    "Cannot expand asset path '{}' of flavor '{}': {}",
                    asset.source, entry.name, e
                ))
            })?;
            let source = base_dir.join(expanded.as_ref());

            let target = match &asset.target {
                Some(target) => target.clone(),
                None => source
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| {
                        Error::config_invalid(format!(
                            "Asset '{}' of flavor '{}' has no file name",
                            asset.source, entry.name
                        ))
                    })?,
            };

            Ok(Asset::new(source, target))
        })
        .collect()
}

/// Targets must stay inside the staging directory
pub(crate) fn validate_target(profile: &str, target: &str) -> Result<()> {
    let path = Path::new(target);
    let escapes = target.is_empty()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

    if escapes {
        return Err(Error::config_invalid(format!(
            "Asset target '{target}' of flavor '{profile}' must be a relative path inside the staging directory"
        )));
    }
    Ok(())
}

fn describe_difference(expected: &BTreeSet<String>, actual: &BTreeSet<String>) -> String {
    let missing: Vec<&str> = expected.difference(actual).map(String::as_str).collect();
    let unexpected: Vec<&str> = actual.difference(expected).map(String::as_str).collect();

    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing: {}", missing.join(", ")));
    }
    if !unexpected.is_empty() {
        parts.push(format!("unexpected: {}", unexpected.join(", ")));
    }
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::TempDir;

    fn sample() -> ProfileRegistry {
        let mut builder = ProfileRegistry::builder();
        builder
            .register("development", Settings::new("App Dev", ".dev"), vec![])
            .unwrap();
        builder
            .register("production", Settings::new("App", ""), vec![])
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_lookup_known() {
        let registry = sample();
        let profile = registry.lookup("production").unwrap();
        assert_eq!(profile.settings.display_name, "App");
    }

    #[test]
    fn test_lookup_is_exact() {
        let registry = sample();
        let err = registry.lookup("Production").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownProfile);
        assert!(err.message.contains("development, production"));
    }

    #[test]
    fn test_names_keep_declaration_order() {
        let registry = sample();
        assert_eq!(registry.names(), vec!["development", "production"]);
        assert_eq!(registry.first().name, "development");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut builder = ProfileRegistry::builder();
        builder
            .register("development", Settings::new("A", ""), vec![])
            .unwrap();
        let err = builder
            .register("development", Settings::new("B", ""), vec![])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateProfile);
    }

    #[test]
    fn test_invalid_name_rejected() {
        let mut builder = ProfileRegistry::builder();
        for name in ["", "1st", "dev build", "../prod"] {
            let err = builder
                .register(name, Settings::new("A", ""), vec![])
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidProfileName, "{name}");
        }
    }

    #[test]
    fn test_key_set_must_match() {
        let mut builder = ProfileRegistry::builder();
        builder
            .register(
                "development",
                Settings::new("App Dev", ".dev").with_extra("greeting", "Hi"),
                vec![],
            )
            .unwrap();

        let err = builder
            .register(
                "production",
                Settings::new("App", "").with_extra("welcome", "Hello"),
                vec![],
            )
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::SettingsMismatch);
        let context = err.context.unwrap();
        assert!(context.contains("missing: greeting"));
        assert!(context.contains("unexpected: welcome"));
    }

    #[test]
    fn test_reserved_extra_key_rejected() {
        let mut builder = ProfileRegistry::builder();
        let err = builder
            .register(
                "development",
                Settings::new("App", "").with_extra("displayName", "Other"),
                vec![],
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigValidationError);
    }

    #[test]
    fn test_keys_exporting_to_same_variable_rejected() {
        let mut builder = ProfileRegistry::builder();
        let err = builder
            .register(
                "development",
                Settings::new("App Dev", ".dev")
                    .with_extra("apiUrl", "https://a.example.com")
                    .with_extra("api_url", "https://b.example.com"),
                vec![],
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigValidationError);
        assert!(err.message.contains("FLAVOR_API_URL"));

        let err = builder
            .register(
                "development",
                Settings::new("App Dev", ".dev").with_extra("display_name", "Other"),
                vec![],
            )
            .unwrap_err();
        assert!(err.message.contains("FLAVOR_DISPLAY_NAME"));
    }

    #[test]
    fn test_asset_target_cannot_escape() {
        let mut builder = ProfileRegistry::builder();
        let err = builder
            .register(
                "development",
                Settings::new("App", ""),
                vec![Asset::new("a.json", "../a.json")],
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigValidationError);
    }

    #[test]
    fn test_empty_registry_rejected() {
        let err = ProfileRegistry::builder().build().unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyRegistry);
    }

    #[test]
    fn test_from_config_resolves_assets() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("flavors.toml");
        std::fs::write(
            &manifest,
            r#"
            [[flavor]]
            name = "development"
            display_name = "App Dev"
            identifier_suffix = ".dev"
            [[flavor.assets]]
            source = "flavors/development/google-services.json"

            [[flavor]]
            name = "production"
            display_name = "App"
            [[flavor.assets]]
            source = "flavors/production/google-services.json"
            target = "android/google-services.json"
            "#,
        )
        .unwrap();

        let config = Config::from_file(&manifest).unwrap();
        let registry = ProfileRegistry::from_config(&config).unwrap();

        let dev = registry.lookup("development").unwrap();
        assert_eq!(dev.assets[0].target, "google-services.json");
        assert_eq!(
            dev.assets[0].source,
            dir.path().join("flavors/development/google-services.json")
        );

        let prod = registry.lookup("production").unwrap();
        assert_eq!(prod.assets[0].target, "android/google-services.json");
    }

    #[test]
    fn test_from_config_rejects_undeclared_default() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("flavors.toml");
        std::fs::write(
            &manifest,
            r#"
            [selection]
            default = "staging"

            [[flavor]]
            name = "development"
            display_name = "App Dev"
            "#,
        )
        .unwrap();

        let config = Config::from_file(&manifest).unwrap();
        let err = ProfileRegistry::from_config(&config).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownProfile);
        assert!(err.context.is_some());
    }
}
