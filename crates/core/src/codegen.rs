//! Code generation for the resolved flavor
//!
//! Renders the active flavor's settings into artifacts consumed downstream:
//! a Rust module (`include!`d by applications from `build.rs` output) and
//! key/value exports for platform packaging pipelines. Only the active
//! flavor's values are ever rendered.

use crate::accessor::ResolvedConfig;
use crate::error::{Error, Result};
use handlebars::Handlebars;
use serde_json::json;
use std::fmt;
use std::str::FromStr;

const RUST_MODULE: &str = r#"// @generated by flavor-core; do not edit.
// Active flavor: {{name}}

/// Backend endpoint descriptors of the active flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlavorBackend {
    pub project_id: &'static str,
    pub api_base_url: &'static str,
    pub storage_bucket: Option<&'static str>,
}

/// Settings of the flavor selected at build time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlavorSettings {
    pub name: &'static str,
    pub display_name: &'static str,
    pub identifier_suffix: &'static str,
    pub backend: Option<FlavorBackend>,
    pub extra: &'static [(&'static str, &'static str)],
}

impl FlavorSettings {
    /// Look up a setting by key
    pub fn get(&self, key: &str) -> Option<&'static str> {
        match key {
            "displayName" => Some(self.display_name),
            "identifierSuffix" => Some(self.identifier_suffix),
            "backend.projectId" => self.backend.map(|b| b.project_id),
            "backend.apiBaseUrl" => self.backend.map(|b| b.api_base_url),
            "backend.storageBucket" => self.backend.and_then(|b| b.storage_bucket),
            _ => self.extra.iter().find(|(k, _)| *k == key).map(|(_, v)| *v),
        }
    }
}

/// The active flavor
pub const SETTINGS: FlavorSettings = FlavorSettings {
    name: {{name_lit}},
    display_name: {{display_name_lit}},
    identifier_suffix: {{identifier_suffix_lit}},
{{#if backend}}
    backend: Some(FlavorBackend {
        project_id: {{backend.project_id_lit}},
        api_base_url: {{backend.api_base_url_lit}},
        storage_bucket: {{backend.storage_bucket_expr}},
    }),
{{else}}
    backend: None,
{{/if}}
    extra: &[
{{#each extra}}
        ({{this.key_lit}}, {{this.value_lit}}),
{{/each}}
    ],
};
"#;

const XCCONFIG: &str = r#"// Generated by flavor; do not edit.
FLAVOR_NAME = {{name}}
FLAVOR_DISPLAY_NAME = {{display_name}}
FLAVOR_IDENTIFIER_SUFFIX = {{identifier_suffix}}
"#;

const PROPERTIES: &str = r#"# Generated by flavor; do not edit.
flavor.name={{name}}
{{#each entries}}
flavor.{{this.key}}={{this.value}}
{{/each}}
"#;

const ENV: &str = r#"# Generated by flavor; do not edit.
export FLAVOR_NAME={{name}}
{{#each entries}}
export FLAVOR_{{this.key}}={{this.value}}
{{/each}}
"#;

/// Output formats for [`export`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Xcode build settings file
    Xcconfig,
    /// Java-style properties, e.g. for Gradle
    Properties,
    /// POSIX shell `export` lines
    Env,
    /// JSON document of the active flavor
    Json,
    /// Rust module with a `SETTINGS` constant
    Rust,
}

impl ExportFormat {
    /// Every format, in the order `--help` lists them
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Xcconfig,
        ExportFormat::Properties,
        ExportFormat::Env,
        ExportFormat::Json,
        ExportFormat::Rust,
    ];

    /// Name accepted on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Xcconfig => "xcconfig",
            ExportFormat::Properties => "properties",
            ExportFormat::Env => "env",
            ExportFormat::Json => "json",
            ExportFormat::Rust => "rust",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                Error::config_invalid(format!(
                    "Unknown export format '{s}'; expected one of: xcconfig, properties, env, json, rust"
                ))
            })
    }
}

fn registry() -> Result<Handlebars<'static>> {
    let mut hb = Handlebars::new();
    hb.register_escape_fn(handlebars::no_escape);
    hb.register_template_string("rust", RUST_MODULE)?;
    hb.register_template_string("xcconfig", XCCONFIG)?;
    hb.register_template_string("properties", PROPERTIES)?;
    hb.register_template_string("env", ENV)?;
    Ok(hb)
}

/// Render the active flavor in the given format
pub fn export(config: &ResolvedConfig, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Rust => generate_rust_module(config),
        ExportFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(config)?)),
        ExportFormat::Xcconfig => {
            let data = json!({
                "name": xcconfig_value(config.name()),
                "display_name": xcconfig_value(config.display_name()),
                "identifier_suffix": xcconfig_value(config.identifier_suffix()),
            });
            Ok(registry()?.render("xcconfig", &data)?)
        }
        ExportFormat::Properties => {
            let entries: Vec<_> = config
                .settings()
                .entries()
                .into_iter()
                .map(|(k, v)| json!({ "key": k, "value": properties_value(&v) }))
                .collect();
            let data = json!({ "name": properties_value(config.name()), "entries": entries });
            Ok(registry()?.render("properties", &data)?)
        }
        ExportFormat::Env => {
            let entries: Vec<_> = config
                .settings()
                .entries()
                .into_iter()
                .map(|(k, v)| json!({ "key": env_key(&k), "value": shell_quote(&v) }))
                .collect();
            let data = json!({ "name": shell_quote(config.name()), "entries": entries });
            Ok(registry()?.render("env", &data)?)
        }
    }
}

/// Render the Rust module exposing `SETTINGS` for the active flavor
pub fn generate_rust_module(config: &ResolvedConfig) -> Result<String> {
    let backend = config.backend().map(|b| {
        let storage_bucket = b
            .storage_bucket
            .as_deref()
            .map_or_else(|| "None".to_string(), |bucket| format!("Some({})", rust_lit(bucket)));
        json!({
            "project_id_lit": rust_lit(&b.project_id),
            "api_base_url_lit": rust_lit(&b.api_base_url),
            "storage_bucket_expr": storage_bucket,
        })
    });

    let extra: Vec<_> = config
        .settings()
        .extra
        .iter()
        .map(|(k, v)| json!({ "key_lit": rust_lit(k), "value_lit": rust_lit(v) }))
        .collect();

    let data = json!({
        "name": config.name(),
        "name_lit": rust_lit(config.name()),
        "display_name_lit": rust_lit(config.display_name()),
        "identifier_suffix_lit": rust_lit(config.identifier_suffix()),
        "backend": backend,
        "extra": extra,
    });

    let rendered = registry()?.render("rust", &data)?;
    tracing::debug!(flavor = %config.name(), bytes = rendered.len(), "Rendered Rust flavor module");
    Ok(rendered)
}

/// Rust string literal; `Debug` output of `str` is a valid literal
fn rust_lit(value: &str) -> String {
    format!("{value:?}")
}

/// xcconfig treats `//` as a comment start; `$()` keeps it literal
fn xcconfig_value(value: &str) -> String {
    value.replace("//", "/$()/")
}

fn properties_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// `backend.projectId` -> `BACKEND_PROJECT_ID`
pub(crate) fn env_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for ch in key.chars() {
        if ch.is_ascii_alphanumeric() {
            if ch.is_ascii_uppercase() && prev_lower {
                out.push('_');
            }
            out.push(ch.to_ascii_uppercase());
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        } else {
            if !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{BackendSettings, Settings};
    use crate::registry::ProfileRegistry;
    use crate::selector::resolve;

    fn registry_fixture() -> ProfileRegistry {
        let backend = |id: &str, url: &str| BackendSettings {
            project_id: id.to_string(),
            api_base_url: url.to_string(),
            storage_bucket: None,
        };

        let mut builder = ProfileRegistry::builder();
        builder
            .register(
                "development",
                Settings::new("App Dev", ".dev")
                    .with_backend(backend("app-dev", "https://dev.example.com"))
                    .with_extra("greeting", "Hey \"dev\""),
                vec![],
            )
            .unwrap();
        builder
            .register(
                "production",
                Settings::new("App", "")
                    .with_backend(backend("app-prod", "https://api.example.com"))
                    .with_extra("greeting", "Hello"),
                vec![],
            )
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_rust_module_contains_active_values_only() {
        let registry = registry_fixture();
        let config = resolve(&registry, Some("production"), "development").unwrap();

        let module = generate_rust_module(&config).unwrap();

        assert!(module.contains(r#"name: "production","#));
        assert!(module.contains(r#"display_name: "App","#));
        assert!(module.contains(r#"identifier_suffix: "","#));
        assert!(module.contains(r#"project_id: "app-prod","#));
        assert!(module.contains(r#"storage_bucket: None,"#));
        assert!(module.contains(r#"("greeting", "Hello"),"#));
        assert!(!module.contains("app-dev"));
        assert!(!module.contains("App Dev"));
    }

    #[test]
    fn test_rust_module_escapes_literals() {
        let registry = registry_fixture();
        let config = resolve(&registry, None, "development").unwrap();

        let module = generate_rust_module(&config).unwrap();
        assert!(module.contains(r#"("greeting", "Hey \"dev\""),"#));
    }

    #[test]
    fn test_xcconfig_export() {
        let registry = registry_fixture();
        let config = resolve(&registry, None, "development").unwrap();

        let out = export(&config, ExportFormat::Xcconfig).unwrap();
        assert!(out.contains("FLAVOR_NAME = development\n"));
        assert!(out.contains("FLAVOR_DISPLAY_NAME = App Dev\n"));
        assert!(out.contains("FLAVOR_IDENTIFIER_SUFFIX = .dev\n"));
    }

    #[test]
    fn test_properties_export() {
        let registry = registry_fixture();
        let config = resolve(&registry, Some("production"), "development").unwrap();

        let out = export(&config, ExportFormat::Properties).unwrap();
        assert!(out.contains("flavor.name=production\n"));
        assert!(out.contains("flavor.displayName=App\n"));
        assert!(out.contains("flavor.identifierSuffix=\n"));
        assert!(out.contains("flavor.backend.apiBaseUrl=https://api.example.com\n"));
    }

    #[test]
    fn test_env_export() {
        let registry = registry_fixture();
        let config = resolve(&registry, None, "development").unwrap();

        let out = export(&config, ExportFormat::Env).unwrap();
        assert!(out.contains("export FLAVOR_NAME='development'\n"));
        assert!(out.contains("export FLAVOR_BACKEND_PROJECT_ID='app-dev'\n"));
        assert!(out.contains("export FLAVOR_IDENTIFIER_SUFFIX='.dev'\n"));
    }

    #[test]
    fn test_json_export() {
        let registry = registry_fixture();
        let config = resolve(&registry, Some("production"), "development").unwrap();

        let out = export(&config, ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["name"], "production");
        assert_eq!(value["settings"]["backend"]["projectId"], "app-prod");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("xcconfig".parse::<ExportFormat>().unwrap(), ExportFormat::Xcconfig);
        assert_eq!("rust".parse::<ExportFormat>().unwrap(), ExportFormat::Rust);
        assert!("yaml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_helpers() {
        assert_eq!(env_key("backend.projectId"), "BACKEND_PROJECT_ID");
        assert_eq!(env_key("identifierSuffix"), "IDENTIFIER_SUFFIX");
        assert_eq!(env_key("api_v2Url"), "API_V2_URL");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(xcconfig_value("https://a"), "https:/$()/a");
        assert_eq!(properties_value("a\\b\nc"), "a\\\\b\\nc");
    }
}
