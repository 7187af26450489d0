//! Profile selection
//!
//! Turns the externally supplied selection input into exactly one resolved
//! profile. Matching is exact: no case folding, no prefix or fuzzy matching.
//!
//! Selection precedence, highest first:
//! 1. `--flavor <name>` on the command line
//! 2. `-P <property>=<name>` on the command line
//! 3. the selection environment variable (default `FLAVOR`)
//! 4. the properties file (default `flavor.properties`)
//! 5. the static default: `[selection] default`, else the first declared flavor
//!
//! [`ProfileSelector`] enforces that one invocation activates at most one
//! flavor: `Unresolved → Resolving → Resolved | Failed`, both terminal.

use crate::accessor::ResolvedConfig;
use crate::config::properties::Properties;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::registry::ProfileRegistry;
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Where a selection came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionSource {
    /// `--flavor` or `-P`
    CommandLine,
    /// The selection environment variable
    Environment,
    /// The properties file next to the manifest
    PropertiesFile,
    /// Nothing selected; the static default applied
    Default,
}

impl fmt::Display for SelectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SelectionSource::CommandLine => "command line",
            SelectionSource::Environment => "environment",
            SelectionSource::PropertiesFile => "properties file",
            SelectionSource::Default => "default",
        };
        f.write_str(label)
    }
}

/// The raw selection input for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// Requested flavor name; `None` means "use the default"
    pub name: Option<String>,
    /// Where `name` came from
    pub source: SelectionSource,
}

impl Selection {
    /// An explicit command-line selection
    pub fn explicit(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            source: SelectionSource::CommandLine,
        }
    }

    /// No selection; the default applies
    pub fn absent() -> Self {
        Self {
            name: None,
            source: SelectionSource::Default,
        }
    }

    /// Pick the selection from already-gathered sources
    ///
    /// `cli_flavor` is the `--flavor` flag, `cli_properties` the `-P`
    /// assignments in command-line order (the last one for `property` wins).
    /// An empty environment variable counts as unset.
    pub fn from_sources(
        property: &str,
        cli_flavor: Option<&str>,
        cli_properties: &[(String, String)],
        env_value: Option<String>,
        properties: &Properties,
    ) -> Self {
        if let Some(name) = cli_flavor {
            return Self::explicit(name);
        }

        if let Some((_, name)) = cli_properties.iter().rev().find(|(k, _)| k == property) {
            return Self::explicit(name.clone());
        }

        if let Some(name) = env_value.filter(|v| !v.is_empty()) {
            return Self {
                name: Some(name),
                source: SelectionSource::Environment,
            };
        }

        if let Some(name) = properties.get(property) {
            return Self {
                name: Some(name.to_string()),
                source: SelectionSource::PropertiesFile,
            };
        }

        Self::absent()
    }

    /// Gather the selection for a manifest from the live environment
    pub fn gather(
        config: &Config,
        cli_flavor: Option<&str>,
        cli_properties: &[(String, String)],
    ) -> Result<Self> {
        let selection = &config.manifest.selection;
        let env_value = std::env::var(&selection.env).ok();
        let properties = Properties::load(&config.properties_path())?;

        let gathered = Self::from_sources(
            &selection.property,
            cli_flavor,
            cli_properties,
            env_value,
            &properties,
        );

        tracing::debug!(
            selection = ?gathered.name,
            source = %gathered.source,
            "Gathered flavor selection"
        );

        Ok(gathered)
    }
}

/// Resolve a selection against the registry
///
/// An absent input resolves to `default`; a present input is used verbatim.
/// Unknown names fail with `UnknownProfile`.
pub fn resolve(
    registry: &ProfileRegistry,
    input: Option<&str>,
    default: &str,
) -> Result<ResolvedConfig> {
    let name = input.unwrap_or(default);
    let profile = registry.lookup(name)?;
    Ok(ResolvedConfig::new(profile))
}

/// Observable lifecycle of a selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionState {
    /// No selection has been resolved yet
    Unresolved,
    /// A resolution is in progress
    Resolving,
    /// A profile is active; terminal
    Resolved,
    /// The selection named no profile; terminal
    Failed,
}

#[derive(Debug)]
enum Outcome {
    Resolved(ResolvedConfig),
    Failed { requested: String, valid: Vec<String> },
}

/// Per-invocation resolver guaranteeing a single active flavor
///
/// Cheap to share across threads; after resolution every reader receives the
/// same `Arc`-backed [`ResolvedConfig`].
#[derive(Debug)]
pub struct ProfileSelector {
    registry: ProfileRegistry,
    default: String,
    resolving: AtomicBool,
    outcome: OnceCell<Outcome>,
}

impl ProfileSelector {
    /// `default` applies when a selection names no flavor
    pub fn new(registry: ProfileRegistry, default: impl Into<String>) -> Self {
        Self {
            registry,
            default: default.into(),
            resolving: AtomicBool::new(false),
            outcome: OnceCell::new(),
        }
    }

    /// Build a selector for a loaded manifest
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = ProfileRegistry::from_config(config)?;
        let default = config
            .manifest
            .default_flavor()
            .map(String::from)
            .unwrap_or_else(|| registry.first().name.clone());
        Ok(Self::new(registry, default))
    }

    /// Static default used when the selection is absent
    pub fn default_name(&self) -> &str {
        &self.default
    }

    /// Names of all declared flavors
    pub fn names(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// Resolve the selection; the first call decides for the whole invocation
    ///
    /// Repeating the same selection returns the same profile. Selecting a
    /// different flavor afterwards fails with `ConflictingSelection`, and once
    /// resolution has failed every call reports the original `UnknownProfile`.
    pub fn resolve(&self, selection: &Selection) -> Result<ResolvedConfig> {
        let requested = selection.name.as_deref().unwrap_or(&self.default);

        let outcome = self.outcome.get_or_init(|| {
            self.resolving.store(true, Ordering::Release);
            match resolve(&self.registry, Some(requested), &self.default) {
                Ok(config) => {
                    tracing::info!(
                        flavor = %config.name(),
                        source = %selection.source,
                        "Resolved flavor"
                    );
                    Outcome::Resolved(config)
                }
                Err(e) => {
                    tracing::error!(flavor = %requested, error = %e.message, "Flavor resolution failed");
                    Outcome::Failed {
                        requested: requested.to_string(),
                        valid: self.registry.names().into_iter().map(String::from).collect(),
                    }
                }
            }
        });

        match outcome {
            Outcome::Resolved(config) if config.name() == requested => Ok(config.clone()),
            Outcome::Resolved(config) => Err(Error::conflicting_selection(config.name(), requested)),
            Outcome::Failed { requested, valid } => {
                let valid: Vec<&str> = valid.iter().map(String::as_str).collect();
                Err(Error::unknown_profile(requested, &valid))
            }
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ResolutionState {
        match self.outcome.get() {
            Some(Outcome::Resolved(_)) => ResolutionState::Resolved,
            Some(Outcome::Failed { .. }) => ResolutionState::Failed,
            None if self.resolving.load(Ordering::Acquire) => ResolutionState::Resolving,
            None => ResolutionState::Unresolved,
        }
    }

    /// The resolved flavor, if resolution succeeded
    pub fn resolved(&self) -> Option<ResolvedConfig> {
        match self.outcome.get() {
            Some(Outcome::Resolved(config)) => Some(config.clone()),
            _ => None,
        }
    }
}
