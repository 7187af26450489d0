//! Structured errors for flavor resolution
//!
//! Every failure carries:
//! - A stable error code for programmatic handling
//! - Optional context and a recovery suggestion
//! - A serializable report form for JSON output

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // IO errors (2xxx)
    IoError = 2000,
    FileNotFound = 2001,
    PermissionDenied = 2002,

    // Configuration errors (3xxx)
    ConfigError = 3000,
    ConfigNotFound = 3001,
    ConfigParseError = 3002,
    ConfigValidationError = 3003,

    // Profile errors (4xxx)
    UnknownProfile = 4001,
    MissingSetting = 4002,
    DuplicateProfile = 4003,
    InvalidProfileName = 4004,
    SettingsMismatch = 4005,
    EmptyRegistry = 4006,
    ConflictingSelection = 4007,

    // Asset errors (5xxx)
    AssetNotFound = 5001,
    AssetConflict = 5002,

    // Code generation errors (6xxx)
    TemplateError = 6001,
}

impl ErrorCode {
    /// Get the numeric code
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a human-readable category
    pub fn category(&self) -> &'static str {
        match self.code() / 1000 {
            2 => "IO",
            3 => "Configuration",
            4 => "Profile",
            5 => "Asset",
            6 => "Codegen",
            _ => "Unknown",
        }
    }

    /// Process exit code for a CLI failing with this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorCode::MissingSetting => exit_codes::VALIDATION_ERROR,
            ErrorCode::UnknownProfile | ErrorCode::ConflictingSelection => exit_codes::CONFIG_ERROR,
            _ => match self.code() / 1000 {
                3 | 4 => exit_codes::CONFIG_ERROR,
                5 => exit_codes::ASSET_ERROR,
                _ => exit_codes::FAILURE,
            },
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// Main error type with rich context
#[derive(Error, Debug)]
pub struct Error {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional context
    pub context: Option<String>,
    /// Recovery suggestion
    pub suggestion: Option<String>,
    /// Source error
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, "\n  Context: {ctx}")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  Suggestion: {suggestion}")?;
        }
        Ok(())
    }
}

impl Error {
    /// Create a new error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            suggestion: None,
            source: None,
        }
    }

    /// Add context to the error
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a recovery suggestion
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add a source error
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Convert to a serializable report
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code,
            code_str: self.code.to_string(),
            category: self.code.category().to_string(),
            message: self.message.clone(),
            context: self.context.clone(),
            suggestion: self.suggestion.clone(),
            source: self.source.as_ref().map(|e| e.to_string()),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        self.code.exit_code()
    }

    // Convenience constructors

    /// Generic IO failure
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::IoError, message)
    }

    /// Generic configuration failure
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// No manifest at `path`
    pub fn config_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Flavor manifest not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Create a flavors.toml file or use --manifest to specify a path")
    }

    /// The manifest parsed but violates a rule
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigValidationError, message)
    }

    /// The selection names no registered profile.
    ///
    /// The message names the rejected selection and lists every valid name in
    /// declaration order.
    pub fn unknown_profile(requested: &str, valid: &[&str]) -> Self {
        Self::new(
            ErrorCode::UnknownProfile,
            format!(
                "Unknown flavor '{}'; valid flavors are: {}",
                requested,
                valid.join(", ")
            ),
        )
        .with_suggestion("Pass one of the listed names with -P flavor=<name> or --flavor <name>")
    }

    /// The active profile defines no setting named `key`
    pub fn missing_setting(key: &str, profile: &str) -> Self {
        Self::new(
            ErrorCode::MissingSetting,
            format!("Setting '{key}' is not defined by flavor '{profile}'"),
        )
        .with_suggestion("Declare the key under [flavor.extra] for every flavor in the manifest")
    }

    /// A profile name was registered twice
    pub fn duplicate_profile(name: &str) -> Self {
        Self::new(
            ErrorCode::DuplicateProfile,
            format!("Flavor '{name}' is declared more than once"),
        )
    }

    /// A profile name is not an identifier
    pub fn invalid_profile_name(name: &str) -> Self {
        Self::new(
            ErrorCode::InvalidProfileName,
            format!("Invalid flavor name '{name}'"),
        )
        .with_suggestion("Flavor names start with a letter and use only letters, digits, '-' and '_'")
    }

    /// A profile's key set differs from the reference profile's
    pub fn settings_mismatch(name: &str, reference: &str, difference: &str) -> Self {
        Self::new(
            ErrorCode::SettingsMismatch,
            format!("Flavor '{name}' does not declare the same settings as '{reference}'"),
        )
        .with_context(difference.to_string())
        .with_suggestion("Every flavor must declare the same set of setting keys")
    }

    /// The registry was closed with no profiles
    pub fn empty_registry() -> Self {
        Self::new(ErrorCode::EmptyRegistry, "No flavors are declared")
            .with_suggestion("Add at least one [[flavor]] table to the manifest")
    }

    /// A second, different profile was requested after resolution
    pub fn conflicting_selection(active: &str, requested: &str) -> Self {
        Self::new(
            ErrorCode::ConflictingSelection,
            format!("Flavor '{active}' is already active; cannot switch to '{requested}'"),
        )
    }

    /// An asset source of `profile` is missing on disk
    pub fn asset_not_found(profile: &str, path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::AssetNotFound,
            format!(
                "Asset {} of flavor '{}' does not exist",
                path.as_ref().display(),
                profile
            ),
        )
    }

    /// Template compilation or rendering failed
    pub fn template(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TemplateError, message)
    }
}

/// Serializable error report for logging and JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    /// Code rendered as `E####`
    pub code_str: String,
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Exit codes for CLI commands
#[allow(missing_docs)]
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const VALIDATION_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const ASSET_ERROR: i32 = 4;
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            _ => ErrorCode::IoError,
        };
        Error::new(code, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, format!("JSON parse error: {err}")).with_source(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, format!("TOML parse error: {err}")).with_source(err)
    }
}

impl From<handlebars::RenderError> for Error {
    fn from(err: handlebars::RenderError) -> Self {
        Error::template(format!("Template render error: {err}")).with_source(err)
    }
}

impl From<handlebars::TemplateError> for Error {
    fn from(err: handlebars::TemplateError) -> Self {
        Error::template(format!("Template error: {err}")).with_source(err)
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Attach context to the error, if any
    fn context(self, context: impl Into<String>) -> Result<T>;
    /// Attach a recovery suggestion to the error, if any
    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_suggestion(suggestion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::FileNotFound.to_string(), "E2001");
        assert_eq!(ErrorCode::UnknownProfile.to_string(), "E4001");
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::IoError.category(), "IO");
        assert_eq!(ErrorCode::MissingSetting.category(), "Profile");
        assert_eq!(ErrorCode::AssetNotFound.category(), "Asset");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ErrorCode::UnknownProfile.exit_code(), exit_codes::CONFIG_ERROR);
        assert_eq!(ErrorCode::MissingSetting.exit_code(), exit_codes::VALIDATION_ERROR);
        assert_eq!(ErrorCode::AssetNotFound.exit_code(), exit_codes::ASSET_ERROR);
        assert_eq!(ErrorCode::IoError.exit_code(), exit_codes::FAILURE);
    }

    #[test]
    fn test_every_code_has_a_category() {
        for code in [
            ErrorCode::IoError,
            ErrorCode::ConfigNotFound,
            ErrorCode::ConflictingSelection,
            ErrorCode::AssetConflict,
            ErrorCode::TemplateError,
        ] {
            assert_ne!(code.category(), "Unknown", "{code}");
        }
    }

    #[test]
    fn test_unknown_profile_lists_valid_names() {
        let err = Error::unknown_profile("staging", &["development", "production"]);
        assert_eq!(err.code, ErrorCode::UnknownProfile);
        assert!(err.message.contains("'staging'"));
        assert!(err.message.contains("development, production"));
        assert!(err.suggestion.is_some());
    }

    #[test]
    fn test_error_report_serialization() {
        let err = Error::missing_setting("apiKey", "production").with_context("while generating");

        let json = serde_json::to_string(&err.to_report()).unwrap();

        assert!(json.contains("E4002"));
        assert!(json.contains("Profile"));
        assert!(json.contains("while generating"));
    }
}
