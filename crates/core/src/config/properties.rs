//! Java-style `.properties` files
//!
//! Supports `key=value` and `key: value` pairs, `#` and `!` comment lines, and
//! trims whitespace around keys and values. Later duplicates override earlier
//! ones. Line continuations and unicode escapes are not supported.

use crate::error::{Error, Result, ResultExt};
use std::collections::BTreeMap;
use std::path::Path;

/// Parsed property set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Parse properties from text
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
            .map(|line| match line.find(['=', ':']) {
                Some(idx) => (line[..idx].trim(), line[idx + 1..].trim()),
                None => (line, ""),
            })
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Self { entries }
    }

    /// Read a properties file; a missing file yields an empty set
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(Error::from)
            .context(format!("Reading properties file {}", path.display()))?;

        Ok(Self::parse(&content))
    }

    /// Look up a property
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no properties were read
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a `key=value` command-line property
pub fn parse_assignment(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(Error::config_invalid(format!(
            "Invalid property '{raw}', expected key=value"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_separators_and_comments() {
        let props = Properties::parse(
            "# build defaults\n\
             ! legacy comment\n\
             flavor = development\n\
             org.gradle.jvmargs=-Xmx2g\n\
             sdk.dir: /opt/android\n\
             \n\
             bare\n",
        );

        assert_eq!(props.get("flavor"), Some("development"));
        assert_eq!(props.get("org.gradle.jvmargs"), Some("-Xmx2g"));
        assert_eq!(props.get("sdk.dir"), Some("/opt/android"));
        assert_eq!(props.get("bare"), Some(""));
        assert_eq!(props.len(), 4);
    }

    #[test]
    fn test_value_may_contain_separator() {
        let props = Properties::parse("url=https://example.com:443/a=b");
        assert_eq!(props.get("url"), Some("https://example.com:443/a=b"));
    }

    #[test]
    fn test_later_duplicate_wins() {
        let props = Properties::parse("flavor=development\nflavor=production");
        assert_eq!(props.get("flavor"), Some("production"));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let props = Properties::load(&dir.path().join("flavor.properties")).unwrap();
        assert!(props.is_empty());
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("flavor=production").unwrap(),
            ("flavor".to_string(), "production".to_string())
        );
        assert_eq!(
            parse_assignment("flavor=").unwrap(),
            ("flavor".to_string(), String::new())
        );
        assert!(parse_assignment("flavor").is_err());
        assert!(parse_assignment("=production").is_err());
    }
}
