//! Manifest file loading

use super::schema::FlavorManifest;
use crate::error::{Error, Result, ResultExt};
use std::path::{Path, PathBuf};

/// File names searched when no manifest path is given
const CANDIDATES: &[&str] = &["flavors.toml", ".flavors.toml", "config/flavors.toml"];

/// Loaded manifest together with where it came from
#[derive(Debug, Clone)]
pub struct Config {
    /// Parsed manifest
    pub manifest: FlavorManifest,
    /// Where the manifest was read from
    pub path: PathBuf,
}

impl Config {
    /// Load the manifest from `path`, or search the current directory
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::discover(Path::new(".")),
        }
    }

    /// Search `dir` for a manifest in the standard locations
    pub fn discover(dir: &Path) -> Result<Self> {
        let found = CANDIDATES
            .iter()
            .map(|candidate| dir.join(candidate))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| Error::config_not_found(dir.join(CANDIDATES[0])))?;

        Self::from_file(&found)
    }

    /// Load and parse a TOML manifest
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::config_not_found(path));
        }

        let content = std::fs::read_to_string(path)
            .map_err(Error::from)
            .context(format!("Reading manifest {}", path.display()))?;

        let manifest = toml::from_str(&content)
            .map_err(Error::from)
            .context(format!("Parsing manifest {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Loaded flavor manifest");

        Ok(Self {
            manifest,
            path: path.to_path_buf(),
        })
    }

    /// Directory the manifest lives in; relative paths resolve against it
    pub fn base_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Location of the selection properties file
    pub fn properties_path(&self) -> PathBuf {
        self.base_dir()
            .join(&self.manifest.selection.properties_file)
    }
}
