//! Per-flavor asset staging
//!
//! Copies the active flavor's assets (credential files such as
//! `google-services.json` or `GoogleService-Info.plist`) into a staging
//! directory. Contents are never parsed. A record file tracks what was staged
//! so that switching flavors removes the previous flavor's files.

use crate::accessor::ResolvedConfig;
use crate::error::{Error, ErrorCode, Result, ResultExt};
use crate::registry::validate_target;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name of the record file written into the staging directory
pub const STAGE_RECORD: &str = ".flavor-stage.json";

/// One staged file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedFile {
    /// Path relative to the staging directory, `/`-separated
    pub target: String,
    /// Hex SHA-256 of the staged content
    pub sha256: String,
    /// Size in bytes
    pub bytes: u64,
}

/// Contents of [`STAGE_RECORD`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    /// Flavor the files belong to
    pub flavor: String,
    /// When the run finished
    pub staged_at: DateTime<Utc>,
    /// Staged files in copy order
    pub files: Vec<StagedFile>,
}

impl StageRecord {
    /// Read the record from a staging directory, if one exists
    pub fn read(out_dir: &Path) -> Result<Option<Self>> {
        let path = out_dir.join(STAGE_RECORD);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let record = serde_json::from_str(&content)
            .map_err(Error::from)
            .context(format!("Reading stage record {}", path.display()))?;
        Ok(Some(record))
    }
}

/// Result of a staging run
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    /// Flavor that was staged
    pub flavor: String,
    /// Staging directory
    pub out_dir: PathBuf,
    /// Staged files in copy order
    pub files: Vec<StagedFile>,
    /// Files left by an earlier run that were removed
    pub removed: Vec<String>,
}

impl StageReport {
    /// Combined size of the staged files
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.bytes).sum()
    }
}

/// Stage the active flavor's assets into `out_dir`
///
/// Files are copied into a scratch directory next to `out_dir` first, so a
/// failed copy leaves `out_dir` exactly as the previous run left it. Only then
/// are the previous flavor's files removed and the new ones moved into place.
pub fn stage_assets(config: &ResolvedConfig, out_dir: &Path) -> Result<StageReport> {
    let plan = plan_copies(config)?;
    let planned: BTreeSet<&str> = plan.iter().map(|(_, target)| target.as_str()).collect();

    let previous = StageRecord::read(out_dir)?;
    let stale: Vec<String> = match &previous {
        Some(record) => stale_targets(record, &planned)?,
        None => Vec::new(),
    };

    fs::create_dir_all(out_dir)
        .map_err(Error::from)
        .context(format!("Creating staging directory {}", out_dir.display()))?;

    let scratch = tempfile::Builder::new()
        .prefix(".flavor-stage-")
        .tempdir_in(scratch_parent(out_dir))
        .map_err(Error::from)
        .context(format!("Creating scratch directory for {}", out_dir.display()))?;

    let mut files = Vec::with_capacity(plan.len());
    for (source, target) in &plan {
        let dest = scratch.path().join(target);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, &dest)
            .map_err(Error::from)
            .context(format!("Copying {}", source.display()))?;

        let content = fs::read(&dest)?;
        files.push(StagedFile {
            target: target.clone(),
            sha256: hex::encode(Sha256::digest(&content)),
            bytes: content.len() as u64,
        });
    }

    let mut removed = Vec::new();
    for target in stale {
        let path = out_dir.join(&target);
        if path.is_file() {
            fs::remove_file(&path)?;
            prune_empty_parents(out_dir, &path);
            tracing::debug!(target_file = %target, "Removed stale asset");
        }
        removed.push(target);
    }

    for (_, target) in &plan {
        let dest = out_dir.join(target);
        if dest.is_dir() {
            fs::remove_dir(&dest).map_err(|e| {
                Error::new(
                    ErrorCode::AssetConflict,
                    format!("Cannot stage '{target}': {} is a non-empty directory", dest.display()),
                )
                .with_source(e)
            })?;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(scratch.path().join(target), &dest)
            .map_err(Error::from)
            .context(format!("Moving staged file into {}", dest.display()))?;
    }

    let record = StageRecord {
        flavor: config.name().to_string(),
        staged_at: Utc::now(),
        files: files.clone(),
    };
    fs::write(
        out_dir.join(STAGE_RECORD),
        serde_json::to_string_pretty(&record)?,
    )?;

    tracing::info!(
        flavor = %config.name(),
        files = files.len(),
        removed = removed.len(),
        out_dir = %out_dir.display(),
        "Staged flavor assets"
    );

    Ok(StageReport {
        flavor: config.name().to_string(),
        out_dir: out_dir.to_path_buf(),
        files,
        removed,
    })
}

/// Targets of the previous run that the current plan no longer stages
///
/// The record is a plain file in the output directory; targets that would
/// resolve outside it are refused.
fn stale_targets(record: &StageRecord, planned: &BTreeSet<&str>) -> Result<Vec<String>> {
    let mut stale = Vec::new();
    for file in &record.files {
        validate_target(&record.flavor, &file.target)
            .context(format!("Invalid entry in {STAGE_RECORD}"))?;
        let target = normalize_target(&file.target);
        if !planned.contains(target.as_str()) {
            stale.push(target);
        }
    }
    Ok(stale)
}

/// Remove directories emptied by a stale file, up to `out_dir`
fn prune_empty_parents(out_dir: &Path, removed: &Path) {
    let mut dir = removed.parent();
    while let Some(current) = dir {
        if current == out_dir || !current.starts_with(out_dir) {
            break;
        }
        let empty = fs::read_dir(current).map(|mut d| d.next().is_none()).unwrap_or(false);
        if !empty || fs::remove_dir(current).is_err() {
            break;
        }
        dir = current.parent();
    }
}

/// Sibling of `out_dir`, so the final moves stay on one filesystem
fn scratch_parent(out_dir: &Path) -> &Path {
    match out_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        Some(_) => Path::new("."),
        None => out_dir,
    }
}

/// Expand assets into (source file, relative target) pairs
///
/// Directory assets contribute every file beneath them, following symlinks.
/// Two sources mapping to the same target, or a file target that another
/// target needs as a directory, is an error.
fn plan_copies(config: &ResolvedConfig) -> Result<Vec<(PathBuf, String)>> {
    let mut plan = Vec::new();
    let mut seen = BTreeSet::new();

    for asset in config.assets() {
        if !asset.source.exists() {
            return Err(Error::asset_not_found(config.name(), &asset.source));
        }

        let pairs = if asset.source.is_dir() {
            walk_directory(&asset.source, &asset.target)?
        } else {
            vec![(asset.source.clone(), normalize_target(&asset.target))]
        };

        for (source, target) in pairs {
            if !seen.insert(target.clone()) {
                return Err(conflict(config.name(), &target));
            }
            plan.push((source, target));
        }
    }

    for target in &seen {
        let mut parts: Vec<&str> = target.split('/').collect();
        parts.pop();
        while !parts.is_empty() {
            if seen.contains(parts.join("/").as_str()) {
                return Err(conflict(config.name(), target));
            }
            parts.pop();
        }
    }

    Ok(plan)
}

fn walk_directory(root: &Path, base: &str) -> Result<Vec<(PathBuf, String)>> {
    let mut pairs = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).display().to_string();
            Error::io(format!("Cannot read asset {path}: {e}")).with_source(e)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(root).map_err(|e| {
            Error::io(format!("Asset {} is outside {}", entry.path().display(), root.display()))
                .with_source(e)
        })?;
        pairs.push((entry.path().to_path_buf(), join_target(base, rel)));
    }
    Ok(pairs)
}

fn conflict(flavor: &str, target: &str) -> Error {
    Error::new(
        ErrorCode::AssetConflict,
        format!("Flavor '{flavor}' stages more than one file at '{target}'"),
    )
}

fn join_target(base: &str, rel: &Path) -> String {
    let rel = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    normalize_target(&format!("{base}/{rel}"))
}

fn normalize_target(target: &str) -> String {
    target
        .split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}
