//! `build.rs` integration
//!
//! Resolves the flavor once per cargo build, writes the generated settings
//! module into `OUT_DIR` and stages the flavor's assets next to it.
//!
//! ```rust,no_run
//! // build.rs
//! fn main() {
//!     if let Err(e) = flavor_core::build_script::FlavorBuild::new("flavors.toml").run() {
//!         eprintln!("{e}");
//!         std::process::exit(1);
//!     }
//! }
//! ```
//!
//! The application then includes the module:
//!
//! ```rust,ignore
//! mod flavor {
//!     include!(concat!(env!("OUT_DIR"), "/flavor.rs"));
//! }
//! ```

use crate::accessor::ResolvedConfig;
use crate::assets::{stage_assets, StageReport};
use crate::codegen::generate_rust_module;
use crate::config::Config;
use crate::error::{Error, Result, ResultExt};
use crate::selector::{ProfileSelector, Selection};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default file name of the generated module
pub const DEFAULT_MODULE: &str = "flavor.rs";
/// Default staging directory name under `OUT_DIR`
pub const DEFAULT_ASSETS_DIR: &str = "flavor-assets";

/// What a build-script run produced
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// The flavor the build resolved to
    pub config: ResolvedConfig,
    /// Path of the generated module
    pub module_path: PathBuf,
    /// What was staged into the assets directory
    pub stage: StageReport,
}

/// Builder for the `build.rs` flavor step
#[derive(Debug, Clone)]
pub struct FlavorBuild {
    manifest: PathBuf,
    out_dir: Option<PathBuf>,
    module_name: String,
    assets_dir: String,
}

impl FlavorBuild {
    /// `manifest` is relative to the crate root (cargo runs build scripts there)
    pub fn new(manifest: impl Into<PathBuf>) -> Self {
        Self {
            manifest: manifest.into(),
            out_dir: None,
            module_name: DEFAULT_MODULE.to_string(),
            assets_dir: DEFAULT_ASSETS_DIR.to_string(),
        }
    }

    /// Write into `dir` instead of `$OUT_DIR`
    #[must_use]
    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(dir.into());
        self
    }

    /// File name of the generated module inside the output directory
    #[must_use]
    pub fn module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = name.into();
        self
    }

    /// Name of the staging directory inside the output directory
    #[must_use]
    pub fn assets_dir(mut self, name: impl Into<String>) -> Self {
        self.assets_dir = name.into();
        self
    }

    /// Run the step, printing cargo directives to stdout
    pub fn run(self) -> Result<BuildOutput> {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        self.run_with(&mut lock)
    }

    /// Run the step, writing cargo directives to `directives`
    pub fn run_with(self, directives: &mut impl Write) -> Result<BuildOutput> {
        let out_dir = match self.out_dir {
            Some(dir) => dir,
            None => std::env::var_os("OUT_DIR")
                .map(PathBuf::from)
                .ok_or_else(|| {
                    Error::config("OUT_DIR is not set")
                        .with_suggestion("Call FlavorBuild from a cargo build script or set out_dir")
                })?,
        };

        let config = Config::from_file(&self.manifest)?;
        let selection_env = config.manifest.selection.env.clone();

        emit(directives, "rerun-if-changed", &self.manifest)?;
        // Watching a missing file reruns every build; watch its directory so
        // creating the file is still noticed.
        let properties = config.properties_path();
        if properties.exists() {
            emit(directives, "rerun-if-changed", &properties)?;
        } else {
            emit(directives, "rerun-if-changed", config.base_dir())?;
        }
        writeln!(directives, "cargo:rerun-if-env-changed={selection_env}")?;

        let selector = ProfileSelector::from_config(&config)?;
        let selection = Selection::gather(&config, None, &[])?;
        let resolved = selector
            .resolve(&selection)
            .context(format!("Selecting flavor for {}", self.manifest.display()))?;

        for asset in resolved.assets() {
            emit(directives, "rerun-if-changed", &asset.source)?;
        }

        let module_path = out_dir.join(&self.module_name);
        std::fs::write(&module_path, generate_rust_module(&resolved)?)?;

        let stage = stage_assets(&resolved, &out_dir.join(&self.assets_dir))?;

        writeln!(directives, "cargo:rustc-env=FLAVOR_NAME={}", resolved.name())?;
        writeln!(
            directives,
            "cargo:rustc-env=FLAVOR_ASSETS_DIR={}",
            stage.out_dir.display()
        )?;

        Ok(BuildOutput {
            config: resolved,
            module_path,
            stage,
        })
    }
}

fn emit(directives: &mut impl Write, key: &str, path: &Path) -> Result<()> {
    writeln!(directives, "cargo:{key}={}", path.display())?;
    Ok(())
}
