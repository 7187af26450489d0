//! Build flavor selection
//!
//! This crate selects exactly one configuration profile ("flavor", e.g.
//! development vs. production) per build and exposes its settings to
//! application code:
//!
//! - **Manifest**: flavors declared in `flavors.toml`, selection defaults in a
//!   properties file
//! - **Registry**: the closed set of declared flavors
//! - **Selector**: resolves the selection input to one flavor, failing on
//!   unknown names
//! - **Accessor**: read-only settings of the active flavor only
//! - **Assets**: stages the active flavor's credential files
//! - **Codegen**: Rust module and packaging exports for the active flavor
//!
//! # Example
//!
//! ```rust,no_run
//! use flavor_core::{config::Config, selector::{ProfileSelector, Selection}};
//!
//! let config = Config::load(None)?;
//! let selector = ProfileSelector::from_config(&config)?;
//! let active = selector.resolve(&Selection::gather(&config, None, &[])?)?;
//!
//! println!("{} ({})", active.display_name(), active.name());
//! # Ok::<(), flavor_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod accessor;
pub mod assets;
pub mod build_script;
pub mod codegen;
pub mod config;
pub mod error;
pub mod profile;
pub mod registry;
pub mod selector;

pub use accessor::ResolvedConfig;
pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::accessor::ResolvedConfig;
    pub use crate::assets::{stage_assets, StageReport};
    pub use crate::codegen::{export, generate_rust_module, ExportFormat};
    pub use crate::config::Config;
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::profile::{Asset, BackendSettings, Profile, Settings};
    pub use crate::registry::{ProfileRegistry, RegistryBuilder};
    pub use crate::selector::{resolve, ProfileSelector, Selection, SelectionSource};
}
