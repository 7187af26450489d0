//! Flavor manifest loading and schema definitions
//!
//! Flavors are declared in a TOML manifest (`flavors.toml`); the properties
//! module reads the Java-style properties file that carries the default
//! selection.

mod loader;
pub mod properties;
mod schema;

pub use loader::Config;
pub use schema::*;
