//! Terminal output helpers for the flavor tools
//!
//! Provides shared CLI functionality:
//! - Status messages honoring `--quiet`
//! - Text/JSON output selection
//! - Settings tables and error rendering

#![warn(missing_docs)]

pub mod output;
