//! Prints a greeting configured by the flavor selected at build time.
//!
//! ```sh
//! cargo run -p flavor-greeting                       # flavor.properties / default
//! FLAVOR=production cargo run -p flavor-greeting
//! ```

mod greeting;
mod platform;

#[allow(dead_code)]
mod flavor {
    include!(concat!(env!("OUT_DIR"), "/flavor.rs"));
}

use greeting::Greeting;
use platform::Platform;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!(
        flavor = env!("FLAVOR_NAME"),
        assets = env!("FLAVOR_ASSETS_DIR"),
        "Starting"
    );

    match Greeting::new(&flavor::SETTINGS, Platform::current()) {
        Ok(greeting) => {
            println!("{}", greeting.greet());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
