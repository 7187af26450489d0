//! Resolves the build flavor and generates `$OUT_DIR/flavor.rs`.
//!
//! Select with `FLAVOR=production cargo build` or `flavor=production` in
//! `flavor.properties`; the manifest default applies otherwise.

fn main() {
    if let Err(e) = flavor_core::build_script::FlavorBuild::new("flavors.toml").run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
