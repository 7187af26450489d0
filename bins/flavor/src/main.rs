//! Flavor CLI
//!
//! Selects, inspects and stages build flavors declared in `flavors.toml`.

use anyhow::Result;
use clap::{Parser, Subcommand};
use flavor_cli::output::{self, format_count, format_size, format_table, OutputFormat, Status};
use flavor_core::codegen::{self, ExportFormat};
use flavor_core::config::properties::parse_assignment;
use flavor_core::config::Config;
use flavor_core::error::exit_codes;
use flavor_core::registry::ProfileRegistry;
use flavor_core::selector::{ProfileSelector, Selection};
use flavor_core::{assets, Error, ErrorCode, ResolvedConfig};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flavor")]
#[command(about = "Select, inspect and stage build flavors")]
#[command(version)]
struct Cli {
    /// Flavor manifest path (searches flavors.toml, .flavors.toml, config/flavors.toml)
    #[arg(short, long, global = true)]
    manifest: Option<PathBuf>,

    /// Build property, e.g. -P flavor=production (repeatable)
    #[arg(
        short = 'P',
        long = "property",
        value_name = "KEY=VALUE",
        value_parser = parse_property,
        global = true
    )]
    properties: Vec<(String, String)>,

    /// Flavor to select; takes precedence over -P and the environment
    #[arg(long, global = true)]
    flavor: Option<String>,

    /// Increase log verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List declared flavors
    List,

    /// Show the active flavor's settings
    Show,

    /// Print one setting of the active flavor
    Get {
        /// Setting key, e.g. displayName or backend.projectId
        key: String,
    },

    /// Validate the manifest, the selection and every flavor's assets
    Check,

    /// Copy the active flavor's assets into a directory
    Stage {
        /// Staging directory
        #[arg(long, default_value = "build/flavor-assets")]
        out: PathBuf,
    },

    /// Write the Rust settings module for the active flavor
    Generate {
        /// Output file
        #[arg(long)]
        out: PathBuf,
    },

    /// Render the active flavor for a packaging pipeline
    Export {
        /// xcconfig, properties, env, json or rust
        #[arg(value_parser = parse_export_format)]
        kind: ExportFormat,

        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn parse_property(raw: &str) -> std::result::Result<(String, String), String> {
    parse_assignment(raw).map_err(|e| e.message)
}

fn parse_export_format(raw: &str) -> std::result::Result<ExportFormat, String> {
    raw.parse().map_err(|e: Error| e.message)
}

fn init_logging(verbose: u8, ansi: bool) {
    let level = match verbose {
        0 => "warn",
        1 => "flavor_core=info,flavor=info",
        2 => "flavor_core=debug,flavor=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(ansi)
        .compact()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }
    Status::set_quiet(cli.quiet);
    init_logging(cli.verbose, !cli.no_color);

    let format = cli.format;
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is::<Reported>() => match err.downcast_ref::<Reported>() {
            Some(Reported(code)) => exit_code(code.exit_code()),
            None => exit_code(exit_codes::FAILURE),
        },
        Err(err) => match err.downcast_ref::<Error>() {
            Some(flavor_err) => {
                if !format.is_json() || output::print_json(&flavor_err.to_report()).is_err() {
                    output::print_error(flavor_err);
                }
                exit_code(flavor_err.exit_code())
            }
            None => {
                Status::error(&format!("{err:#}"));
                exit_code(exit_codes::FAILURE)
            }
        },
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// A failure whose report is already on stdout
#[derive(Debug)]
struct Reported(ErrorCode);

impl std::fmt::Display for Reported {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (reported)", self.0)
    }
}

impl std::error::Error for Reported {}

/// Everything a command needs: the manifest and the selection for this run
struct Session {
    config: Config,
    selector: ProfileSelector,
    selection: Selection,
    format: OutputFormat,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self> {
        let config = Config::load(cli.manifest.as_deref())?;
        let selector = ProfileSelector::from_config(&config)?;
        let selection = Selection::gather(&config, cli.flavor.as_deref(), &cli.properties)?;

        tracing::debug!(
            manifest = %config.path.display(),
            flavors = selector.names().len(),
            selection = ?selection.name,
            source = %selection.source,
            "Opened session"
        );

        Ok(Self {
            config,
            selector,
            selection,
            format: cli.format,
        })
    }

    fn active(&self) -> Result<ResolvedConfig> {
        Ok(self.selector.resolve(&self.selection)?)
    }

    fn requested_name(&self) -> &str {
        self.selection
            .name
            .as_deref()
            .unwrap_or_else(|| self.selector.default_name())
    }
}

fn run(cli: Cli) -> Result<()> {
    let session = Session::open(&cli)?;

    match cli.command {
        Commands::List => run_list(&session),
        Commands::Show => run_show(&session),
        Commands::Get { key } => run_get(&session, &key),
        Commands::Check => run_check(&session),
        Commands::Stage { out } => run_stage(&session, &out),
        Commands::Generate { out } => run_export(&session, ExportFormat::Rust, Some(&out)),
        Commands::Export { kind, out } => run_export(&session, kind, out.as_deref()),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FlavorRow<'a> {
    name: &'a str,
    display_name: &'a str,
    identifier_suffix: &'a str,
    assets: usize,
    default: bool,
    selected: bool,
}

fn run_list(session: &Session) -> Result<()> {
    let registry = ProfileRegistry::from_config(&session.config)?;
    let default = session.selector.default_name();
    let requested = session.requested_name();

    let rows: Vec<FlavorRow<'_>> = registry
        .iter()
        .map(|p| FlavorRow {
            name: &p.name,
            display_name: &p.settings.display_name,
            identifier_suffix: &p.settings.identifier_suffix,
            assets: p.assets.len(),
            default: p.name == default,
            selected: p.name == requested,
        })
        .collect();

    if session.format.is_json() {
        output::print_json(&rows)?;
        return Ok(());
    }

    Status::header(&format!("Flavors ({})", session.config.path.display()));
    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for row in &rows {
        let marker = if row.selected { "●".green().to_string() } else { "○".dimmed().to_string() };
        let default = if row.default { " (default)".dimmed().to_string() } else { String::new() };
        println!(
            "  {} {:<width$}  {}  {}{}",
            marker,
            row.name,
            row.display_name,
            format_count(row.assets, "asset", "assets").dimmed(),
            default,
        );
    }

    if !registry.contains(requested) {
        println!();
        Status::warning(&format!("Selected flavor '{requested}' is not declared"));
    }
    Ok(())
}

fn run_show(session: &Session) -> Result<()> {
    let active = session.active()?;

    if session.format.is_json() {
        #[derive(Serialize)]
        struct ShowOutput<'a> {
            source: String,
            #[serde(flatten)]
            flavor: &'a ResolvedConfig,
        }
        output::print_json(&ShowOutput {
            source: session.selection.source.to_string(),
            flavor: &active,
        })?;
        return Ok(());
    }

    Status::header(&format!("Flavor: {}", active.name()));
    println!("  {} {}", "selected by:".dimmed(), session.selection.source);
    println!();
    println!("{}", format_table(&active.settings().entries()));

    if !active.assets().is_empty() {
        println!();
        println!("{}", "Assets:".bold());
        for asset in active.assets() {
            println!("  {} → {}", asset.source.display(), asset.target);
        }
    }
    Ok(())
}

fn run_get(session: &Session, key: &str) -> Result<()> {
    let active = session.active()?;
    let value = active.get(key)?;

    if session.format.is_json() {
        output::print_json(&serde_json::json!({ "flavor": active.name(), "key": key, "value": value }))?;
    } else {
        println!("{value}");
    }
    Ok(())
}

fn run_check(session: &Session) -> Result<()> {
    let registry = ProfileRegistry::from_config(&session.config)?;

    let missing: Vec<(String, PathBuf)> = registry
        .iter()
        .flat_map(|p| {
            p.assets
                .iter()
                .filter(|a| !a.source.exists())
                .map(move |a| (p.name.clone(), a.source.clone()))
        })
        .collect();

    let selection = session.active();
    let failure = match &selection {
        Err(e) => Some(match e.downcast_ref::<Error>() {
            Some(flavor_err) => flavor_err.to_report(),
            None => Error::new(ErrorCode::ConfigError, format!("{e:#}")).to_report(),
        }),
        Ok(_) => missing
            .first()
            .map(|(flavor, path)| missing_assets(flavor, path, missing.len()).to_report()),
    };

    if session.format.is_json() {
        let missing_json: Vec<_> = missing
            .iter()
            .map(|(flavor, path)| serde_json::json!({ "flavor": flavor, "path": path }))
            .collect();
        output::print_json(&serde_json::json!({
            "manifest": session.config.path,
            "flavors": registry.names(),
            "selected": selection.as_ref().ok().map(|c| c.name().to_string()),
            "missingAssets": missing_json,
            "error": failure,
        }))?;

        return match failure {
            Some(report) => Err(Reported(report.code).into()),
            None => Ok(()),
        };
    }

    Status::success(&format!(
        "{} declared in {}",
        format_count(registry.len(), "flavor", "flavors"),
        session.config.path.display()
    ));
    for (flavor, path) in &missing {
        Status::error(&format!("{flavor}: missing asset {}", path.display()));
    }
    if let Ok(active) = &selection {
        Status::success(&format!(
            "Selection resolves to '{}' ({})",
            active.name(),
            session.selection.source
        ));
    }

    selection?;
    if let Some((flavor, path)) = missing.first() {
        return Err(missing_assets(flavor, path, missing.len()).into());
    }
    Ok(())
}

fn missing_assets(flavor: &str, path: &Path, count: usize) -> Error {
    Error::asset_not_found(flavor, path).with_context(format!(
        "{} missing across all flavors",
        format_count(count, "asset is", "assets are")
    ))
}

fn run_stage(session: &Session, out: &Path) -> Result<()> {
    let active = session.active()?;
    let report = assets::stage_assets(&active, out)?;

    if session.format.is_json() {
        output::print_json(&report)?;
        return Ok(());
    }

    for removed in &report.removed {
        Status::info(&format!("Removed {removed}"));
    }
    Status::success(&format!(
        "Staged {} ({}) for '{}' into {}",
        format_count(report.files.len(), "asset", "assets"),
        format_size(report.total_bytes()),
        report.flavor,
        report.out_dir.display()
    ));
    Ok(())
}

fn run_export(session: &Session, kind: ExportFormat, out: Option<&Path>) -> Result<()> {
    let active = session.active()?;
    let rendered = codegen::export(&active, kind)?;

    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(Error::from)?;
            }
            std::fs::write(path, rendered).map_err(Error::from)?;
            tracing::info!(format = %kind, flavor = %active.name(), path = %path.display(), "Wrote export");
            Status::success(&format!(
                "Wrote {} export of '{}' to {}",
                kind,
                active.name(),
                path.display()
            ));
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_repeated_properties() {
        let cli = Cli::parse_from([
            "flavor",
            "-P",
            "flavor=production",
            "-P",
            "org.gradle.daemon=false",
            "show",
        ]);
        assert_eq!(
            cli.properties,
            vec![
                ("flavor".to_string(), "production".to_string()),
                ("org.gradle.daemon".to_string(), "false".to_string()),
            ]
        );
    }

    #[test]
    fn test_export_kind_parsing() {
        let cli = Cli::parse_from(["flavor", "export", "xcconfig"]);
        assert!(matches!(
            cli.command,
            Commands::Export { kind: ExportFormat::Xcconfig, out: None }
        ));
        assert!(Cli::try_parse_from(["flavor", "export", "yaml"]).is_err());
    }

    #[test]
    fn test_exit_code_mapping() {
        let err = Error::new(ErrorCode::UnknownProfile, "x");
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
    }
}
