//! Switchyard CLI.
//!
//! Loads a route manifest and checks it, resolves sample requests against
//! it, or prints the routing trie.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use switchyard_lib::{ManifestError, Probe, Report, RouteManifest};
use switchyard_router::Constraints;
use switchyard_telemetry::{LogFormat, Telemetry, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "switchyard", about = "Switchyard route manifest tool", version)]
struct Cli {
    /// Log level or filter directive. `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format (json or pretty). Logs are written to stderr.
    #[arg(long, global = true, default_value = "json", value_parser = parse_log_format)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register every route of a manifest and report rejections.
    Check {
        /// Route manifest (YAML).
        #[arg(short, long)]
        routes: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Resolve one request against a manifest.
    ///
    /// Exits with 2 when no route matches and the manifest has no default.
    Resolve {
        /// Route manifest (YAML).
        #[arg(short, long)]
        routes: PathBuf,

        /// HTTP method.
        method: String,

        /// Request path, optionally with a query string.
        path: String,

        /// Request constraint, for example `version=2.x`. Repeatable.
        #[arg(
            short = 'c',
            long = "constraint",
            value_name = "KEY=VALUE",
            value_parser = parse_constraint
        )]
        constraints: Vec<(String, String)>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the routing trie of a manifest.
    Tree {
        /// Route manifest (YAML).
        #[arg(short, long)]
        routes: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    LogFormat::parse(s)
        .ok_or_else(|| format!("unknown log format '{}' (expected json or pretty)", s))
}

fn parse_constraint(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

/// Load a manifest, printing the error on failure.
fn load(path: &Path) -> Option<RouteManifest> {
    match RouteManifest::load(path) {
        Ok(manifest) => {
            switchyard_telemetry::log_manifest_loaded!(
                path = %path.display(),
                routes = manifest.routes.len(),
                "manifest loaded"
            );
            Some(manifest)
        }
        Err(e) => {
            eprintln!("error: {}", e);
            None
        }
    }
}

#[derive(Serialize)]
struct CheckReport {
    file: String,
    valid: bool,
    registered: usize,
    errors: Vec<String>,
}

/// Run the check command.
fn run_check(routes: &Path, format: OutputFormat) -> ExitCode {
    let Some(manifest) = load(routes) else {
        return ExitCode::from(1);
    };

    let outcome = manifest.check();

    match format {
        OutputFormat::Json => {
            let report = CheckReport {
                file: routes.display().to_string(),
                valid: outcome.is_valid(),
                registered: outcome.registered,
                errors: outcome.errors.iter().map(|e| e.to_string()).collect(),
            };
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("error: failed to render report: {}", e);
                    return ExitCode::from(1);
                }
            }
        }
        OutputFormat::Text => {
            for error in &outcome.errors {
                eprintln!("error: {}", error);
            }
            if outcome.is_valid() {
                println!(
                    "{}: {} route(s) registered",
                    routes.display(),
                    outcome.registered
                );
            } else {
                eprintln!(
                    "{}: {} route(s) registered, {} rejected",
                    routes.display(),
                    outcome.registered,
                    outcome.errors.len()
                );
            }
        }
    }

    if outcome.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

#[derive(Serialize)]
struct Unmatched<'a> {
    method: &'a str,
    path: &'a str,
    matched: bool,
    allowed: Vec<String>,
}

/// Run the resolve command.
fn run_resolve(
    routes: &Path,
    method: &str,
    path: &str,
    constraints: Vec<(String, String)>,
    format: OutputFormat,
) -> ExitCode {
    let Some(manifest) = load(routes) else {
        return ExitCode::from(1);
    };
    let router = match manifest.build_router() {
        Ok(router) => router,
        Err(e) => {
            report_build_error(&e);
            return ExitCode::from(1);
        }
    };

    let probe = Probe {
        method: method.to_string(),
        path: path.to_string(),
        constraints: constraints.into_iter().collect::<Constraints>(),
    };
    let mut report = Report::default();

    if router
        .dispatch(method, path, &probe, &mut report, &probe.constraints)
        .is_none()
    {
        let allowed = router.allowed_methods(path, &probe.constraints);
        switchyard_telemetry::log_route_not_found!(
            method = %method,
            path = %path,
            constraints = %probe.constraints.to_json(),
            "no route matched"
        );
        match format {
            OutputFormat::Json => {
                let unmatched = Unmatched {
                    method,
                    path,
                    matched: false,
                    allowed,
                };
                if let Ok(json) = serde_json::to_string_pretty(&unmatched) {
                    println!("{}", json);
                }
            }
            OutputFormat::Text => {
                eprintln!("no route for {} {}", method, path);
                if !allowed.is_empty() {
                    eprintln!("allowed methods: {}", allowed.join(", "));
                }
            }
        }
        return ExitCode::from(2);
    }

    switchyard_telemetry::log_route_resolved!(
        method = %method,
        path = %path,
        target = %report.target,
        fallback = report.fallback,
        "route resolved"
    );

    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: failed to render report: {}", e);
                return ExitCode::from(1);
            }
        },
        OutputFormat::Text => {
            if report.fallback {
                println!("target: {} (default route)", report.target);
            } else {
                println!("target: {}", report.target);
            }
            if let Some(pattern) = &report.pattern {
                println!("pattern: {}", pattern);
            }
            for param in &report.params {
                println!("param {}: {}", param.name, param.value);
            }
        }
    }

    ExitCode::SUCCESS
}

/// Run the tree command.
fn run_tree(routes: &Path) -> ExitCode {
    let Some(manifest) = load(routes) else {
        return ExitCode::from(1);
    };
    match manifest.build_router() {
        Ok(router) => {
            print!("{}", router.snapshot());
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_build_error(&e);
            ExitCode::from(1)
        }
    }
}

fn report_build_error(error: &ManifestError) {
    switchyard_telemetry::log_registration_failed!(error = %error, "manifest rejected");
    eprintln!("error: {}", error);
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let telemetry = TelemetryConfig::new()
        .with_log_level(&cli.log_level)
        .with_log_format(cli.log_format);
    if let Err(e) = Telemetry::init(telemetry) {
        eprintln!("error: {}", e);
        return ExitCode::from(1);
    }

    match cli.command {
        Commands::Check { routes, format } => run_check(&routes, format),
        Commands::Resolve {
            routes,
            method,
            path,
            constraints,
            format,
        } => run_resolve(&routes, &method, &path, constraints, format),
        Commands::Tree { routes } => run_tree(&routes),
    }
}
