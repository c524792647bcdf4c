//! Warden: compile workflow declarations into CI job manifests.
//!
//! Three subcommands:
//! - `warden compile`: compile one or more declarations and print the manifests
//! - `warden mcp-config`: print only the rendered MCP configuration
//! - `warden check-domain`: validate and classify network allow-list entries

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nimbus_warden::{
    classify_domain, compile_batch, load_declaration, CompiledWorkflow, DomainEntry,
    WorkflowDeclaration,
};
use tracing_subscriber::EnvFilter;

/// Warden: workflow configuration synthesis.
#[derive(Parser)]
#[command(
    name = "warden",
    version,
    about = "Compile workflow declarations into CI job manifests"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile declarations and print each manifest
    Compile {
        /// Declaration files (.toml or .json)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Print the rendered MCP configuration for one declaration
    McpConfig {
        /// Declaration file (.toml or .json)
        file: PathBuf,
    },
    /// Validate allow-list entries and show how each is classified
    CheckDomain {
        #[arg(required = true)]
        values: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Toml,
}

fn main() -> ExitCode {
    // Initialize tracing with env filter (RUST_LOG controls verbosity)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Compile { files, format } => run_compile(&files, format),
        Commands::McpConfig { file } => run_mcp_config(&file),
        Commands::CheckDomain { values } => Ok(run_check_domain(&values)),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Compile every file, printing manifests to stdout and failures to stderr.
/// Returns false if any file failed.
fn run_compile(files: &[PathBuf], format: Format) -> Result<bool> {
    let mut declarations = Vec::new();
    let mut ok = true;
    for file in files {
        match load_declaration(file) {
            Ok(decl) => declarations.push(decl),
            Err(e) => {
                eprintln!("error: {e}");
                ok = false;
            }
        }
    }

    for result in compile_batch(&declarations) {
        match result {
            Ok(compiled) => println!("{}", render_manifest(&compiled, format)?),
            Err(e) => {
                eprintln!("error: {e}");
                ok = false;
            }
        }
    }

    tracing::info!(files = files.len(), success = ok, "compile finished");
    Ok(ok)
}

fn render_manifest(compiled: &CompiledWorkflow, format: Format) -> Result<String> {
    match format {
        Format::Json => serde_json::to_string_pretty(compiled)
            .with_context(|| format!("failed to serialize workflow '{}'", compiled.name)),
        Format::Toml => toml::to_string_pretty(compiled)
            .with_context(|| format!("failed to serialize workflow '{}'", compiled.name)),
    }
}

fn run_mcp_config(file: &Path) -> Result<bool> {
    let decl = load_declaration(file)
        .with_context(|| format!("failed to load {}", file.display()))?;
    let compiled = compile_one(&decl)
        .with_context(|| format!("failed to compile {}", file.display()))?;
    print!("{}", compiled.mcp_config);
    Ok(true)
}

/// Compile a single declaration behind the same panic boundary as a batch.
fn compile_one(decl: &WorkflowDeclaration) -> nimbus_warden::Result<CompiledWorkflow> {
    compile_batch(std::slice::from_ref(decl))
        .pop()
        .unwrap_or_else(|| {
            Err(nimbus_warden::WardenError::Internal(
                decl.name.clone(),
                "no compilation result".to_string(),
            ))
        })
}

/// Print one line per value. Returns false if any value was rejected.
fn run_check_domain(values: &[String]) -> bool {
    let mut ok = true;
    for value in values {
        match classify_domain(value) {
            Ok(DomainEntry::Ecosystem(name)) => println!("{value}: ecosystem '{name}'"),
            Ok(entry @ DomainEntry::Explicit { .. }) => {
                println!("{value}: domain {}", entry.to_pattern());
            }
            Ok(entry @ DomainEntry::Wildcard { .. }) => {
                println!("{value}: wildcard {}", entry.to_pattern());
            }
            Err(e) => {
                println!("{value}: invalid: {e}");
                ok = false;
            }
        }
    }
    ok
}
