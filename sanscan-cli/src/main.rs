mod report;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use sanscan_core::tools::DEFAULT_TOOL_TIMEOUT;
use sanscan_core::{
    detect, resolve, Backend, BinaryValidator, Inspector, NativeInspector, Policy, ToolInspector,
    DEFAULT_POLICY_PATH,
};

use crate::report::Report;

/// Sanitizer detection for ELF binaries
#[derive(Parser)]
#[command(
    name = "sanscan",
    about = "Check which sanitizers (ASan, TSan, MSan) a binary was built with",
    version,
    author
)]
struct Cli {
    /// Path to the executable or shared library
    #[arg(required = true)]
    file_path: PathBuf,

    /// Skip binary validation and go straight to the symbol table
    #[arg(short, long)]
    force: bool,

    /// Overwrite the policy file with the default policy
    #[arg(short, long)]
    reset: bool,

    /// Path to the policy file
    #[arg(short, long, default_value = DEFAULT_POLICY_PATH)]
    config: PathBuf,

    /// How binaries are inspected
    #[arg(long, default_value = "native", value_parser = parse_backend)]
    backend: Backend,

    /// Timeout in seconds for each external tool call (tools backend)
    #[arg(long, default_value_t = DEFAULT_TOOL_TIMEOUT.as_secs())]
    timeout: u64,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn parse_backend(s: &str) -> Result<Backend, String> {
    s.parse()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let policy = if cli.reset {
        log::info!("Resetting policy file {} as asked...", cli.config.display());
        Policy::reset(&cli.config)?
    } else {
        Policy::load_or_initialize(&cli.config)?
    };

    let path = resolve(&cli.file_path);
    log::debug!("Resolved {} -> {}", cli.file_path.display(), path.display());

    let inspector: Box<dyn Inspector> = match cli.backend {
        Backend::Native => Box::new(NativeInspector::new()),
        Backend::Tools => Box::new(ToolInspector::new(Duration::from_secs(cli.timeout))),
    };

    if cli.force {
        log::warn!("Skipping validation of {}", path.display());
    } else {
        BinaryValidator::new(&policy, inspector.as_ref()).validate(&path)?;
    }

    let result = detect(&path, inspector.as_ref(), &policy)
        .with_context(|| format!("Failed to classify {}", path.display()))?;

    let report = Report::new(&path, &result);
    match cli.format {
        Format::Text => report.print_text(),
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}
