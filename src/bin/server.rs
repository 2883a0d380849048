//! Server binary for form2report.
//!
//! A thin shim over the library crate: parses flags, reads the service
//! configuration from the environment, and serves until terminated.

use anyhow::{Context, Result};
use clap::Parser;
use form2report::{AppState, Pipeline, ServiceConfig};
use std::io;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENVIRONMENT VARIABLES:
  GOOGLE_VISION_API_KEY      Vision API key (required)
  GOOGLE_API_KEY             Generative-model API key (required)
  SUPABASE_URL               Store project URL (required)
  SUPABASE_SERVICE_ROLE_KEY  Store service-role key (required)
  VISION_ENDPOINT            Override the annotate endpoint
  MODEL_BASE_URL             Override the model API base URL
  MODEL_ID                   Override the model (default: gemini-1.5-flash-latest)
  HAZARD_REPORTS_TABLE       Override the target table (default: hazard_reports)
  OCR_TIMEOUT_SECS           OCR call timeout (default: 30)
  MODEL_TIMEOUT_SECS         Model call timeout (default: 60)
  INSERT_TIMEOUT_SECS        Insert call timeout (default: 10)

SETUP:
  1. Export the four required variables.
  2. Run:   form2report-server --bind 0.0.0.0:8787
  3. Test:  curl -X POST localhost:8787/process-hazard-report \
                 -H 'Content-Type: application/json' \
                 -d "{\"image_base64\": \"$(base64 -w0 form.jpg)\"}"
"#;

/// Hazard-report ingestion service: photographed form in, structured row out.
#[derive(Parser, Debug)]
#[command(
    name = "form2report-server",
    version,
    about = "Serve the hazard-report extraction pipeline over HTTP",
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "FORM2REPORT_BIND", default_value = "0.0.0.0:8787")]
    bind: SocketAddr,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FORM2REPORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FORM2REPORT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = ServiceConfig::from_env().context(
        "Service configuration incomplete — see `form2report-server --help` for the variable list",
    )?;
    let pipeline =
        Pipeline::from_config(&config).context("Failed to construct the ingest pipeline")?;

    form2report::serve(cli.bind, AppState::new(pipeline))
        .await
        .context("Server terminated abnormally")?;

    Ok(())
}
