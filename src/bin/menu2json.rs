//! CLI binary for menu2json.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `ExtractionConfig`, runs the pipeline once, and reports the
//! failing stage on error.

use anyhow::{Context, Result};
use clap::Parser;
use menu2json::{
    default_output_path, extract_to_file, pipeline::detect, ExtractionConfig, DEFAULT_MODEL,
};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract the single menu file in the current directory
  API_KEY=gsk-... menu2json

  # Extract a specific file to a specific output
  menu2json menus/dinner.pdf -o dinner.json

  # Scanned menu photo, Hindi + English OCR
  menu2json menu.jpg --ocr-language hin+eng

  # Deterministic run against a different OpenAI-compatible server
  menu2json menu.pdf --api-base-url http://localhost:11434 --temperature 0

ENVIRONMENT VARIABLES:
  API_KEY        Credential for the completion service (required)
  MODEL_NAME     Model id passed through verbatim
  OUTPUT_DIR     Destination directory, created if absent
  TEMPERATURE    Sampling temperature (lower = more deterministic)
  MAX_TOKENS     Cap on completion length

OUTPUT:
  <input stem>_extracted.json in OUTPUT_DIR (or next to the input file),
  written atomically — a failed run never leaves a partial file.

SETUP:
  1. Set API key:            export API_KEY=gsk-...
  2. Drop one menu file (.pdf/.jpg/.jpeg/.png) in the input directory
  3. Run:                    menu2json

  Scanned documents additionally need tesseract on PATH
  (e.g. apt install tesseract-ocr).
"#;

/// Extract structured JSON from a restaurant menu PDF or image.
#[derive(Parser, Debug)]
#[command(
    name = "menu2json",
    version,
    about = "Extract structured JSON from restaurant menu PDFs and images using LLMs",
    long_about = "Convert one restaurant-menu document (PDF, JPEG, or PNG) into validated JSON: \
restaurant name plus items with name, description, verbatim price, and category. \
Text comes from the PDF text layer when available, tesseract OCR otherwise; \
an LLM structures it and a validation pass rejects hallucinated values.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Menu file path. When omitted, the single recognised file in
    /// --input-dir is used.
    input: Option<PathBuf>,

    /// Directory searched when no input path is given.
    #[arg(long, default_value = ".")]
    input_dir: PathBuf,

    /// Write the JSON here instead of the default
    /// `<stem>_extracted.json` location.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Credential for the completion service.
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model id passed through verbatim to the API.
    #[arg(long, env = "MODEL_NAME", default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of the OpenAI-compatible completion endpoint.
    #[arg(long, env = "API_BASE_URL")]
    api_base_url: Option<String>,

    /// Destination directory for the output JSON, created if absent.
    #[arg(long, env = "OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Sampling temperature (0.0–2.0); lower = more deterministic.
    #[arg(long, env = "TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max completion tokens.
    #[arg(long, env = "MAX_TOKENS", default_value_t = 4096)]
    max_tokens: u32,

    /// Attempts per completion request on transient failure.
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 60)]
    api_timeout: u64,

    /// Tesseract language code(s), e.g. "eng" or "hin+eng".
    #[arg(long, env = "OCR_LANGUAGE", default_value = "eng")]
    ocr_language: String,

    /// Path to a text file containing a custom system prompt.
    #[arg(long)]
    system_prompt: Option<PathBuf>,

    /// Also print the result JSON to stdout.
    #[arg(long)]
    print: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
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

    // ── Resolve input ────────────────────────────────────────────────────
    let input = match cli.input.clone() {
        Some(path) => path,
        None => detect::discover_input(&cli.input_dir)
            .map_err(|e| anyhow::anyhow!("{} failed: {e}", e.stage()))?,
    };

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli).await?;
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&input, &config));

    // ── Run the pipeline ─────────────────────────────────────────────────
    let result = extract_to_file(&input, &output_path, &config)
        .await
        .map_err(|e| anyhow::anyhow!("{} failed: {e}", e.stage()))?;

    if cli.print {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("failed to serialise result")?
        );
    }

    if !cli.quiet {
        eprintln!(
            "✔ {} item(s) from {} page(s)  →  {}",
            result.data.items.len(),
            result.metadata.total_pages,
            output_path.display()
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .model(cli.model.clone())
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .ocr_language(cli.ocr_language.clone());

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref url) = cli.api_base_url {
        builder = builder.api_base_url(url.clone());
    }
    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_dir(dir.clone());
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read system prompt from {path:?}"))?;
        builder = builder.system_prompt(prompt);
    }

    builder
        .build()
        .map_err(|e| anyhow::anyhow!("{} failed: {e}", e.stage()))
}
