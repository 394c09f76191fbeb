//! CLI binary for invoice2json.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, renders numbered progress lines, and prints the
//! extracted record.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use invoice2json::{
    extract, ExtractionConfig, ExtractionProgress, ExtractionStats, InvoiceRecord,
    DEFAULT_API_BASE, DEFAULT_MODEL,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress: numbered lines plus a spinner ──────────────────────────────

/// Renders the run as numbered human-readable lines, with an indicatif
/// spinner while the network calls are in flight. The line counter starts at
/// 2 because `main` prints line 1 (the credential check) itself.
struct CliProgress {
    bar: ProgressBar,
    step: AtomicUsize,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            step: AtomicUsize::new(2),
        })
    }

    fn line(&self, text: String) {
        let n = self.step.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!("{n}. {text}"));
    }
}

impl ExtractionProgress for CliProgress {
    fn on_start(&self, input: &Path) {
        self.line(format!("AI analysis of {} started", bold(&input.display().to_string())));
        self.bar.set_message("uploading…");
    }

    fn on_upload_complete(&self, bytes: u64, duration_ms: u64) {
        self.line(format!(
            "Uploaded {} KiB {}",
            bytes / 1024,
            dim(&format!("({:.1}s)", duration_ms as f64 / 1000.0)),
        ));
        self.bar.set_message("waiting for the model…");
    }

    fn on_record_validated(&self, located: usize, duration_ms: u64) {
        self.line(format!(
            "Model reply validated — {} of 5 fields located {}",
            bold(&located.to_string()),
            dim(&format!("({:.1}s)", duration_ms as f64 / 1000.0)),
        ));
        self.bar.set_message("annotating…");
    }

    fn on_annotation_complete(&self, output: &Path, drawn: usize, skipped: usize) {
        self.line(format!(
            "Annotated PDF written to {} {}",
            bold(&output.display().to_string()),
            dim(&format!("({drawn} boxes drawn, {skipped} skipped)")),
        ));
    }

    fn on_complete(&self, stats: &ExtractionStats) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} done in {}ms",
            green("✔"),
            bold(&stats.total_duration_ms.to_string()),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract fields, print them to stdout
  invoice2json invoice.pdf

  # Extract and write an annotated copy with labeled bounding boxes
  invoice2json invoice.pdf -o out/invoice_annotated.pdf

  # Use a specific model, machine-readable output
  invoice2json --model gemini-3-flash-preview --json invoice.pdf

  # Custom instruction prompt
  invoice2json --prompt-file prompt.txt invoice.pdf

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY        Gemini API key (required)
  GEMINI_API_BASE       Override the API endpoint (e.g. a local stub)
  INVOICE2JSON_MODEL    Override the model ID
  PDFIUM_LIB_PATH       Path to an existing libpdfium (annotation only)

SETUP:
  1. Set the API key:  export GEMINI_API_KEY=AIza...
  2. Extract:          invoice2json invoice.pdf -o annotated.pdf
"#;

/// Extract structured invoice fields from a PDF using Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "invoice2json",
    version,
    about = "Extract structured invoice fields from a PDF using Gemini",
    long_about = "Extract the invoice total, tax, recipient, sender, and account number from a \
PDF by delegating document understanding to a hosted multimodal model, validating the reply \
against a fixed JSON Schema, and optionally annotating the source PDF with labeled bounding \
boxes over the extracted fields.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Write an annotated copy of the PDF to this path.
    #[arg(short = 'o', long = "annotate", value_name = "PDF")]
    annotate: Option<PathBuf>,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini API base URL.
    #[arg(long, env = "GEMINI_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Model ID.
    #[arg(long, env = "INVOICE2JSON_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Path to a text file containing a custom instruction prompt.
    #[arg(long, env = "INVOICE2JSON_PROMPT")]
    prompt_file: Option<PathBuf>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long)]
    temperature: Option<f32>,

    /// Files API upload timeout in seconds.
    #[arg(long, default_value_t = 120)]
    upload_timeout: u64,

    /// generateContent call timeout in seconds.
    #[arg(long, default_value_t = 60)]
    api_timeout: u64,

    /// Output the full extraction result as JSON instead of field lines.
    #[arg(long)]
    json: bool,

    /// Disable the progress display.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors and the record itself.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The numbered progress lines are the user-facing feedback; library logs
    // stay at error level unless --verbose asks for them.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // ── Step 1: credential line ──────────────────────────────────────────
    // The library re-checks eagerly; this line mirrors the check for humans.
    if show_progress {
        if cli.api_key.is_some() {
            eprintln!("1. {} API key configured", green("✔"));
        } else {
            eprintln!("1. {} GEMINI_API_KEY is not set", cyan("⚠"));
        }
    }

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli, show_progress).await?;

    // ── Run extraction ───────────────────────────────────────────────────
    let output = extract(&cli.input, &config)
        .await
        .context("Extraction failed")?;

    // ── Print the record ─────────────────────────────────────────────────
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else {
        print_record(&output.invoice);
        if let Some(ref annotated) = output.annotated {
            if cli.quiet {
                // Progress lines were suppressed; still say where the file went.
                eprintln!("annotated: {}", annotated.display());
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, show_progress: bool) -> Result<ExtractionConfig> {
    let prompt = match cli.prompt_file {
        Some(ref path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read prompt from {path:?}"))?,
        ),
        None => None,
    };

    let mut builder = ExtractionConfig::builder()
        .api_base(cli.api_base.clone())
        .model(cli.model.clone())
        .upload_timeout_secs(cli.upload_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(p) = prompt {
        builder = builder.prompt(p);
    }
    if let Some(ref out) = cli.annotate {
        builder = builder.annotate_to(out.clone());
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if show_progress {
        builder = builder.progress(CliProgress::new() as Arc<dyn ExtractionProgress>);
    }

    builder.build().context("Invalid configuration")
}

/// Human-readable field lines, one per extracted field.
fn print_record(invoice: &InvoiceRecord) {
    let page = |located: bool, page: u32| -> String {
        if located {
            dim(&format!("(page {page})"))
        } else {
            dim("(not located)")
        }
    };

    println!(
        "total:      {} {}",
        bold(&format!("{:.2}", invoice.total.value)),
        page(
            invoice.total.location.locate().is_some(),
            invoice.total.location.page
        ),
    );
    println!(
        "tax:        {} {}",
        bold(&format!("{:.2}", invoice.tax.value)),
        page(
            invoice.tax.location.locate().is_some(),
            invoice.tax.location.page
        ),
    );
    println!(
        "recipient:  {} {}",
        bold(&invoice.recipient.name),
        page(
            invoice.recipient.location.locate().is_some(),
            invoice.recipient.location.page
        ),
    );
    println!(
        "sender:     {} {}",
        bold(&invoice.sender.name),
        page(
            invoice.sender.location.locate().is_some(),
            invoice.sender.location.page
        ),
    );
    println!(
        "account_no: {} {}",
        bold(&invoice.account_no.account_no),
        page(
            invoice.account_no.location.locate().is_some(),
            invoice.account_no.location.page
        ),
    );
}
