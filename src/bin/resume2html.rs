//! CLI binary for resume2html.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionSettings`, drives a `BatchDriver` and prints results.
//!
//! Exit codes: 0 when no file failed, 2 when at least one file failed,
//! 1 on fatal setup errors, 130 when interrupted with Ctrl-C.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use resume2html::{
    check_tools, enumerate, BatchDriver, BatchProgressCallback, BatchSummary, CancellationToken,
    ConversionResult, ConversionSettings, Converter, FileRecord, ProgressCallback,
    Resume2HtmlError, DEFAULT_MAX_FILE_SIZE,
};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const EXIT_FAILURES: u8 = 2;
const EXIT_FATAL: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch plus a log line per
/// finished file. Files complete out of order when several workers run.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize, skipped: usize) {
        self.bar.set_length(total as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total} files ({skipped} skipped)…"))
        ));
    }

    fn on_file_start(&self, _index: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, _index: usize, _total: usize, result: &ConversionResult) {
        let elapsed = dim(&format!("{:.1}s", result.duration_ms as f64 / 1000.0));
        if result.is_success() {
            let ocr = if result.ocr_applied { " OCR" } else { "" };
            self.bar.println(format!(
                "  {} {:<40}  {}  {}",
                green("✓"),
                result.filename,
                dim(&format!("{:>8} bytes{ocr}", result.html_size)),
                elapsed,
            ));
        } else {
            let error = result
                .error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            let first_line = error.lines().next().unwrap_or_default();
            let msg: String = if first_line.chars().count() > 80 {
                format!("{}\u{2026}", first_line.chars().take(79).collect::<String>())
            } else {
                first_line.to_string()
            };
            self.bar.println(format!(
                "  {} {:<40}  {}  {}",
                red("✗"),
                result.filename,
                red(&msg),
                elapsed,
            ));
        }
        self.bar.inc(1);
    }

    fn on_file_skipped(&self, name: &str) {
        self.bar
            .println(format!("  {} {}", dim("–"), dim(&format!("{name} (unsupported, skipped)"))));
    }

    fn on_batch_complete(&self, _summary: &BatchSummary) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert one resume into ./html_output
  resume2html resume.pdf

  # Convert a folder with 8 workers into ./site
  resume2html ./resumes -o ./site -w 8

  # Scanned PDFs without OCR, smaller images
  resume2html ./resumes --no-ocr --quality 60

  # HTML only, bundle everything into converted_files.zip
  resume2html ./resumes --no-text --archive

  # Machine-readable summary on stdout
  resume2html ./resumes --json > summary.json

  # Check which external tools are installed
  resume2html --check-tools

OUTPUTS (per input file, in the output directory):
  <stem>.html             self-contained page (inline CSS, images as data: URIs)
  <stem>.txt              extracted plain text
  <stem>_metadata.json    status, sizes, timings and error kind
  batch_summary.json      batch mode only: counts and every file record

EXTERNAL TOOLS:
  pdfium     PDF input        --pdfium-lib, else the system library
  soffice    DOC input        --soffice (LibreOffice)
  tesseract  OCR for scans    --tesseract, --ocr-lang

EXIT CODES:
  0    every file converted (unsupported files are skipped, not failed)
  1    fatal error before conversion (bad input path, invalid options)
  2    one or more files failed
  130  interrupted with Ctrl-C (partial summary is still written)
"#;

/// Convert resumes (PDF, DOC, DOCX) to styled, self-contained HTML.
#[derive(Parser, Debug)]
#[command(
    name = "resume2html",
    version,
    about = "Convert resumes (PDF, DOC, DOCX) to styled, self-contained HTML",
    long_about = "Convert resume documents to styled, self-contained HTML pages with \
extracted plain text and per-file JSON metadata. A directory input is converted as a \
parallel batch; one failing file never stops the others.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Resume file, or a directory of resumes for batch mode.
    #[arg(required_unless_present = "check_tools")]
    input: Option<PathBuf>,

    /// Output directory.
    #[arg(short, long, env = "RESUME2HTML_OUTPUT", default_value = "html_output")]
    output: PathBuf,

    /// Treat INPUT as a directory of resumes (implied when it is one).
    #[arg(long, env = "RESUME2HTML_BATCH")]
    batch: bool,

    /// Number of files converted concurrently.
    #[arg(short, long, env = "RESUME2HTML_WORKERS", default_value_t = 4,
          value_parser = clap::value_parser!(u16).range(1..))]
    workers: u16,

    /// Disable OCR for scanned PDFs.
    #[arg(long, env = "RESUME2HTML_NO_OCR")]
    no_ocr: bool,

    /// JPEG quality of embedded images (1–100).
    #[arg(long, env = "RESUME2HTML_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Page rasterisation DPI for OCR (72–600).
    #[arg(long, env = "RESUME2HTML_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Per-file timeout in seconds (0 disables).
    #[arg(long, env = "RESUME2HTML_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Do not write <stem>.html.
    #[arg(long, env = "RESUME2HTML_NO_HTML")]
    no_html: bool,

    /// Do not write <stem>.txt.
    #[arg(long, env = "RESUME2HTML_NO_TEXT")]
    no_text: bool,

    /// Tesseract language code(s), e.g. eng or eng+deu.
    #[arg(long, env = "RESUME2HTML_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Per-file size limit in MiB (0 disables).
    #[arg(long, env = "RESUME2HTML_MAX_FILE_SIZE", default_value_t = DEFAULT_MAX_FILE_SIZE / (1024 * 1024))]
    max_file_size: u64,

    /// LibreOffice executable used for .doc input.
    #[arg(long, env = "RESUME2HTML_SOFFICE", default_value = "soffice")]
    soffice: PathBuf,

    /// Tesseract executable used for OCR.
    #[arg(long, env = "RESUME2HTML_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Full path of the pdfium shared library (default: system library).
    #[arg(long, env = "RESUME2HTML_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Also bundle produced files into converted_files.zip (batch mode).
    #[arg(long, env = "RESUME2HTML_ARCHIVE")]
    archive: bool,

    /// Print the summary (batch) or file record (single file) as JSON on stdout.
    #[arg(long, env = "RESUME2HTML_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "RESUME2HTML_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RESUME2HTML_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "RESUME2HTML_QUIET")]
    quiet: bool,

    /// Report availability of soffice, tesseract and pdfium, then exit.
    #[arg(long)]
    check_tools: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Usage errors are setup errors: exit 1, never the "files failed" code.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_FATAL),
            };
        }
    };

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
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
        .with_writer(io::stderr)
        .init();

    match run(cli, show_progress).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", red("✘"), e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(cli: Cli, show_progress: bool) -> Result<ExitCode> {
    let settings = build_settings(&cli)?;

    // ── Tool check mode ──────────────────────────────────────────────────
    if cli.check_tools {
        let report = check_tools(&settings).await;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialise tool report")?
            );
        } else {
            for tool in &report {
                let mark = if tool.available { green("✓") } else { red("✗") };
                println!(
                    "{} {:<10} {:<20} {}",
                    mark,
                    tool.name,
                    dim(tool.needed_for),
                    tool.detail
                );
            }
        }
        let all_ok = report.iter().all(|t| t.available);
        return Ok(if all_ok {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(EXIT_FATAL)
        });
    }

    // ── Cancellation on Ctrl-C ───────────────────────────────────────────
    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{} interrupted, finishing up…", cyan("⚠"));
                token.cancel();
            }
        });
    }

    let mut driver = BatchDriver::new(Converter::new(settings)).with_cancellation(token.clone());

    let input = cli.input.clone().context("INPUT is required")?;
    let is_dir = match tokio::fs::metadata(&input).await {
        Ok(meta) => meta.is_dir(),
        Err(_) => {
            return Err(Resume2HtmlError::InputNotFound { path: input })
                .context("Cannot read input");
        }
    };

    let failed = if cli.batch || is_dir {
        // ── Batch mode ───────────────────────────────────────────────────
        let plan = enumerate(&input)
            .await
            .with_context(|| format!("Cannot read batch input {}", input.display()))?;

        if show_progress {
            let cb = CliProgressCallback::new();
            driver = driver.with_progress(cb as ProgressCallback);
        }
        let summary = driver.run(plan).await.context("Batch failed")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
            );
        } else if !cli.quiet {
            print_summary(&summary, &cli.output);
        }
        summary.has_failures()
    } else {
        // ── Single-file mode ─────────────────────────────────────────────
        let result = driver.convert_one(&input).await;

        if cli.json {
            let record = FileRecord::from(&result);
            println!(
                "{}",
                serde_json::to_string_pretty(&record).context("Failed to serialise record")?
            );
        } else if !cli.quiet {
            print_result(&result);
        }
        !result.is_success()
    };

    Ok(if token.is_cancelled() {
        ExitCode::from(EXIT_INTERRUPTED)
    } else if failed {
        ExitCode::from(EXIT_FAILURES)
    } else {
        ExitCode::SUCCESS
    })
}

/// Map CLI args to `ConversionSettings`.
fn build_settings(cli: &Cli) -> Result<ConversionSettings> {
    let max_file_size = match cli.max_file_size {
        0 => None,
        mb => Some(mb.saturating_mul(1024 * 1024)),
    };

    let mut builder = ConversionSettings::builder()
        .image_quality(cli.quality)
        .dpi(cli.dpi)
        .ocr_enabled(!cli.no_ocr)
        .workers(cli.workers as usize)
        .emit_html(!cli.no_html)
        .emit_text(!cli.no_text)
        .timeout_secs(cli.timeout)
        .output_dir(&cli.output)
        .max_file_size(max_file_size)
        .ocr_language(cli.ocr_lang.clone())
        .soffice_path(&cli.soffice)
        .tesseract_path(&cli.tesseract)
        .archive(cli.archive);

    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(summary: &BatchSummary, output_dir: &Path) {
    let mark = if summary.failed == 0 {
        green("✔")
    } else if summary.succeeded == 0 {
        red("✘")
    } else {
        cyan("⚠")
    };
    eprintln!(
        "{}  {}/{} converted  {} failed  {} skipped{}  →  {}",
        mark,
        bold(&summary.succeeded.to_string()),
        summary.records.len(),
        if summary.failed > 0 {
            red(&summary.failed.to_string())
        } else {
            summary.failed.to_string()
        },
        summary.skipped,
        if summary.cancelled {
            cyan("  (cancelled)")
        } else {
            String::new()
        },
        bold(&output_dir.display().to_string()),
    );
    for record in summary.failures() {
        eprintln!(
            "   {} {}  {}",
            red("✗"),
            record.filename,
            dim(record.error.as_deref().unwrap_or_default())
        );
    }
    if let Some(ref archive) = summary.archive_path {
        eprintln!("   archive: {}", dim(archive));
    }
}

fn print_result(result: &ConversionResult) {
    if result.is_success() {
        let target = result
            .output_path
            .as_ref()
            .or(result.text_path.as_ref())
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        eprintln!(
            "{}  {}  {} pages{}  {}ms  →  {}",
            green("✔"),
            result.filename,
            result.page_count,
            if result.ocr_applied { " (OCR)" } else { "" },
            result.duration_ms,
            bold(&target),
        );
    } else {
        let error = result
            .error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        eprintln!("{}  {}  {}", red("✘"), result.filename, red(&error));
    }
}
