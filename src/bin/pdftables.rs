//! CLI binary for edgequake-pdftables.
//!
//! A thin shim over the library crate: `serve` runs the HTTP service,
//! `extract` processes one local PDF, `search` ranks its tables against a
//! free-text query using embeddings.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use edgequake_pdftables::config::{DEFAULT_MODEL, DEFAULT_TESSERACT_CMD, MAX_RETRIES_LIMIT};
use edgequake_pdftables::{
    index_tables, serve, Embedder, ExtractionProgressCallback, ExtractionReport, ExtractorConfig,
    GeminiClient, ProgressCallback, TablePipeline,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar for the summarisation phase; tables may finish out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix("Extracting");
        bar.set_message("text, OCR and tables…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_tables: usize) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:40.green/238}] {pos:>3}/{len} tables  {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        self.bar.set_length(total_tables as u64);
        self.bar.set_prefix("Summarising");
    }

    fn on_table_complete(&self, table_index: usize, total_tables: usize, summary_len: usize) {
        self.bar.println(format!(
            "  {} Table {:>3}/{:<3}  {}",
            green("✓"),
            table_index,
            total_tables,
            dim(&format!("{summary_len:>5} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_table_error(&self, table_index: usize, total_tables: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = error.chars().take(80).collect();
        self.bar.println(format!(
            "  {} Table {:>3}/{:<3}  {}",
            red("✗"),
            table_index,
            total_tables,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_tables: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let errors = self.errors.load(Ordering::SeqCst);
        if errors == 0 {
            eprintln!(
                "{} {}/{} tables summarised",
                green("✔"),
                bold(&success_count.to_string()),
                total_tables
            );
        } else {
            eprintln!(
                "{} {}/{} tables summarised  ({} failed)",
                red("⚠"),
                bold(&success_count.to_string()),
                total_tables,
                red(&errors.to_string())
            );
        }
    }
}

// ── Arguments ────────────────────────────────────────────────────────────────

/// Extract tables from PDF documents and summarise them with an LLM.
#[derive(Parser, Debug)]
#[command(name = "pdftables", version, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFTABLES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFTABLES_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (POST /upload-pdf/).
    Serve {
        #[arg(long, env = "PDFTABLES_HOST", default_value = "0.0.0.0")]
        host: String,

        #[arg(long, env = "PDFTABLES_PORT", default_value_t = 8000)]
        port: u16,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Extract and summarise the tables of one local PDF.
    Extract {
        pdf: PathBuf,

        /// Print the wire response as JSON.
        #[arg(long)]
        json: bool,

        /// Print the full report (text layer, OCR, outcomes, stats) as JSON.
        #[arg(long, conflicts_with = "json")]
        full: bool,

        /// Disable the progress bar.
        #[arg(long, env = "PDFTABLES_NO_PROGRESS")]
        no_progress: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Rank the tables of a PDF by similarity to a query.
    Search {
        pdf: PathBuf,

        query: String,

        /// Number of tables to return.
        #[arg(short, long, default_value_t = 3)]
        k: usize,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Google API key for Gemini.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Generation model.
    #[arg(long, env = "PDFTABLES_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// edgequake-llm provider (openai, anthropic, ollama, ...) instead of Gemini.
    #[arg(long, env = "PDFTABLES_PROVIDER")]
    provider: Option<String>,

    /// Tables summarised (and pages OCR'd) concurrently.
    #[arg(short, long, env = "PDFTABLES_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Per-call model timeout in seconds.
    #[arg(long, env = "PDFTABLES_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Retries per table on model failure.
    #[arg(
        long,
        env = "PDFTABLES_MAX_RETRIES",
        default_value_t = 2,
        value_parser = clap::value_parser!(u32).range(0..=MAX_RETRIES_LIMIT as i64)
    )]
    max_retries: u32,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PDFTABLES_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max tokens per summary.
    #[arg(long, env = "PDFTABLES_MAX_TOKENS", default_value_t = 1000)]
    max_tokens: usize,

    /// Run OCR over rendered pages.
    #[arg(long, env = "PDFTABLES_OCR", default_value_t = true, action = ArgAction::Set)]
    ocr: bool,

    /// Tesseract binary.
    #[arg(long, env = "TESSERACT_CMD", default_value = DEFAULT_TESSERACT_CMD)]
    tesseract_cmd: PathBuf,

    /// Tesseract language pack.
    #[arg(long, env = "TESSERACT_LANG", default_value = "eng")]
    tesseract_lang: String,

    /// Java binary used to run tabula.
    #[arg(long, env = "JAVA_CMD", default_value = "java")]
    java_cmd: PathBuf,

    /// tabula-java jar.
    #[arg(long, env = "TABULA_JAR", default_value = "tabula.jar")]
    tabula_jar: PathBuf,

    /// Directory containing the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,
}

impl PipelineArgs {
    fn to_config(&self, progress: Option<ProgressCallback>) -> Result<ExtractorConfig> {
        let mut builder = ExtractorConfig::builder()
            .model(self.model.clone())
            .concurrency(self.concurrency)
            .api_timeout_secs(self.api_timeout)
            .max_retries(self.max_retries)
            .temperature(self.temperature)
            .max_output_tokens(self.max_tokens)
            .ocr_enabled(self.ocr)
            .tesseract_cmd(self.tesseract_cmd.clone())
            .tesseract_lang(self.tesseract_lang.clone())
            .java_cmd(self.java_cmd.clone())
            .tabula_jar(self.tabula_jar.clone());

        if let Some(ref key) = self.api_key {
            builder = builder.api_key(key.clone());
        }
        if let Some(ref provider) = self.provider {
            builder = builder.provider_name(provider.clone());
        }
        if let Some(ref dir) = self.pdfium_lib_path {
            builder = builder.pdfium_lib_path(dir.clone());
        }
        if let Some(cb) = progress {
            builder = builder.progress_callback(cb);
        }
        builder.build().context("Invalid configuration")
    }
}

// ── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let show_progress = match &cli.command {
        Command::Extract {
            json,
            full,
            no_progress,
            ..
        } => !cli.quiet && !no_progress && !json && !full,
        _ => false,
    };
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

    match cli.command {
        Command::Serve {
            host,
            port,
            pipeline,
        } => {
            let config = pipeline.to_config(None)?;
            serve(config, &host, port)
                .await
                .context("Server terminated")?;
        }

        Command::Extract {
            pdf,
            json,
            full,
            pipeline,
            ..
        } => {
            let progress: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new() as ProgressCallback)
            } else {
                None
            };
            let report = run(&pipeline, &pdf, progress).await?;

            if full {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to serialise report")?
                );
            } else if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report.response)
                        .context("Failed to serialise response")?
                );
            } else {
                print_tables(&report);
                if !cli.quiet {
                    eprintln!(
                        "{}",
                        dim(&format!(
                            "{} pages rendered, {} tables, {}ms total",
                            report.stats.rendered_pages,
                            report.stats.detected_tables,
                            report.stats.total_duration_ms
                        ))
                    );
                }
            }
        }

        Command::Search {
            pdf,
            query,
            k,
            pipeline,
        } => {
            let config = pipeline.to_config(None)?;
            let embedder: Arc<dyn Embedder> = Arc::new(GeminiClient::from_config(&config));
            let tables: Vec<_> = TablePipeline::from_config(config.clone())
                .context("Failed to set up pipeline")?
                .clean_tables(&pdf)
                .await
                .with_context(|| format!("Error processing PDF {}", pdf.display()))?
                .into_iter()
                .filter_map(Result::ok)
                .collect();

            let index = index_tables(
                &embedder,
                &tables,
                config.embedding_dimension,
                config.concurrency,
            )
            .await
            .context("Failed to index tables")?;

            let query_vec = embedder
                .embed(&query)
                .await
                .context("Failed to embed query")?;
            let hits = index.search(&query_vec, k).context("Search failed")?;

            if hits.is_empty() {
                eprintln!("No tables found in {}", pdf.display());
            }
            for hit in hits {
                println!(
                    "{}  {}",
                    bold(&format!("Table {}", hit.table_index)),
                    dim(&format!("distance {:.4}", hit.distance))
                );
                println!("{}\n", hit.content);
            }
        }
    }

    Ok(())
}

async fn run(
    args: &PipelineArgs,
    pdf: &Path,
    progress: Option<ProgressCallback>,
) -> Result<ExtractionReport> {
    let config = args.to_config(progress)?;
    let pipeline = TablePipeline::from_config(config).context("Failed to set up pipeline")?;
    pipeline
        .process_path(pdf)
        .await
        .with_context(|| format!("Error processing PDF {}", pdf.display()))
}

fn print_tables(report: &ExtractionReport) {
    if report.response.tables.is_empty() {
        println!("No tables found.");
        return;
    }
    for table in &report.response.tables {
        println!("{}", bold(&format!("── Table {} ──", table.table_index)));
        println!("{}\n", table.content);
        println!("{} {}\n", bold("Summary:"), table.summary);
    }
}
