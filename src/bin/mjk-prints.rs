//! CLI binary for mjk-prints.
//!
//! `serve` runs the HTTP API; `process` and `inspect` are operator tools for
//! reprocessing a stuck upload or checking a PDF before it goes live.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use mjk_prints::api::{self, AppState};
use mjk_prints::{
    inspect_bytes, process_file, PdfiumRenderer, PostgrestDb, ProcessContext, ProcessingConfig,
    ProcessingProgressCallback, ProgressCallback, ServerConfig, SupabaseClient, SupabaseConfig,
    SupabaseStorage, DEFAULT_BUCKET, MAX_SIGNED_URL_TTL_SECS,
};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

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

/// Progress bar over the planned artifacts, with one log line per artifact.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Downloading PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl ProcessingProgressCallback for CliProgressCallback {
    fn on_processing_start(&self, file_id: Uuid, planned_artifacts: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>2}/{len} images  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_length(planned_artifacts as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Rendering");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{planned_artifacts} images planned for {file_id}"))
        ));
    }

    fn on_artifact_complete(&self, storage_path: &str, bytes: usize) {
        self.bar.println(format!(
            "  {} {:<48} {}",
            green("✓"),
            storage_path,
            dim(&format!("{:>7} bytes", bytes))
        ));
        self.bar.inc(1);
    }

    fn on_artifact_error(&self, label: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {:<16} {}", red("✗"), label, red(&msg)));
        self.bar.inc(1);
    }

    fn on_processing_complete(&self, _file_id: Uuid, succeeded: usize, failed: usize) {
        self.bar.finish_and_clear();
        if failed == 0 {
            eprintln!("{} {} images generated", green("✔"), bold(&succeeded.to_string()));
        } else {
            eprintln!(
                "{} {} images generated  ({} failed)",
                cyan("⚠"),
                bold(&succeeded.to_string()),
                red(&failed.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the API server
  mjk-prints serve --bind 0.0.0.0:8080

  # Reprocess an upload that is stuck in 'processing'
  mjk-prints process 1f0e6c1e-7a43-4c8e-9a55-2f7f3c1b9d10 --force

  # Check a local PDF before uploading it
  mjk-prints inspect poster.pdf --json

ENVIRONMENT VARIABLES:
  SUPABASE_URL               Project URL, e.g. https://abc.supabase.co
  SUPABASE_SERVICE_ROLE_KEY  Service-role key for REST and Storage
  MJK_STORAGE_BUCKET         Bucket name (default: mjk-prints-storage)
  MJK_BIND_ADDR              Listen address for `serve`
  MJK_JPEG_QUALITY           JPEG quality for previews (1-100)
  PDFIUM_LIB_PATH            Path to an existing libpdfium
  RUST_LOG                   Log filter override
"#;

#[derive(Parser, Debug)]
#[command(
    name = "mjk-prints",
    version,
    about = "Print marketplace backend: catalog API and PDF preview pipeline",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "MJK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "MJK_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Generate previews and thumbnails for one uploaded file.
    Process(ProcessArgs),
    /// Print metadata for a local PDF. No Supabase access needed.
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct SupabaseArgs {
    /// Supabase project URL.
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: String,

    /// Supabase service-role key.
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    service_key: String,

    /// Storage bucket for PDFs and generated images.
    #[arg(long, env = "MJK_STORAGE_BUCKET", default_value = DEFAULT_BUCKET)]
    bucket: String,

    /// HTTP timeout for Supabase calls in seconds.
    #[arg(long, env = "MJK_SUPABASE_TIMEOUT", default_value_t = 120)]
    timeout: u64,
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// JPEG quality for generated images (1–100).
    #[arg(long, env = "MJK_JPEG_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Number of leading pages to thumbnail.
    #[arg(long, env = "MJK_MAX_THUMBNAILS", default_value_t = 5)]
    max_thumbnails: usize,

    /// Thumbnail width in pixels.
    #[arg(long, env = "MJK_THUMBNAIL_WIDTH", default_value_t = 200)]
    thumbnail_width: u32,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    supabase: SupabaseArgs,

    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Listen address.
    #[arg(long, env = "MJK_BIND_ADDR", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Largest accepted upload in MiB.
    #[arg(long, env = "MJK_MAX_UPLOAD_MB", default_value_t = 50)]
    max_upload_mb: usize,

    /// Lifetime of signed download URLs in seconds.
    #[arg(
        long,
        env = "MJK_SIGNED_URL_TTL",
        default_value_t = 3600,
        value_parser = clap::value_parser!(u64).range(1..=MAX_SIGNED_URL_TTL_SECS)
    )]
    signed_url_ttl: u64,

    /// Do not start processing automatically after an upload.
    #[arg(long, env = "MJK_NO_AUTO_PROCESS")]
    no_auto_process: bool,
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// `file_uploads.id` to process.
    file_id: Uuid,

    /// Reprocess even if the row is marked `processing`.
    #[arg(long)]
    force: bool,

    /// Print the full result as JSON.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    supabase: SupabaseArgs,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Local PDF path.
    path: PathBuf,

    /// Print metadata as JSON.
    #[arg(long)]
    json: bool,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs for interactive `process` runs.
    let interactive_process = matches!(&cli.command, Command::Process(a) if !a.json);
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || interactive_process {
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
        Command::Serve(args) => serve(args).await,
        Command::Process(args) => process(args, cli.quiet).await,
        Command::Inspect(args) => inspect(args).await,
    }
}

fn supabase_client(args: &SupabaseArgs) -> Result<SupabaseClient> {
    let config = SupabaseConfig::new(&args.supabase_url, &args.service_key)
        .with_bucket(&args.bucket)
        .with_timeout_secs(args.timeout);
    SupabaseClient::new(config).context("Invalid Supabase configuration")
}

fn renderer(lib: Option<&PathBuf>) -> PdfiumRenderer {
    match lib {
        Some(path) => PdfiumRenderer::with_library_path(path),
        None => PdfiumRenderer::new(),
    }
}

/// Map CLI args to `ProcessingConfig`.
fn build_config(
    args: &PipelineArgs,
    force: bool,
    progress: Option<ProgressCallback>,
) -> Result<ProcessingConfig> {
    let mut builder = ProcessingConfig::builder()
        .jpeg_quality(args.jpeg_quality)
        .max_thumbnails(args.max_thumbnails)
        .thumbnail_width(args.thumbnail_width)
        .force(force);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn serve(args: ServeArgs) -> Result<()> {
    let client = supabase_client(&args.supabase)?;
    let db = Arc::new(PostgrestDb::new(client.clone()));
    let renderer = renderer(args.pipeline.pdfium_lib.as_ref());
    renderer
        .check_binding()
        .await
        .context("PDF engine unavailable")?;

    let state = Arc::new(AppState {
        files: db.clone(),
        catalog: db,
        store: Arc::new(SupabaseStorage::new(client)),
        renderer: Arc::new(renderer),
        processing: build_config(&args.pipeline, false, None)?,
        server: ServerConfig {
            max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
            signed_url_ttl_secs: args.signed_url_ttl,
            auto_process: !args.no_auto_process,
        },
    });

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;

    tracing::info!("Listening on {}", args.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn process(args: ProcessArgs, quiet: bool) -> Result<()> {
    let client = supabase_client(&args.supabase)?;
    let db = Arc::new(PostgrestDb::new(client.clone()));

    let show_progress = !quiet && !args.json;
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ProcessingProgressCallback>)
    } else {
        None
    };
    let config = build_config(&args.pipeline, args.force, progress)?;

    let ctx = ProcessContext {
        files: db.clone(),
        store: Arc::new(SupabaseStorage::new(client)),
        renderer: Arc::new(renderer(args.pipeline.pdfium_lib.as_ref())),
        catalog: Some(db),
    };

    let output = process_file(args.file_id, &ctx, &config)
        .await
        .with_context(|| format!("Processing {} failed", args.file_id))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else if !quiet {
        for failure in &output.failures {
            eprintln!("  {} {}", red("✗"), failure);
        }
        eprintln!(
            "{}  {} pages  {}/{} images  {}ms",
            if output.failures.is_empty() { green("✔") } else { cyan("⚠") },
            output.metadata.page_count,
            output.stats.succeeded,
            output.stats.planned_artifacts,
            output.stats.total_duration_ms,
        );
        if let Some(cover) = output.cover_url() {
            eprintln!("   cover: {}", dim(cover));
        }
    }

    Ok(())
}

async fn inspect(args: InspectArgs) -> Result<()> {
    let data = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("Failed to read {}", args.path.display()))?;
    let source = args.path.display().to_string();
    let renderer = renderer(args.pdfium_lib.as_ref());

    let meta = inspect_bytes(&source, data.into(), &renderer)
        .await
        .context("Failed to inspect PDF")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
        );
    } else {
        println!("File:         {}", source);
        if let Some(ref t) = meta.title {
            println!("Title:        {}", t);
        }
        if let Some(ref a) = meta.author {
            println!("Author:       {}", a);
        }
        if let Some(ref s) = meta.subject {
            println!("Subject:      {}", s);
        }
        println!("Pages:        {}", meta.page_count);
        println!("PDF Version:  {}", meta.pdf_version);
        println!(
            "Page size:    {:.0} × {:.0} pt",
            meta.page_width_pts, meta.page_height_pts
        );
        if let Some(ref p) = meta.producer {
            println!("Producer:     {}", p);
        }
        if let Some(ref c) = meta.creator {
            println!("Creator:      {}", c);
        }
    }
    Ok(())
}
