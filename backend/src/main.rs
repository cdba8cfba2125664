//! Tagsheet CLI - Normalize inventory spreadsheets
//!
//! # Main Commands
//!
//! ```bash
//! tagsheet serve                      # Start HTTP server (port 3000)
//! tagsheet transform register.xlsx   # Normalize a workbook to .xlsx
//! tagsheet categories                 # List registered sheet names
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! tagsheet expand "HQ/LT/010-013"     # Show what a tag expands to
//! ```

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tagsheet::delivery::snapshot;
use tagsheet::{
    expand_tag, render_xlsx, CategoryRegistry, JobContext, JsonSnapshot, OutboxDelivery,
    Orchestrator, Settings,
};

#[derive(Parser)]
#[command(name = "tagsheet")]
#[command(about = "Normalize inventory spreadsheets into canonical tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: .xlsx → canonical workbook
    Transform {
        /// Input .xlsx file
        input: PathBuf,

        /// Output workbook (default: <input>-normalized.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the canonical rows as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Send the result to this address through the outbox
        #[arg(long)]
        notify: Option<String>,

        /// Outbox directory (default: TAGSHEET_OUTBOX_DIR or ./outbox)
        #[arg(long)]
        outbox: Option<PathBuf>,

        /// Store canonical rows under this directory
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,
    },

    /// Show what a single tag cell expands to
    Expand {
        /// Tag cell value, e.g. "HQ/LT/010-013"
        tag: String,
    },

    /// List registered sheet names and their categories
    Categories,

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: TAGSHEET_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let settings = Settings::from_env();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Transform {
            input,
            output,
            json,
            notify,
            outbox,
            snapshot_dir,
        } => cmd_transform(
            &settings,
            &input,
            output.as_deref(),
            json.as_deref(),
            notify,
            outbox,
            snapshot_dir,
        ),

        Commands::Expand { tag } => cmd_expand(&tag),

        Commands::Categories => cmd_categories(),

        Commands::Serve { port } => cmd_serve(settings, port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_transform(
    settings: &Settings,
    input: &Path,
    output: Option<&Path>,
    json: Option<&Path>,
    notify: Option<String>,
    outbox: Option<PathBuf>,
    snapshot_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let document = input
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "register.xlsx".to_string());
    let job = JobContext::new(document, notify.clone());

    let mut orchestrator = Orchestrator::new(CategoryRegistry::builtin());
    if notify.is_some() {
        let dir = outbox.unwrap_or_else(|| settings.outbox_dir.clone());
        orchestrator = orchestrator.with_delivery(OutboxDelivery::new(dir));
    }
    if let Some(dir) = snapshot_dir.or_else(|| settings.snapshot_dir.clone()) {
        orchestrator = orchestrator.with_persistence(JsonSnapshot::new(dir));
    }

    let report = orchestrator.transform_file(input, &job)?;

    eprintln!("\n⚙️  Output sheets:");
    for sheet in &report.sheets {
        eprintln!("   {:<30} {:>6} rows", sheet.name, sheet.rows);
    }
    for name in &report.skipped {
        eprintln!("   ⚠️  Skipped input sheet: {}", name);
    }

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output(input));
    fs::write(&output, render_xlsx(&report.workbook)?)?;
    eprintln!("\n💾 Workbook written to: {}", output.display());

    if let Some(path) = json {
        let value = snapshot(&job, &report.workbook);
        fs::write(path, serde_json::to_string_pretty(&value)?)?;
        eprintln!("💾 JSON written to: {}", path.display());
    }

    eprintln!("\n✨ Done in {} ms", report.elapsed_ms);
    Ok(())
}

/// `<dir>/<stem>-normalized.xlsx` next to the input.
fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "register".to_string());
    input.with_file_name(format!("{}-normalized.xlsx", stem))
}

fn cmd_expand(tag: &str) -> Result<(), Box<dyn std::error::Error>> {
    match expand_tag(tag)? {
        Some(tags) => {
            eprintln!("🏷️  {} → {} tag(s)", tag, tags.len());
            for t in tags {
                println!("{}", t);
            }
        }
        None => {
            eprintln!("🏷️  {} is not range-encoded", tag);
            println!("{}", tag);
        }
    }
    Ok(())
}

fn cmd_categories() -> Result<(), Box<dyn std::error::Error>> {
    let entries = CategoryRegistry::builtin().entries();
    eprintln!("📋 Registered sheet names ({}):\n", entries.len());
    for (sheet, category) in entries {
        println!("  {:<20} → {}", sheet, category);
    }
    Ok(())
}

async fn cmd_serve(mut settings: Settings, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port {
        settings.port = port;
    }
    tagsheet::api::start_server(settings).await
}
