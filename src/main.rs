use clap::Parser;
use dotenvy::dotenv;
use file_intake::{AcceptPolicy, FileHandle, IntakeConfig, IntakeHandle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Stage files through the intake controller and report the result
#[derive(Parser, Debug)]
#[command(name = "file-intake", version)]
struct Args {
    /// Files to stage, submitted as one batch
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Maximum number of staged files
    #[arg(long)]
    max_files: Option<usize>,

    /// Maximum size per file in megabytes
    #[arg(long)]
    max_size_mb: Option<u64>,

    /// Accepted types, e.g. "image/*,.pdf"
    #[arg(long)]
    accept: Option<String>,

    /// Delay between progress ticks in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Shrink image previews to this many pixels per edge
    #[arg(long)]
    thumbnail: Option<u32>,

    /// Print the final state as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "file_intake=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = IntakeConfig::from_env();
    if let Some(max_files) = args.max_files {
        config = config.with_max_files(max_files);
    }
    if let Some(mb) = args.max_size_mb {
        config = config.with_max_size_mb(mb);
    }
    if let Some(accept) = &args.accept {
        config = config.with_accept(AcceptPolicy::parse(accept)?);
    }
    if let Some(ms) = args.interval_ms {
        config.progress_interval = Duration::from_millis(ms);
    }
    if args.thumbnail.is_some() {
        config.preview_max_dimension = args.thumbnail;
    }

    let intake = IntakeHandle::builder(config)
        .on_files_added(|files| {
            let names: Vec<&str> = files.iter().map(|f| f.name()).collect();
            info!("Files added: {}", names.join(", "));
        })
        .spawn()?;

    let mut candidates = Vec::with_capacity(args.files.len());
    for path in &args.files {
        match FileHandle::from_path(path).await {
            Ok(file) => candidates.push(file),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    let report = intake.pick_files(candidates).await?;
    if report.admitted.is_empty() {
        info!("No files were staged");
        intake.shutdown();
        return Ok(());
    }

    intake.wait_until_complete().await?;
    let view = intake.view().await?;
    intake.shutdown();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("{}", view.counter);
    for entry in &view.entries {
        println!(
            "  {:<36} {:>10}  {:<6} {:>3}%  {}{}",
            entry.name,
            entry.size_label,
            entry.kind_label,
            entry.progress,
            entry.status_label,
            if entry.preview.is_some() { "  [preview]" } else { "" }
        );
    }
    for rejection in &report.rejections {
        println!("  {:<36} rejected ({})", rejection.file_name, rejection.reason.code());
    }

    Ok(())
}
