mod config;

use anyhow::{anyhow, bail, Context, Result};
use barber_capture::{BgrFrame, FrameSlot};
use barber_core::{normalize, StyleEntry};
use barber_session::{Session, SwapOutcome, Upload};
use barber_swap::GradioClient;
use clap::{Parser, Subcommand};
use config::Config;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "barber", about = "Virtual barbershop: try hairstyles on your own face")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List style categories, or one gallery page of a category
    Styles {
        /// Category to page through (e.g., "Modernos")
        #[arg(short, long)]
        category: Option<String>,
        /// Zero-based page index
        #[arg(short, long, default_value_t = 0)]
        page: usize,
    },
    /// Fit an image onto the display canvas
    Normalize {
        input: PathBuf,
        output: PathBuf,
    },
    /// Put your face onto a catalog hairstyle
    Swap {
        /// JPG or PNG photo of your face
        #[arg(long, required_unless_present = "camera_frame", conflicts_with = "camera_frame")]
        photo: Option<PathBuf>,
        /// Raw BGR24 camera frame dump
        #[arg(long, requires_all = ["frame_width", "frame_height"])]
        camera_frame: Option<PathBuf>,
        #[arg(long)]
        frame_width: Option<u32>,
        #[arg(long)]
        frame_height: Option<u32>,
        #[arg(short, long)]
        category: String,
        #[arg(short, long)]
        style: String,
        /// Directory the result is written into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Styles { category, page } => list_styles(&config, category.as_deref(), page)?,
        Commands::Normalize { input, output } => {
            let image = normalize::load_image(&input)?;
            let canvas = config.canvas();
            normalize::normalize(&image, canvas)
                .save(&output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!(
                "{} → {} ({}x{})",
                input.display(),
                output.display(),
                canvas.width,
                canvas.height
            );
        }
        Commands::Swap {
            photo,
            camera_frame,
            frame_width,
            frame_height,
            category,
            style,
            out,
        } => {
            let source = match (photo, camera_frame, frame_width, frame_height) {
                (Some(path), _, _, _) => Source::Photo(path),
                (None, Some(path), Some(width), Some(height)) => Source::Frame {
                    path,
                    width,
                    height,
                },
                _ => bail!("either --photo or --camera-frame with its dimensions is required"),
            };
            run_swap(&config, source, &category, &style, &out).await?;
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn list_styles(config: &Config, category: Option<&str>, page: usize) -> Result<()> {
    let catalog = config.catalog()?;

    let Some(category) = category else {
        for name in catalog.categories() {
            println!(
                "{name} ({} styles, {} pages)",
                catalog.entries(name).len(),
                catalog.total_pages(name, config.page_size)
            );
        }
        return Ok(());
    };

    if catalog.entries(category).is_empty() {
        bail!("unknown category: {category}");
    }
    let rendered = catalog.render_page(category, page, config.page_size, config.canvas());
    println!(
        "{category}: page {}/{}",
        rendered.page_index + 1,
        rendered.total_pages
    );
    for tile in &rendered.tiles {
        println!("  {:<24} {}", tile.entry.display_name, tile.entry.asset_path.display());
    }
    for missing in &rendered.missing {
        println!(
            "  {:<24} MISSING ({})",
            missing.entry.display_name, missing.error
        );
    }
    Ok(())
}

enum Source {
    Photo(PathBuf),
    Frame { path: PathBuf, width: u32, height: u32 },
}

async fn run_swap(
    config: &Config,
    source: Source,
    category: &str,
    style: &str,
    out: &Path,
) -> Result<()> {
    let catalog = config.catalog()?;
    let entry = catalog
        .find(category, style)
        .ok_or_else(|| anyhow!("no style {style:?} in category {category:?}"))?
        .clone();
    let client = GradioClient::new(config.swap_config())?;

    let mut session = Session::new(config.session_options(), config.store());
    let outcome = prepare_and_swap(&mut session, &client, source, &entry).await;
    println!("{}", serde_json::to_string_pretty(&session.snapshot())?);

    let written = match outcome {
        Ok(SwapOutcome::Succeeded) => write_download(&session, out),
        Ok(SwapOutcome::Failed(message)) => Err(anyhow!(message)),
        Ok(SwapOutcome::Skipped(reason)) => Err(anyhow!("swap not started: {reason:?}")),
        Err(err) => Err(err),
    };

    let leaked = session.close();
    if leaked > 0 {
        tracing::warn!(count = leaked, "temp images left behind");
    }
    written
}

async fn prepare_and_swap(
    session: &mut Session,
    client: &GradioClient,
    source: Source,
    entry: &StyleEntry,
) -> Result<SwapOutcome> {
    match source {
        Source::Photo(path) => {
            let upload = Upload::from_path(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            session
                .set_source_from_upload(&upload)
                .map_err(|e| anyhow!(e.user_message()))?;
        }
        Source::Frame { path, width, height } => {
            let data = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let slot = FrameSlot::new();
            slot.publish(BgrFrame::new(data, width, height, 0)?);
            session
                .capture_from(&slot)
                .map_err(|e| anyhow!(e.user_message()))?;
        }
    }
    session
        .select_style(entry)
        .map_err(|e| anyhow!(e.user_message()))?;

    Ok(session.request_swap(client).await)
}

fn write_download(session: &Session, out: &Path) -> Result<()> {
    let artifact = session
        .download()?
        .ok_or_else(|| anyhow!("swap succeeded but produced no result"))?;
    std::fs::create_dir_all(out)
        .with_context(|| format!("failed to create {}", out.display()))?;
    let path = out.join(&artifact.file_name);
    std::fs::write(&path, &artifact.bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("saved {} ({})", path.display(), artifact.mime);
    Ok(())
}
