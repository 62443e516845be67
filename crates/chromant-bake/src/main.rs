//! chromant-bake: pre-generate gamut tables into a cache directory.
//!
//! ```text
//! chromant-bake list
//! chromant-bake bake --cache-dir ~/.cache/chromant --space sRGB --space Rec2020
//! chromant-bake bake --cache-dir ./tables --all --model CAM16 --force
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use chromant_core::gamut::cache;
use chromant_core::{ColorRegistry, GamutConfig, GamutStore, LocusDataset, PerceptualModel};

#[derive(Parser)]
#[command(name = "chromant-bake")]
#[command(author, version, about = "Pre-generate gamut tables")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List color spaces, illuminants and perceptual models
    List,
    /// Generate and persist gamut tables
    Bake(BakeArgs),
}

#[derive(Args)]
struct BakeArgs {
    /// Output directory for .sgt files
    #[arg(long)]
    cache_dir: PathBuf,

    /// Perceptual model (Lab, CAM16); repeatable, default all
    #[arg(short, long = "model")]
    models: Vec<String>,

    /// Color space key; repeatable
    #[arg(short, long = "space")]
    spaces: Vec<String>,

    /// Bake every listed color space
    #[arg(long, conflicts_with = "spaces")]
    all: bool,

    /// JSON gamut config (resolutions, search step)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON locus dataset ({"points": [[x, y, z], ...], "blacklist": [...]})
    #[arg(long)]
    locus: Option<PathBuf>,

    /// Regenerate even if a cache file exists
    #[arg(long)]
    force: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let registry = Arc::new(ColorRegistry::builtin());

    match cli.command {
        Commands::List => {
            list(&registry);
            Ok(())
        }
        Commands::Bake(args) => bake(registry, args),
    }
}

fn list(registry: &ColorRegistry) {
    println!("Color spaces:");
    for cs in registry.color_spaces().iter().filter(|cs| !cs.hidden) {
        println!("  {:<12} {} ({})", cs.key, cs.name, cs.illuminant);
    }
    println!("Illuminants:");
    for name in registry.illuminant_names() {
        let xyz = registry.illuminant_xyz(name).unwrap_or_default();
        println!("  {:<4} {:.5} {:.5} {:.5}", name, xyz.x, xyz.y, xyz.z);
    }
    println!("Models:");
    for model in PerceptualModel::ALL {
        println!("  {model}");
    }
}

fn bake(registry: Arc<ColorRegistry>, args: BakeArgs) -> Result<()> {
    let models = if args.models.is_empty() {
        PerceptualModel::ALL.to_vec()
    } else {
        args.models
            .iter()
            .map(|name| PerceptualModel::from_name(name))
            .collect::<Result<Vec<_>, _>>()?
    };

    let spaces: Vec<String> = if args.all {
        registry
            .color_spaces()
            .iter()
            .filter(|cs| !cs.hidden)
            .map(|cs| cs.key.clone())
            .collect()
    } else {
        args.spaces.clone()
    };
    if spaces.is_empty() {
        bail!("no color spaces given; pass --space <KEY> or --all");
    }
    for key in &spaces {
        registry.color_space(key)?;
    }

    let config = match &args.config {
        Some(path) => GamutConfig::from_json_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => GamutConfig::default(),
    }
    .with_cache_dir(&args.cache_dir);

    let locus = match &args.locus {
        Some(path) => LocusDataset::from_json_file(path)
            .with_context(|| format!("Failed to read locus dataset {}", path.display()))?,
        None => LocusDataset::empty(),
    };

    std::fs::create_dir_all(&args.cache_dir)
        .with_context(|| format!("Failed to create {}", args.cache_dir.display()))?;

    if args.force {
        for &model in &models {
            for key in &spaces {
                let path = cache::cache_path(&args.cache_dir, model, key);
                if path.exists() {
                    std::fs::remove_file(&path)
                        .with_context(|| format!("Failed to remove {}", path.display()))?;
                }
            }
        }
    }

    let store = GamutStore::with_locus(registry, config, locus);
    let total = Instant::now();
    for &model in &models {
        for key in &spaces {
            let start = Instant::now();
            let table = store.table(model, key);
            let path = cache::cache_path(&args.cache_dir, model, key);
            if table.is_empty() || !path.exists() {
                bail!("{model}_{key}: table was not written to {}", path.display());
            }
            let (j, s, h) = table.resolution();
            println!(
                "{:<24} {j}x{s}x{h}  {:>8.2}s  {}",
                table.key(),
                start.elapsed().as_secs_f64(),
                path.display()
            );
        }
    }
    info!(
        tables = models.len() * spaces.len(),
        elapsed_s = total.elapsed().as_secs_f64(),
        "bake finished"
    );
    Ok(())
}
