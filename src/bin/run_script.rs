use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use terragen::{Generator, GeneratorConfig, SEA_LEVEL};

#[derive(Parser, Debug)]
#[command(
    name = "run_script",
    version,
    about = "Run an agent script on a height grid and print height statistics"
)]
struct Cli {
    /// Agent script to run.
    script: PathBuf,

    /// JSON generator configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grid side length, overrides the configuration.
    #[arg(long)]
    size: Option<usize>,

    /// Scheduler seed, overrides the configuration.
    #[arg(long)]
    seed: Option<u64>,

    /// Start from smooth noise relief with this seed instead of a flat grid.
    #[arg(long)]
    relief: Option<u32>,

    /// Write the normalized script back to this path.
    #[arg(long)]
    save: Option<PathBuf>,

    /// Stop after this many ticks instead of running to completion.
    #[arg(long)]
    ticks: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };
    if let Some(size) = cli.size {
        config.size = size;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(relief) = cli.relief {
        config = config.with_relief(relief);
    }

    let mut generator = Generator::from_config(&config)?;
    generator
        .load(&cli.script)
        .with_context(|| format!("loading {}", cli.script.display()))?;
    info!(
        "{} phases on a {}x{} grid, seed {}",
        generator.phases_count(),
        config.size,
        config.size,
        config.seed
    );

    match cli.ticks {
        Some(n) => {
            let finished = generator.run_ticks(n);
            info!(
                "ran {} ticks, finished: {}, {} agents alive",
                generator.tick_count(),
                finished,
                generator.live_agent_count()
            );
        }
        None => generator.run_all(),
    }

    let heights = generator.height_map().heights();
    let min = heights.iter().copied().fold(f32::INFINITY, f32::min);
    let max = heights.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let avg = heights.iter().sum::<f32>() / heights.len() as f32;
    let land = heights.iter().filter(|&&h| h >= SEA_LEVEL).count();
    let sea = heights.len() - land;

    println!("Height stats after {} ticks:", generator.tick_count());
    println!("  Min: {:.1}", min);
    println!("  Max: {:.1}", max);
    println!("  Avg: {:.1}", avg);
    println!(
        "  Land cells (h>={}): {} ({:.1}%)",
        SEA_LEVEL,
        land,
        land as f32 * 100.0 / heights.len() as f32
    );
    println!(
        "  Sea cells (h<{}): {} ({:.1}%)",
        SEA_LEVEL,
        sea,
        sea as f32 * 100.0 / heights.len() as f32
    );

    if let Some(path) = &cli.save {
        generator.save(path)?;
    }

    Ok(())
}
