use anyhow::{bail, Context};
use clap::Parser;
use log::warn;
use generator::profile::{build_source, GeneratorConfig, SYNTHETIC_DATASET};
use gui_bridge::bridge::{bridge_bind_address, SnapshotBridge};
use roostcore::navigation::NavPosition;
use roostcore::DataSource;
use source::FsSource;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::ReviewConfig;
use workflow::runner::{ConsoleGuard, Runner};

mod generator;
mod gui_bridge;
mod source;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Terminal reviewer for radar roost tracks")]
struct Args {
    /// Load reviewer settings from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding `<dataset>/config.json` and `<dataset>/batches.txt`
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    dataset: Option<String>,
    #[arg(long)]
    batch: Option<String>,
    /// Zero-based day index to resume at
    #[arg(long, default_value_t = 0)]
    day: usize,
    /// Zero-based frame index to resume at
    #[arg(long, default_value_t = 0)]
    frame: usize,
    /// Read commands from a file instead of stdin
    #[arg(long)]
    script: Option<PathBuf>,
    /// Write the export CSV here once input is exhausted
    #[arg(long)]
    export: Option<PathBuf>,
    /// Review a seeded synthetic batch instead of the data directory
    #[arg(long, default_value_t = false)]
    synthetic: bool,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Publish the session snapshot over HTTP until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
    /// Discard unexported labels without asking
    #[arg(long, default_value_t = false)]
    yes: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = &args.config {
        ReviewConfig::load(path)?
    } else {
        ReviewConfig::default()
    };
    if let Some(data_dir) = args.data_dir.clone() {
        config.data_dir = data_dir;
    }

    let (source, default_dataset): (Box<dyn DataSource>, Option<String>) = if args.synthetic {
        let generator = GeneratorConfig {
            seed: args.seed,
            ..GeneratorConfig::default()
        };
        let source: Box<dyn DataSource> =
            Box::new(build_source(&generator).context("generating synthetic batch")?);
        (source, Some(SYNTHETIC_DATASET.to_string()))
    } else {
        let source: Box<dyn DataSource> = Box::new(FsSource::new(config.data_dir.clone()));
        (source, config.default_dataset().map(str::to_string))
    };
    let Some(dataset) = args.dataset.clone().or(default_dataset) else {
        bail!("no dataset given: pass --dataset or list datasets in the config");
    };
    let position = NavPosition {
        dataset,
        batch: args.batch.clone().unwrap_or_default(),
        day: args.day,
        frame: args.frame,
    };

    let bridge = SnapshotBridge::new();
    let mut runner = Runner::new(config, source, Box::new(ConsoleGuard::new(args.yes)))
        .with_bridge(bridge.clone());
    if args.serve {
        bridge.serve(bridge_bind_address());
    }

    println!("{}", runner.open(&position)?);

    let input: Box<dyn BufRead> = match &args.script {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening script {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };
    runner.run(input, io::stdout().lock())?;

    if let Some(path) = args.export {
        println!("{}", runner.export(Some(path))?);
    }
    if runner.session().is_dirty() {
        warn!("exiting with labels that were not exported");
    }

    if args.serve {
        bridge.publish_status("snapshot bridge running (Ctrl+C to stop)...");
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
