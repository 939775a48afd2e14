use std::{
	path::PathBuf,
	process::ExitCode,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{bail, Context, Result};
use clap::Args;
use vtile_core::{Config, FeatureSource, RunOptions, RunStats};

#[derive(Args)]
/// Run the full pipeline over one or more source regions.
pub struct Build {
	/// A `.osm.pbf` extract or a pre-converted NDJSON file (repeatable).
	#[clap(long = "source", required = true)]
	sources: Vec<PathBuf>,
	#[clap(long)]
	config: PathBuf,
	#[clap(long = "out")]
	output: PathBuf,
	#[clap(long, default_value_t = default_jobs())]
	jobs: usize,
	#[clap(long)]
	clip: bool,
	#[clap(long = "no-clip")]
	no_clip: bool,
	#[clap(long = "clip-buffer")]
	clip_buffer: Option<f64>,
}

fn default_jobs() -> usize {
	std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

pub fn run(args: Build) -> Result<ExitCode> {
	if args.clip && args.no_clip {
		bail!("--clip and --no-clip are mutually exclusive");
	}

	let config = Config::load(&args.config).with_context(|| format!("loading config {}", args.config.display()))?;

	let mut sources: Vec<Box<dyn FeatureSource>> = Vec::with_capacity(args.sources.len());
	for path in &args.sources {
		sources.push(crate::source::open(path)?);
	}

	// Cancellation requests stop processing after the in-flight feature rather than
	// hard-killing the process; a second Ctrl-C exits immediately.
	let cancel = Arc::new(AtomicBool::new(false));
	{
		let cancel = cancel.clone();
		ctrlc::set_handler(move || {
			if cancel.swap(true, Ordering::SeqCst) {
				log::warn!("second interrupt received, exiting immediately");
				std::process::exit(130);
			}
			log::info!("interrupt received, finishing the in-flight feature before stopping");
		})
		.context("failed to install Ctrl-C handler")?;
	}

	let stats = RunStats::new();
	let options = RunOptions {
		jobs: args.jobs,
		clip: if args.clip {
			Some(true)
		} else if args.no_clip {
			Some(false)
		} else {
			None
		},
		clip_buffer: args.clip_buffer,
		generated_millis: now_millis(),
	};

	log::info!("building {} tileset(s) from {} source(s) into {}", config.tilesets.len(), sources.len(), args.output.display());

	vtile_core::run(sources, &config, &args.output, &options, &stats, &cancel).context("pipeline run failed")?;

	let snapshot = stats.snapshot();
	log::info!("{}", snapshot);

	if snapshot.sources_failed > 0 { Ok(ExitCode::FAILURE) } else { Ok(ExitCode::SUCCESS) }
}

fn now_millis() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}
