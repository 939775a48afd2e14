use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::Args;
use vtile_core::Config;

#[derive(Args)]
/// Load and validate a tileset document without touching the filesystem otherwise.
pub struct CheckConfig {
	#[clap(long)]
	config: PathBuf,
}

pub fn run(args: CheckConfig) -> Result<ExitCode> {
	match Config::load(&args.config) {
		Ok(config) => {
			println!("{} is valid ({} tileset(s))", args.config.display(), config.tilesets.len());
			for tileset in &config.tilesets {
				println!(
					"  {} (tile_size_meters {}, {} feature definition(s))",
					tileset.id,
					tileset.tile_size_meters,
					tileset.features.len()
				);
			}
			Ok(ExitCode::SUCCESS)
		},
		Err(err) => {
			eprintln!("{}", err);
			Ok(ExitCode::FAILURE)
		},
	}
}
