use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;

#[derive(Args)]
/// Inspect an existing output tree's index manifest.
pub struct Info {
	#[clap(long = "out")]
	output: PathBuf,
}

#[derive(Deserialize)]
struct Manifest {
	bounds: BoundsView,
	tilesets: Vec<TilesetView>,
	tile_count: u64,
	center: CenterView,
	generated: u64,
}

#[derive(Deserialize)]
struct BoundsView {
	#[serde(rename = "minLon")]
	min_lon: f64,
	#[serde(rename = "minLat")]
	min_lat: f64,
	#[serde(rename = "maxLon")]
	max_lon: f64,
	#[serde(rename = "maxLat")]
	max_lat: f64,
}

#[derive(Deserialize)]
struct CenterView {
	lon: f64,
	lat: f64,
}

#[derive(Deserialize)]
struct TilesetView {
	id: String,
	view_range_meters: Option<[f64; 2]>,
}

pub fn run(args: Info) -> Result<ExitCode> {
	let path = args.output.join("index.json");
	let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
	let manifest: Manifest = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;

	println!("Bounds");
	println!("  lon {:.5} .. {:.5}", manifest.bounds.min_lon, manifest.bounds.max_lon);
	println!("  lat {:.5} .. {:.5}", manifest.bounds.min_lat, manifest.bounds.max_lat);
	println!("  center {:.5}, {:.5}", manifest.center.lon, manifest.center.lat);

	println!();
	println!("Tile count: {}", manifest.tile_count);
	println!("Generated: {}", manifest.generated);

	println!();
	println!("Tilesets");
	for tileset in &manifest.tilesets {
		match tileset.view_range_meters {
			Some([min, max]) => println!("  {} (view range {}m .. {}m)", tileset.id, min, max),
			None => println!("  {}", tileset.id),
		}
	}

	Ok(ExitCode::SUCCESS)
}
