use std::{
	path::{Path, PathBuf},
	sync::atomic::{AtomicBool, Ordering},
};

use rayon::prelude::*;

use crate::{
	bounds::Bounds,
	classify::Classifier,
	config::{ClipConfig, Config, Tileset},
	error::SourceError,
	finalize::finalize_tile_file,
	geometry::{clip_to_tile, grid_snap, simplify_feature},
	importance,
	index::IndexManifest,
	source::FeatureSource,
	stats::RunStats,
	tile::{route, TileGrid},
	writer::StreamingWriter,
};

const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Knobs the CLI collects from the operator and threads through to a run. `clip`/
/// `clip_buffer` override the document-wide `ClipConfig` when set, matching `build`'s
/// `--clip`/`--no-clip`/`--clip-buffer` flags.
pub struct RunOptions {
	pub jobs: usize,
	pub clip: Option<bool>,
	pub clip_buffer: Option<f64>,
	/// Stamped into the index manifest verbatim so the engine stays deterministic
	/// and testable; the CLI supplies the wall-clock value.
	pub generated_millis: u64,
}

impl RunOptions {
	fn effective_clip(&self, config: &Config) -> ClipConfig {
		ClipConfig {
			enabled: self.clip.unwrap_or(config.clip.enabled),
			buffer_fraction: self.clip_buffer.unwrap_or(config.clip.buffer_fraction),
		}
	}
}

fn tile_bounds(tileset: &Tileset, x: i64, y: i64) -> Bounds {
	let tile_height_deg = tileset.tile_size_meters / METERS_PER_DEG_LAT;
	let lat_mid = (y as f64 + 0.5) * tile_height_deg;
	let grid = TileGrid::for_latitude(tileset.tile_size_meters, lat_mid);
	grid.bounds_of(x, y)
}

/// Processes one region single-threadedly: classify, simplify, grid-snap, clip, route
/// and append every resulting feature into the shared intermediate tree. Never buffers
/// more than the features touched by one input feature at a time.
fn process_source(
	source: &dyn FeatureSource, config: &Config, clip: &ClipConfig, temp_root: &Path, stats: &RunStats,
	cancel: &AtomicBool,
) -> Result<(), SourceError> {
	let mut writer = StreamingWriter::new(temp_root);
	let features = source.features()?;

	for result in features {
		if cancel.load(Ordering::Relaxed) {
			break;
		}

		let mut feature = match result {
			Ok(f) => f,
			Err(_) => {
				stats.record_skipped();
				continue;
			},
		};
		stats.record_read();

		let mut matched_any = false;
		for tileset in &config.tilesets {
			let classifier = Classifier::new(tileset);
			let Some(matched) = classifier.classify(&mut feature) else { continue };
			matched_any = true;

			let mut geometry = simplify_feature(&feature.geometry, matched.simplification);
			if config.grid_snap.enabled {
				if let Some(epsilon_m) = matched.simplification.epsilon_m() {
					let cell_size_deg = (epsilon_m / config.grid_snap.divisor) / 111_000.0;
					geometry = grid_snap(&geometry, cell_size_deg);
				}
			}

			let Some(bounds) = geometry.bounds() else {
				continue;
			};

			let mut tileset_feature = feature.clone();
			tileset_feature.geometry = geometry;
			tileset_feature.render = Some(matched.render);

			let importance = importance::score(&tileset_feature.tags, tileset_feature.geometry.kind());
			if importance == 0 {
				continue;
			}

			let mut written = 0u64;
			for tile_id in route(&tileset.id, tileset.tile_size_meters, &bounds) {
				let tb = tile_bounds(tileset, tile_id.x, tile_id.y);
				let tile_geometry = if clip.enabled {
					match clip_to_tile(&tileset_feature.geometry, &tileset_feature.tags, &tb, clip.buffer_fraction) {
						Some(g) => g,
						None => continue,
					}
				} else {
					tileset_feature.geometry.clone()
				};

				let mut out = tileset_feature.clone();
				out.geometry = tile_geometry;
				let json = out.to_compact_json();
				writer.append(&tile_id, importance, &json)?;
				written += 1;
			}
			stats.record_written(written);
		}

		if !matched_any {
			stats.record_skipped();
		}
	}

	Ok(())
}

/// Walks the intermediate tree produced by the streaming phase and finalizes every
/// touched tile as a serial sweep over the union of all intermediate files.
/// Single-threaded by design.
fn finalize_all(temp_root: &Path, output: &Path, config: &Config, stats: &RunStats) -> Vec<PathBuf> {
	let mut finalized = Vec::new();

	for tileset in &config.tilesets {
		let tileset_dir = temp_root.join(&tileset.id);
		let Ok(x_dirs) = std::fs::read_dir(&tileset_dir) else { continue };
		for x_entry in x_dirs.flatten() {
			let Ok(x) = x_entry.file_name().to_string_lossy().parse::<i64>() else { continue };
			let Ok(y_files) = std::fs::read_dir(x_entry.path()) else { continue };
			for y_entry in y_files.flatten() {
				let file_name = y_entry.file_name();
				let file_name = file_name.to_string_lossy();
				let Some(y_str) = file_name.strip_suffix(".jsonl") else { continue };
				let Ok(y) = y_str.parse::<i64>() else { continue };

				let intermediate_path = y_entry.path();
				let relative = PathBuf::from(&tileset.id).join(x.to_string()).join(format!("{y}.json"));
				let prior_path = output.join(&relative);
				let write_path = temp_root.join(&relative);
				let bounds = tile_bounds(tileset, x, y);

				match finalize_tile_file(&intermediate_path, &prior_path, &write_path, &bounds, tileset.coastline_epsilon_m())
				{
					Ok(()) => {
						stats.record_tile_finalized();
						finalized.push(relative);
					},
					Err(e) => {
						log::warn!("tile {:?} could not be finalized: {}", prior_path, e);
					},
				}
			}
		}
	}

	finalized
}

/// Moves every freshly finalized tile file from the temporary tree into `output`,
/// creating parent directories as needed, so each tile is moved atomically into place
/// only once finalization has succeeded. Each rename is individually atomic; tiles
/// untouched by this run are left exactly as they were.
fn publish(temp_root: &Path, output: &Path, finalized: &[PathBuf]) -> std::io::Result<()> {
	for relative in finalized {
		let from = temp_root.join(relative);
		let to = output.join(relative);
		if let Some(parent) = to.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::rename(&from, &to)?;
	}
	Ok(())
}

/// Runs the full two-pass pipeline over every source region: a parallel streaming
/// pass per region, then a serial finalization sweep, then publication into `output`
/// and an index manifest.
///
/// Returns `Ok(())` even when individual sources or tiles failed (those are recorded
/// in `stats`); the caller inspects `stats.sources_failed` to decide the process exit
/// code.
pub fn run(
	sources: Vec<Box<dyn FeatureSource>>, config: &Config, output: &Path, options: &RunOptions, stats: &RunStats,
	cancel: &AtomicBool,
) -> std::io::Result<()> {
	let clip = options.effective_clip(config);

	// Bounds are required up front; the engine fails the source if unavailable.
	// Regions are ordered largest-first so the long tail of small regions stays
	// available as backfill work.
	let mut regions: Vec<(Box<dyn FeatureSource>, Bounds)> = Vec::new();
	for source in sources {
		match source.bounds() {
			Ok(b) => regions.push((source, b)),
			Err(e) => {
				log::warn!("source {} failed: {}", source.label(), e);
				stats.record_source_failed();
			},
		}
	}
	regions.sort_by(|a, b| area(&b.1).partial_cmp(&area(&a.1)).unwrap());

	let merged_bounds = regions.iter().map(|(_, b)| *b).reduce(|a, b| a.union(&b));

	let temp_root = temp_dir_for(output);
	if temp_root.exists() {
		std::fs::remove_dir_all(&temp_root)?;
	}
	std::fs::create_dir_all(&temp_root)?;

	let pool = rayon::ThreadPoolBuilder::new().num_threads(options.jobs.max(1)).build().map_err(|e| {
		std::io::Error::new(std::io::ErrorKind::Other, e)
	})?;

	pool.install(|| {
		regions.par_iter().for_each(|(source, _)| {
			if let Err(e) = process_source(source.as_ref(), config, &clip, &temp_root, stats, cancel) {
				log::warn!("source {} failed during streaming: {}", source.label(), e);
				stats.record_source_failed();
			}
		});
	});

	if cancel.load(Ordering::Relaxed) {
		// Cancellation aborts before publication: the temporary tree is left for the
		// next run to supersede or clean up, and `output` is untouched.
		return Ok(());
	}

	let finalized = finalize_all(&temp_root, output, config, stats);
	publish(&temp_root, output, &finalized)?;
	std::fs::remove_dir_all(&temp_root).ok();

	if let Some(bounds) = merged_bounds {
		let manifest = IndexManifest::new(bounds, config, stats.tiles_finalized.load(Ordering::Relaxed), options.generated_millis);
		manifest.write(&output.join("index.json"))?;
	}

	Ok(())
}

fn area(b: &Bounds) -> f64 {
	(b.max_lon - b.min_lon).abs() * (b.max_lat - b.min_lat).abs()
}

fn temp_dir_for(output: &Path) -> PathBuf {
	let name = output.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "out".to_string());
	output.with_file_name(format!(".{name}.vtile-tmp"))
}
