use std::{fs, path::Path};

use serde::Serialize;

use crate::{bounds::Bounds, config::Config};

#[derive(Serialize)]
struct CenterPoint {
	lon: f64,
	lat: f64,
}

#[derive(Serialize)]
struct TilesetSummary {
	id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	view_range_meters: Option<[f64; 2]>,
}

/// The run manifest written to `out/index.json`.
#[derive(Serialize)]
pub struct IndexManifest {
	bounds: Bounds,
	tilesets: Vec<TilesetSummary>,
	tile_count: u64,
	center: CenterPoint,
	generated: u64,
}

impl IndexManifest {
	/// `generated` is passed in by the caller rather than read from the system clock
	/// here, so the manifest builder stays deterministic and testable.
	pub fn new(bounds: Bounds, config: &Config, tile_count: u64, generated_millis: u64) -> IndexManifest {
		let (lon, lat) = bounds.center();
		IndexManifest {
			bounds,
			tilesets: config
				.tilesets
				.iter()
				.map(|t| TilesetSummary { id: t.id.clone(), view_range_meters: t.view_range_meters })
				.collect(),
			tile_count,
			center: CenterPoint { lon, lat },
			generated: generated_millis,
		}
	}

	pub fn write(&self, path: &Path) -> std::io::Result<()> {
		let json = serde_json::to_string(self).expect("IndexManifest always serializes");
		fs::write(path, json)
	}
}

#[cfg(test)]
mod test {
	use std::path::Path;

	use super::*;

	#[test]
	fn serializes_expected_top_level_fields() {
		let config = Config::parse(
			"tilesets:\n  - id: overview\n    tile_size_meters: 1000\n    features:\n      - osm_match: {geometry: [Point]}\n        render: {layer: x}\n",
			Path::new("<test>"),
		)
		.unwrap();
		let manifest = IndexManifest::new(Bounds::new(0.0, 0.0, 2.0, 2.0), &config, 4, 123);
		let json = serde_json::to_value(&manifest).unwrap();
		assert_eq!(json["tile_count"], 4);
		assert_eq!(json["center"]["lon"], 1.0);
		assert_eq!(json["tilesets"][0]["id"], "overview");
	}
}
