//! End-to-end exercises of the orchestrator against an in-memory `FeatureSource`,
//! standing in for the CLI's `osmium`-backed and fixture-backed implementations.

use std::sync::atomic::AtomicBool;

use geo::{coord, LineString, Point};
use vtile_core::{Bounds, Config, Feature, FeatureSource, Geometry, RunOptions, RunStats, SourceError, Tags};

struct MemorySource {
	label: String,
	bounds: Bounds,
	features: Vec<Feature>,
}

impl FeatureSource for MemorySource {
	fn label(&self) -> String {
		self.label.clone()
	}

	fn bounds(&self) -> Result<Bounds, SourceError> {
		Ok(self.bounds)
	}

	fn features(&self) -> Result<Box<dyn Iterator<Item = Result<Feature, SourceError>> + '_>, SourceError> {
		Ok(Box::new(self.features.clone().into_iter().map(Ok)))
	}
}

fn tags(pairs: &[(&str, &str)]) -> Tags {
	let mut t = Tags::default();
	for (k, v) in pairs {
		t.0.insert(k.to_string(), v.to_string());
	}
	t
}

const POINT_CONFIG: &str = r#"
tilesets:
  - id: overview
    tile_size_meters: 50000
    features:
      - osm_match:
          geometry: [Point]
          tags:
            place: [city, town]
          requires_name: true
        render:
          layer: places
          min_lod: 0
"#;

#[test]
fn builds_a_tile_document_for_a_named_city_point() {
	let config = Config::parse(POINT_CONFIG, std::path::Path::new("<test>")).unwrap();
	let dir = tempfile::tempdir().unwrap();
	let output = dir.path().join("out");

	let feature = Feature::new(Geometry::Point(Point::new(9.99, 53.55)), tags(&[("place", "city"), ("name", "Hamburg")]));
	let source = MemorySource { label: "hamburg".into(), bounds: Bounds::new(9.9, 53.5, 10.1, 53.6), features: vec![feature] };

	let stats = RunStats::new();
	let cancel = AtomicBool::new(false);
	let options = RunOptions { jobs: 1, clip: None, clip_buffer: None, generated_millis: 1_700_000_000_000 };

	vtile_core::run(vec![Box::new(source)], &config, &output, &options, &stats, &cancel).unwrap();

	let snapshot = stats.snapshot();
	assert_eq!(snapshot.features_read, 1);
	assert_eq!(snapshot.sources_failed, 0);
	assert!(snapshot.tiles_finalized >= 1);

	let index_text = std::fs::read_to_string(output.join("index.json")).unwrap();
	let index: serde_json::Value = serde_json::from_str(&index_text).unwrap();
	assert_eq!(index["tile_count"], snapshot.tiles_finalized);
	assert_eq!(index["tilesets"][0]["id"], "overview");

	let tileset_dir = output.join("overview");
	let x_dir = std::fs::read_dir(&tileset_dir).unwrap().next().unwrap().unwrap().path();
	let tile_file = std::fs::read_dir(&x_dir).unwrap().next().unwrap().unwrap().path();
	let tile_text = std::fs::read_to_string(tile_file).unwrap();
	assert!(tile_text.contains("Hamburg"));
	assert!(tile_text.contains("\"_meta\""));
}

const COASTLINE_CONFIG: &str = r#"
tilesets:
  - id: overview
    tile_size_meters: 100000
    features:
      - osm_match:
          geometry: [LineString]
          tags:
            natural: [coastline]
        render:
          layer: water
        simplification:
          disabled: true
"#;

#[test]
fn synthesizes_a_water_polygon_around_an_island_coastline() {
	let config = Config::parse(COASTLINE_CONFIG, std::path::Path::new("<test>")).unwrap();
	let dir = tempfile::tempdir().unwrap();
	let output = dir.path().join("out");

	// A closed, clockwise ring well inside a single tile: coastline.rs treats this as
	// an island and the whole tile becomes water with the island punched out as a hole.
	let island = LineString::new(vec![
		coord! { x: 0.3, y: 0.3 },
		coord! { x: 0.3, y: 0.7 },
		coord! { x: 0.7, y: 0.7 },
		coord! { x: 0.7, y: 0.3 },
		coord! { x: 0.3, y: 0.3 },
	]);
	let feature = Feature::new(Geometry::LineString(island), tags(&[("natural", "coastline")]));
	let source = MemorySource { label: "island".into(), bounds: Bounds::new(0.0, 0.0, 1.0, 1.0), features: vec![feature] };

	let stats = RunStats::new();
	let cancel = AtomicBool::new(false);
	let options = RunOptions { jobs: 1, clip: None, clip_buffer: None, generated_millis: 0 };

	vtile_core::run(vec![Box::new(source)], &config, &output, &options, &stats, &cancel).unwrap();

	let tileset_dir = output.join("overview");
	let x_dir = std::fs::read_dir(&tileset_dir).unwrap().next().unwrap().unwrap().path();
	let tile_file = std::fs::read_dir(&x_dir).unwrap().next().unwrap().unwrap().path();
	let tile_text = std::fs::read_to_string(&tile_file).unwrap();

	assert!(tile_text.contains("\"hasCoastline\":true"));
	let doc: serde_json::Value = serde_json::from_str(&tile_text).unwrap();
	let polygon_feature = doc["features"]
		.as_array()
		.unwrap()
		.iter()
		.find(|f| f["geometry"]["type"] == "Polygon")
		.expect("a synthesized water polygon");
	assert_eq!(polygon_feature["properties"]["natural"], "water");
	// exterior ring plus one hole for the island.
	assert_eq!(polygon_feature["geometry"]["coordinates"].as_array().unwrap().len(), 2);
}

#[test]
fn cancellation_leaves_output_untouched() {
	let config = Config::parse(POINT_CONFIG, std::path::Path::new("<test>")).unwrap();
	let dir = tempfile::tempdir().unwrap();
	let output = dir.path().join("out");

	let feature = Feature::new(Geometry::Point(Point::new(9.99, 53.55)), tags(&[("place", "city"), ("name", "Hamburg")]));
	let source = MemorySource { label: "hamburg".into(), bounds: Bounds::new(9.9, 53.5, 10.1, 53.6), features: vec![feature] };

	let stats = RunStats::new();
	let cancel = AtomicBool::new(true);
	let options = RunOptions { jobs: 1, clip: None, clip_buffer: None, generated_millis: 0 };

	vtile_core::run(vec![Box::new(source)], &config, &output, &options, &stats, &cancel).unwrap();

	assert!(!output.join("index.json").exists());
}
