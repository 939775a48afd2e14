use std::{collections::HashMap, fs, path::Path};

use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::{error::ConfigError, feature::GeometryKind};

/// A set of allowed string values, pre-interned at config load so per-feature tag
/// checks are hash-set lookups rather than re-reading the declarative document.
#[derive(Clone, Debug, Default)]
pub struct ValueSet {
	values: FxHashSet<String>,
	wildcard: bool,
}

impl ValueSet {
	fn from_raw(raw: &[String]) -> Self {
		let mut values = FxHashSet::default();
		let mut wildcard = false;
		for v in raw {
			if v == "*" {
				wildcard = true;
			} else {
				values.insert(v.clone());
			}
		}
		ValueSet { values, wildcard }
	}

	pub fn matches(&self, value: &str) -> bool {
		self.wildcard || self.values.contains(value)
	}
}

#[derive(Clone, Debug, Deserialize)]
struct RawOsmMatch {
	#[serde(default)]
	geometry: Vec<String>,
	#[serde(default)]
	tags: HashMap<String, Vec<String>>,
	#[serde(default)]
	match_all: bool,
	#[serde(default)]
	tags_exclude: HashMap<String, Vec<String>>,
	min_area_km2: Option<f64>,
	max_area_km2: Option<f64>,
	population_min: Option<i64>,
	population_max: Option<i64>,
	#[serde(default)]
	requires_name: bool,
}

/// The match predicate for a single feature definition.
#[derive(Clone, Debug)]
pub struct OsmMatch {
	pub geometry: Vec<GeometryKind>,
	pub tags: HashMap<String, ValueSet>,
	pub match_all: bool,
	pub tags_exclude: HashMap<String, ValueSet>,
	pub min_area_km2: Option<f64>,
	pub max_area_km2: Option<f64>,
	pub population_min: Option<i64>,
	pub population_max: Option<i64>,
	pub requires_name: bool,
}

fn parse_geometry_kind(s: &str) -> Option<GeometryKind> {
	match s {
		"Point" => Some(GeometryKind::Point),
		"LineString" => Some(GeometryKind::LineString),
		"Polygon" => Some(GeometryKind::Polygon),
		"MultiLineString" => Some(GeometryKind::MultiLineString),
		"MultiPolygon" => Some(GeometryKind::MultiPolygon),
		_ => None,
	}
}

impl From<RawOsmMatch> for OsmMatch {
	fn from(raw: RawOsmMatch) -> Self {
		OsmMatch {
			geometry: raw.geometry.iter().filter_map(|s| parse_geometry_kind(s)).collect(),
			tags: raw.tags.into_iter().map(|(k, v)| (k, ValueSet::from_raw(&v))).collect(),
			match_all: raw.match_all,
			tags_exclude: raw.tags_exclude.into_iter().map(|(k, v)| (k, ValueSet::from_raw(&v))).collect(),
			min_area_km2: raw.min_area_km2,
			max_area_km2: raw.max_area_km2,
			population_min: raw.population_min,
			population_max: raw.population_max,
			requires_name: raw.requires_name,
		}
	}
}

/// `{ epsilon_m: number }` or `{ disabled: true }`.
#[derive(Clone, Copy, Debug)]
pub enum Simplification {
	Epsilon(f64),
	Disabled,
}

impl Simplification {
	pub fn epsilon_m(&self) -> Option<f64> {
		match self {
			Simplification::Epsilon(e) => Some(*e),
			Simplification::Disabled => None,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
struct RawSimplification {
	epsilon_m: Option<f64>,
	#[serde(default)]
	disabled: bool,
}

#[derive(Clone, Debug, Deserialize)]
struct RawRender {
	layer: String,
	#[serde(default = "default_color")]
	color: [u8; 4],
	#[serde(default)]
	min_lod: u8,
	#[serde(default)]
	fill: bool,
}

fn default_color() -> [u8; 4] {
	[128, 128, 128, 255]
}

/// Static render attributes attached to every feature matching this definition;
/// per-feature values (like `name`) are filled in at classification time.
#[derive(Clone, Debug)]
pub struct RenderSpec {
	pub layer: String,
	pub color: [u8; 4],
	pub min_lod: u8,
	pub fill: bool,
}

#[derive(Clone, Debug, Deserialize)]
struct RawFeatureDefinition {
	osm_match: RawOsmMatch,
	render: RawRender,
	simplification: Option<RawSimplification>,
}

/// One rule within a tileset: match predicate, simplification spec and render
/// attributes. First match wins within a tileset.
#[derive(Clone, Debug)]
pub struct FeatureDefinition {
	pub osm_match: OsmMatch,
	pub render: RenderSpec,
	pub simplification: Simplification,
}

#[derive(Clone, Debug, Deserialize)]
struct RawTileset {
	id: String,
	tile_size_meters: f64,
	features: Vec<RawFeatureDefinition>,
	view_range_meters: Option<[f64; 2]>,
}

/// A named collection of tiles sharing a tile size and feature-selection rules.
/// Process-wide, read-only after config load.
#[derive(Clone, Debug)]
pub struct Tileset {
	pub id: String,
	pub tile_size_meters: f64,
	pub features: Vec<FeatureDefinition>,
	pub view_range_meters: Option<[f64; 2]>,
}

impl Tileset {
	/// The simplification epsilon this tileset applies to synthesized ocean polygons:
	/// the epsilon of whichever feature definition matches `natural=coastline`, or
	/// `None` if no such definition exists or it disables simplification.
	pub fn coastline_epsilon_m(&self) -> Option<f64> {
		self.features
			.iter()
			.find(|f| f.osm_match.tags.get("natural").map(|v| v.matches("coastline")).unwrap_or(false))
			.and_then(|f| f.simplification.epsilon_m())
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawClipConfig {
	#[serde(default)]
	enabled: bool,
	buffer_fraction: Option<f64>,
}

#[derive(Copy, Clone, Debug)]
pub struct ClipConfig {
	pub enabled: bool,
	pub buffer_fraction: f64,
}

impl Default for ClipConfig {
	fn default() -> Self {
		ClipConfig { enabled: false, buffer_fraction: 0.02 }
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawGridSnapConfig {
	#[serde(default)]
	enabled: bool,
	divisor: Option<f64>,
}

#[derive(Copy, Clone, Debug)]
pub struct GridSnapConfig {
	pub enabled: bool,
	pub divisor: f64,
}

impl Default for GridSnapConfig {
	fn default() -> Self {
		GridSnapConfig { enabled: false, divisor: 4.0 }
	}
}

#[derive(Clone, Debug, Deserialize)]
struct RawConfig {
	tilesets: Vec<RawTileset>,
	#[serde(default)]
	clip: RawClipConfig,
	#[serde(default)]
	grid_snap: RawGridSnapConfig,
}

/// The fully parsed tileset configuration document.
#[derive(Clone, Debug)]
pub struct Config {
	pub tilesets: Vec<Tileset>,
	pub clip: ClipConfig,
	pub grid_snap: GridSnapConfig,
}

impl Config {
	pub fn load(path: &Path) -> Result<Config, ConfigError> {
		let text = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
		Self::parse(&text, path)
	}

	pub fn parse(text: &str, source_path: &Path) -> Result<Config, ConfigError> {
		let raw: RawConfig =
			serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(source_path.to_path_buf(), e))?;
		Self::validate_and_build(raw)
	}

	fn validate_and_build(raw: RawConfig) -> Result<Config, ConfigError> {
		let mut seen_ids = FxHashSet::default();
		let mut tilesets = Vec::with_capacity(raw.tilesets.len());

		for raw_ts in raw.tilesets {
			if !seen_ids.insert(raw_ts.id.clone()) {
				return Err(ConfigError::DuplicateTileset(raw_ts.id));
			}
			if raw_ts.tile_size_meters <= 0.0 {
				return Err(ConfigError::InvalidTileSize(raw_ts.id, raw_ts.tile_size_meters));
			}
			if raw_ts.features.is_empty() {
				return Err(ConfigError::EmptyTileset(raw_ts.id));
			}

			let mut features = Vec::with_capacity(raw_ts.features.len());
			for (index, raw_fd) in raw_ts.features.into_iter().enumerate() {
				let simplification = match raw_fd.simplification {
					Some(RawSimplification { disabled: true, .. }) => Simplification::Disabled,
					Some(RawSimplification { epsilon_m: Some(e), .. }) => {
						if e < 0.0 {
							return Err(ConfigError::NegativeEpsilon { tileset: raw_ts.id.clone(), index, epsilon: e });
						}
						Simplification::Epsilon(e)
					},
					_ => Simplification::Disabled,
				};

				features.push(FeatureDefinition {
					osm_match: raw_fd.osm_match.into(),
					render: RenderSpec {
						layer: raw_fd.render.layer,
						color: raw_fd.render.color,
						min_lod: raw_fd.render.min_lod,
						fill: raw_fd.render.fill,
					},
					simplification,
				});
			}

			tilesets.push(Tileset {
				id: raw_ts.id,
				tile_size_meters: raw_ts.tile_size_meters,
				features,
				view_range_meters: raw_ts.view_range_meters,
			});
		}

		Ok(Config {
			tilesets,
			clip: ClipConfig { enabled: raw.clip.enabled, buffer_fraction: raw.clip.buffer_fraction.unwrap_or(0.02) },
			grid_snap: GridSnapConfig {
				enabled: raw.grid_snap.enabled,
				divisor: raw.grid_snap.divisor.unwrap_or(4.0),
			},
		})
	}
}

#[cfg(test)]
mod test {
	use super::*;

	const SAMPLE: &str = r#"
tilesets:
  - id: overview
    tile_size_meters: 50000
    features:
      - osm_match:
          geometry: [Point]
          tags:
            place: [city, town]
        render:
          layer: points
          min_lod: 0
"#;

	#[test]
	fn loads_a_minimal_config() {
		let config = Config::parse(SAMPLE, Path::new("<test>")).unwrap();
		assert_eq!(config.tilesets.len(), 1);
		assert_eq!(config.tilesets[0].id, "overview");
		assert_eq!(config.tilesets[0].features.len(), 1);
	}

	#[test]
	fn rejects_duplicate_tileset_ids() {
		let text = format!("{SAMPLE}\n{}", SAMPLE.replacen("tilesets:\n", "", 1));
		let err = Config::parse(&text, Path::new("<test>"));
		assert!(err.is_err());
	}

	#[test]
	fn rejects_non_positive_tile_size() {
		let text = SAMPLE.replace("50000", "0");
		let err = Config::parse(&text, Path::new("<test>"));
		assert!(matches!(err, Err(ConfigError::InvalidTileSize(_, _))));
	}

	#[test]
	fn wildcard_value_set_matches_anything() {
		let vs = ValueSet::from_raw(&["*".to_string()]);
		assert!(vs.matches("anything"));
	}

	#[test]
	fn coastline_epsilon_is_read_from_the_matching_definition() {
		let text = r#"
tilesets:
  - id: overview
    tile_size_meters: 50000
    features:
      - osm_match:
          geometry: [LineString]
          tags:
            natural: [coastline]
        render:
          layer: water
        simplification:
          epsilon_m: 15
"#;
		let config = Config::parse(text, Path::new("<test>")).unwrap();
		assert_eq!(config.tilesets[0].coastline_epsilon_m(), Some(15.0));
	}
}
