use std::{fs, path::Path};

use geo::{coord, LineString, Rect};
use geojson::JsonObject;
use serde_json::Value;

use crate::{
	bounds::Bounds,
	coastline::synthesize_ocean_polygons,
	error::FinalizeError,
	feature::{Feature, Geometry, RenderBlock, Tags},
	geometry::simplify_feature,
};

const LAND_KEYS: &[&str] = &["building", "highway", "railway", "landuse", "leisure", "aeroway", "amenity", "place", "man_made"];

fn is_land_tag(key: &str, value: &str) -> bool {
	match key {
		"natural" => !matches!(value, "water" | "coastline"),
		"waterway" | "water" => false,
		_ => LAND_KEYS.contains(&key),
	}
}

fn has_land_features(features: &[Feature]) -> bool {
	features.iter().any(|f| f.tags.0.iter().any(|(k, v)| is_land_tag(k, v)))
}

fn has_coastline(features: &[Feature]) -> bool {
	features.iter().any(|f| f.tags.has("natural", "coastline"))
}

/// The final per-tile output artifact.
pub struct TileDocument {
	pub features: Vec<Feature>,
	pub has_coastline: bool,
	pub has_land_features: bool,
}

impl TileDocument {
	pub fn to_compact_json(&self) -> String {
		let mut meta = JsonObject::new();
		meta.insert("hasCoastline".into(), Value::Bool(self.has_coastline));
		meta.insert("hasLandFeatures".into(), Value::Bool(self.has_land_features));
		let mut foreign = JsonObject::new();
		foreign.insert("_meta".into(), Value::Object(meta));

		let collection = geojson::FeatureCollection {
			bbox: None,
			features: self.features.iter().map(|f| f.to_geojson_feature()).collect(),
			foreign_members: Some(foreign),
		};
		collection.to_string()
	}

	pub fn from_compact_json(text: &str) -> Option<TileDocument> {
		let collection: geojson::FeatureCollection = serde_json::from_str(text).ok()?;
		let has_coastline = collection
			.foreign_members
			.as_ref()
			.and_then(|m| m.get("_meta"))
			.and_then(|m| m.get("hasCoastline"))
			.and_then(Value::as_bool)
			.unwrap_or(false);
		let has_land_features = collection
			.foreign_members
			.as_ref()
			.and_then(|m| m.get("_meta"))
			.and_then(|m| m.get("hasLandFeatures"))
			.and_then(Value::as_bool)
			.unwrap_or(false);
		let features = collection.features.iter().filter_map(Feature::from_geojson_feature).collect();
		Some(TileDocument { features, has_coastline, has_land_features })
	}
}

/// Reads an intermediate file, dedupes by exact feature-JSON string, keeping the
/// importance of the first occurrence encountered.
fn read_and_dedupe(path: &Path) -> Result<Vec<(u32, Feature)>, FinalizeError> {
	let text = fs::read_to_string(path).map_err(|e| FinalizeError::Io(path.to_path_buf(), e))?;
	let mut seen = std::collections::HashSet::new();
	let mut out = Vec::new();
	for line in text.lines() {
		if line.is_empty() {
			continue;
		}
		let (importance, json) = line.split_once('\t').ok_or_else(|| FinalizeError::Corrupt(path.to_path_buf()))?;
		if !seen.insert(json.to_string()) {
			continue;
		}
		let importance: u32 = importance.parse().map_err(|_| FinalizeError::Corrupt(path.to_path_buf()))?;
		let geojson_feature: geojson::Feature =
			serde_json::from_str(json).map_err(|_| FinalizeError::Corrupt(path.to_path_buf()))?;
		let feature = Feature::from_geojson_feature(&geojson_feature).ok_or_else(|| FinalizeError::Corrupt(path.to_path_buf()))?;
		out.push((importance, feature));
	}
	Ok(out)
}

fn rect_of(bounds: &Bounds) -> Rect<f64> {
	Rect::new(coord! { x: bounds.min_lon, y: bounds.min_lat }, coord! { x: bounds.max_lon, y: bounds.max_lat })
}

/// Runs the full finalization procedure for one tile: dedup, union with any prior
/// finalized document, coastline synthesis, importance sort.
pub fn finalize(
	mut records: Vec<(u32, Feature)>,
	prior: Option<TileDocument>,
	tile_bounds: &Bounds,
	coastline_epsilon_m: Option<f64>,
) -> TileDocument {
	if let Some(prior) = prior {
		let mut seen: std::collections::HashSet<String> =
			records.iter().map(|(_, f)| f.to_compact_json()).collect();
		for feature in prior.features {
			let json = feature.to_compact_json();
			if seen.insert(json) {
				records.push((5, feature));
			}
		}
	}

	let all_features: Vec<Feature> = records.iter().map(|(_, f)| f.clone()).collect();
	let mut has_coastline_flag = has_coastline(&all_features);
	let has_land_features_flag = has_land_features(&all_features);

	if has_coastline_flag {
		let rect = rect_of(tile_bounds);
		let coastline_lines: Vec<LineString<f64>> = records
			.iter()
			.filter(|(_, f)| f.tags.has("natural", "coastline"))
			.filter_map(|(_, f)| match &f.geometry {
				Geometry::LineString(l) => Some(l.clone()),
				_ => None,
			})
			.collect();

		let polygons = synthesize_ocean_polygons(&coastline_lines, &rect);
		if polygons.is_empty() {
			has_coastline_flag = false;
		} else {
			for polygon in polygons {
				let mut geometry = Geometry::Polygon(polygon);
				if let Some(epsilon_m) = coastline_epsilon_m {
					geometry = simplify_feature(&geometry, crate::config::Simplification::Epsilon(epsilon_m));
				}
				let mut tags = Tags::default();
				tags.0.insert("natural".to_string(), "water".to_string());
				tags.0.insert("water".to_string(), "ocean".to_string());
				let mut feature = Feature::new(geometry, tags);
				feature.render = Some(RenderBlock {
					layer: "water".to_string(),
					color: [64, 128, 200, 255],
					min_lod: 0,
					fill: true,
					name: None,
				});
				records.push((100, feature));
			}
		}
	}

	records.retain(|(_, f)| !f.tags.has("natural", "coastline") || has_coastline_flag);

	records.sort_by(|a, b| b.0.cmp(&a.0));

	TileDocument {
		features: records.into_iter().map(|(_, f)| f).collect(),
		has_coastline: has_coastline_flag,
		has_land_features: has_land_features_flag,
	}
}

/// Finalizes one intermediate file on disk into its final tile document, then deletes
/// the intermediate. `prior_path` and `write_path` are kept separate so a caller can
/// merge against a previously published document while staging the new one elsewhere
/// (the orchestrator's output stays untouched until publication succeeds).
pub fn finalize_tile_file(
	intermediate_path: &Path,
	prior_path: &Path,
	write_path: &Path,
	tile_bounds: &Bounds,
	coastline_epsilon_m: Option<f64>,
) -> Result<(), FinalizeError> {
	let records = read_and_dedupe(intermediate_path)?;
	let prior = fs::read_to_string(prior_path).ok().and_then(|text| TileDocument::from_compact_json(&text));
	let document = finalize(records, prior, tile_bounds, coastline_epsilon_m);

	if let Some(parent) = write_path.parent() {
		fs::create_dir_all(parent).map_err(|e| FinalizeError::Io(write_path.to_path_buf(), e))?;
	}
	fs::write(write_path, document.to_compact_json()).map_err(|e| FinalizeError::Io(write_path.to_path_buf(), e))?;
	fs::remove_file(intermediate_path).map_err(|e| FinalizeError::Io(intermediate_path.to_path_buf(), e))?;
	Ok(())
}

#[cfg(test)]
mod test {
	use geo::Point;

	use super::*;

	fn point_feature(lon: f64, lat: f64, tags: &[(&str, &str)]) -> Feature {
		let mut t = Tags::default();
		for (k, v) in tags {
			t.0.insert(k.to_string(), v.to_string());
		}
		Feature::new(Geometry::Point(Point::new(lon, lat)), t)
	}

	#[test]
	fn sorts_by_importance_descending() {
		let records = vec![
			(10, point_feature(0.1, 0.1, &[("a", "1")])),
			(90, point_feature(0.2, 0.2, &[("b", "2")])),
			(50, point_feature(0.3, 0.3, &[("c", "3")])),
		];
		let bounds = Bounds::new(0.0, 0.0, 1.0, 1.0);
		let doc = finalize(records, None, &bounds, None);
		let importances: Vec<u32> = doc.features.iter().map(|f| if f.tags.has("b", "2") { 90 } else if f.tags.has("c", "3") { 50 } else { 10 }).collect();
		assert_eq!(importances, vec![90, 50, 10]);
	}

	#[test]
	fn prior_document_features_merge_at_importance_five() {
		let prior = TileDocument {
			features: vec![point_feature(0.1, 0.1, &[("old", "yes")])],
			has_coastline: false,
			has_land_features: false,
		};
		let records = vec![(90, point_feature(0.2, 0.2, &[("new", "yes")]))];
		let bounds = Bounds::new(0.0, 0.0, 1.0, 1.0);
		let doc = finalize(records, Some(prior), &bounds, None);
		assert_eq!(doc.features.len(), 2);
		assert_eq!(doc.features[0].tags.get("new"), Some("yes"));
	}

	#[test]
	fn no_coastline_features_skips_synthesis() {
		let records = vec![(5, point_feature(0.1, 0.1, &[("building", "yes")]))];
		let bounds = Bounds::new(0.0, 0.0, 1.0, 1.0);
		let doc = finalize(records, None, &bounds, None);
		assert!(!doc.has_coastline);
		assert!(doc.has_land_features);
	}
}
