use crate::{
	config::{FeatureDefinition, OsmMatch, Simplification, Tileset},
	feature::{Feature, RenderBlock},
};

/// The outcome of a successful classification: the render attributes to attach and
/// the simplification spec that governs this feature within this tileset.
pub struct Match {
	pub render: RenderBlock,
	pub simplification: Simplification,
}

/// Evaluates a tileset's feature definitions against a feature, first match wins.
/// Holds no state of its own beyond a borrowed tileset.
pub struct Classifier<'a> {
	tileset: &'a Tileset,
}

impl<'a> Classifier<'a> {
	pub fn new(tileset: &'a Tileset) -> Self {
		Classifier { tileset }
	}

	/// Returns the match for the first feature definition that matches, or `None` if
	/// the feature should be dropped from this tileset entirely.
	pub fn classify(&self, feature: &mut Feature) -> Option<Match> {
		for def in &self.tileset.features {
			if matches(&def.osm_match, feature) {
				return Some(Match { render: render_block_for(def, feature), simplification: def.simplification });
			}
		}
		None
	}
}

fn matches(m: &OsmMatch, feature: &mut Feature) -> bool {
	if !m.geometry.is_empty() && !m.geometry.contains(&feature.geometry.kind()) {
		return false;
	}

	if !m.tags.is_empty() {
		let tag_match = |key: &String, values: &crate::config::ValueSet| match feature.tags.get(key) {
			Some(v) => values.matches(v),
			None => false,
		};
		let ok = if m.match_all { m.tags.iter().all(|(k, v)| tag_match(k, v)) } else { m.tags.iter().any(|(k, v)| tag_match(k, v)) };
		if !ok {
			return false;
		}
	}

	for (key, values) in &m.tags_exclude {
		if let Some(v) = feature.tags.get(key) {
			if values.matches(v) {
				return false;
			}
		}
	}

	if m.min_area_km2.is_some() || m.max_area_km2.is_some() {
		let area = feature.area_km2();
		if let Some(min) = m.min_area_km2 {
			if area < min {
				return false;
			}
		}
		if let Some(max) = m.max_area_km2 {
			if area > max {
				return false;
			}
		}
	}

	if m.population_min.is_some() || m.population_max.is_some() {
		match feature.tags.population() {
			Some(pop) => {
				if let Some(min) = m.population_min {
					if pop < min {
						return false;
					}
				}
				if let Some(max) = m.population_max {
					if pop > max {
						return false;
					}
				}
			},
			None => return false,
		}
	}

	if m.requires_name && feature.tags.get("name").is_none() {
		return false;
	}

	true
}

fn render_block_for(def: &FeatureDefinition, feature: &Feature) -> RenderBlock {
	RenderBlock {
		layer: def.render.layer.clone(),
		color: def.render.color,
		min_lod: def.render.min_lod,
		fill: def.render.fill,
		name: feature.tags.get("name").map(|s| s.to_string()),
	}
}

#[cfg(test)]
mod test {
	use std::path::Path;

	use super::*;
	use crate::config::Config;

	const CONFIG: &str = r#"
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
      - osm_match:
          geometry: [Polygon]
          tags:
            natural: ["*"]
          tags_exclude:
            natural: [water]
        render:
          layer: land
          min_lod: 2
"#;

	fn load() -> Tileset {
		Config::parse(CONFIG, Path::new("<test>")).unwrap().tilesets.remove(0)
	}

	#[test]
	fn matches_first_definition_for_named_city_point() {
		use crate::feature::{Geometry, Tags};
		use geo::Point;
		let tileset = load();
		let classifier = Classifier::new(&tileset);
		let mut tags = Tags::default();
		tags.0.insert("place".into(), "city".into());
		tags.0.insert("name".into(), "Testville".into());
		let mut feature = Feature::new(Geometry::Point(Point::new(1.0, 1.0)), tags);
		let render = classifier.classify(&mut feature).unwrap();
		assert_eq!(render.layer, "places");
		assert_eq!(render.name.as_deref(), Some("Testville"));
	}

	#[test]
	fn drops_unnamed_place_point() {
		use crate::feature::{Geometry, Tags};
		use geo::Point;
		let tileset = load();
		let classifier = Classifier::new(&tileset);
		let mut tags = Tags::default();
		tags.0.insert("place".into(), "city".into());
		let mut feature = Feature::new(Geometry::Point(Point::new(1.0, 1.0)), tags);
		assert!(classifier.classify(&mut feature).is_none());
	}

	#[test]
	fn excludes_water_tagged_natural_polygons() {
		use crate::feature::{Geometry, Tags};
		use geo::{coord, LineString, Polygon};
		let tileset = load();
		let classifier = Classifier::new(&tileset);
		let mut tags = Tags::default();
		tags.0.insert("natural".into(), "water".into());
		let poly = Polygon::new(
			LineString::new(vec![
				coord! { x: 0.0, y: 0.0 },
				coord! { x: 1.0, y: 0.0 },
				coord! { x: 1.0, y: 1.0 },
				coord! { x: 0.0, y: 1.0 },
				coord! { x: 0.0, y: 0.0 },
			]),
			vec![],
		);
		let mut feature = Feature::new(Geometry::Polygon(poly), tags);
		assert!(classifier.classify(&mut feature).is_none());
	}
}
