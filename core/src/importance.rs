use crate::feature::{GeometryKind, Tags};

/// Pure function of tags and geometry kind. `0` means "anything else", and the
/// caller should skip the feature entirely for importance-sensitive output.
pub fn score(tags: &Tags, kind: GeometryKind) -> u32 {
	if tags.has("natural", "coastline") {
		return 110;
	}

	let highway = remap_construction(tags);

	if kind == GeometryKind::Polygon || kind == GeometryKind::MultiPolygon {
		if tags.has("natural", "water") || tags.has("water", "ocean") {
			return 100;
		}
		if tags.has("natural", "wood") || tags.has("landuse", "forest") {
			return 90;
		}
		if is_park_green_or_farmland(tags) {
			return 40;
		}
		if is_admin_subdivision(tags) {
			return 25;
		}
		if is_building(tags) {
			return 20;
		}
	}

	if kind == GeometryKind::Point {
		if let Some(place) = tags.get("place") {
			match place {
				"city" => return 95,
				"town" => return 85,
				"village" => return 55,
				"hamlet" | "locality" => return 8,
				_ => {},
			}
		}
		if tags.get("name").is_some() {
			return 5;
		}
	}

	if let Some(highway) = highway {
		match highway {
			"motorway" | "trunk" | "primary" => return 80,
			"secondary" => return 50,
			"tertiary" | "residential" => return 30,
			"unclassified" | "service" | "track" | "path" | "footway" => return 10,
			_ => {},
		}
	}

	if let Some(aeroway) = tags.get("aeroway") {
		match aeroway {
			"runway" => return 75,
			"taxiway" => return 35,
			"apron" => return 30,
			_ => {},
		}
	}

	if let Some(railway) = tags.get("railway") {
		if railway == "rail" {
			return 70;
		}
	}

	if tags.has("waterway", "river") || tags.has("waterway", "canal") {
		return 60;
	}

	if tags.get("building").is_some() {
		return 20;
	}

	0
}

/// A `construction` highway is scored as the class it will eventually become, per the
/// `construction` tag's value, rather than as a generic road under construction.
fn remap_construction(tags: &Tags) -> Option<&str> {
	if tags.get("highway") == Some("construction") {
		tags.get("construction")
	} else {
		tags.get("highway")
	}
}

fn is_park_green_or_farmland(tags: &Tags) -> bool {
	matches!(tags.get("leisure"), Some("park")) || matches!(tags.get("landuse"), Some("farmland") | Some("farm"))
		|| matches!(tags.get("landuse"), Some("village_green") | Some("greenfield"))
}

fn is_admin_subdivision(tags: &Tags) -> bool {
	matches!(tags.get("place"), Some("suburb") | Some("borough") | Some("quarter"))
}

fn is_building(tags: &Tags) -> bool {
	tags.get("building").is_some()
}

#[cfg(test)]
mod test {
	use super::*;

	fn tags(pairs: &[(&str, &str)]) -> Tags {
		let mut t = Tags::default();
		for (k, v) in pairs {
			t.0.insert(k.to_string(), v.to_string());
		}
		t
	}

	#[test]
	fn coastline_outranks_everything() {
		let t = tags(&[("natural", "coastline")]);
		assert_eq!(score(&t, GeometryKind::LineString), 110);
	}

	#[test]
	fn city_point_scores_95() {
		let t = tags(&[("place", "city"), ("name", "Hamburg")]);
		assert_eq!(score(&t, GeometryKind::Point), 95);
	}

	#[test]
	fn construction_highway_remaps_to_target_class() {
		let t = tags(&[("highway", "construction"), ("construction", "primary")]);
		assert_eq!(score(&t, GeometryKind::LineString), 80);
	}

	#[test]
	fn unrecognized_feature_scores_zero() {
		let t = tags(&[("amenity", "bench")]);
		assert_eq!(score(&t, GeometryKind::Point), 0);
	}
}
