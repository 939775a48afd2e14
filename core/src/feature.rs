use std::collections::BTreeMap;

use geo::{BoundingRect, Geometry as GeoGeometry, LineString, MultiLineString, MultiPolygon, Point, Polygon, Rect};
use geojson::JsonObject;
use serde_json::Value;

use crate::bounds::Bounds;

/// The closed set of geometry kinds this engine understands.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum GeometryKind {
	Point,
	LineString,
	Polygon,
	MultiLineString,
	MultiPolygon,
}

impl GeometryKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			GeometryKind::Point => "Point",
			GeometryKind::LineString => "LineString",
			GeometryKind::Polygon => "Polygon",
			GeometryKind::MultiLineString => "MultiLineString",
			GeometryKind::MultiPolygon => "MultiPolygon",
		}
	}
}

/// A tagged union over the geometry kinds we accept. Dispatch on this for bounds,
/// simplification, clipping and coordinate iteration rather than matching on strings.
#[derive(Clone, Debug)]
pub enum Geometry {
	Point(Point<f64>),
	LineString(LineString<f64>),
	Polygon(Polygon<f64>),
	MultiLineString(MultiLineString<f64>),
	MultiPolygon(MultiPolygon<f64>),
}

impl Geometry {
	pub fn kind(&self) -> GeometryKind {
		match self {
			Geometry::Point(_) => GeometryKind::Point,
			Geometry::LineString(_) => GeometryKind::LineString,
			Geometry::Polygon(_) => GeometryKind::Polygon,
			Geometry::MultiLineString(_) => GeometryKind::MultiLineString,
			Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
		}
	}

	pub fn bounding_rect(&self) -> Option<Rect<f64>> {
		match self {
			Geometry::Point(g) => Some(Rect::new(g.0, g.0)),
			Geometry::LineString(g) => g.bounding_rect(),
			Geometry::Polygon(g) => g.bounding_rect(),
			Geometry::MultiLineString(g) => g.bounding_rect(),
			Geometry::MultiPolygon(g) => g.bounding_rect(),
		}
	}

	pub fn bounds(&self) -> Option<Bounds> {
		self.bounding_rect().map(|r| Bounds::new(r.min().x, r.min().y, r.max().x, r.max().y))
	}

	pub fn is_empty(&self) -> bool {
		match self {
			Geometry::Point(_) => false,
			Geometry::LineString(g) => g.0.len() < 2,
			Geometry::Polygon(g) => g.exterior().0.len() < 4,
			Geometry::MultiLineString(g) => g.0.is_empty() || g.0.iter().all(|l| l.0.len() < 2),
			Geometry::MultiPolygon(g) => g.0.is_empty() || g.0.iter().all(|p| p.exterior().0.len() < 4),
		}
	}

	pub fn try_from_geojson(geom: &geojson::Geometry) -> Option<Geometry> {
		let parsed: GeoGeometry<f64> = geom.clone().try_into().ok()?;
		Geometry::try_from(parsed)
	}

	pub fn to_geojson(&self) -> geojson::Geometry {
		let geo: GeoGeometry<f64> = self.clone().into();
		geojson::Geometry::new(geojson::Value::from(&geo))
	}
}

impl TryFrom<GeoGeometry<f64>> for Geometry {
	type Error = ();

	fn try_from(value: GeoGeometry<f64>) -> Result<Self, Self::Error> {
		match value {
			GeoGeometry::Point(p) => Ok(Geometry::Point(p)),
			GeoGeometry::LineString(l) => Ok(Geometry::LineString(l)),
			GeoGeometry::Polygon(p) => Ok(Geometry::Polygon(p)),
			GeoGeometry::MultiLineString(m) => Ok(Geometry::MultiLineString(m)),
			GeoGeometry::MultiPolygon(m) => Ok(Geometry::MultiPolygon(m)),
			_ => Err(()),
		}
	}
}

impl From<Geometry> for GeoGeometry<f64> {
	fn from(value: Geometry) -> Self {
		match value {
			Geometry::Point(p) => GeoGeometry::Point(p),
			Geometry::LineString(l) => GeoGeometry::LineString(l),
			Geometry::Polygon(p) => GeoGeometry::Polygon(p),
			Geometry::MultiLineString(m) => GeoGeometry::MultiLineString(m),
			Geometry::MultiPolygon(m) => GeoGeometry::MultiPolygon(m),
		}
	}
}

/// A key-value tag bag. Kept as a sorted map so serialized output is deterministic,
/// which matters for the exact-string deduplication the finalizer relies on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tags(pub BTreeMap<String, String>);

impl Tags {
	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.get(key).map(|s| s.as_str())
	}

	pub fn has(&self, key: &str, value: &str) -> bool {
		self.get(key) == Some(value)
	}

	pub fn population(&self) -> Option<i64> {
		self.get("population").and_then(|v| v.parse().ok())
	}

	pub fn from_json_object(props: &JsonObject) -> Tags {
		let mut map = BTreeMap::new();
		for (k, v) in props {
			let s = match v {
				Value::String(s) => s.clone(),
				Value::Number(n) => n.to_string(),
				Value::Bool(b) => b.to_string(),
				_ => continue,
			};
			map.insert(k.clone(), s);
		}
		Tags(map)
	}

	pub fn to_json_object(&self) -> JsonObject {
		self.0.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect()
	}
}

/// A small record telling the renderer which visual layer, color and LOD applies.
/// Produced by classification (`crate::classify`), consumed by the external renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderBlock {
	pub layer: String,
	pub color: [u8; 4],
	pub min_lod: u8,
	pub fill: bool,
	pub name: Option<String>,
}

impl RenderBlock {
	pub fn to_json_object(&self) -> JsonObject {
		let mut obj = JsonObject::new();
		obj.insert("layer".into(), Value::String(self.layer.clone()));
		obj.insert(
			"color".into(),
			Value::Array(self.color.iter().map(|c| Value::from(*c)).collect()),
		);
		obj.insert("minLOD".into(), Value::from(self.min_lod));
		obj.insert("fill".into(), Value::Bool(self.fill));
		if let Some(name) = &self.name {
			obj.insert("name".into(), Value::String(name.clone()));
		}
		obj
	}
}

/// A single input/output feature. Mutated only by the geometry transformer; released
/// once it has been serialized into an intermediate record.
#[derive(Clone, Debug)]
pub struct Feature {
	pub geometry: Geometry,
	pub tags: Tags,
	/// Memoized bounding-box area in km², computed on first use during classification.
	pub area_km2: Option<f64>,
	pub render: Option<RenderBlock>,
}

impl Feature {
	pub fn new(geometry: Geometry, tags: Tags) -> Self {
		Feature { geometry, tags, area_km2: None, render: None }
	}

	/// Area of the feature's bounding box in km², using a fixed meridian factor.
	/// Memoized on first use since a feature may be checked against several area
	/// bounds in a row during classification.
	pub fn area_km2(&mut self) -> f64 {
		if let Some(a) = self.area_km2 {
			return a;
		}
		const METERS_PER_DEGREE: f64 = 111_000.0;
		let area = match self.geometry.bounding_rect() {
			Some(rect) => {
				let width_m = (rect.max().x - rect.min().x) * METERS_PER_DEGREE;
				let height_m = (rect.max().y - rect.min().y) * METERS_PER_DEGREE;
				(width_m.abs() * height_m.abs()) / 1_000_000.0
			},
			None => 0.0,
		};
		self.area_km2 = Some(area);
		area
	}

	pub fn to_geojson_feature(&self) -> geojson::Feature {
		let mut foreign_members = JsonObject::new();
		if let Some(render) = &self.render {
			foreign_members.insert("_render".into(), Value::Object(render.to_json_object()));
		}
		geojson::Feature {
			bbox: None,
			geometry: Some(self.geometry.to_geojson()),
			id: None,
			properties: Some(self.tags.to_json_object()),
			foreign_members: if foreign_members.is_empty() { None } else { Some(foreign_members) },
		}
	}

	/// Minimal, whitespace-free serialization used for intermediate records and tile
	/// documents: no pretty-printing, deterministic key order.
	pub fn to_compact_json(&self) -> String {
		self.to_geojson_feature().to_string()
	}

	pub fn from_geojson_feature(feature: &geojson::Feature) -> Option<Feature> {
		let geometry = feature.geometry.as_ref()?;
		let geometry = Geometry::try_from_geojson(geometry)?;
		let tags = feature.properties.as_ref().map(Tags::from_json_object).unwrap_or_default();
		Some(Feature::new(geometry, tags))
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use geo::coord;

	#[test]
	fn area_km2_of_unit_degree_box() {
		let rect = Polygon::new(
			LineString::new(vec![
				coord! { x: 0.0, y: 0.0 },
				coord! { x: 1.0, y: 0.0 },
				coord! { x: 1.0, y: 1.0 },
				coord! { x: 0.0, y: 1.0 },
				coord! { x: 0.0, y: 0.0 },
			]),
			vec![],
		);
		let mut f = Feature::new(Geometry::Polygon(rect), Tags::default());
		let area = f.area_km2();
		// 111,000m x 111,000m in km^2
		assert!((area - 12_321.0).abs() < 1.0);
	}

	#[test]
	fn tags_roundtrip_through_json() {
		let mut obj = JsonObject::new();
		obj.insert("highway".into(), Value::String("residential".into()));
		obj.insert("population".into(), Value::from(42));
		let tags = Tags::from_json_object(&obj);
		assert_eq!(tags.get("highway"), Some("residential"));
		assert_eq!(tags.population(), Some(42));
	}
}
