use geo::{MapCoordsInPlace, Simplify};

use crate::{config::Simplification, feature::Geometry};

const METERS_PER_DEGREE: f64 = 111_000.0;

/// Ramer-Douglas-Peucker simplification with a fixed meters-to-degrees conversion
/// applied uniformly regardless of latitude. Points pass through untouched. A result
/// that becomes empty reverts to the pre-simplification geometry: simplification
/// must never drop a feature.
pub fn simplify_feature(geometry: &Geometry, simplification: Simplification) -> Geometry {
	let epsilon_m = match simplification.epsilon_m() {
		Some(e) => e,
		None => return geometry.clone(),
	};
	let epsilon_deg = epsilon_m / METERS_PER_DEGREE;

	let simplified = match geometry {
		Geometry::Point(_) => return geometry.clone(),
		Geometry::LineString(g) => Geometry::LineString(g.simplify(&epsilon_deg)),
		Geometry::Polygon(g) => Geometry::Polygon(g.simplify(&epsilon_deg)),
		Geometry::MultiLineString(g) => Geometry::MultiLineString(g.simplify(&epsilon_deg)),
		Geometry::MultiPolygon(g) => Geometry::MultiPolygon(g.simplify(&epsilon_deg)),
	};

	if simplified.is_empty() {
		geometry.clone()
	} else {
		simplified
	}
}

/// Rounds every coordinate to a shared grid so independently simplified neighbors
/// stay colinear along shared boundaries. Idempotent by construction: rounding an
/// already-rounded coordinate to the same cell size is a no-op.
pub fn grid_snap(geometry: &Geometry, cell_size_deg: f64) -> Geometry {
	if cell_size_deg <= 0.0 {
		return geometry.clone();
	}
	let snap = |c: f64| (c / cell_size_deg).round() * cell_size_deg;

	let mut out = geometry.clone();
	match &mut out {
		Geometry::Point(p) => p.map_coords_in_place(|c| geo::coord! { x: snap(c.x), y: snap(c.y) }),
		Geometry::LineString(g) => g.map_coords_in_place(|c| geo::coord! { x: snap(c.x), y: snap(c.y) }),
		Geometry::Polygon(g) => g.map_coords_in_place(|c| geo::coord! { x: snap(c.x), y: snap(c.y) }),
		Geometry::MultiLineString(g) => g.map_coords_in_place(|c| geo::coord! { x: snap(c.x), y: snap(c.y) }),
		Geometry::MultiPolygon(g) => g.map_coords_in_place(|c| geo::coord! { x: snap(c.x), y: snap(c.y) }),
	}
	out
}

#[cfg(test)]
mod test {
	use geo::{coord, LineString};

	use super::*;

	#[test]
	fn grid_snap_is_idempotent() {
		let line = Geometry::LineString(LineString::new(vec![
			coord! { x: 0.123456, y: 1.987654 },
			coord! { x: 0.2, y: 2.0 },
		]));
		let once = grid_snap(&line, 0.01);
		let twice = grid_snap(&once, 0.01);
		let Geometry::LineString(a) = &once else { unreachable!() };
		let Geometry::LineString(b) = &twice else { unreachable!() };
		assert_eq!(a.0, b.0);
	}

	#[test]
	fn disabled_simplification_passes_geometry_through() {
		let line = Geometry::LineString(LineString::new(vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 0.0 }]));
		let result = simplify_feature(&line, Simplification::Disabled);
		let Geometry::LineString(a) = &line else { unreachable!() };
		let Geometry::LineString(b) = &result else { unreachable!() };
		assert_eq!(a.0, b.0);
	}

	#[test]
	fn points_are_never_simplified() {
		use geo::Point;
		let point = Geometry::Point(Point::new(1.0, 2.0));
		let result = simplify_feature(&point, Simplification::Epsilon(50.0));
		assert!(matches!(result, Geometry::Point(_)));
	}
}
