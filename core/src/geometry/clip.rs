use geo::{coord, BooleanOps, LineString, MultiPolygon, Polygon};

use crate::{bounds::Bounds, feature::Geometry};

fn is_small_structure(tags: &crate::feature::Tags) -> bool {
	tags.get("building").is_some() || tags.has("public_transport", "platform") || tags.has("railway", "platform")
}

fn buffered_box(tile_bounds: &Bounds, buffer_fraction: f64) -> Polygon<f64> {
	let width = tile_bounds.max_lon - tile_bounds.min_lon;
	let height = tile_bounds.max_lat - tile_bounds.min_lat;
	let dx = width * buffer_fraction;
	let dy = height * buffer_fraction;
	let (min_lon, min_lat, max_lon, max_lat) = (
		tile_bounds.min_lon - dx,
		tile_bounds.min_lat - dy,
		tile_bounds.max_lon + dx,
		tile_bounds.max_lat + dy,
	);
	Polygon::new(
		LineString::new(vec![
			coord! { x: min_lon, y: min_lat },
			coord! { x: max_lon, y: min_lat },
			coord! { x: max_lon, y: max_lat },
			coord! { x: min_lon, y: max_lat },
			coord! { x: min_lon, y: min_lat },
		]),
		vec![],
	)
}

fn lies_entirely_inside(bounds: &Bounds, box_bounds: &Bounds) -> bool {
	bounds.min_lon >= box_bounds.min_lon
		&& bounds.max_lon <= box_bounds.max_lon
		&& bounds.min_lat >= box_bounds.min_lat
		&& bounds.max_lat <= box_bounds.max_lat
}

/// Refines the router's loose bounding-box assignment to an actual geometric clip,
/// honoring the per-geometry-kind exemptions below. Returns `None` when the clipped
/// result for this tile is empty (the feature should be dropped from the tile).
pub fn clip_to_tile(
	geometry: &Geometry,
	tags: &crate::feature::Tags,
	tile_bounds: &Bounds,
	buffer_fraction: f64,
) -> Option<Geometry> {
	match geometry {
		Geometry::Point(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => Some(geometry.clone()),
		Geometry::Polygon(_) | Geometry::MultiPolygon(_) if is_small_structure(tags) => Some(geometry.clone()),
		Geometry::Polygon(poly) => clip_polygon(poly, tile_bounds, buffer_fraction),
		Geometry::MultiPolygon(multi) => clip_multi_polygon(multi, tile_bounds, buffer_fraction),
	}
}

fn clip_polygon(poly: &Polygon<f64>, tile_bounds: &Bounds, buffer_fraction: f64) -> Option<Geometry> {
	let feature_bounds = geometry_bounds_or(poly, tile_bounds);
	let buffer_box_bounds = expand(tile_bounds, buffer_fraction);
	if lies_entirely_inside(&feature_bounds, &buffer_box_bounds) {
		return Some(Geometry::Polygon(poly.clone()));
	}

	let clip_box = buffered_box(tile_bounds, buffer_fraction);
	let clipped: MultiPolygon<f64> = poly.intersection(&clip_box);
	multi_polygon_to_geometry(clipped)
}

fn clip_multi_polygon(multi: &MultiPolygon<f64>, tile_bounds: &Bounds, buffer_fraction: f64) -> Option<Geometry> {
	let feature_bounds = geometry_bounds_or(multi, tile_bounds);
	let buffer_box_bounds = expand(tile_bounds, buffer_fraction);
	if lies_entirely_inside(&feature_bounds, &buffer_box_bounds) {
		return Some(Geometry::MultiPolygon(multi.clone()));
	}

	let clip_box = buffered_box(tile_bounds, buffer_fraction);
	let clipped: MultiPolygon<f64> = multi.intersection(&clip_box);
	multi_polygon_to_geometry(clipped)
}

fn multi_polygon_to_geometry(clipped: MultiPolygon<f64>) -> Option<Geometry> {
	if clipped.0.is_empty() {
		return None;
	}
	if clipped.0.len() == 1 {
		Some(Geometry::Polygon(clipped.0.into_iter().next().unwrap()))
	} else {
		Some(Geometry::MultiPolygon(clipped))
	}
}

fn geometry_bounds_or<G>(geometry: &G, fallback: &Bounds) -> Bounds
where
	G: geo::BoundingRect<f64, Output = Option<geo::Rect<f64>>>,
{
	geometry
		.bounding_rect()
		.map(|r| Bounds::new(r.min().x, r.min().y, r.max().x, r.max().y))
		.unwrap_or(*fallback)
}

fn expand(bounds: &Bounds, buffer_fraction: f64) -> Bounds {
	let width = bounds.max_lon - bounds.min_lon;
	let height = bounds.max_lat - bounds.min_lat;
	Bounds::new(
		bounds.min_lon - width * buffer_fraction,
		bounds.min_lat - height * buffer_fraction,
		bounds.max_lon + width * buffer_fraction,
		bounds.max_lat + height * buffer_fraction,
	)
}

#[cfg(test)]
mod test {
	use geo::coord;

	use super::*;
	use crate::feature::Tags;

	fn square(min: f64, max: f64) -> Polygon<f64> {
		Polygon::new(
			LineString::new(vec![
				coord! { x: min, y: min },
				coord! { x: max, y: min },
				coord! { x: max, y: max },
				coord! { x: min, y: max },
				coord! { x: min, y: min },
			]),
			vec![],
		)
	}

	#[test]
	fn points_are_never_clipped() {
		let geometry = Geometry::Point(geo::Point::new(100.0, 100.0));
		let tile_bounds = Bounds::new(0.0, 0.0, 1.0, 1.0);
		let result = clip_to_tile(&geometry, &Tags::default(), &tile_bounds, 0.02);
		assert!(matches!(result, Some(Geometry::Point(_))));
	}

	#[test]
	fn polygons_fully_inside_buffer_pass_through_unclipped() {
		let poly = square(0.1, 0.9);
		let geometry = Geometry::Polygon(poly.clone());
		let tile_bounds = Bounds::new(0.0, 0.0, 1.0, 1.0);
		let result = clip_to_tile(&geometry, &Tags::default(), &tile_bounds, 0.02).unwrap();
		let Geometry::Polygon(out) = result else { panic!("expected polygon") };
		assert_eq!(out.exterior().0.len(), poly.exterior().0.len());
	}

	#[test]
	fn spanning_polygon_is_clipped_to_the_tile() {
		let poly = square(-1.0, 2.0);
		let geometry = Geometry::Polygon(poly);
		let tile_bounds = Bounds::new(0.0, 0.0, 1.0, 1.0);
		let result = clip_to_tile(&geometry, &Tags::default(), &tile_bounds, 0.02).unwrap();
		let bounds = result.bounds().unwrap();
		assert!(bounds.max_lon <= 1.02 + 1e-9);
		assert!(bounds.min_lon >= -0.02 - 1e-9);
	}

	#[test]
	fn building_polygons_are_never_clipped() {
		let poly = square(-1.0, 2.0);
		let geometry = Geometry::Polygon(poly.clone());
		let mut tags = Tags::default();
		tags.0.insert("building".into(), "yes".into());
		let tile_bounds = Bounds::new(0.0, 0.0, 1.0, 1.0);
		let result = clip_to_tile(&geometry, &tags, &tile_bounds, 0.02).unwrap();
		let Geometry::Polygon(out) = result else { panic!("expected polygon") };
		assert_eq!(out.exterior().0.len(), poly.exterior().0.len());
	}
}
