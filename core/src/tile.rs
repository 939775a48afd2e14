use crate::bounds::Bounds;

/// Identifies one output tile within one tileset's equal-metric grid.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TileId {
	pub tileset: String,
	pub x: i64,
	pub y: i64,
}

/// Degree size of one tile edge for a tileset of the given meter size, evaluated at a
/// given latitude. Longitude spacing shrinks toward the poles; latitude spacing does
/// not, since both axes use a fixed meridian-arc length rather than a projection.
pub struct TileGrid {
	pub tile_width_deg: f64,
	pub tile_height_deg: f64,
}

const METERS_PER_DEG_LAT: f64 = 111_320.0;

impl TileGrid {
	pub fn for_latitude(tile_size_meters: f64, lat_deg: f64) -> TileGrid {
		let meters_per_deg_lon = METERS_PER_DEG_LAT * lat_deg.to_radians().cos();
		TileGrid {
			tile_width_deg: tile_size_meters / meters_per_deg_lon,
			tile_height_deg: tile_size_meters / METERS_PER_DEG_LAT,
		}
	}

	pub fn x_of(&self, lon_deg: f64) -> i64 {
		(lon_deg / self.tile_width_deg).floor() as i64
	}

	pub fn y_of(&self, lat_deg: f64) -> i64 {
		(lat_deg / self.tile_height_deg).floor() as i64
	}

	pub fn bounds_of(&self, x: i64, y: i64) -> Bounds {
		Bounds::new(
			x as f64 * self.tile_width_deg,
			y as f64 * self.tile_height_deg,
			(x + 1) as f64 * self.tile_width_deg,
			(y + 1) as f64 * self.tile_height_deg,
		)
	}
}

/// Computes every (x, y) a feature's bounding box touches under the tileset's grid.
/// Deliberately loose: a bounding-box intersection, refined later by the clipper.
pub fn route(tileset: &str, tile_size_meters: f64, bounds: &Bounds) -> Vec<TileId> {
	let (_, lat_avg) = bounds.center();
	let grid = TileGrid::for_latitude(tile_size_meters, lat_avg);

	let x_min = grid.x_of(bounds.min_lon);
	let x_max = grid.x_of(bounds.max_lon);
	let y_min = grid.y_of(bounds.min_lat);
	let y_max = grid.y_of(bounds.max_lat);

	let mut ids = Vec::with_capacity(((x_max - x_min + 1) * (y_max - y_min + 1)).max(1) as usize);
	for x in x_min..=x_max {
		for y in y_min..=y_max {
			ids.push(TileId { tileset: tileset.to_string(), x, y });
		}
	}
	ids
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn routes_a_point_to_a_single_tile() {
		let bounds = Bounds::new(0.4, 0.4, 0.4, 0.4);
		let ids = route("overview", 50_000.0, &bounds);
		assert_eq!(ids.len(), 1);
	}

	#[test]
	fn routes_a_spanning_bbox_to_a_grid_of_tiles() {
		let grid = TileGrid::for_latitude(1_000.0, 0.0);
		let width = grid.tile_width_deg;
		let bounds = Bounds::new(0.0, 0.0, width * 2.5, 0.0);
		let ids = route("fine", 1_000.0, &bounds);
		assert_eq!(ids.len(), 4);
	}

	#[test]
	fn tile_bounds_roundtrip_into_grid_indices() {
		let grid = TileGrid::for_latitude(10_000.0, 45.0);
		let bounds = grid.bounds_of(3, -2);
		assert_eq!(grid.x_of(bounds.min_lon + grid.tile_width_deg / 2.0), 3);
		assert_eq!(grid.y_of(bounds.min_lat + grid.tile_height_deg / 2.0), -2);
	}
}
