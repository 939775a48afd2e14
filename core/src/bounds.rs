use serde::{Deserialize, Serialize};

/// A geographic bounding box in WGS84 degrees.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
	#[serde(rename = "minLon")]
	pub min_lon: f64,
	#[serde(rename = "minLat")]
	pub min_lat: f64,
	#[serde(rename = "maxLon")]
	pub max_lon: f64,
	#[serde(rename = "maxLat")]
	pub max_lat: f64,
}

impl Bounds {
	pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
		Self { min_lon, min_lat, max_lon, max_lat }
	}

	pub fn center(&self) -> (f64, f64) {
		((self.min_lon + self.max_lon) / 2.0, (self.min_lat + self.max_lat) / 2.0)
	}

	pub fn intersects(&self, other: &Bounds) -> bool {
		self.min_lon <= other.max_lon
			&& self.max_lon >= other.min_lon
			&& self.min_lat <= other.max_lat
			&& self.max_lat >= other.min_lat
	}

	/// Merge two bounds into their union.
	pub fn union(&self, other: &Bounds) -> Bounds {
		Bounds {
			min_lon: self.min_lon.min(other.min_lon),
			min_lat: self.min_lat.min(other.min_lat),
			max_lon: self.max_lon.max(other.max_lon),
			max_lat: self.max_lat.max(other.max_lat),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn union_grows_to_contain_both() {
		let a = Bounds::new(0.0, 0.0, 1.0, 1.0);
		let b = Bounds::new(0.5, 0.5, 2.0, 2.0);
		let u = a.union(&b);
		assert_eq!(u, Bounds::new(0.0, 0.0, 2.0, 2.0));
	}

	#[test]
	fn center_is_midpoint() {
		let b = Bounds::new(8.0, 52.0, 10.0, 54.0);
		assert_eq!(b.center(), (9.0, 53.0));
	}
}
