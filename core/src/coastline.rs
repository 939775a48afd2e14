use geo::{coord, BooleanOps, Coord, InteriorPoint, LineString, Polygon, Rect};

const AREA_FRACTION_CUTOFF: f64 = 0.3;
const COORD_EPS: f64 = 1e-9;

fn coords_equal(a: Coord<f64>, b: Coord<f64>) -> bool {
	(a.x - b.x).abs() < COORD_EPS && (a.y - b.y).abs() < COORD_EPS
}

fn dedupe_exact(lines: Vec<LineString<f64>>) -> Vec<LineString<f64>> {
	let mut kept: Vec<LineString<f64>> = Vec::new();
	'outer: for line in lines {
		for existing in &kept {
			if existing.0.len() == line.0.len() && existing.0.iter().zip(line.0.iter()).all(|(a, b)| coords_equal(*a, *b)) {
				continue 'outer;
			}
		}
		kept.push(line);
	}
	kept
}

/// Greedily splices lines whose endpoints coincide into longer chains.
fn merge_by_shared_endpoints(mut lines: Vec<LineString<f64>>) -> Vec<LineString<f64>> {
	let mut merged = true;
	while merged {
		merged = false;
		'search: for i in 0..lines.len() {
			for j in 0..lines.len() {
				if i == j {
					continue;
				}
				let (a, b) = (lines[i].0.clone(), lines[j].0.clone());
				if a.is_empty() || b.is_empty() {
					continue;
				}
				if coords_equal(*a.last().unwrap(), *b.first().unwrap()) {
					let mut joined = a;
					joined.extend(b.into_iter().skip(1));
					let (lo, hi) = if i < j { (i, j) } else { (j, i) };
					lines.remove(hi);
					lines[lo] = LineString::new(joined);
					merged = true;
					break 'search;
				}
			}
		}
	}
	lines
}

fn is_closed(line: &LineString<f64>) -> bool {
	line.0.len() >= 4 && coords_equal(*line.0.first().unwrap(), *line.0.last().unwrap())
}

fn fully_inside(line: &LineString<f64>, rect: &Rect<f64>) -> bool {
	line.0.iter().all(|c| c.x >= rect.min().x && c.x <= rect.max().x && c.y >= rect.min().y && c.y <= rect.max().y)
}

fn ring_signed_area(coords: &[Coord<f64>]) -> f64 {
	let mut sum = 0.0;
	for w in coords.windows(2) {
		sum += w[0].x * w[1].y - w[1].x * w[0].y;
	}
	sum / 2.0
}

/// Liang-Barsky clip of a single segment against an axis-aligned rectangle; returns
/// the clipped parameter range `[t0, t1] ⊆ [0, 1]`, or `None` if the segment misses.
fn liang_barsky(p0: Coord<f64>, p1: Coord<f64>, rect: &Rect<f64>) -> Option<(f64, f64)> {
	let dx = p1.x - p0.x;
	let dy = p1.y - p0.y;
	let mut t0 = 0.0_f64;
	let mut t1 = 1.0_f64;
	let checks = [
		(-dx, p0.x - rect.min().x),
		(dx, rect.max().x - p0.x),
		(-dy, p0.y - rect.min().y),
		(dy, rect.max().y - p0.y),
	];
	for (p, q) in checks {
		if p == 0.0 {
			if q < 0.0 {
				return None;
			}
		} else {
			let r = q / p;
			if p < 0.0 {
				if r > t1 {
					return None;
				} else if r > t0 {
					t0 = r;
				}
			} else if r < t0 {
				return None;
			} else if r < t1 {
				t1 = r;
			}
		}
	}
	if t0 > t1 {
		None
	} else {
		Some((t0, t1))
	}
}

fn lerp(p0: Coord<f64>, p1: Coord<f64>, t: f64) -> Coord<f64> {
	coord! { x: p0.x + (p1.x - p0.x) * t, y: p0.y + (p1.y - p0.y) * t }
}

/// Clips a (possibly self-overlapping) polyline to the rectangle, returning the
/// surviving runs in original travel order.
fn clip_open_line(line: &LineString<f64>, rect: &Rect<f64>) -> Vec<Vec<Coord<f64>>> {
	let mut runs = Vec::new();
	let mut current: Vec<Coord<f64>> = Vec::new();
	for w in line.0.windows(2) {
		let (p0, p1) = (w[0], w[1]);
		match liang_barsky(p0, p1, rect) {
			Some((t0, t1)) => {
				let a = lerp(p0, p1, t0);
				let b = lerp(p0, p1, t1);
				if current.is_empty() {
					current.push(a);
				}
				current.push(b);
				if t1 < 1.0 - COORD_EPS {
					runs.push(std::mem::take(&mut current));
				}
			},
			None => {
				if !current.is_empty() {
					runs.push(std::mem::take(&mut current));
				}
			},
		}
	}
	if !current.is_empty() {
		runs.push(current);
	}
	runs.into_iter()
		.map(|mut r| {
			r.dedup_by(|a, b| coords_equal(*a, *b));
			r
		})
		.filter(|r| r.len() >= 2)
		.collect()
}

fn snap_to_boundary(p: Coord<f64>, rect: &Rect<f64>) -> Coord<f64> {
	let d_east = (p.x - rect.max().x).abs();
	let d_west = (p.x - rect.min().x).abs();
	let d_south = (p.y - rect.min().y).abs();
	let d_north = (p.y - rect.max().y).abs();
	let dmin = d_east.min(d_west).min(d_south).min(d_north);
	let mut out = p;
	if (dmin - d_east).abs() < COORD_EPS {
		out.x = rect.max().x;
	} else if (dmin - d_west).abs() < COORD_EPS {
		out.x = rect.min().x;
	} else if (dmin - d_south).abs() < COORD_EPS {
		out.y = rect.min().y;
	} else {
		out.y = rect.max().y;
	}
	out
}

/// Parameterizes the tile boundary clockwise from the NE corner: east ∈ [0,1), south
/// ∈ [1,2), west ∈ [2,3), north ∈ [3,4).
fn boundary_param(p: Coord<f64>, rect: &Rect<f64>) -> f64 {
	let w = rect.max().x - rect.min().x;
	let h = rect.max().y - rect.min().y;
	let d_east = (p.x - rect.max().x).abs();
	let d_south = (p.y - rect.min().y).abs();
	let d_west = (p.x - rect.min().x).abs();
	let d_north = (p.y - rect.max().y).abs();
	let dists = [d_east, d_south, d_west, d_north];
	let edge = dists.iter().enumerate().min_by(|a, b| a.1.partial_cmp(b.1).unwrap()).unwrap().0;
	let clamp01 = |x: f64| x.clamp(0.0, 0.999_999_999);
	match edge {
		0 => clamp01((rect.max().y - p.y) / h),
		1 => 1.0 + clamp01((rect.max().x - p.x) / w),
		2 => 2.0 + clamp01((p.y - rect.min().y) / h),
		3 => 3.0 + clamp01((p.x - rect.min().x) / w),
		_ => unreachable!(),
	}
}

fn normalize4(t: f64) -> f64 {
	let m = t % 4.0;
	if m < 0.0 {
		m + 4.0
	} else {
		m
	}
}

fn corner_at(k: i64, rect: &Rect<f64>) -> Coord<f64> {
	match k.rem_euclid(4) {
		0 => coord! { x: rect.max().x, y: rect.max().y },
		1 => coord! { x: rect.max().x, y: rect.min().y },
		2 => coord! { x: rect.min().x, y: rect.min().y },
		3 => coord! { x: rect.min().x, y: rect.max().y },
		_ => unreachable!(),
	}
}

/// Boundary corners strictly between `t_exit` and `t_entry`, walking clockwise.
fn corners_between(t_exit: f64, t_entry: f64, rect: &Rect<f64>) -> Vec<Coord<f64>> {
	let span = normalize4(t_entry - t_exit);
	let mut out = Vec::new();
	let mut k = t_exit.floor() as i64 + 1;
	for _ in 0..4 {
		let delta = normalize4(k as f64 - t_exit);
		if delta >= span - COORD_EPS {
			break;
		}
		out.push(corner_at(k, rect));
		k += 1;
	}
	out
}

struct Segment {
	coords: Vec<Coord<f64>>,
	t_entry: f64,
	t_exit: f64,
}

/// Pairs each segment's exit with the next entry encountered clockwise and walks the
/// resulting cycles into closed rings.
fn trace_rings(segments: &[Segment], rect: &Rect<f64>) -> Vec<Vec<Coord<f64>>> {
	let n = segments.len();
	if n == 0 {
		return Vec::new();
	}

	let mut next = vec![0usize; n];
	for i in 0..n {
		let mut best: Option<(usize, f64)> = None;
		for j in 0..n {
			let mut d = normalize4(segments[j].t_entry - segments[i].t_exit);
			if i == j {
				d = 4.0;
			}
			if best.map(|(_, bd)| d < bd).unwrap_or(true) {
				best = Some((j, d));
			}
		}
		next[i] = best.unwrap().0;
	}

	let mut visited = vec![false; n];
	let mut rings = Vec::new();
	for start in 0..n {
		if visited[start] {
			continue;
		}
		let mut coords: Vec<Coord<f64>> = Vec::new();
		let mut cur = start;
		loop {
			if visited[cur] {
				break;
			}
			visited[cur] = true;
			coords.extend(segments[cur].coords.iter().cloned());
			let nxt = next[cur];
			coords.extend(corners_between(segments[cur].t_exit, segments[nxt].t_entry, rect));
			if nxt == start {
				coords.push(segments[start].coords[0]);
				break;
			}
			cur = nxt;
		}
		if coords.len() >= 4 {
			rings.push(coords);
		}
	}
	rings
}

fn rect_polygon(rect: &Rect<f64>) -> Polygon<f64> {
	Polygon::new(
		LineString::new(vec![
			coord! { x: rect.min().x, y: rect.min().y },
			coord! { x: rect.max().x, y: rect.min().y },
			coord! { x: rect.max().x, y: rect.max().y },
			coord! { x: rect.min().x, y: rect.max().y },
			coord! { x: rect.min().x, y: rect.min().y },
		]),
		vec![],
	)
}

/// Cleans up a degenerate traced ring via self-union through the boolean-ops engine,
/// keeping the largest resulting ring by area.
fn repair(polygon: Polygon<f64>) -> Option<Polygon<f64>> {
	if polygon.exterior().0.len() < 4 {
		return None;
	}
	let area = ring_signed_area(&polygon.exterior().0).abs();
	if area <= COORD_EPS {
		return None;
	}
	let repaired = polygon.union(&polygon);
	repaired.0.into_iter().max_by(|a, b| {
		ring_signed_area(&a.exterior().0).abs().partial_cmp(&ring_signed_area(&b.exterior().0).abs()).unwrap()
	})
}

fn clip_polygon_to_rect(polygon: &Polygon<f64>, rect: &Rect<f64>) -> Option<Polygon<f64>> {
	let rect_poly = rect_polygon(rect);
	let clipped = polygon.intersection(&rect_poly);
	clipped.0.into_iter().max_by(|a, b| {
		ring_signed_area(&a.exterior().0).abs().partial_cmp(&ring_signed_area(&b.exterior().0).abs()).unwrap()
	})
}

/// Reconstructs the water-side polygons for one tile from its coastline line-strings.
/// Returns an empty vector when the input contains no segments that truly intersect
/// the tile (caller is responsible for clearing
/// `hasCoastline` in that case).
pub fn synthesize_ocean_polygons(coastlines: &[LineString<f64>], rect: &Rect<f64>) -> Vec<Polygon<f64>> {
	let lines = dedupe_exact(coastlines.to_vec());
	let lines = merge_by_shared_endpoints(lines);

	let mut closed_rings: Vec<Vec<Coord<f64>>> = Vec::new();
	let mut open_pieces: Vec<Vec<Coord<f64>>> = Vec::new();

	for line in &lines {
		if is_closed(line) && fully_inside(line, rect) {
			closed_rings.push(line.0.clone());
		} else {
			open_pieces.extend(clip_open_line(line, rect));
		}
	}

	let tile_area = (rect.max().x - rect.min().x) * (rect.max().y - rect.min().y);

	let mut islands: Vec<Vec<Coord<f64>>> = Vec::new();
	let mut enclosed_water: Vec<Polygon<f64>> = Vec::new();
	for ring in closed_rings {
		if ring_signed_area(&ring) < 0.0 {
			islands.push(ring);
		} else {
			enclosed_water.push(Polygon::new(LineString::new(ring), vec![]));
		}
	}

	let segments: Vec<Segment> = open_pieces
		.into_iter()
		.filter_map(|mut coords| {
			coords.dedup_by(|a, b| coords_equal(*a, *b));
			if coords.len() < 2 {
				return None;
			}
			let first = snap_to_boundary(coords[0], rect);
			let last = snap_to_boundary(*coords.last().unwrap(), rect);
			let len = coords.len();
			coords[0] = first;
			coords[len - 1] = last;
			Some(Segment { t_entry: boundary_param(first, rect), t_exit: boundary_param(last, rect), coords })
		})
		.collect();

	let mut water_polygons: Vec<Polygon<f64>> = Vec::new();

	if segments.is_empty() {
		if islands.is_empty() && enclosed_water.is_empty() {
			return Vec::new();
		}
		// All-hole tile: islands with no open segments.
		if !islands.is_empty() {
			let holes: Vec<LineString<f64>> = islands.into_iter().map(LineString::new).collect();
			water_polygons.push(Polygon::new(rect_polygon(rect).exterior().clone(), holes));
		}
		water_polygons.extend(enclosed_water);
	} else {
		let traced = trace_rings(&segments, rect);
		for ring in traced {
			let area = ring_signed_area(&ring).abs();
			let mut polygon = Polygon::new(LineString::new(ring.clone()), vec![]);
			if area > tile_area * AREA_FRACTION_CUTOFF {
				if let Some(test_point) = right_side_test_point(&segments, rect) {
					if !polygon.contains_point(test_point) {
						let rect_poly = rect_polygon(rect);
						if let Some(flipped) = rect_poly.difference(&polygon).0.into_iter().next() {
							polygon = flipped;
						}
					}
				}
			}
			water_polygons.push(polygon);
		}

		// Hole assignment with orphan fallback.
		let mut orphans = Vec::new();
		for island in islands {
			let island_ring = LineString::new(island);
			let interior = Polygon::new(island_ring.clone(), vec![]).interior_point();
			let mut assigned = false;
			if let Some(point) = interior {
				for polygon in &mut water_polygons {
					if polygon.contains_point(point) {
						let mut rings: Vec<LineString<f64>> = polygon.interiors().to_vec();
						rings.push(island_ring.clone());
						*polygon = Polygon::new(polygon.exterior().clone(), rings);
						assigned = true;
						break;
					}
				}
			}
			if !assigned {
				orphans.push(island_ring);
			}
		}
		if !orphans.is_empty() {
			water_polygons.push(Polygon::new(rect_polygon(rect).exterior().clone(), orphans));
		}
		water_polygons.extend(enclosed_water);
	}

	water_polygons
		.into_iter()
		.filter_map(|p| clip_polygon_to_rect(&p, rect))
		.filter_map(repair)
		.collect()
}

fn right_side_test_point(segments: &[Segment], rect: &Rect<f64>) -> Option<geo::Point<f64>> {
	let first = segments.first()?;
	if first.coords.len() < 2 {
		return None;
	}
	let (p0, p1) = (first.coords[0], first.coords[1]);
	let (dx, dy) = (p1.x - p0.x, p1.y - p0.y);
	let len = (dx * dx + dy * dy).sqrt();
	if len < COORD_EPS {
		return None;
	}
	let (nx, ny) = (dy / len, -dx / len);
	let epsilon = ((rect.max().x - rect.min().x).min(rect.max().y - rect.min().y)) * 0.01;
	let mid_x = (p0.x + p1.x) / 2.0;
	let mid_y = (p0.y + p1.y) / 2.0;
	Some(geo::Point::new(mid_x + nx * epsilon, mid_y + ny * epsilon))
}

trait ContainsPoint {
	fn contains_point(&self, p: geo::Point<f64>) -> bool;
}

impl ContainsPoint for Polygon<f64> {
	fn contains_point(&self, p: geo::Point<f64>) -> bool {
		use geo::Contains;
		self.contains(&p)
	}
}

#[cfg(test)]
mod test {
	use geo::Rect;

	use super::*;

	fn tile_rect() -> Rect<f64> {
		Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 })
	}

	#[test]
	fn two_segments_crossing_east_to_west_form_northern_water_polygon() {
		let rect = tile_rect();
		let a = LineString::new(vec![coord! { x: 1.0, y: 0.5 }, coord! { x: 0.5, y: 0.6 }]);
		let b = LineString::new(vec![coord! { x: 0.5, y: 0.6 }, coord! { x: 0.0, y: 0.5 }]);
		let polygons = synthesize_ocean_polygons(&[a, b], &rect);
		assert_eq!(polygons.len(), 1);
		let area = ring_signed_area(&polygons[0].exterior().0).abs();
		assert!(area > 0.3 && area < 0.7);
	}

	#[test]
	fn lone_island_with_no_open_segments_becomes_a_hole_in_the_whole_tile() {
		let rect = tile_rect();
		let island = LineString::new(vec![
			coord! { x: 0.4, y: 0.4 },
			coord! { x: 0.4, y: 0.5 },
			coord! { x: 0.5, y: 0.4 },
			coord! { x: 0.4, y: 0.4 },
		]);
		let polygons = synthesize_ocean_polygons(&[island], &rect);
		assert_eq!(polygons.len(), 1);
		assert_eq!(polygons[0].interiors().len(), 1);
	}

	#[test]
	fn no_coastline_input_yields_no_polygons() {
		let rect = tile_rect();
		let polygons = synthesize_ocean_polygons(&[], &rect);
		assert!(polygons.is_empty());
	}
}
