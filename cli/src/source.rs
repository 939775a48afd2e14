use std::{
	fs::File,
	io::{BufRead, BufReader, Lines},
	path::{Path, PathBuf},
	process::{Child, ChildStdout, Command, Stdio},
};

use anyhow::{bail, Result};
use vtile_core::{Bounds, Feature, FeatureSource, SourceError};

/// Picks the production `osmium`-backed source for `.pbf`/`.osm.pbf` paths, or the
/// plain-NDJSON source (with its `<path>.bounds.json` sidecar) for anything else,
/// matching `build`'s `--source <pbf-or-ndjson>` contract.
pub fn open(path: &Path) -> Result<Box<dyn FeatureSource>> {
	if !path.exists() {
		bail!("source {} does not exist", path.display());
	}

	let is_pbf = path.extension().map(|ext| ext.eq_ignore_ascii_case("pbf")).unwrap_or(false);
	if is_pbf {
		return Ok(Box::new(OsmiumSource { path: path.to_path_buf() }));
	}

	let bounds_path = sidecar_bounds_path(path);
	if !bounds_path.exists() {
		bail!("no bounds sidecar found at {} for source {}", bounds_path.display(), path.display());
	}
	Ok(Box::new(NdjsonFileSource { path: path.to_path_buf(), bounds_path }))
}

fn sidecar_bounds_path(path: &Path) -> PathBuf {
	let mut name = path.file_name().unwrap_or_default().to_os_string();
	name.push(".bounds.json");
	path.with_file_name(name)
}

/// Shells out to `osmium export`/`osmium fileinfo` to read a `.osm.pbf` extract.
/// `osmium` is expected on `PATH`; this type never parses PBF itself.
pub struct OsmiumSource {
	path: PathBuf,
}

impl FeatureSource for OsmiumSource {
	fn label(&self) -> String {
		self.path.display().to_string()
	}

	fn bounds(&self) -> Result<Bounds, SourceError> {
		let output = Command::new("osmium")
			.args(["fileinfo", "--extended", "-f", "json"])
			.arg(&self.path)
			.output()
			.map_err(|e| SourceError::Unreadable(self.path.clone(), e))?;

		if !output.status.success() {
			return Err(SourceError::MissingBounds(self.path.clone()));
		}

		let json: serde_json::Value =
			serde_json::from_slice(&output.stdout).map_err(|_| SourceError::MissingBounds(self.path.clone()))?;
		let bbox = &json["data"]["bbox"];
		match (bbox["left"].as_f64(), bbox["bottom"].as_f64(), bbox["right"].as_f64(), bbox["top"].as_f64()) {
			(Some(min_lon), Some(min_lat), Some(max_lon), Some(max_lat)) => {
				Ok(Bounds::new(min_lon, min_lat, max_lon, max_lat))
			},
			_ => Err(SourceError::MissingBounds(self.path.clone())),
		}
	}

	fn features(&self) -> Result<Box<dyn Iterator<Item = Result<Feature, SourceError>> + '_>, SourceError> {
		let mut child = Command::new("osmium")
			.args(["export", "--format=geojsonseq", "-o", "-"])
			.arg(&self.path)
			.stdout(Stdio::piped())
			.spawn()
			.map_err(|e| SourceError::Unreadable(self.path.clone(), e))?;

		let stdout = child.stdout.take().expect("stdout was piped");
		Ok(Box::new(GeojsonSeqLines { path: self.path.clone(), child, lines: BufReader::new(stdout).lines() }))
	}
}

struct GeojsonSeqLines {
	path: PathBuf,
	child: Child,
	lines: Lines<BufReader<ChildStdout>>,
}

impl Iterator for GeojsonSeqLines {
	type Item = Result<Feature, SourceError>;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			let line = match self.lines.next()? {
				Ok(line) => line,
				Err(e) => return Some(Err(SourceError::Unreadable(self.path.clone(), e))),
			};
			// `geojsonseq` prefixes each record with an ASCII record separator.
			let trimmed = line.trim_start_matches('\u{1e}').trim();
			if trimmed.is_empty() {
				continue;
			}
			return Some(parse_feature_line(trimmed, &self.path));
		}
	}
}

impl Drop for GeojsonSeqLines {
	fn drop(&mut self) {
		let _ = self.child.kill();
		let _ = self.child.wait();
	}
}

/// Test/offline path: a pre-converted NDJSON file plus a `<path>.bounds.json` sidecar,
/// so the engine's own tests never need a real `osmium` binary on `PATH`.
pub struct NdjsonFileSource {
	path: PathBuf,
	bounds_path: PathBuf,
}

impl FeatureSource for NdjsonFileSource {
	fn label(&self) -> String {
		self.path.display().to_string()
	}

	fn bounds(&self) -> Result<Bounds, SourceError> {
		let text =
			std::fs::read_to_string(&self.bounds_path).map_err(|e| SourceError::Unreadable(self.bounds_path.clone(), e))?;
		serde_json::from_str(&text).map_err(|_| SourceError::MissingBounds(self.bounds_path.clone()))
	}

	fn features(&self) -> Result<Box<dyn Iterator<Item = Result<Feature, SourceError>> + '_>, SourceError> {
		let file = File::open(&self.path).map_err(|e| SourceError::Unreadable(self.path.clone(), e))?;
		Ok(Box::new(NdjsonLines { path: self.path.clone(), lines: BufReader::new(file).lines() }))
	}
}

struct NdjsonLines {
	path: PathBuf,
	lines: Lines<BufReader<File>>,
}

impl Iterator for NdjsonLines {
	type Item = Result<Feature, SourceError>;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			let line = match self.lines.next()? {
				Ok(line) => line,
				Err(e) => return Some(Err(SourceError::Unreadable(self.path.clone(), e))),
			};
			let trimmed = line.trim();
			if trimmed.is_empty() {
				continue;
			}
			return Some(parse_feature_line(trimmed, &self.path));
		}
	}
}

fn parse_feature_line(line: &str, path: &Path) -> Result<Feature, SourceError> {
	let bad_record = || SourceError::Unreadable(path.to_path_buf(), std::io::Error::new(std::io::ErrorKind::InvalidData, "not a GeoJSON feature"));

	let geojson: geojson::GeoJson = line.parse().map_err(|_| bad_record())?;
	let feature = geojson::Feature::try_from(geojson).map_err(|_| bad_record())?;
	Feature::from_geojson_feature(&feature).ok_or_else(bad_record)
}
