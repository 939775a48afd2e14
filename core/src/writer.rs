use std::{
	collections::HashSet,
	fs::{self, File, OpenOptions},
	io::Write,
	path::{Path, PathBuf},
};

use crate::{error::SourceError, tile::TileId};

/// Appends feature records to per-tile intermediate files. Caches which tile
/// directories have already been created so repeated appends into the same tile don't
/// re-stat the filesystem.
pub struct StreamingWriter {
	root: PathBuf,
	known_dirs: HashSet<PathBuf>,
}

impl StreamingWriter {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		StreamingWriter { root: root.into(), known_dirs: HashSet::new() }
	}

	fn path_for(&self, tile: &TileId) -> PathBuf {
		self.root.join(&tile.tileset).join(tile.x.to_string()).join(format!("{}.jsonl", tile.y))
	}

	/// Appends one `{importance}\t{feature_json}\n` record. Directory creation is
	/// lazy and retry-safe: "already exists" is not an error.
	pub fn append(&mut self, tile: &TileId, importance: u32, feature_json: &str) -> Result<(), SourceError> {
		let path = self.path_for(tile);
		let dir = path.parent().expect("tile path always has a parent");
		if !self.known_dirs.contains(dir) {
			fs::create_dir_all(dir).map_err(|e| SourceError::Write(dir.to_path_buf(), e))?;
			self.known_dirs.insert(dir.to_path_buf());
		}

		let mut file = open_for_append(&path).map_err(|e| SourceError::Write(path.clone(), e))?;
		writeln!(file, "{importance}\t{feature_json}").map_err(|e| SourceError::Write(path, e))?;
		Ok(())
	}
}

fn open_for_append(path: &Path) -> std::io::Result<File> {
	OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn appends_create_lazily_cached_directories() {
		let dir = tempfile::tempdir().unwrap();
		let mut writer = StreamingWriter::new(dir.path());
		let tile = TileId { tileset: "overview".into(), x: 3, y: -2 };
		writer.append(&tile, 95, "{\"a\":1}").unwrap();
		writer.append(&tile, 10, "{\"a\":2}").unwrap();

		let path = dir.path().join("overview").join("3").join("-2.jsonl");
		let contents = fs::read_to_string(path).unwrap();
		assert_eq!(contents.lines().count(), 2);
		assert_eq!(contents.lines().next().unwrap(), "95\t{\"a\":1}");
	}
}
