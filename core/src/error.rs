use std::{fmt::Debug, path::PathBuf};

use thiserror::Error;

/// Fatal: the tileset document itself is malformed. Raised before any region is processed.
#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("tileset '{0}' is declared more than once")]
	DuplicateTileset(String),
	#[error("tileset '{0}' has non-positive tile_size_meters ({1})")]
	InvalidTileSize(String, f64),
	#[error("tileset '{0}' has no feature definitions")]
	EmptyTileset(String),
	#[error("tileset '{tileset}' feature {index} has a negative simplification epsilon_m ({epsilon})")]
	NegativeEpsilon { tileset: String, index: usize, epsilon: f64 },
	#[error("failed to read config file {0:?}: {1}")]
	Io(PathBuf, #[source] std::io::Error),
	#[error("failed to parse config file {0:?}: {1}")]
	Parse(PathBuf, #[source] serde_yaml::Error),
}

/// Fails the one affected source region; the orchestrator continues with the rest.
#[derive(Error, Debug)]
pub enum SourceError {
	#[error("source {0:?} could not be read: {1}")]
	Unreadable(PathBuf, #[source] std::io::Error),
	#[error("bounds for source {0:?} are unavailable")]
	MissingBounds(PathBuf),
	#[error("write error while processing source {0:?}: {1}")]
	Write(PathBuf, #[source] std::io::Error),
}

/// Non-fatal: the specific tile is skipped or left in its prior state, and the run continues.
#[derive(Error, Debug)]
pub enum FinalizeError {
	#[error("tile {0:?} could not be finalized: {1}")]
	Io(PathBuf, #[source] std::io::Error),
	#[error("tile {0:?} contained malformed intermediate records")]
	Corrupt(PathBuf),
}
