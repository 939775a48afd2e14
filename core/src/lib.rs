//! Transforms OpenStreetMap feature streams into per-tile vector map documents.
//!
//! The crate is organized around the pipeline described by its own module layout:
//! [`config`] loads the declarative tileset document, [`classify`] matches features
//! against it, [`geometry`] simplifies/snaps/clips, [`tile`] assigns tile ids,
//! [`importance`] scores features for ordering, [`writer`] appends intermediate
//! records, [`finalize`] (with [`coastline`] for ocean synthesis) produces the final
//! tile documents, and [`orchestrator`] drives all of the above across parallel
//! source regions. [`index`] writes the run manifest and [`stats`] accumulates
//! best-effort counters. [`source`] is the trait boundary to the external
//! PBF-to-feature converter and bounds oracle.

pub mod bounds;
pub mod classify;
pub mod coastline;
pub mod config;
pub mod error;
pub mod feature;
pub mod finalize;
pub mod geometry;
pub mod importance;
pub mod index;
pub mod orchestrator;
pub mod source;
pub mod stats;
pub mod tile;
pub mod writer;

pub use bounds::Bounds;
pub use config::Config;
pub use error::{ConfigError, FinalizeError, SourceError};
pub use feature::{Feature, Geometry, GeometryKind, RenderBlock, Tags};
pub use orchestrator::{run, RunOptions};
pub use source::FeatureSource;
pub use stats::{RunStats, RunStatsSnapshot};
pub use tile::TileId;
