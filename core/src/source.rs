use crate::{bounds::Bounds, error::SourceError, feature::Feature};

/// A lazily-streamable region of input features plus the region's bounds. The engine
/// depends only on this trait, never on how the features were produced: PBF conversion
/// and bounds extraction are external collaborators the CLI wires up.
pub trait FeatureSource: Send + Sync {
	/// A label used in logs and error messages; need not be unique.
	fn label(&self) -> String;

	/// The region's geographic footprint. Required up front; the engine fails this
	/// source if unavailable.
	fn bounds(&self) -> Result<Bounds, SourceError>;

	/// Streams features one at a time. Implementations must not buffer the whole
	/// region in memory.
	fn features(&self) -> Result<Box<dyn Iterator<Item = Result<Feature, SourceError>> + '_>, SourceError>;
}
