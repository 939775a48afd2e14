use std::sync::atomic::{AtomicU64, Ordering};

/// Best-effort counters accumulated across an orchestrated run and reported at the
/// end. Individual fields use relaxed atomics since exact ordering between workers
/// is not meaningful, only final totals.
#[derive(Default)]
pub struct RunStats {
	pub features_read: AtomicU64,
	pub features_skipped: AtomicU64,
	pub features_written: AtomicU64,
	pub tiles_finalized: AtomicU64,
	pub sources_failed: AtomicU64,
}

impl RunStats {
	pub fn new() -> Self {
		RunStats::default()
	}

	pub fn record_read(&self) {
		self.features_read.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_skipped(&self) {
		self.features_skipped.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_written(&self, count: u64) {
		self.features_written.fetch_add(count, Ordering::Relaxed);
	}

	pub fn record_tile_finalized(&self) {
		self.tiles_finalized.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_source_failed(&self) {
		self.sources_failed.fetch_add(1, Ordering::Relaxed);
	}

	pub fn snapshot(&self) -> RunStatsSnapshot {
		RunStatsSnapshot {
			features_read: self.features_read.load(Ordering::Relaxed),
			features_skipped: self.features_skipped.load(Ordering::Relaxed),
			features_written: self.features_written.load(Ordering::Relaxed),
			tiles_finalized: self.tiles_finalized.load(Ordering::Relaxed),
			sources_failed: self.sources_failed.load(Ordering::Relaxed),
		}
	}
}

#[derive(Copy, Clone, Debug, Default)]
pub struct RunStatsSnapshot {
	pub features_read: u64,
	pub features_skipped: u64,
	pub features_written: u64,
	pub tiles_finalized: u64,
	pub sources_failed: u64,
}

impl std::fmt::Display for RunStatsSnapshot {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"read {} / skipped {} / written {} / tiles {} / sources failed {}",
			self.features_read, self.features_skipped, self.features_written, self.tiles_finalized, self.sources_failed
		)
	}
}
