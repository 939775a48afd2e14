pub mod clip;
pub mod simplify;

pub use clip::clip_to_tile;
pub use simplify::{grid_snap, simplify_feature};
