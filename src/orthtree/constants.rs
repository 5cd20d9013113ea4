//! Dimensions of the grid and defaults of the tree shape.

/// Number of levels of the grid. Grid coordinates and cell sizes fit in an `i32` without
/// overflow on any per-axis operation.
pub const MAX_LEVEL: u32 = 30;

/// Side length of the grid, and of the root cell, in grid units.
pub const GRID_SIZE: i32 = 1 << MAX_LEVEL;

/// Default maximal number of items stored in a leaf before it is split.
pub const DEFAULT_BUCKET_SIZE: usize = 10;

/// Largest supported dimension.
pub const MAX_DIMENSION: usize = 8;

/// Factor applied to the largest extent of the bounding box when deriving the grid scale.
pub(crate) const BOX_MARGIN: f64 = 1.01;

/// Slack applied when converting a distance bound into grid units, to absorb rounding.
pub(crate) const PRUNING_SLACK: f64 = 1.005;
