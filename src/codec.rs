//! Conversion between domain coordinates and the fixed-point grid of an orthtree.
//!
//! Integer coordinates give exact control over geometric predicates, and since cells have
//! power-of-two side lengths, locating the child that contains a point is a matter of testing
//! one bit per axis. The price is that the conversion must be known before any point is stored,
//! which is why an index is always built from a bounding box.

use num_traits::ToPrimitive;
use tracing::debug;

use crate::error::{OrthtreeError, Result};
use crate::orthtree::constants::{BOX_MARGIN, GRID_SIZE};

/// Conversion between `f64` domain coordinates and `i32` grid coordinates in `[0, GRID_SIZE)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateCodec<const D: usize> {
    origin: [f64; D],
    scale: f64,
}

impl<const D: usize> CoordinateCodec<D> {
    /// Derive the conversion from the bounding box `[bbmin, bbmax]`.
    ///
    /// A 1% margin is added to the largest extent, so that rounding never pushes a point of the
    /// box onto the upper grid boundary.
    pub fn try_new(bbmin: [f64; D], bbmax: [f64; D]) -> Result<Self> {
        let mut max_delta = 0.0_f64;
        for k in 0..D {
            if !bbmin[k].is_finite() || !bbmax[k].is_finite() {
                return Err(OrthtreeError::InvalidBoundingBox(format!(
                    "non-finite bound on axis {}",
                    k
                )));
            }
            if bbmax[k] < bbmin[k] {
                return Err(OrthtreeError::InvalidBoundingBox(format!(
                    "max {} is lower than min {} on axis {}",
                    bbmax[k], bbmin[k], k
                )));
            }
            max_delta = max_delta.max(bbmax[k] - bbmin[k]);
        }

        let scale = GRID_SIZE as f64 / (BOX_MARGIN * max_delta);
        if max_delta <= 0.0 || !scale.is_finite() {
            return Err(OrthtreeError::InvalidBoundingBox(
                "the box has no extent".to_string(),
            ));
        }

        debug!(?bbmin, ?bbmax, scale, "new orthtree grid conversion");
        Ok(Self {
            origin: bbmin,
            scale,
        })
    }

    /// Lower corner of the grid, in domain coordinates.
    pub fn origin(&self) -> &[f64; D] {
        &self.origin
    }

    /// Number of grid units per domain unit.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Smallest representable difference between two domain coordinates.
    pub fn quantum(&self) -> f64 {
        1.0 / self.scale
    }

    /// Transform domain coordinates into grid coordinates.
    ///
    /// Fails with [`OrthtreeError::OutOfBounds`] when a coordinate does not map into
    /// `[0, GRID_SIZE)`, which happens for points lying outside the bounding box the codec was
    /// built from.
    pub fn to_grid(&self, p: &[f64; D]) -> Result<[i32; D]> {
        let mut ijk = [0; D];
        for k in 0..D {
            let scaled = ((p[k] - self.origin[k]) * self.scale).floor();
            match scaled.to_i32() {
                Some(i) if (0..GRID_SIZE).contains(&i) => ijk[k] = i,
                _ => {
                    return Err(OrthtreeError::OutOfBounds {
                        axis: k,
                        value: p[k],
                    })
                }
            }
        }
        Ok(ijk)
    }

    /// Transform domain coordinates into grid coordinates without any range check.
    ///
    /// Used for query points, which are allowed to lie outside the grid.
    pub fn query_grid(&self, p: &[f64; D]) -> [i64; D] {
        std::array::from_fn(|k| ((p[k] - self.origin[k]) * self.scale).floor() as i64)
    }

    /// Transform grid coordinates into domain coordinates.
    ///
    /// This is lossy: `to_domain(to_grid(p))` only recovers `p` within one
    /// [`quantum`][Self::quantum] on each axis.
    pub fn to_domain(&self, ijk: &[i32; D]) -> [f64; D] {
        std::array::from_fn(|k| self.origin[k] + ijk[k] as f64 / self.scale)
    }

    /// Domain coordinates of the center of the grid.
    pub fn center(&self) -> [f64; D] {
        std::array::from_fn(|k| self.origin[k] + GRID_SIZE as f64 * 0.5 / self.scale)
    }
}
