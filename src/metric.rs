//! Distance metrics for nearest-neighbor queries.
//!
//! Meshing curved surfaces measures distances with a local Riemannian metric, under which the
//! set of points closer than `d` to a query is an ellipse rather than a circle. The index only
//! needs two things from a metric: the distance itself, and an over-estimate of how far a point
//! at metric distance `d` can lie from the query along each axis. Pruning uses the box enclosing
//! that ellipse, which is conservative: no closer point is ever discarded, but some cells may be
//! visited needlessly.

/// A trait for calculating distances between domain points.
///
/// `context` is the location where the metric is evaluated. The index always passes the query
/// point.
///
/// For [`find_nearest`][crate::orthtree::OrthtreeIndex::find_nearest] to be exact, `distance`
/// must be a true metric, and [`unit_ball_extent`][DistanceMetric::unit_ball_extent] must never
/// under-estimate the local anisotropy.
pub trait DistanceMetric<const D: usize> {
    /// Distance between `a` and `b`, evaluated at `context`.
    fn distance(&self, a: &[f64; D], b: &[f64; D], context: &[f64; D]) -> f64;

    /// Largest domain displacement, over all axes, of a point at unit distance from `context`.
    fn local_scale(&self, context: &[f64; D]) -> f64 {
        let _ = context;
        1.0
    }

    /// Half extent, along each axis, of the unit ball centered at `context`.
    ///
    /// Defaults to [`local_scale`][DistanceMetric::local_scale] on every axis.
    fn unit_ball_extent(&self, context: &[f64; D]) -> [f64; D] {
        [self.local_scale(context); D]
    }
}

/// Euclidean distance metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanDistance;

impl<const D: usize> DistanceMetric<D> for EuclideanDistance {
    #[inline]
    fn distance(&self, a: &[f64; D], b: &[f64; D], _context: &[f64; D]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }
}

/// Anisotropic metric with a constant weight per axis.
///
/// The distance is `sqrt(sum((w[k] * (a[k] - b[k]))^2))`, so the unit ball is an axis-aligned
/// ellipsoid with half extent `1 / w[k]` along axis `k`.
#[derive(Debug, Clone, Copy)]
pub struct ScaledDistance<const D: usize> {
    weights: [f64; D],
}

impl<const D: usize> ScaledDistance<D> {
    /// Create a new metric from per-axis weights.
    ///
    /// # Panics
    ///
    /// If a weight is not strictly positive and finite.
    pub fn new(weights: [f64; D]) -> Self {
        assert!(
            weights.iter().all(|w| w.is_finite() && *w > 0.0),
            "Metric weights must be positive, got {:?}",
            weights
        );
        Self { weights }
    }

    /// Per-axis weights of this metric.
    pub fn weights(&self) -> &[f64; D] {
        &self.weights
    }
}

impl<const D: usize> DistanceMetric<D> for ScaledDistance<D> {
    #[inline]
    fn distance(&self, a: &[f64; D], b: &[f64; D], _context: &[f64; D]) -> f64 {
        let mut sum = 0.0;
        for k in 0..D {
            let d = self.weights[k] * (a[k] - b[k]);
            sum += d * d;
        }
        sum.sqrt()
    }

    fn local_scale(&self, _context: &[f64; D]) -> f64 {
        self.weights.iter().fold(0.0, |acc, w| acc.max(1.0 / w))
    }

    fn unit_ball_extent(&self, _context: &[f64; D]) -> [f64; D] {
        std::array::from_fn(|k| 1.0 / self.weights[k])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance() {
        let metric = EuclideanDistance;
        let distance = metric.distance(&[0.0, 0.0], &[3.0, 4.0], &[0.0, 0.0]);
        assert!((distance - 5.0).abs() < 1e-10);

        let distance = metric.distance(&[1.0, 1.0, 1.0], &[2.0, 3.0, 3.0], &[1.0, 1.0, 1.0]);
        assert!((distance - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_euclidean_extent() {
        let metric = EuclideanDistance;
        assert_eq!(metric.local_scale(&[0.0, 0.0]), 1.0);
        assert_eq!(metric.unit_ball_extent(&[0.0, 0.0, 0.0]), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_scaled_distance() {
        let metric = ScaledDistance::new([1.0, 4.0]);
        let distance = metric.distance(&[0.0, 0.0], &[3.0, 1.0], &[0.0, 0.0]);
        assert!((distance - 5.0).abs() < 1e-10);
        assert_eq!(metric.unit_ball_extent(&[0.0, 0.0]), [1.0, 0.25]);
        assert_eq!(metric.local_scale(&[0.0, 0.0]), 1.0);
    }

    #[test]
    fn test_scaled_extent_bounds_displacement() {
        // A point at metric distance d never moves further than d * extent along an axis
        let metric = ScaledDistance::new([0.5, 2.0, 3.0]);
        let origin = [0.0; 3];
        let extent = metric.unit_ball_extent(&origin);
        for p in [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.3, -0.2, 0.7]] {
            let d = metric.distance(&origin, &p, &origin);
            for k in 0..3 {
                assert!(p[k].abs() <= d * extent[k] + 1e-12);
            }
        }
    }

    #[test]
    #[should_panic]
    fn test_scaled_rejects_zero_weight() {
        ScaledDistance::new([1.0, 0.0]);
    }
}
