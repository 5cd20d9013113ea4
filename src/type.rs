use std::rc::Rc;
use std::sync::Arc;

use geo_traits::CoordTrait;

use crate::error::{OrthtreeError, Result};

/// A trait for values that have a position in `D`-dimensional domain space.
pub trait Location<const D: usize> {
    /// Domain coordinates of this value.
    fn position(&self) -> [f64; D];
}

impl<const D: usize> Location<D> for [f64; D] {
    #[inline]
    fn position(&self) -> [f64; D] {
        *self
    }
}

/// A cheap handle onto a located item, as stored in the buckets of an
/// [`Orthtree`][crate::orthtree::Orthtree].
///
/// The index never owns the item behind the handle, it only keeps a clone of the handle.
/// Membership is decided by [`same_item`][ItemRef::same_item], not by position, so two items
/// sharing a position are distinct entries.
///
/// Implementations are provided for references, [`Rc`] and [`Arc`], all comparing by address.
/// Integer vertex ids or other custom handles can implement this trait with value equality.
pub trait ItemRef<const D: usize>: Location<D> + Clone {
    /// Returns `true` if both handles designate the same item.
    fn same_item(&self, other: &Self) -> bool;
}

impl<T: Location<D> + ?Sized, const D: usize> Location<D> for &T {
    #[inline]
    fn position(&self) -> [f64; D] {
        (**self).position()
    }
}

impl<T: Location<D> + ?Sized, const D: usize> ItemRef<D> for &T {
    #[inline]
    fn same_item(&self, other: &Self) -> bool {
        std::ptr::eq(*self, *other)
    }
}

impl<T: Location<D> + ?Sized, const D: usize> Location<D> for Rc<T> {
    #[inline]
    fn position(&self) -> [f64; D] {
        (**self).position()
    }
}

impl<T: Location<D> + ?Sized, const D: usize> ItemRef<D> for Rc<T> {
    #[inline]
    fn same_item(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: Location<D> + ?Sized, const D: usize> Location<D> for Arc<T> {
    #[inline]
    fn position(&self) -> [f64; D] {
        (**self).position()
    }
}

impl<T: Location<D> + ?Sized, const D: usize> ItemRef<D> for Arc<T> {
    #[inline]
    fn same_item(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

/// Read a `D`-dimensional coordinate out of a geo-traits coordinate.
pub(crate) fn coord_to_array<const D: usize>(coord: &impl CoordTrait<T = f64>) -> Result<[f64; D]> {
    let found = coord.dim().size();
    if found != D {
        return Err(OrthtreeError::DimensionMismatch { expected: D, found });
    }
    let mut out = [0.0; D];
    for (k, value) in out.iter_mut().enumerate() {
        *value = coord
            .nth(k)
            .ok_or(OrthtreeError::DimensionMismatch { expected: D, found })?;
    }
    Ok(out)
}
