use geo_traits::CoordTrait;
use tracing::trace;

use crate::codec::CoordinateCodec;
use crate::error::Result;
use crate::metric::{DistanceMetric, EuclideanDistance};
use crate::orthtree::cell::{child_slot, Cell, CellId};
use crate::orthtree::constants::{GRID_SIZE, PRUNING_SLACK};
use crate::orthtree::index::Orthtree;
use crate::orthtree::traversal::{Cursor, Walk};
use crate::r#type::{coord_to_array, ItemRef};

/// A trait for searching and accessing data out of an Orthtree.
pub trait OrthtreeIndex<P: ItemRef<D>, const D: usize>: Sized {
    /// Access a cell of this tree.
    fn cell(&self, id: CellId) -> &Cell<P, D>;

    /// Handle of the root cell, which exists for the whole lifetime of the tree.
    fn root_id(&self) -> CellId;

    /// Conversion between domain and grid coordinates used by this tree.
    fn codec(&self) -> &CoordinateCodec<D>;

    /// The maximal number of items held by a leaf.
    fn bucket_size(&self) -> usize;

    /// The number of live cells, maintained incrementally.
    fn num_cells(&self) -> usize;

    /// The root cell.
    fn root(&self) -> &Cell<P, D> {
        self.cell(self.root_id())
    }

    /// The number of items in this tree.
    fn len(&self) -> usize {
        self.root().count()
    }

    /// Returns `true` if this tree holds no item.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `visit` to every cell in prefix order.
    ///
    /// `visit` receives the cell, its side and the grid coordinates of its lower corner. It
    /// decides whether children of the cell are visited ([`Walk::Continue`]), skipped
    /// ([`Walk::SkipChildren`]), or whether the traversal stops ([`Walk::Abort`]).
    ///
    /// Returns `true` if the traversal ran to completion, `false` if it was aborted.
    ///
    /// ```
    /// use orthtree::orthtree::{Orthtree, OrthtreeIndex, Walk};
    ///
    /// let points = vec![[1.0, 1.0], [2.0, 5.0], [8.0, 3.0]];
    /// let mut tree = Orthtree::new([0.0, 0.0], [10.0, 10.0]).unwrap();
    /// for p in &points {
    ///     tree.add(p).unwrap();
    /// }
    ///
    /// let mut count = 0;
    /// tree.walk(|cell, _size, _origin| {
    ///     count += cell.items().count();
    ///     Walk::Continue
    /// });
    /// assert_eq!(count, 3);
    /// ```
    fn walk<'a, F>(&'a self, mut visit: F) -> bool
    where
        P: 'a,
        F: FnMut(&'a Cell<P, D>, i32, &[i32; D]) -> Walk,
    {
        let mut cursor = Cursor::new(self.root_id(), GRID_SIZE, [0; D]);
        loop {
            let cell = self.cell(cursor.cell());
            let action = visit(cell, cursor.size(), cursor.origin());
            if action == Walk::Abort {
                return false;
            }
            if action == Walk::Continue && cursor.descend(self) {
                continue;
            }
            if !cursor.advance(self) {
                return true;
            }
        }
    }

    /// Collect all items of this tree.
    fn items(&self) -> Vec<&P> {
        let mut items = Vec::with_capacity(self.len());
        self.walk(|cell, _, _| {
            items.extend(cell.items());
            Walk::Continue
        });
        items
    }

    /// Return an item close to `query`, using Euclidean distance.
    ///
    /// See [`find_near_with_metric`][OrthtreeIndex::find_near_with_metric].
    fn find_near(&self, query: &[f64; D]) -> Option<&P> {
        self.find_near_with_metric(query, &EuclideanDistance)
    }

    /// Return an item close to `query`.
    ///
    /// The leaf which would contain `query` is located; if it holds items, the nearest of them
    /// is returned. Otherwise the nearest item of the first populated leaf found below the last
    /// existing ancestor is returned. Items in other leaves may of course be nearer; the result
    /// is a cheap starting point for
    /// [`find_nearest_with_metric`][OrthtreeIndex::find_nearest_with_metric].
    ///
    /// Returns `None` if the tree is empty. `query` may lie outside the bounding box.
    fn find_near_with_metric<M: DistanceMetric<D>>(
        &self,
        query: &[f64; D],
        metric: &M,
    ) -> Option<&P> {
        near_candidate(self, query, metric).map(|(item, _)| item)
    }

    /// Return the nearest item to `query`, using Euclidean distance.
    fn find_nearest(&self, query: &[f64; D]) -> Option<&P> {
        self.find_nearest_with_metric(query, &EuclideanDistance)
    }

    /// Return the nearest item to `query` under `metric`.
    ///
    /// The search starts from [`find_near_with_metric`][OrthtreeIndex::find_near_with_metric],
    /// then walks the tree, skipping cells which cannot contain an item nearer than the best one
    /// found so far. Under an anisotropic metric, the ellipse of nearer points is replaced by its
    /// enclosing box, so more cells than necessary may be visited, but the result is exact
    /// provided `metric` is a true metric whose
    /// [`unit_ball_extent`][DistanceMetric::unit_ball_extent] is not under-estimated.
    ///
    /// Returns `None` if the tree is empty. When several items are at the same distance, any of
    /// them may be returned.
    fn find_nearest_with_metric<M: DistanceMetric<D>>(
        &self,
        query: &[f64; D],
        metric: &M,
    ) -> Option<&P> {
        let (mut nearest, mut best_dist) = near_candidate(self, query, metric)?;

        let ijk = self.codec().query_grid(query);
        let extent = metric.unit_ball_extent(query);
        let scale = self.codec().scale();
        let grid_per_unit: [f64; D] = std::array::from_fn(|k| PRUNING_SLACK * scale * extent[k]);
        let mut bound = grid_bound(best_dist, &grid_per_unit);

        let mut searched_cells = 0;
        self.walk(|cell, size, origin| {
            for k in 0..D {
                let lower = (origin[k] as i64).saturating_sub(bound[k]);
                let upper = (origin[k] as i64 + size as i64).saturating_add(bound[k]);
                if ijk[k] < lower || ijk[k] > upper {
                    return Walk::SkipChildren;
                }
            }
            searched_cells += 1;

            let mut improved = false;
            for entry in cell.entries() {
                let dist = metric.distance(query, &entry.item.position(), query);
                if dist < best_dist {
                    best_dist = dist;
                    nearest = &entry.item;
                    improved = true;
                }
            }
            if improved {
                bound = grid_bound(best_dist, &grid_per_unit);
            }
            Walk::Continue
        });
        trace!(
            searched_cells,
            num_cells = self.num_cells(),
            best_dist,
            "nearest item located"
        );

        Some(nearest)
    }

    /// Return the nearest item to a geo-traits coordinate, using Euclidean distance.
    ///
    /// Fails if the coordinate does not have exactly `D` dimensions.
    fn find_nearest_coord(&self, coord: &impl CoordTrait<T = f64>) -> Result<Option<&P>> {
        let query = coord_to_array(coord)?;
        Ok(self.find_nearest(&query))
    }

    /// Slow variant of [`find_nearest`][OrthtreeIndex::find_nearest] visiting every cell.
    ///
    /// This is meant for debugging and validation only.
    fn find_nearest_brute(&self, query: &[f64; D]) -> Option<&P> {
        self.find_nearest_brute_with_metric(query, &EuclideanDistance)
    }

    /// Slow variant of [`find_nearest_with_metric`][OrthtreeIndex::find_nearest_with_metric]
    /// visiting every cell.
    fn find_nearest_brute_with_metric<M: DistanceMetric<D>>(
        &self,
        query: &[f64; D],
        metric: &M,
    ) -> Option<&P> {
        let mut nearest: Option<(&P, f64)> = None;
        self.walk(|cell, _, _| {
            if let Some((item, dist)) = closest_in_leaf(cell, query, metric) {
                if nearest.map_or(true, |(_, best_dist)| dist < best_dist) {
                    nearest = Some((item, dist));
                }
            }
            Walk::Continue
        });
        nearest.map(|(item, _)| item)
    }

    /// Count live cells by walking the tree. This should agree with
    /// [`num_cells`][OrthtreeIndex::num_cells] and is meant for diagnostics.
    fn count_cells(&self) -> usize {
        let mut count = 0;
        self.walk(|_, _, _| {
            count += 1;
            Walk::Continue
        });
        count
    }

    /// Side of the smallest cell, in grid units.
    fn min_cell_size(&self) -> i32 {
        let mut min_size = GRID_SIZE;
        self.walk(|_, size, _| {
            min_size = min_size.min(size);
            Walk::Continue
        });
        min_size
    }

    /// Number of levels of the tree; a tree reduced to its root has one level.
    fn max_level(&self) -> usize {
        let mut size = self.min_cell_size();
        let mut level = 1;
        while size < GRID_SIZE {
            size <<= 1;
            level += 1;
        }
        level
    }
}

impl<P: ItemRef<D>, const D: usize> OrthtreeIndex<P, D> for Orthtree<P, D> {
    fn cell(&self, id: CellId) -> &Cell<P, D> {
        &self.cells[id]
    }

    fn root_id(&self) -> CellId {
        self.root
    }

    fn codec(&self) -> &CoordinateCodec<D> {
        &self.codec
    }

    fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    fn num_cells(&self) -> usize {
        self.cells.len()
    }
}

/// Locate the leaf of `query` and return its nearest item along with its distance, falling back
/// to the first populated leaf below the last existing ancestor.
fn near_candidate<'a, P, T, M, const D: usize>(
    tree: &'a T,
    query: &[f64; D],
    metric: &M,
) -> Option<(&'a P, f64)>
where
    P: ItemRef<D>,
    T: OrthtreeIndex<P, D>,
    M: DistanceMetric<D>,
{
    let grid = tree.codec().query_grid(query);
    let ijk: [i32; D] = std::array::from_fn(|k| grid[k].clamp(0, GRID_SIZE as i64 - 1) as i32);

    let mut current = tree.root_id();
    let mut size = GRID_SIZE;
    let mut origin = [0; D];
    let mut searched_cells = 1;
    while let Some(children) = tree.cell(current).children() {
        let slot = child_slot(&ijk, size >> 1);
        match children[slot] {
            Some(child) if tree.cell(child).count() > 0 => {
                size >>= 1;
                for (k, o) in origin.iter_mut().enumerate() {
                    if slot & (1 << k) != 0 {
                        *o += size;
                    }
                }
                current = child;
                searched_cells += 1;
            }
            _ => {
                trace!(searched_cells, "no populated leaf at query, searching siblings");
                return near_in_subtree(tree, Cursor::new(current, size, origin), query, metric);
            }
        }
    }
    trace!(
        searched_cells,
        num_cells = tree.num_cells(),
        "near item located"
    );
    closest_in_leaf(tree.cell(current), query, metric)
}

/// Nearest item of the first populated leaf met by `cursor`.
fn near_in_subtree<'a, P, T, M, const D: usize>(
    tree: &'a T,
    mut cursor: Cursor<D>,
    query: &[f64; D],
    metric: &M,
) -> Option<(&'a P, f64)>
where
    P: ItemRef<D>,
    T: OrthtreeIndex<P, D>,
    M: DistanceMetric<D>,
{
    loop {
        if let Some(found) = closest_in_leaf(tree.cell(cursor.cell()), query, metric) {
            return Some(found);
        }
        if cursor.descend(tree) {
            continue;
        }
        if !cursor.advance(tree) {
            return None;
        }
    }
}

/// Nearest item of a leaf, or `None` for empty leaves and internal cells.
fn closest_in_leaf<'a, P, M, const D: usize>(
    cell: &'a Cell<P, D>,
    query: &[f64; D],
    metric: &M,
) -> Option<(&'a P, f64)>
where
    P: ItemRef<D>,
    M: DistanceMetric<D>,
{
    let mut nearest: Option<(&P, f64)> = None;
    for entry in cell.entries() {
        let dist = metric.distance(query, &entry.item.position(), query);
        if nearest.map_or(true, |(_, best_dist)| dist < best_dist) {
            nearest = Some((&entry.item, dist));
        }
    }
    nearest
}

/// Convert a distance bound into a per-axis bound in grid units.
#[inline]
fn grid_bound<const D: usize>(distance: f64, grid_per_unit: &[f64; D]) -> [i64; D] {
    std::array::from_fn(|k| (distance * grid_per_unit[k]).ceil() as i64)
}
