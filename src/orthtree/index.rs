use geo_traits::RectTrait;
use tinyvec::TinyVec;
use tracing::{debug, trace};

use crate::codec::CoordinateCodec;
use crate::error::{OrthtreeError, Result};
use crate::orthtree::cell::{child_slot, Cell, CellArena, CellId, Children, Entry};
use crate::orthtree::constants::{DEFAULT_BUCKET_SIZE, GRID_SIZE, MAX_DIMENSION};
use crate::r#type::{coord_to_array, ItemRef};

/// A dynamic orthtree: a quadtree when `D == 2`, an octree when `D == 3`.
///
/// Items are handles implementing [`ItemRef`]. They are added and removed one by one while a
/// mesh evolves, and queried through the [`OrthtreeIndex`][crate::orthtree::OrthtreeIndex]
/// trait.
///
/// ```
/// use orthtree::orthtree::{Orthtree, OrthtreeIndex};
///
/// let points = vec![[1.0, 1.0], [2.0, 5.0], [8.0, 3.0]];
/// let mut tree = Orthtree::new([0.0, 0.0], [10.0, 10.0]).unwrap();
/// for p in &points {
///     tree.add(p).unwrap();
/// }
///
/// let nearest = tree.find_nearest(&[7.0, 4.0]).unwrap();
/// assert_eq!(*nearest, &[8.0, 3.0]);
///
/// tree.remove(&&points[2]).unwrap();
/// assert_eq!(tree.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Orthtree<P, const D: usize> {
    pub(crate) cells: CellArena<P, D>,
    pub(crate) root: CellId,
    pub(crate) bucket_size: usize,
    pub(crate) codec: CoordinateCodec<D>,
}

impl<P: ItemRef<D>, const D: usize> Orthtree<P, D> {
    /// Create an empty tree over the bounding box `[bbmin, bbmax]` with the default bucket size.
    ///
    /// The default is [`DEFAULT_BUCKET_SIZE`], raised to `2^D` in more than three dimensions.
    pub fn new(bbmin: [f64; D], bbmax: [f64; D]) -> Result<Self> {
        let bucket_size = DEFAULT_BUCKET_SIZE.max(1 << D.min(MAX_DIMENSION));
        Self::new_with_bucket_size(bbmin, bbmax, bucket_size)
    }

    /// Create an empty tree over the bounding box `[bbmin, bbmax]`.
    ///
    /// Every item added later must lie inside this box. `bucket_size` is the maximal number of
    /// items held by a leaf, and must be at least `2^D`.
    pub fn new_with_bucket_size(
        bbmin: [f64; D],
        bbmax: [f64; D],
        bucket_size: usize,
    ) -> Result<Self> {
        if D == 0 || D > MAX_DIMENSION {
            return Err(OrthtreeError::UnsupportedDimension(D));
        }
        let min = 1 << D;
        if bucket_size < min {
            return Err(OrthtreeError::InvalidBucketSize { bucket_size, min });
        }

        let codec = CoordinateCodec::try_new(bbmin, bbmax)?;
        let mut cells = CellArena::new();
        let root = cells.alloc(Cell::empty_leaf());
        debug!(dimension = D, bucket_size, "new orthtree");

        Ok(Self {
            cells,
            root,
            bucket_size,
            codec,
        })
    }

    /// Create an empty tree covering a rectangle, with the default bucket size.
    pub fn try_from_rect(rect: &impl RectTrait<T = f64>) -> Result<Self> {
        Self::new(coord_to_array(&rect.min())?, coord_to_array(&rect.max())?)
    }

    /// Add an item to the tree.
    ///
    /// Returns `true` if a full leaf had to be split.
    ///
    /// Fails if the item lies outside the bounding box, or if more than `bucket_size` items
    /// would share the same grid coordinates. The tree is left untouched on failure.
    pub fn add(&mut self, item: P) -> Result<bool> {
        let grid = self.codec.to_grid(&item.position())?;

        let mut path: TinyVec<[CellId; 32]> = TinyVec::new();
        let mut current = self.root;
        let mut size = GRID_SIZE;
        while let Some(children) = self.cells[current].children() {
            size >>= 1;
            let slot = child_slot(&grid, size);
            let child = children[slot];
            path.push(current);
            current = match child {
                Some(child) => child,
                None => {
                    let child = self.cells.alloc(Cell::empty_leaf());
                    self.cells.get_mut(current).set_child(slot, Some(child));
                    child
                }
            };
        }

        // Splitting can only separate items with distinct grid coordinates
        let leaf = &self.cells[current];
        if leaf.count() >= self.bucket_size && leaf.entries().iter().all(|e| e.grid == grid) {
            return Err(OrthtreeError::MaxDepthExceeded {
                bucket_size: self.bucket_size,
            });
        }

        for &ancestor in path.iter() {
            self.cells.get_mut(ancestor).increment_count();
        }

        let mut split = false;
        while self.cells[current].count() >= self.bucket_size {
            size >>= 1;
            current = self.split(current, size, &grid);
            split = true;
        }
        self.cells.get_mut(current).push_entry(Entry { item, grid });
        Ok(split)
    }

    /// Split the full leaf `id` into `2^D` leaves of side `size`, and return the one containing
    /// `grid`.
    fn split(&mut self, id: CellId, size: i32, grid: &[i32; D]) -> CellId {
        debug_assert!(size > 0, "leaf of unit size cannot be split");
        let leaves: TinyVec<[CellId; 8]> = (0..1 << D)
            .map(|_| self.cells.alloc(Cell::empty_leaf()))
            .collect();
        let children: Children = leaves.iter().map(|&leaf| Some(leaf)).collect();

        // The new total accounts for the item being added
        let count = self.cells[id].count() + 1;
        let entries = self.cells.get_mut(id).convert_to_internal(count, children);
        for entry in entries {
            let slot = child_slot(&entry.grid, size);
            self.cells.get_mut(leaves[slot]).push_entry(entry);
        }
        trace!(cell = ?id, size, "split full leaf");

        leaves[child_slot(grid, size)]
    }

    /// Remove an item from the tree.
    ///
    /// The item is looked up by identity (see [`ItemRef::same_item`]) in the leaf its position
    /// maps to, so it must not have moved since it was added. A leaf left empty is detached from
    /// its parent, as is any internal cell left without items; chains of internal cells with a
    /// single child are not collapsed.
    ///
    /// Fails with [`OrthtreeError::NotFound`] if the item is not stored in the tree. The tree is
    /// left untouched on failure.
    pub fn remove(&mut self, item: &P) -> Result<()> {
        let grid = self.codec.to_grid(&item.position())?;

        // `path[i]` holds the i-th internal cell from the root and the slot followed in it
        let mut path: TinyVec<[(CellId, usize); 32]> = TinyVec::new();
        let mut current = self.root;
        let mut size = GRID_SIZE;
        while let Some(children) = self.cells[current].children() {
            size >>= 1;
            let slot = child_slot(&grid, size);
            let child = children[slot].ok_or(OrthtreeError::NotFound)?;
            path.push((current, slot));
            current = child;
        }

        let position = self.cells[current]
            .entries()
            .iter()
            .position(|entry| entry.item.same_item(item))
            .ok_or(OrthtreeError::NotFound)?;
        self.cells.get_mut(current).remove_entry(position);

        let mut emptied = None;
        for (depth, &(cell, _)) in path.iter().enumerate() {
            if self.cells.get_mut(cell).decrement_count() == 0 && emptied.is_none() {
                emptied = Some(depth);
            }
        }
        if emptied.is_none() && self.cells[current].count() == 0 {
            emptied = Some(path.len());
        }

        match emptied {
            None => {}
            Some(0) => self.reset_root(),
            Some(depth) => {
                let (parent, slot) = path[depth - 1];
                let cell = path.get(depth).map_or(current, |&(cell, _)| cell);
                self.cells.get_mut(parent).set_child(slot, None);
                let released = self.cells.release_subtree(cell);
                trace!(cell = ?cell, released, "released empty cells");
            }
        }
        Ok(())
    }

    /// Turn the root back into an empty leaf, releasing everything below it.
    fn reset_root(&mut self) {
        let children: Vec<CellId> = self.cells[self.root]
            .children()
            .unwrap_or(&[])
            .iter()
            .flatten()
            .copied()
            .collect();
        *self.cells.get_mut(self.root) = Cell::empty_leaf();
        for child in children {
            self.cells.release_subtree(child);
        }
    }
}
