//! Cells of an orthtree and the arena owning them.

use std::mem;
use std::ops::Index;

use tinyvec::TinyVec;

/// Child slots of an internal cell. Inline for up to three dimensions.
pub(crate) type Children = TinyVec<[Option<CellId>; 8]>;

/// Stable handle onto a cell of an [`Orthtree`][crate::orthtree::Orthtree].
///
/// Handles of released cells are recycled by later splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellId(usize);

/// An item stored in a leaf, along with its grid coordinates at insertion time.
#[derive(Debug, Clone)]
pub(crate) struct Entry<P, const D: usize> {
    pub(crate) item: P,
    pub(crate) grid: [i32; D],
}

#[derive(Debug, Clone)]
pub(crate) enum Slots<P, const D: usize> {
    /// Items of a leaf, in insertion order.
    Bucket(Vec<Entry<P, D>>),
    /// `count` is the total number of items stored below this cell.
    Children { count: usize, children: Children },
}

/// A cell of an orthtree.
///
/// A cell is either a leaf holding a bucket of items, or an internal node with `2^D` child
/// slots, some of which may be empty. Cells carry no location: the traversal passes their size
/// and grid origin alongside them.
#[derive(Debug, Clone)]
pub struct Cell<P, const D: usize> {
    pub(crate) slots: Slots<P, D>,
}

impl<P, const D: usize> Cell<P, D> {
    pub(crate) fn empty_leaf() -> Self {
        Self {
            slots: Slots::Bucket(Vec::new()),
        }
    }

    /// Returns `true` if this cell holds items rather than children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.slots, Slots::Bucket(_))
    }

    /// Number of items stored in this cell, including those stored in its descendants.
    #[inline]
    pub fn count(&self) -> usize {
        match &self.slots {
            Slots::Bucket(entries) => entries.len(),
            Slots::Children { count, .. } => *count,
        }
    }

    /// Items held by this cell. Always empty for internal cells.
    pub fn items(&self) -> impl Iterator<Item = &P> + '_ {
        self.entries().iter().map(|entry| &entry.item)
    }

    /// The `i`-th item of a leaf.
    pub fn item(&self, i: usize) -> Option<&P> {
        self.entries().get(i).map(|entry| &entry.item)
    }

    #[inline]
    pub(crate) fn entries(&self) -> &[Entry<P, D>] {
        match &self.slots {
            Slots::Bucket(entries) => entries,
            Slots::Children { .. } => &[],
        }
    }

    /// Child slots of an internal cell, or `None` for a leaf.
    #[inline]
    pub(crate) fn children(&self) -> Option<&[Option<CellId>]> {
        match &self.slots {
            Slots::Bucket(_) => None,
            Slots::Children { children, .. } => Some(children.as_slice()),
        }
    }

    pub(crate) fn push_entry(&mut self, entry: Entry<P, D>) {
        match &mut self.slots {
            Slots::Bucket(entries) => entries.push(entry),
            Slots::Children { .. } => unreachable!("internal cells hold no entries"),
        }
    }

    /// Remove the entry at `position`, shifting the following ones to the left.
    pub(crate) fn remove_entry(&mut self, position: usize) -> Entry<P, D> {
        match &mut self.slots {
            Slots::Bucket(entries) => entries.remove(position),
            Slots::Children { .. } => unreachable!("internal cells hold no entries"),
        }
    }

    /// Turn a leaf into an internal cell, returning its former entries.
    pub(crate) fn convert_to_internal(&mut self, count: usize, children: Children) -> Vec<Entry<P, D>> {
        match mem::replace(&mut self.slots, Slots::Children { count, children }) {
            Slots::Bucket(entries) => entries,
            Slots::Children { .. } => unreachable!("only leaves can be split"),
        }
    }

    pub(crate) fn increment_count(&mut self) {
        if let Slots::Children { count, .. } = &mut self.slots {
            *count += 1;
        }
    }

    /// Decrement the total of an internal cell and return the new total.
    pub(crate) fn decrement_count(&mut self) -> usize {
        match &mut self.slots {
            Slots::Children { count, .. } => {
                debug_assert!(*count > 0);
                *count -= 1;
                *count
            }
            Slots::Bucket(entries) => entries.len(),
        }
    }

    pub(crate) fn set_child(&mut self, slot: usize, child: Option<CellId>) {
        if let Slots::Children { children, .. } = &mut self.slots {
            children[slot] = child;
        }
    }
}

/// Index of the child containing grid coordinates `ijk`, for children of side `size`.
///
/// Bit `k` of the result is set when the coordinate on axis `k` lies in the upper half of the
/// parent cell. In 2D:
/// ```text
///      +---+---+
///  J=1 | 2 | 3 |    I = i & size
///      +---+---+    J = j & size
///  J=0 | 0 | 1 |
///      +---+---+
///       I=0 I=1
/// ```
#[inline]
pub(crate) fn child_slot<const D: usize>(ijk: &[i32; D], size: i32) -> usize {
    debug_assert!(size > 0);
    let mut slot = 0;
    for (k, &i) in ijk.iter().enumerate() {
        if i & size != 0 {
            slot |= 1 << k;
        }
    }
    slot
}

/// Owner of all cells of a tree. Released cells are kept on a free list and reused.
#[derive(Debug, Clone)]
pub(crate) struct CellArena<P, const D: usize> {
    cells: Vec<Cell<P, D>>,
    free: Vec<CellId>,
}

impl<P, const D: usize> CellArena<P, D> {
    pub(crate) fn new() -> Self {
        Self {
            cells: vec![],
            free: vec![],
        }
    }

    /// Number of live cells.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.cells.len() - self.free.len()
    }

    pub(crate) fn alloc(&mut self, cell: Cell<P, D>) -> CellId {
        match self.free.pop() {
            Some(id) => {
                self.cells[id.0] = cell;
                id
            }
            None => {
                self.cells.push(cell);
                CellId(self.cells.len() - 1)
            }
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: CellId) -> &mut Cell<P, D> {
        &mut self.cells[id.0]
    }

    /// Release `id` and every cell below it. Returns the number of released cells.
    pub(crate) fn release_subtree(&mut self, id: CellId) -> usize {
        let mut stack = vec![id];
        let mut released = 0;
        while let Some(id) = stack.pop() {
            let cell = mem::replace(&mut self.cells[id.0], Cell::empty_leaf());
            if let Slots::Children { children, .. } = cell.slots {
                stack.extend(children.into_iter().flatten());
            }
            self.free.push(id);
            released += 1;
        }
        released
    }
}

impl<P, const D: usize> Index<CellId> for CellArena<P, D> {
    type Output = Cell<P, D>;

    #[inline]
    fn index(&self, id: CellId) -> &Self::Output {
        &self.cells[id.0]
    }
}
