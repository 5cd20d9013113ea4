//! Utilities to traverse the Orthtree structure.

use tinyvec::TinyVec;

use crate::orthtree::cell::CellId;
use crate::orthtree::constants::MAX_LEVEL;
use crate::orthtree::OrthtreeIndex;
use crate::r#type::ItemRef;

/// Decision returned by a visitor passed to [`walk`][OrthtreeIndex::walk].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Visit the children of this cell, then continue.
    Continue,
    /// Do not visit the children of this cell, continue with its siblings.
    SkipChildren,
    /// Stop the traversal immediately.
    Abort,
}

#[derive(Debug, Clone, Copy, Default)]
struct Frame {
    cell: CellId,
    /// Slot of `cell` in its parent. Unused for the starting cell.
    slot: usize,
}

/// Explicit-stack cursor visiting a subtree in prefix order.
///
/// The grid origin of the current cell is maintained incrementally: the size of a child is added
/// on the axes whose bit is set in its slot when entering it, and subtracted when leaving it.
#[derive(Debug, Clone)]
pub(crate) struct Cursor<const D: usize> {
    stack: TinyVec<[Frame; 32]>,
    size: i32,
    origin: [i32; D],
}

impl<const D: usize> Cursor<D> {
    /// Create a cursor on `start`, a cell of side `size` whose lower corner is `origin`.
    pub(crate) fn new(start: CellId, size: i32, origin: [i32; D]) -> Self {
        let mut stack = TinyVec::new();
        stack.push(Frame {
            cell: start,
            slot: 0,
        });
        Self {
            stack,
            size,
            origin,
        }
    }

    /// The current cell.
    #[inline]
    pub(crate) fn cell(&self) -> CellId {
        self.stack[self.stack.len() - 1].cell
    }

    /// Side of the current cell, in grid units.
    #[inline]
    pub(crate) fn size(&self) -> i32 {
        self.size
    }

    /// Lower corner of the current cell, in grid coordinates.
    #[inline]
    pub(crate) fn origin(&self) -> &[i32; D] {
        &self.origin
    }

    /// Move to the first child of the current cell.
    ///
    /// Returns `false`, without moving, if the current cell is a leaf or has no child.
    pub(crate) fn descend<P: ItemRef<D>>(&mut self, tree: &impl OrthtreeIndex<P, D>) -> bool {
        let Some(children) = tree.cell(self.cell()).children() else {
            return false;
        };
        let Some((slot, child)) = next_child(children, 0) else {
            return false;
        };
        debug_assert!(self.stack.len() <= MAX_LEVEL as usize);
        self.size >>= 1;
        self.shift(slot, 1);
        self.stack.push(Frame { cell: child, slot });
        true
    }

    /// Move to the next cell in prefix order which is not a descendant of the current one.
    ///
    /// Returns `false` once the whole subtree of the starting cell has been visited.
    pub(crate) fn advance<P: ItemRef<D>>(&mut self, tree: &impl OrthtreeIndex<P, D>) -> bool {
        while self.stack.len() > 1 {
            let depth = self.stack.len() - 1;
            let parent = self.stack[depth - 1].cell;
            let slot = self.stack[depth].slot;
            self.shift(slot, -1);

            let siblings = tree.cell(parent).children().unwrap_or(&[]);
            if let Some((next_slot, sibling)) = next_child(siblings, slot + 1) {
                self.shift(next_slot, 1);
                self.stack[depth] = Frame {
                    cell: sibling,
                    slot: next_slot,
                };
                return true;
            }

            self.stack.pop();
            self.size <<= 1;
        }
        false
    }

    /// Add (`sign = 1`) or remove (`sign = -1`) the offset of child `slot` from the origin.
    #[inline]
    fn shift(&mut self, slot: usize, sign: i32) {
        for k in 0..D {
            if slot & (1 << k) != 0 {
                self.origin[k] += sign * self.size;
            }
        }
    }
}

/// First non-empty slot at or after `from`.
#[inline]
fn next_child(children: &[Option<CellId>], from: usize) -> Option<(usize, CellId)> {
    children
        .iter()
        .enumerate()
        .skip(from)
        .find_map(|(slot, child)| child.map(|child| (slot, child)))
}
