//! A dynamic, dimension-generic orthtree (quadtree, octree) of point handles.
//!
//! Integer grid coordinates are used for two reasons: a better control on the accuracy of
//! geometrical operations, and simpler vertex location, since cells have power-of-two side
//! lengths and bitwise operators can replace floating point comparisons.
//!
//! Each [`Cell`] holds either up to `bucket_size` items or `2^D` child slots, some of which may
//! be empty. A full leaf is split when an item is added to it, and a cell is deleted as soon as
//! it holds no more items.
//!
//! Cells carry no locational information. It is passed instead to the visitor given to
//! [`OrthtreeIndex::walk`], which keeps cells compact on large meshes.

#![warn(missing_docs)]

mod cell;
pub mod constants;
mod index;
mod r#trait;
mod traversal;

pub use cell::{Cell, CellId};
pub use index::Orthtree;
pub use r#trait::OrthtreeIndex;
pub use traversal::Walk;
