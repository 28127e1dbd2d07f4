//! Quadtree addressing.
//!
//! - [`tree_index`]: `TreeIndex` - bit-packed node address
//! - [`data_index`]: `DataIndex` - cache key (node address + data layer id)

pub mod data_index;
pub mod tree_index;

pub use data_index::{DataId, DataIndex, IndexHasher, IndexMap};
pub use tree_index::TreeIndex;
