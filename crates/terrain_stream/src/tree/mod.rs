//! Live quadtree of resident and partially resident nodes.
//!
//! - [`node`]: `Node`, `NodeId` - one quadtree element and its cache claims
//! - [`arena`]: `NodeArena` - slab storage with 4-block child allocation

pub mod arena;
pub mod node;

pub use arena::NodeArena;
pub use node::{Node, NodeId};
