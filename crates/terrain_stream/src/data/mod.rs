//! Tile sourcing and node data loading.
//!
//! - [`layer`]: `Texel`, `Rgb8`, `Layer` - data layers and texel encodings
//! - [`source`]: `TileSource` - pyramid reader boundary, `TileHeader`, `TileSet`
//! - [`quadtree_file`]: `QuadtreeFile` - on-disk tile format and writer
//! - [`pyramid`]: `FilePyramid` - directory of per-patch quadtree files
//! - [`memory`]: `MemoryTileSource` - in-memory pyramid
//! - [`node_data`]: `NodeData` - main pool payload
//! - [`request`]: `FetchRequest`, `FetchQueue` - per-frame load queue
//! - [`manager`]: `DataManager` - loads requested nodes into the cache

pub mod layer;
pub mod manager;
pub mod memory;
pub mod node_data;
pub mod pyramid;
pub mod quadtree_file;
pub mod request;
pub mod source;

pub use layer::{value_range, Layer, Rgb8, Texel};
pub use manager::{DataManager, FetchStats};
pub use memory::MemoryTileSource;
pub use node_data::{NodeData, NodeDataAllocator};
pub use pyramid::FilePyramid;
pub use quadtree_file::{QuadtreeFile, QuadtreeFileWriter};
pub use request::{FetchQueue, FetchRequest};
pub use source::{TileHeader, TileIndex, TileSet, TileSource, NO_TILE};
