//! terrain_stream - Out-of-core level-of-detail streaming for spherical terrain
//!
//! Streams elevation, imagery and optional scalar layers from an on-disk
//! quadtree pyramid into fixed-size CPU and GPU pools, and keeps a gap-free,
//! overlap-free tiling of the visible sphere at view-dependent detail.
//!
//! # Features
//!
//! - **Pooled cache**: fixed-capacity pools with LRU eviction, pinning and
//!   generation-checked claims
//! - **Prioritized fetching**: per-frame, deduplicated, budgeted tile loads
//! - **Refine/coarsen traversal**: pluggable LOD and visibility policies
//!   drive a quadtree forest over a cube or rhombic triacontahedron
//!
//! # Example
//!
//! ```ignore
//! use terrain_stream::{FilePyramid, SequentialGpuHandles, Settings, TerrainStreamer, View};
//!
//! let settings = Settings::load(Path::new("terrain.toml"))?;
//! let source = FilePyramid::open("pyramid/", settings.polyhedron.num_patches())?;
//! let mut streamer = TerrainStreamer::new(settings, source, Box::new(SequentialGpuHandles::new(0)))?;
//!
//! // Once per display frame
//! let view = View::perspective(eye, target, up, fovy, [width, height], near, far);
//! for tile in streamer.advance_frame(&view).tiles() {
//!     // upload tile.main into tile.gpu when tile.needs_upload, then draw
//! }
//! ```

pub mod constants;
pub mod error;
pub use error::{Result, TerrainError};

// Tree addressing and cache keys
pub mod index;
pub use index::{DataId, DataIndex, TreeIndex};

// Patch scopes, bounds and clipping
pub mod geometry;
pub use geometry::{BoundingSphere, Frustum, Polyhedron, Scope};

// Pooled cache
pub mod cache;
pub use cache::{Allocator, Cache, Claim, GpuHandle, PoolId, PoolStats, SequentialGpuHandles};

// Tile sources and node loading
pub mod data;
pub use data::{
  DataManager, FetchQueue, FetchRequest, FilePyramid, Layer, MemoryTileSource, NodeData, QuadtreeFile,
  QuadtreeFileWriter, TileSource,
};

// Live quadtree
pub mod tree;
pub use tree::{Node, NodeArena, NodeId};

// LOD and visibility policies
pub mod lod;
pub use lod::{Focus, FocusLod, FrustumLod, FrustumVisibility, LodEvaluator, View, VisibilityEvaluator};

// Per-frame traversal
pub mod surface;
pub use surface::{RefinementBudget, RefinementStats, SurfaceApproximation, SurfaceTile};

pub mod config;
pub use config::Settings;

pub mod streamer;
pub use streamer::{FrameStats, TerrainStreamer};

pub mod metrics;
