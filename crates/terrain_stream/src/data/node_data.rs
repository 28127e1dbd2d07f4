//! NodeData - CPU-resident payload of the main cache pool.

use glam::{DVec3, Vec3};

use super::layer::Rgb8;
use super::source::TileSet;
use crate::cache::Allocator;
use crate::constants::CHILD_COUNT;
use crate::geometry::{BoundingSphere, Scope};
use crate::index::TreeIndex;

/// Everything loaded for one node: texels of every layer, projected geometry
/// and the summaries the tree keeps for LOD and visibility.
#[derive(Clone, Debug)]
pub struct NodeData {
  pub index: TreeIndex,
  pub scope: Scope,
  /// Elevation `[min, max]` from the tile header (`[0, 0]` without DEM).
  pub range: [f32; 2],
  pub bounds: BoundingSphere,
  /// Origin of [`geometry`](Self::geometry) (the bounding sphere center).
  pub origin: DVec3,
  /// `res²` elevations, row-major.
  pub elevation: Vec<f32>,
  /// `res²` colors, row-major.
  pub color: Vec<Rgb8>,
  /// One `res²` buffer per scalar layer.
  pub layers: Vec<Vec<f32>>,
  /// `[min, max]` per scalar layer, nodata excluded.
  pub layer_ranges: Vec<[f32; 2]>,
  /// `res²` surface positions relative to [`origin`](Self::origin).
  pub geometry: Vec<Vec3>,
  /// Tiles this node was loaded from.
  pub tiles: TileSet,
  /// Tiles of the 4 children, from the tile headers.
  pub child_tiles: [TileSet; CHILD_COUNT],
}

impl NodeData {
  /// Buffers sized for `tile_resolution²` texels and `scalar_layers` layers.
  pub fn new(tile_resolution: usize, scalar_layers: usize) -> Self {
    let texels = tile_resolution * tile_resolution;
    Self {
      index: TreeIndex::root(0),
      scope: Scope {
        corners: [DVec3::Z; 4],
      },
      range: [0.0, 0.0],
      bounds: BoundingSphere::new(DVec3::ZERO, 0.0),
      origin: DVec3::ZERO,
      elevation: vec![0.0; texels],
      color: vec![Rgb8::BLACK; texels],
      layers: vec![vec![0.0; texels]; scalar_layers],
      layer_ranges: vec![[0.0, 0.0]; scalar_layers],
      geometry: vec![Vec3::ZERO; texels],
      tiles: TileSet::absent(scalar_layers),
      child_tiles: std::array::from_fn(|_| TileSet::absent(scalar_layers)),
    }
  }

  /// Bytes held by the texel and geometry buffers.
  pub fn byte_size(tile_resolution: usize, scalar_layers: usize) -> usize {
    let texels = tile_resolution * tile_resolution;
    texels
      * (std::mem::size_of::<f32>()
        + std::mem::size_of::<Rgb8>()
        + scalar_layers * std::mem::size_of::<f32>()
        + std::mem::size_of::<Vec3>())
  }

  /// World-space position of texel `(i, j)`.
  #[inline]
  pub fn world_position(&self, resolution: usize, i: usize, j: usize) -> DVec3 {
    self.origin + self.geometry[j * resolution + i].as_dvec3()
  }
}

/// Allocates [`NodeData`] buffers for the main pool.
#[derive(Clone, Copy, Debug)]
pub struct NodeDataAllocator {
  pub tile_resolution: usize,
  pub scalar_layers: usize,
}

impl NodeDataAllocator {
  pub fn new(tile_resolution: usize, scalar_layers: usize) -> Self {
    Self {
      tile_resolution,
      scalar_layers,
    }
  }
}

impl Allocator<NodeData> for NodeDataAllocator {
  fn allocate(&mut self) -> NodeData {
    NodeData::new(self.tile_resolution, self.scalar_layers)
  }

  fn allocation_size(&self) -> usize {
    NodeData::byte_size(self.tile_resolution, self.scalar_layers)
  }
}
