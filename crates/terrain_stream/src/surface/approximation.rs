//! SurfaceApproximation - the renderable tiling produced by one traversal.

use crate::cache::{Claim, GpuHandle};
use crate::data::NodeData;
use crate::index::TreeIndex;
use crate::tree::NodeId;

/// One visible node at the right level of detail.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceTile {
  pub node: NodeId,
  pub index: TreeIndex,
  /// Resident CPU data.
  pub main: Claim<NodeData>,
  /// GPU slot, if one could be claimed this frame.
  pub gpu: Option<Claim<GpuHandle>>,
  /// The GPU slot was freshly claimed and must be filled from `main`.
  pub needs_upload: bool,
  /// LOD score at emission time.
  pub lod: f64,
}

/// Gap-free, overlap-free set of tiles for one frame.
///
/// Rebuilt from scratch by every traversal; read-only for renderers.
#[derive(Clone, Debug, Default)]
pub struct SurfaceApproximation {
  frame: u64,
  tiles: Vec<SurfaceTile>,
}

impl SurfaceApproximation {
  pub fn new() -> Self {
    Self::default()
  }

  /// Cache frame this approximation was built in.
  pub fn frame(&self) -> u64 {
    self.frame
  }

  /// Tiles in traversal order (depth first, patch by patch).
  pub fn tiles(&self) -> &[SurfaceTile] {
    &self.tiles
  }

  pub fn len(&self) -> usize {
    self.tiles.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tiles.is_empty()
  }

  /// Tiles whose GPU slot must be filled before drawing.
  pub fn pending_uploads(&self) -> impl Iterator<Item = &SurfaceTile> {
    self.tiles.iter().filter(|t| t.needs_upload)
  }

  /// Contributing tile count per level (index = level).
  pub fn tiles_per_level(&self) -> Vec<usize> {
    let mut counts = Vec::new();
    for tile in &self.tiles {
      let level = tile.index.level() as usize;
      if counts.len() <= level {
        counts.resize(level + 1, 0);
      }
      counts[level] += 1;
    }
    counts
  }

  pub(crate) fn reset(&mut self, frame: u64) {
    self.frame = frame;
    self.tiles.clear();
  }

  pub(crate) fn push(&mut self, tile: SurfaceTile) {
    self.tiles.push(tile);
  }
}
