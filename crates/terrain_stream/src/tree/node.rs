//! Node - one element of the live quadtree.

use std::fmt;

use crate::cache::{Claim, GpuHandle};
use crate::constants::CHILD_COUNT;
use crate::data::{NodeData, TileSet};
use crate::geometry::{BoundingSphere, Scope};
use crate::index::TreeIndex;

/// Stable identifier of a node in a [`NodeArena`](super::NodeArena).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
  #[inline]
  pub const fn from_raw(raw: u32) -> Self {
    Self(raw)
  }

  #[inline]
  pub const fn raw(self) -> u32 {
    self.0
  }

  /// Sibling `which` of a child block starting at `self`.
  #[inline]
  pub(crate) fn offset(self, which: u8) -> Self {
    debug_assert!((which as usize) < CHILD_COUNT);
    Self(self.0 + which as u32)
  }
}

impl fmt::Debug for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "NodeId({})", self.0)
  }
}

/// Quadtree node.
///
/// Either a leaf or the parent of exactly 4 children allocated as one block.
/// The summaries (`range`, `bounds`, tiles) survive the loss of the cached
/// payload, so a data-absent node can still be scored and re-requested.
#[derive(Clone, Debug)]
pub struct Node {
  pub index: TreeIndex,
  pub scope: Scope,
  pub parent: Option<NodeId>,
  /// First of 4 contiguous child ids.
  pub first_child: Option<NodeId>,
  pub range: [f32; 2],
  pub bounds: BoundingSphere,
  /// False until data was loaded once.
  pub has_bounds: bool,
  pub tiles: TileSet,
  pub child_tiles: [TileSet; CHILD_COUNT],
  pub main: Option<Claim<NodeData>>,
  pub gpu: Option<Claim<GpuHandle>>,
  /// Set when a child failed to load; the node is never split again.
  pub terminal: bool,
}

impl Node {
  pub fn new(index: TreeIndex, scope: Scope, parent: Option<NodeId>) -> Self {
    Self {
      index,
      scope,
      parent,
      first_child: None,
      range: [0.0, 0.0],
      bounds: BoundingSphere::new(scope.centroid(), 0.0),
      has_bounds: false,
      tiles: TileSet::default(),
      child_tiles: Default::default(),
      main: None,
      gpu: None,
      terminal: false,
    }
  }

  #[inline]
  pub fn is_leaf(&self) -> bool {
    self.first_child.is_none()
  }

  /// Bind freshly loaded data and copy its summaries.
  pub fn adopt(&mut self, claim: Claim<NodeData>, data: &NodeData) {
    debug_assert_eq!(data.index, self.index, "adopting data of another node");
    self.main = Some(claim);
    self.range = data.range;
    self.bounds = data.bounds;
    self.has_bounds = true;
    self.tiles = data.tiles.clone();
    self.child_tiles = data.child_tiles.clone();
  }

  /// Whether any child has a tile in any layer.
  #[inline]
  pub fn has_child_tiles(&self) -> bool {
    self.child_tiles.iter().any(|t| !t.is_empty())
  }

  /// Whether the node may be split below `max_level`.
  pub fn can_split(&self, max_level: u8) -> bool {
    !self.terminal && self.has_bounds && self.index.level() < max_level && self.has_child_tiles()
  }
}
