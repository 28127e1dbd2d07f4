//! Per-frame refine/coarsen traversal.
//!
//! Walks every patch root depth first and decides, per visible node:
//!
//! ```text
//!   invisible                      release children (cached data kept)
//!   interior, lod <= -1            coarsen: drop subtree + its claims, contribute
//!   interior, children ready       descend
//!   interior, children missing     contribute, request missing children
//!   leaf, lod >= +1, splittable    split; descend if children ready,
//!                                  else contribute and request them
//!   leaf otherwise                 contribute
//! ```
//!
//! A child is "ready" when its data is resident, or when it was loaded once
//! and is currently invisible (it would contribute nothing anyway). A node
//! only stops contributing once all of its replacements can, so the emitted
//! tiles always tile the visible sphere without gaps or overlaps.

use tracing::debug;

use super::approximation::{SurfaceApproximation, SurfaceTile};
use super::budget::{RefinementBudget, RefinementStats};
use crate::cache::{Cache, GpuHandle, PoolId};
use crate::constants::{CHILD_COUNT, LOD_COARSEN_THRESHOLD, LOD_REFINE_THRESHOLD};
use crate::data::manager::discard_children;
use crate::data::{FetchQueue, FetchRequest, NodeData};
use crate::index::{DataId, DataIndex};
use crate::lod::{LodEvaluator, View, VisibilityEvaluator};
use crate::tree::{Node, NodeArena, NodeId};

/// Read-only input for one traversal.
pub struct RefinementInput<'a> {
  pub view: &'a View,
  pub lod: &'a dyn LodEvaluator,
  pub visibility: &'a dyn VisibilityEvaluator,
  /// Budget configuration for rate limiting.
  pub budget: RefinementBudget,
  /// Leaves at this level are never split.
  pub max_level: u8,
  pub main_pool: PoolId<NodeData>,
  pub gpu_pool: PoolId<GpuHandle>,
}

/// Run one traversal.
///
/// Rebuilds `surface` from scratch and appends fetch requests for missing
/// children to `queue`. Cache claims of contributing tiles and of every
/// visited node are touched for the current frame.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "surface::refine"))]
pub fn refine(
  input: &RefinementInput<'_>,
  cache: &mut Cache,
  arena: &mut NodeArena,
  queue: &mut FetchQueue,
  surface: &mut SurfaceApproximation,
) -> RefinementStats {
  surface.reset(cache.frame_number());
  let mut walker = Walker {
    input,
    cache,
    arena,
    queue,
    surface,
    stats: RefinementStats::default(),
  };
  for i in 0..walker.arena.roots().len() {
    let root = walker.arena.roots()[i];
    walker.visit(root);
  }

  let stats = walker.stats;
  debug!(
    contributing = stats.contributing,
    splits = stats.splits_performed,
    coarsens = stats.coarsens_performed,
    requests = stats.requests_issued,
    culled = stats.nodes_culled,
    "refined surface"
  );
  stats
}

struct Walker<'a> {
  input: &'a RefinementInput<'a>,
  cache: &'a mut Cache,
  arena: &'a mut NodeArena,
  queue: &'a mut FetchQueue,
  surface: &'a mut SurfaceApproximation,
  stats: RefinementStats,
}

impl Walker<'_> {
  fn visit(&mut self, id: NodeId) {
    self.stats.nodes_visited += 1;
    let node = &self.arena[id];
    if !self.input.visibility.evaluate(node, self.input.view) {
      self.stats.nodes_culled += 1;
      if !node.is_leaf() {
        self.stats.nodes_released += self.arena.remove_children(id, |_| {});
      }
      return;
    }

    let resident = node.main.is_some_and(|claim| self.cache.touch(claim));
    debug_assert!(resident, "{:?} ({}) visited without resident data", id, node.index);
    let lod = self.input.lod.evaluate(node, self.input.view);
    if node.is_leaf() {
      self.visit_leaf(id, lod);
    } else {
      self.visit_interior(id, lod);
    }
  }

  fn visit_interior(&mut self, id: NodeId, lod: f64) {
    if lod <= LOD_COARSEN_THRESHOLD && self.input.budget.can_coarsen(self.stats.coarsens_performed) {
      let removed = discard_children(self.cache, self.arena, id);
      self.stats.coarsens_performed += 1;
      debug!(node = %self.arena[id].index, removed, "coarsened");
      self.emit(id, lod);
      return;
    }

    let Some(children) = self.arena.children(id) else {
      return;
    };
    self.descend_or_request(id, children, lod);
  }

  fn visit_leaf(&mut self, id: NodeId, lod: f64) {
    let node = &self.arena[id];
    let wants_split = lod >= LOD_REFINE_THRESHOLD && node.can_split(self.input.max_level);
    if !wants_split || !self.input.budget.can_split(self.stats.splits_performed) {
      self.emit(id, lod);
      return;
    }

    let children = self.split(id);
    self.stats.splits_performed += 1;
    self.descend_or_request(id, children, lod);
  }

  fn descend_or_request(&mut self, id: NodeId, children: [NodeId; CHILD_COUNT], lod: f64) {
    let missing = children.map(|child| self.needs_fetch(child));
    if !missing.contains(&true) {
      for child in children {
        self.visit(child);
      }
      return;
    }

    for (which, child) in children.into_iter().enumerate() {
      if missing[which] {
        let index = self.arena[child].index;
        self.queue.push(FetchRequest::new(lod, id, which as u8, index));
        self.stats.requests_issued += 1;
      }
    }
    self.emit(id, lod);
  }

  /// Give a leaf its 4 data-absent children.
  fn split(&mut self, id: NodeId) -> [NodeId; CHILD_COUNT] {
    let node = &self.arena[id];
    let (index, scopes) = (node.index, node.scope.split());
    let children: [Node; CHILD_COUNT] =
      std::array::from_fn(|which| Node::new(index.down(which as u8), scopes[which], Some(id)));
    let first = self.arena.insert_children(id, children);
    [0, 1, 2, 3].map(|which| first.offset(which))
  }

  /// Whether a child blocks its parent from descending.
  ///
  /// Reattaches still-cached data on the way.
  fn needs_fetch(&mut self, id: NodeId) -> bool {
    if self.reattach(id) {
      return false;
    }
    let node = &self.arena[id];
    !node.has_bounds || self.input.visibility.evaluate(node, self.input.view)
  }

  /// Check the node's data claim, recovering it from the pool by key when
  /// the node was recreated. True if the data is resident.
  fn reattach(&mut self, id: NodeId) -> bool {
    let node = &mut self.arena[id];
    if node.main.is_some_and(|claim| self.cache.is_valid(claim)) {
      return true;
    }
    node.main = None;
    let Some(claim) = self.cache.find(self.input.main_pool, DataIndex::main(node.index)) else {
      return false;
    };
    let Some(data) = self.cache.get(claim) else {
      return false;
    };
    node.adopt(claim, data);
    self.stats.reattached += 1;
    true
  }

  /// Add a node to the surface, claiming GPU storage for it.
  fn emit(&mut self, id: NodeId, lod: f64) {
    let gpu_pool = self.input.gpu_pool;
    let node = &mut self.arena[id];
    let Some(main) = node.main else {
      return;
    };

    let key = DataIndex::new(node.index, DataId::GPU_GEOMETRY);
    let current = node
      .gpu
      .filter(|&claim| self.cache.touch(claim))
      .or_else(|| self.cache.find(gpu_pool, key).filter(|&claim| self.cache.touch(claim)));
    let (gpu, needs_upload) = match current {
      Some(claim) => (Some(claim), false),
      None => match self.cache.grab_new(gpu_pool, key) {
        Some(claim) => {
          self.stats.gpu_uploads += 1;
          (Some(claim), true)
        }
        None => {
          self.stats.gpu_deferred += 1;
          (None, false)
        }
      },
    };
    node.gpu = gpu;

    self.surface.push(SurfaceTile {
      node: id,
      index: node.index,
      main,
      gpu,
      needs_upload,
      lod,
    });
    self.stats.contributing += 1;
  }
}

#[cfg(test)]
#[path = "refinement_test.rs"]
mod refinement_test;
