//! DataManager - turns fetch requests into resident node data.
//!
//! ```text
//!   FetchQueue ──prepare──► most urgent first ──budget──► load_node()
//!                                                          │
//!        grab_new(main pool) ◄─────────────────────────────┘
//!          │ none free: defer, stop servicing this frame
//!          ▼
//!        read DEM / color / scalar tiles (nodata if absent)
//!        range from DEM header, child tiles from headers
//!        project grid at planet_radius + elevation * vertical_scale
//!        bounding sphere from scope + range
//! ```

use glam::DVec3;
use tracing::{debug, warn};

use super::layer::{value_range, Layer, Rgb8};
use super::node_data::NodeData;
use super::request::FetchQueue;
use super::source::{nodata_texel, read_texels, tile_or_none, TileSet, TileSource};
use crate::cache::{Cache, Claim, PoolId};
use crate::constants::CHILD_COUNT;
use crate::error::{Result, TerrainError};
use crate::geometry::{BoundingSphere, Scope};
use crate::index::{DataIndex, TreeIndex};
use crate::tree::{Node, NodeArena, NodeId};

/// Outcome of servicing one frame's fetch queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchStats {
  /// Requests queued by the traversal.
  pub requested: usize,
  /// Duplicates collapsed before servicing.
  pub coalesced: usize,
  /// Children loaded.
  pub serviced: usize,
  /// Requests that found the cache exhausted.
  pub deferred: usize,
  /// Requests left over after the budget or an exhausted cache.
  pub dropped: usize,
  /// Requests whose target vanished or was already resident.
  pub stale: usize,
  /// Loads that failed to read a tile.
  pub failed: usize,
}

/// Loads node data from a [`TileSource`] into the main cache pool.
pub struct DataManager<S: TileSource> {
  source: S,
  pool: PoolId<NodeData>,
  planet_radius: f64,
  vertical_scale: f64,
  scratch: Vec<u8>,
}

impl<S: TileSource> DataManager<S> {
  pub fn new(source: S, pool: PoolId<NodeData>, planet_radius: f64, vertical_scale: f64) -> Self {
    Self {
      source,
      pool,
      planet_radius,
      vertical_scale,
      scratch: Vec::new(),
    }
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  pub fn source_mut(&mut self) -> &mut S {
    &mut self.source
  }

  /// Pool holding [`NodeData`] payloads.
  pub fn pool(&self) -> PoolId<NodeData> {
    self.pool
  }

  pub fn tile_resolution(&self) -> usize {
    self.source.tile_resolution()
  }

  pub fn planet_radius(&self) -> f64 {
    self.planet_radius
  }

  pub fn vertical_scale(&self) -> f64 {
    self.vertical_scale
  }

  /// Load a base patch root from its top-level tiles.
  ///
  /// `Ok(None)` means the pool had no free slot.
  pub fn load_root(&mut self, cache: &mut Cache, index: TreeIndex, scope: Scope) -> Result<Option<Claim<NodeData>>> {
    debug_assert!(index.is_root());
    let tiles = self.source.root_tiles(index.patch());
    if tiles.is_empty() {
      return Err(TerrainError::MissingRoot(index.patch()));
    }
    self.load_node(cache, index, scope, tiles)
  }

  /// Load child `which` of a node whose data was loaded before.
  ///
  /// `Ok(None)` means the pool had no free slot; retry on a later frame.
  pub fn load_child(&mut self, cache: &mut Cache, parent: &Node, which: u8) -> Result<Option<Claim<NodeData>>> {
    debug_assert!(parent.has_bounds, "parent of a load must have been loaded");
    let tiles = parent.child_tiles[which as usize].clone();
    self.load_node(cache, parent.index.down(which), parent.scope.child(which), tiles)
  }

  /// Load a node from explicit tiles.
  ///
  /// A still-resident copy is reused without touching the source.
  pub fn load_node(
    &mut self,
    cache: &mut Cache,
    index: TreeIndex,
    scope: Scope,
    tiles: TileSet,
  ) -> Result<Option<Claim<NodeData>>> {
    let key = DataIndex::main(index);
    if let Some(claim) = cache.find(self.pool, key) {
      cache.touch(claim);
      return Ok(Some(claim));
    }
    let Some(claim) = cache.grab_new(self.pool, key) else {
      return Ok(None);
    };
    let Some(data) = cache.get_mut(claim) else {
      return Ok(None);
    };
    let filled = fill_node(
      &mut self.source,
      &mut self.scratch,
      data,
      NodeSpec {
        index,
        scope,
        tiles,
        planet_radius: self.planet_radius,
        vertical_scale: self.vertical_scale,
      },
    );
    match filled {
      Ok(()) => Ok(Some(claim)),
      Err(e) => {
        cache.invalidate(claim);
        Err(e)
      }
    }
  }

  /// Service a frame's fetch queue against the tree.
  ///
  /// At most `budget` loads are attempted (0 = unlimited). When the pool is
  /// exhausted the rest of the queue is dropped. A failed load marks the
  /// parent terminal and discards its children.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "data::service"))]
  pub fn service(&mut self, cache: &mut Cache, arena: &mut NodeArena, queue: &mut FetchQueue, budget: usize) -> FetchStats {
    let mut stats = FetchStats {
      requested: queue.len(),
      ..Default::default()
    };
    stats.coalesced = queue.prepare();

    let mut attempts = 0;
    let mut exhausted = false;
    for request in queue.drain() {
      if exhausted || (budget > 0 && attempts >= budget) {
        stats.dropped += 1;
        continue;
      }
      let Some(child_id) = resolve(arena, request.parent, request.child, request.index) else {
        stats.stale += 1;
        continue;
      };
      if arena[child_id].main.is_some_and(|c| cache.is_valid(c)) {
        stats.stale += 1;
        continue;
      }

      attempts += 1;
      let parent = &arena[request.parent];
      let tiles = parent.child_tiles[request.child as usize].clone();
      let scope = parent.scope.child(request.child);
      match self.load_node(cache, request.index, scope, tiles) {
        Ok(Some(claim)) => {
          if let Some(data) = cache.get(claim) {
            arena[child_id].adopt(claim, data);
          }
          stats.serviced += 1;
        }
        Ok(None) => {
          stats.deferred += 1;
          exhausted = true;
        }
        Err(e) => {
          warn!(node = %request.index, error = %e, "tile load failed, node will not be refined further");
          stats.failed += 1;
          discard_children(cache, arena, request.parent);
          arena[request.parent].terminal = true;
        }
      }
    }

    if stats.requested > 0 {
      debug!(
        requested = stats.requested,
        serviced = stats.serviced,
        deferred = stats.deferred,
        dropped = stats.dropped,
        failed = stats.failed,
        "serviced fetch queue"
      );
    }
    stats
  }
}

/// Child node a request targets, if the tree still has it.
fn resolve(arena: &NodeArena, parent: NodeId, which: u8, expected: TreeIndex) -> Option<NodeId> {
  let child = arena.children(parent)?[which as usize];
  (arena.get(child)?.index == expected).then_some(child)
}

/// Remove a node's subtree and release every cache claim held in it.
pub(crate) fn discard_children(cache: &mut Cache, arena: &mut NodeArena, parent: NodeId) -> usize {
  arena.remove_children(parent, |node| {
    if let Some(main) = node.main {
      cache.invalidate(main);
    }
    if let Some(gpu) = node.gpu {
      cache.invalidate(gpu);
    }
  })
}

struct NodeSpec {
  index: TreeIndex,
  scope: Scope,
  tiles: TileSet,
  planet_radius: f64,
  vertical_scale: f64,
}

fn fill_node<S: TileSource>(source: &mut S, scratch: &mut Vec<u8>, data: &mut NodeData, spec: NodeSpec) -> Result<()> {
  let patch = spec.index.patch();
  let scalar_layers = data.layers.len();
  let mut child_tiles: [TileSet; CHILD_COUNT] = std::array::from_fn(|_| TileSet::absent(scalar_layers));

  // Elevation: range and child links come from the header.
  let elevation_nodata: f32 = nodata_texel(source, Layer::Elevation);
  data.range = match spec.tiles.dem {
    Some(tile) => {
      let header = read_texels(source, Layer::Elevation, patch, tile, scratch, &mut data.elevation)?;
      for (c, child) in header.children.iter().enumerate() {
        child_tiles[c].dem = tile_or_none(*child);
      }
      header.range
    }
    None => {
      data.elevation.fill(elevation_nodata);
      [0.0, 0.0]
    }
  };

  match spec.tiles.color {
    Some(tile) => {
      let header = read_texels(source, Layer::Color, patch, tile, scratch, &mut data.color)?;
      for (c, child) in header.children.iter().enumerate() {
        child_tiles[c].color = tile_or_none(*child);
      }
    }
    None => data.color.fill(nodata_texel::<S, Rgb8>(source, Layer::Color)),
  }

  for n in 0..scalar_layers {
    let layer = Layer::Scalar(n as u8);
    let nodata: f32 = nodata_texel(source, layer);
    match spec.tiles.get(layer) {
      Some(tile) => {
        let header = read_texels(source, layer, patch, tile, scratch, &mut data.layers[n])?;
        for (c, child) in header.children.iter().enumerate() {
          child_tiles[c].set(layer, tile_or_none(*child));
        }
      }
      None => data.layers[n].fill(nodata),
    }
    data.layer_ranges[n] = value_range(&data.layers[n], nodata);
  }

  data.index = spec.index;
  data.scope = spec.scope;
  data.bounds = BoundingSphere::from_scope(&spec.scope, spec.planet_radius, data.range, spec.vertical_scale);
  data.origin = data.bounds.center;
  data.tiles = spec.tiles;
  data.child_tiles = child_tiles;
  project_geometry(data, elevation_nodata, spec.planet_radius, spec.vertical_scale);
  Ok(())
}

/// Lift the scope's texel grid onto the sphere, relative to `data.origin`.
///
/// Nodata texels sit at the bottom of the node's range so every vertex stays
/// inside `data.bounds`.
fn project_geometry(data: &mut NodeData, nodata: f32, planet_radius: f64, vertical_scale: f64) {
  let res = (data.geometry.len() as f64).sqrt().round() as usize;
  let floor = data.range[0] as f64;
  let step = |i: usize| if res > 1 { i as f64 / (res - 1) as f64 } else { 0.5 };
  for j in 0..res {
    for i in 0..res {
      let at = j * res + i;
      let e = data.elevation[at];
      let height = if e == nodata || e.is_nan() { floor } else { e as f64 };
      let dir: DVec3 = data.scope.grid_point(step(i), step(j));
      let position = dir * (planet_radius + height * vertical_scale);
      data.geometry[at] = (position - data.origin).as_vec3();
    }
  }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod manager_test;
