//! TerrainStreamer - one planet's streaming state.
//!
//! Owns the cache, the data manager, the node tree and the evaluators, and
//! advances them together once per display frame. Several streamers can
//! coexist; nothing is process-global.

use tracing::{debug, info};
use web_time::Instant;

use crate::cache::{Allocator, Cache, GpuHandle, PoolId};
use crate::config::Settings;
use crate::data::{DataManager, FetchQueue, FetchStats, NodeData, NodeDataAllocator, TileSource};
use crate::error::{Result, TerrainError};
use crate::index::TreeIndex;
use crate::lod::{FocusLod, FrustumVisibility, LodEvaluator, View, VisibilityEvaluator};
use crate::surface::{refine, RefinementInput, RefinementStats, SurfaceApproximation, SurfaceTile};
use crate::tree::{Node, NodeArena};

/// Name of the CPU node data pool.
pub const MAIN_POOL: &str = "main";
/// Name of the GPU geometry pool.
pub const GPU_GEOMETRY_POOL: &str = "gpu_geometry";

// =============================================================================
// FrameStats
// =============================================================================

/// What one [`TerrainStreamer::advance_frame`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
  /// Cache frame the traversal ran in.
  pub frame: u64,
  pub refinement: RefinementStats,
  pub fetch: FetchStats,
  /// Traversal time in microseconds.
  pub refine_us: u64,
  /// Fetch servicing time in microseconds.
  pub service_us: u64,
}

// =============================================================================
// TerrainStreamer<S>
// =============================================================================

/// Streaming engine for one planet, generic over its tile source.
pub struct TerrainStreamer<S: TileSource> {
  settings: Settings,
  cache: Cache,
  data: DataManager<S>,
  gpu_pool: PoolId<GpuHandle>,
  arena: NodeArena,
  queue: FetchQueue,
  surface: SurfaceApproximation,
  lod: Box<dyn LodEvaluator>,
  visibility: Box<dyn VisibilityEvaluator>,
  last_frame: FrameStats,
}

impl<S: TileSource> TerrainStreamer<S> {
  /// Register the pools and load and pin one root per base patch.
  ///
  /// Fails when the settings are invalid or disagree with the source, when
  /// the main pool cannot hold the roots, or when a root cannot be read.
  pub fn new(settings: Settings, source: S, gpu_allocator: Box<dyn Allocator<GpuHandle>>) -> Result<Self> {
    settings.validate()?;
    let patches = settings.polyhedron.num_patches();
    if source.num_patches() != patches {
      return Err(TerrainError::InvalidSettings(format!(
        "{:?} has {} patches but the data source has {}",
        settings.polyhedron,
        patches,
        source.num_patches()
      )));
    }
    if source.tile_resolution() != settings.tile_resolution {
      return Err(TerrainError::InvalidSettings(format!(
        "tile_resolution is {} but the data source uses {}",
        settings.tile_resolution,
        source.tile_resolution()
      )));
    }
    if settings.cache_main_node_size < patches {
      return Err(root_capacity(&settings, patches));
    }

    let mut cache = Cache::new();
    let main = cache.register_pool(
      MAIN_POOL,
      settings.cache_main_node_size,
      settings.cache_swaps_per_frame,
      Box::new(NodeDataAllocator::new(settings.tile_resolution, source.scalar_layer_count())),
    );
    let gpu_pool = cache.register_pool(
      GPU_GEOMETRY_POOL,
      settings.cache_gpu_geometry_size,
      settings.cache_swaps_per_frame,
      gpu_allocator,
    );
    let mut data = DataManager::new(source, main, settings.planet_radius, settings.vertical_scale);

    let mut arena = NodeArena::new();
    for (patch, scope) in settings.polyhedron.scopes().into_iter().enumerate() {
      let index = TreeIndex::root(patch as u8);
      let claim = match data.load_root(&mut cache, index, scope)? {
        Some(claim) => claim,
        None => {
          // Swap budget spent on the previous roots.
          cache.advance_frame();
          data.load_root(&mut cache, index, scope)?
            .ok_or_else(|| root_capacity(&settings, patches))?
        }
      };
      cache.pin(claim, true);
      let mut root = Node::new(index, scope, None);
      if let Some(payload) = cache.get(claim) {
        root.adopt(claim, payload);
      }
      arena.insert_root(root);
    }

    info!(
      polyhedron = ?settings.polyhedron,
      patches,
      main_slots = settings.cache_main_node_size,
      gpu_slots = settings.cache_gpu_geometry_size,
      "terrain streamer ready"
    );
    let lod = Box::new(FocusLod::new(settings.frustum_lod()));
    Ok(Self {
      settings,
      cache,
      data,
      gpu_pool,
      arena,
      queue: FetchQueue::new(),
      surface: SurfaceApproximation::new(),
      lod,
      visibility: Box::new(FrustumVisibility),
      last_frame: FrameStats::default(),
    })
  }

  /// Refine against `view`, load what the traversal asked for, and move
  /// the cache to the next frame.
  ///
  /// The returned tiles stay resident until the next call.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "streamer::advance_frame"))]
  pub fn advance_frame(&mut self, view: &View) -> &SurfaceApproximation {
    let frame = self.cache.frame_number();

    let started = Instant::now();
    let input = RefinementInput {
      view,
      lod: self.lod.as_ref(),
      visibility: self.visibility.as_ref(),
      budget: self.settings.refinement_budget(),
      max_level: self.settings.max_level,
      main_pool: self.data.pool(),
      gpu_pool: self.gpu_pool,
    };
    let refinement = {
      #[cfg(feature = "profiling")]
      let _span = tracing::info_span!("refine").entered();
      refine(&input, &mut self.cache, &mut self.arena, &mut self.queue, &mut self.surface)
    };
    let refine_us = started.elapsed().as_micros() as u64;

    let started = Instant::now();
    let fetch = {
      #[cfg(feature = "profiling")]
      let _span = tracing::info_span!("service_fetches").entered();
      self.data.service(
        &mut self.cache,
        &mut self.arena,
        &mut self.queue,
        self.settings.data_manager_fetch_requests_per_frame,
      )
    };
    let service_us = started.elapsed().as_micros() as u64;

    self.cache.advance_frame();
    self.last_frame = FrameStats {
      frame,
      refinement,
      fetch,
      refine_us,
      service_us,
    };
    debug!(
      frame,
      tiles = self.surface.len(),
      nodes = self.arena.len(),
      refine_us,
      service_us,
      "frame advanced"
    );
    &self.surface
  }

  // =========================================================================
  // Policies
  // =========================================================================

  pub fn set_lod_evaluator(&mut self, lod: Box<dyn LodEvaluator>) {
    self.lod = lod;
  }

  pub fn set_visibility_evaluator(&mut self, visibility: Box<dyn VisibilityEvaluator>) {
    self.visibility = visibility;
  }

  // =========================================================================
  // Accessors
  // =========================================================================

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  /// The surface built by the last [`advance_frame`](Self::advance_frame).
  pub fn surface(&self) -> &SurfaceApproximation {
    &self.surface
  }

  pub fn last_frame(&self) -> &FrameStats {
    &self.last_frame
  }

  /// The cache, e.g. to bind every GPU payload for drawing.
  pub fn cache(&self) -> &Cache {
    &self.cache
  }

  pub fn main_pool(&self) -> PoolId<NodeData> {
    self.data.pool()
  }

  pub fn gpu_pool(&self) -> PoolId<GpuHandle> {
    self.gpu_pool
  }

  pub fn arena(&self) -> &NodeArena {
    &self.arena
  }

  pub fn source(&self) -> &S {
    self.data.source()
  }

  /// CPU data of a contributing tile.
  pub fn node_data(&self, tile: &SurfaceTile) -> Option<&NodeData> {
    self.cache.get(tile.main)
  }

  /// GPU handle of a contributing tile, if it got a slot.
  pub fn gpu_handle(&self, tile: &SurfaceTile) -> Option<GpuHandle> {
    self.cache.get(tile.gpu?).copied()
  }
}

fn root_capacity(settings: &Settings, needed: usize) -> TerrainError {
  TerrainError::RootCapacity {
    pool: MAIN_POOL.to_string(),
    capacity: settings.cache_main_node_size,
    needed,
  }
}

#[cfg(test)]
#[path = "streamer_test.rs"]
mod streamer_test;
