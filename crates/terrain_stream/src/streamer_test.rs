use glam::DVec3;

use super::*;
use crate::cache::SequentialGpuHandles;
use crate::data::{Layer, MemoryTileSource};
use crate::geometry::Polyhedron;
use crate::lod::AlwaysVisible;

const RES: usize = 3;
const RADIUS: f64 = 1000.0;

struct Constant(f64);

impl LodEvaluator for Constant {
  fn evaluate(&self, _node: &Node, _view: &View) -> f64 {
    self.0
  }
}

struct NothingVisible;

impl VisibilityEvaluator for NothingVisible {
  fn evaluate(&self, _node: &Node, _view: &View) -> bool {
    false
  }
}

fn settings() -> Settings {
  Settings {
    planet_radius: RADIUS,
    tile_resolution: RES,
    cache_main_node_size: 512,
    cache_gpu_geometry_size: 512,
    polyhedron: Polyhedron::Cube,
    ..Settings::default()
  }
}

fn pyramid(depth: u8) -> MemoryTileSource {
  MemoryTileSource::full_pyramid(6, RES, depth, |_| [0.0, 10.0])
}

fn streamer(settings: Settings, source: MemoryTileSource) -> Result<TerrainStreamer<MemoryTileSource>> {
  TerrainStreamer::new(settings, source, Box::new(SequentialGpuHandles::new(256)))
}

fn view_from(distance: f64) -> View {
  View::perspective(
    DVec3::new(0.0, 0.0, distance),
    DVec3::ZERO,
    DVec3::Y,
    60f64.to_radians(),
    [800, 600],
    1.0,
    100.0 * RADIUS,
  )
}

// =============================================================================
// Batch 1: Startup
// =============================================================================

#[test]
fn test_new_pins_one_root_per_patch() {
  let s = streamer(settings(), pyramid(1)).unwrap();
  assert_eq!(s.arena().roots().len(), 6);
  let stats = s.cache().stats();
  assert_eq!(stats[0].name, MAIN_POOL);
  assert_eq!(stats[0].pinned, 6);
  assert_eq!(stats[1].name, GPU_GEOMETRY_POOL);
  assert_eq!(stats[1].resident, 0);
  for &root in s.arena().roots() {
    assert!(s.arena()[root].has_bounds);
  }
}

#[test]
fn test_main_pool_must_hold_roots() {
  let err = streamer(Settings { cache_main_node_size: 5, ..settings() }, pyramid(1))
    .err()
    .unwrap();
  assert!(matches!(err, TerrainError::RootCapacity { capacity: 5, needed: 6, .. }), "{err}");
}

#[test]
fn test_source_mismatch_is_rejected() {
  let err = streamer(Settings { tile_resolution: 5, ..settings() }, pyramid(1)).err().unwrap();
  assert!(matches!(err, TerrainError::InvalidSettings(_)));

  let err = streamer(
    Settings { polyhedron: Polyhedron::Triacontahedron, ..settings() },
    pyramid(1),
  )
  .err()
  .unwrap();
  assert!(matches!(err, TerrainError::InvalidSettings(_)));
}

#[test]
fn test_missing_root_is_fatal() {
  let source = MemoryTileSource::new(6, RES).with_elevation(-1.0);
  let err = streamer(settings(), source).err().unwrap();
  assert!(matches!(err, TerrainError::MissingRoot(0)));
}

/// Roots still load when the swap budget is smaller than the patch count.
#[test]
fn test_roots_load_across_swap_budget() {
  let s = streamer(Settings { cache_swaps_per_frame: 2, ..settings() }, pyramid(1)).unwrap();
  assert_eq!(s.cache().stats()[0].pinned, 6);
}

// =============================================================================
// Batch 2: Frames
// =============================================================================

#[test]
fn test_close_view_refines_and_stays_resident() {
  let mut s = streamer(settings(), pyramid(3)).unwrap();
  let view = view_from(1.2 * RADIUS);
  for _ in 0..6 {
    s.advance_frame(&view);
  }
  let surface = s.surface();
  assert!(!surface.is_empty());
  assert!(surface.tiles_per_level().len() > 1, "close view should refine");
  assert_eq!(s.last_frame().refinement.contributing, surface.len());
  for tile in surface.tiles() {
    let data = s.node_data(tile).unwrap();
    assert_eq!(data.index, tile.index);
    assert!(s.gpu_handle(tile).is_some());
  }
}

#[test]
fn test_frame_numbers_advance() {
  let mut s = streamer(settings(), pyramid(1)).unwrap();
  let view = view_from(5.0 * RADIUS);
  s.advance_frame(&view);
  let first = s.last_frame().frame;
  s.advance_frame(&view);
  assert_eq!(s.last_frame().frame, first + 1);
  assert_eq!(s.surface().frame(), first + 1);
}

#[test]
fn test_fetch_budget_caps_loads() {
  let mut s = streamer(
    Settings { data_manager_fetch_requests_per_frame: 4, ..settings() },
    pyramid(2),
  )
  .unwrap();
  s.set_lod_evaluator(Box::new(Constant(2.0)));
  s.set_visibility_evaluator(Box::new(AlwaysVisible));
  s.advance_frame(&view_from(5.0 * RADIUS));
  let fetch = s.last_frame().fetch;
  assert_eq!(fetch.requested, 24);
  assert_eq!(fetch.serviced, 4);
  assert_eq!(fetch.dropped, 20);
}

#[test]
fn test_visibility_evaluator_is_swappable() {
  let mut s = streamer(settings(), pyramid(1)).unwrap();
  s.set_visibility_evaluator(Box::new(NothingVisible));
  assert!(s.advance_frame(&view_from(5.0 * RADIUS)).is_empty());
  assert_eq!(s.last_frame().refinement.nodes_culled, 6);
}

/// An unreadable child tile stops refinement below its parent only.
#[test]
fn test_unreadable_tile_marks_parent_terminal() {
  let mut source = pyramid(1);
  // Patch 0's subtree is built first; its child 0 owns elevation tile 0.
  source.mark_unreadable(Layer::Elevation, 0);
  let mut s = streamer(settings(), source).unwrap();
  s.set_lod_evaluator(Box::new(Constant(2.0)));
  s.set_visibility_evaluator(Box::new(AlwaysVisible));

  let view = view_from(5.0 * RADIUS);
  for _ in 0..3 {
    s.advance_frame(&view);
  }
  let root = s.arena().roots()[0];
  assert!(s.arena()[root].terminal);
  assert!(s.arena()[root].is_leaf());

  let tiles = s.surface().tiles();
  let patch0: Vec<u8> = tiles.iter().filter(|t| t.index.patch() == 0).map(|t| t.index.level()).collect();
  assert_eq!(patch0, vec![0]);
  assert_eq!(tiles.iter().filter(|t| t.index.level() == 1).count(), 20);
}
