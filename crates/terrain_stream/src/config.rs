//! Startup settings, read once from TOML and passed to the streamer.

use std::path::Path;

use serde::Deserialize;

use crate::constants::{DEFAULT_PLANET_RADIUS, DEFAULT_TILE_RESOLUTION};
use crate::error::{Result, TerrainError};
use crate::geometry::Polyhedron;
use crate::index::TreeIndex;
use crate::lod::FrustumLod;
use crate::surface::RefinementBudget;

/// Engine settings. Every field is optional in the TOML source.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
  /// Sphere radius in world units.
  pub planet_radius: f64,
  /// Elevation exaggeration applied to geometry and bounds.
  pub vertical_scale: f64,
  /// Texels along one tile edge. Must match the pyramid.
  pub tile_resolution: usize,
  /// Slots in the CPU node data pool.
  pub cache_main_node_size: usize,
  /// Slots in the GPU geometry pool.
  pub cache_gpu_geometry_size: usize,
  /// Slot reassignments per pool per frame (0 = unlimited).
  pub cache_swaps_per_frame: usize,
  /// Tile loads per frame (0 = unlimited).
  pub data_manager_fetch_requests_per_frame: usize,
  /// Leaf splits per frame (0 = unlimited).
  pub max_splits_per_frame: usize,
  /// Subtree coarsens per frame (0 = unlimited).
  pub max_coarsens_per_frame: usize,
  /// Deepest level the tree may reach.
  pub max_level: u8,
  pub lod_scale: f64,
  pub lod_bias: f64,
  pub polyhedron: Polyhedron,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      planet_radius: DEFAULT_PLANET_RADIUS,
      vertical_scale: 1.0,
      tile_resolution: DEFAULT_TILE_RESOLUTION,
      cache_main_node_size: 4096,
      cache_gpu_geometry_size: 1024,
      cache_swaps_per_frame: 0,
      data_manager_fetch_requests_per_frame: 16,
      max_splits_per_frame: RefinementBudget::DEFAULT.max_splits,
      max_coarsens_per_frame: RefinementBudget::DEFAULT.max_coarsens,
      max_level: TreeIndex::MAX_LEVEL,
      lod_scale: 1.0,
      lod_bias: 0.0,
      polyhedron: Polyhedron::default(),
    }
  }
}

impl Settings {
  /// Load and validate settings from a TOML file.
  pub fn load(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path).map_err(|source| TerrainError::SettingsIo {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_toml_str(&content)
  }

  /// Parse and validate settings from TOML text.
  pub fn from_toml_str(text: &str) -> Result<Self> {
    let settings: Settings = toml::from_str(text)?;
    settings.validate()?;
    Ok(settings)
  }

  /// Check value ranges.
  pub fn validate(&self) -> Result<()> {
    if !(self.planet_radius.is_finite() && self.planet_radius > 0.0) {
      return Err(invalid(format!("planet_radius must be positive, got {}", self.planet_radius)));
    }
    if !(self.vertical_scale.is_finite() && self.vertical_scale >= 0.0) {
      return Err(invalid(format!(
        "vertical_scale must be finite and non-negative, got {}",
        self.vertical_scale
      )));
    }
    if self.tile_resolution < 2 {
      return Err(invalid(format!(
        "tile_resolution must be at least 2, got {}",
        self.tile_resolution
      )));
    }
    if self.cache_main_node_size == 0 || self.cache_gpu_geometry_size == 0 {
      return Err(invalid("cache pool sizes must be non-zero".to_string()));
    }
    if self.max_level > TreeIndex::MAX_LEVEL {
      return Err(invalid(format!(
        "max_level must be at most {}, got {}",
        TreeIndex::MAX_LEVEL,
        self.max_level
      )));
    }
    if !(self.lod_scale.is_finite() && self.lod_scale > 0.0) {
      return Err(invalid(format!("lod_scale must be positive, got {}", self.lod_scale)));
    }
    if !self.lod_bias.is_finite() {
      return Err(invalid(format!("lod_bias must be finite, got {}", self.lod_bias)));
    }
    Ok(())
  }

  /// Per-frame refinement limits.
  pub fn refinement_budget(&self) -> RefinementBudget {
    RefinementBudget {
      max_splits: self.max_splits_per_frame,
      max_coarsens: self.max_coarsens_per_frame,
    }
  }

  /// Screen-space LOD evaluator using the configured scale and bias.
  pub fn frustum_lod(&self) -> FrustumLod {
    FrustumLod::new(self.lod_scale, self.lod_bias, self.tile_resolution)
  }
}

fn invalid(message: String) -> TerrainError {
  TerrainError::InvalidSettings(message)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
