//! Constants shared across the streaming engine.
//!
//! ```text
//! LOD score = lod_scale * ln(projected_radius / (tile_resolution * LOD_TILE_FACTOR)) + lod_bias
//!
//!   score >= +1  ─►  refine (split)
//!   score <= -1  ─►  coarsen (merge)
//! ```

/// Default planet radius in meters (mean Earth radius).
pub const DEFAULT_PLANET_RADIUS: f64 = 6_371_000.0;

/// Default tile edge resolution in texels (2^6 + 1, so texel grids nest).
pub const DEFAULT_TILE_RESOLUTION: usize = 65;

/// Fraction of the tile resolution a node's projected radius must cover to be
/// considered at ideal detail.
pub const LOD_TILE_FACTOR: f64 = 0.55;

/// Scores at or above this value recommend splitting a leaf.
pub const LOD_REFINE_THRESHOLD: f64 = 1.0;

/// Scores at or below this value recommend collapsing an interior node.
pub const LOD_COARSEN_THRESHOLD: f64 = -1.0;

/// Frame stamp marking a pinned (never evictable) cache slot.
pub const PINNED_FRAME: u64 = u64::MAX;

/// Number of children of every interior quadtree node.
pub const CHILD_COUNT: usize = 4;
