//! Bounding sphere with double precision for planet-scale coordinates.

use glam::DVec3;

use super::Scope;

/// Double-precision bounding sphere.
///
/// Used for visibility tests and LOD projection of quadtree nodes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
  /// Center in planet-centered Cartesian coordinates.
  pub center: DVec3,
  /// Radius in world units.
  pub radius: f64,
}

impl BoundingSphere {
  pub fn new(center: DVec3, radius: f64) -> Self {
    debug_assert!(radius >= 0.0, "bounding radius must be non-negative");
    Self { center, radius }
  }

  /// Bounds of a patch over an elevation range.
  ///
  /// The center is the scope centroid lifted to the middle of the range. The
  /// radius reaches every corner at both range extremes.
  pub fn from_scope(scope: &Scope, planet_radius: f64, range: [f32; 2], vertical_scale: f64) -> Self {
    let low = planet_radius + range[0] as f64 * vertical_scale;
    let high = planet_radius + range[1] as f64 * vertical_scale;
    let center = scope.centroid() * (0.5 * (low + high));

    let mut radius: f64 = 0.0;
    for corner in scope.corners {
      for height in [low, high] {
        radius = radius.max(center.distance(corner * height));
      }
    }
    Self { center, radius }
  }

  /// Check if a point lies inside or on the sphere.
  #[inline]
  pub fn contains_point(&self, point: DVec3) -> bool {
    self.center.distance_squared(point) <= self.radius * self.radius
  }

  /// Distance from a point to the sphere surface (0 inside).
  #[inline]
  pub fn distance_to(&self, point: DVec3) -> f64 {
    (self.center.distance(point) - self.radius).max(0.0)
  }
}
