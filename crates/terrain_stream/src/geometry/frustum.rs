//! View frustum as six inward-facing planes.

use glam::{DMat4, DVec3, DVec4};

/// Six clip planes `(normal, d)` with `normal · p + d >= 0` inside.
///
/// Plane order: left, right, bottom, top, near, far.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
  pub planes: [DVec4; 6],
}

impl Frustum {
  /// Extract planes from a view-projection matrix with `[0, 1]` clip depth
  /// (glam's `perspective_rh` convention).
  pub fn from_view_projection(view_projection: DMat4) -> Self {
    let r0 = view_projection.row(0);
    let r1 = view_projection.row(1);
    let r2 = view_projection.row(2);
    let r3 = view_projection.row(3);
    let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2].map(normalize_plane);
    Self { planes }
  }

  /// Conservative sphere test: false only if the sphere is fully outside one
  /// plane.
  #[inline]
  pub fn intersects_sphere(&self, center: DVec3, radius: f64) -> bool {
    self
      .planes
      .iter()
      .all(|plane| plane.truncate().dot(center) + plane.w >= -radius)
  }

  #[inline]
  pub fn contains_point(&self, point: DVec3) -> bool {
    self.intersects_sphere(point, 0.0)
  }
}

fn normalize_plane(plane: DVec4) -> DVec4 {
  let length = plane.truncate().length();
  if length > 0.0 {
    plane / length
  } else {
    plane
  }
}
