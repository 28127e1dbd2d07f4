//! Scope - the 4 corner directions of a quadtree patch on the unit sphere.
//!
//! ```text
//!   UL(2) ─────── mt ─────── UR(3)
//!     │    child 2  │  child 3  │
//!     ml ──────── center ────── mr
//!     │    child 0  │  child 1  │
//!   LL(0) ─────── mb ─────── LR(1)
//! ```
//!
//! Child selectors match the corner order: bit 0 = right half, bit 1 = upper
//! half. Corners are unit vectors; elevation is applied when projecting.

use glam::DVec3;

pub const LOWER_LEFT: usize = 0;
pub const LOWER_RIGHT: usize = 1;
pub const UPPER_LEFT: usize = 2;
pub const UPPER_RIGHT: usize = 3;

/// Corner directions of one quadtree patch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scope {
  pub corners: [DVec3; 4],
}

impl Scope {
  /// Create a scope; corners are normalized onto the unit sphere.
  pub fn new(corners: [DVec3; 4]) -> Self {
    Self {
      corners: corners.map(|c| c.normalize()),
    }
  }

  /// Direction through the middle of the patch.
  #[inline]
  pub fn centroid(&self) -> DVec3 {
    (self.corners[0] + self.corners[1] + self.corners[2] + self.corners[3]).normalize()
  }

  /// Bilinear grid direction at `(u, v)` in `[0, 1]²`.
  ///
  /// Points on an edge depend only on that edge's two corners, so patches that
  /// share an edge produce identical grid points along it.
  #[inline]
  pub fn grid_point(&self, u: f64, v: f64) -> DVec3 {
    let [ll, lr, ul, ur] = self.corners;
    (ll * ((1.0 - u) * (1.0 - v)) + lr * (u * (1.0 - v)) + ul * ((1.0 - u) * v) + ur * (u * v))
      .normalize()
  }

  /// Corner `which` lifted to `radius`.
  #[inline]
  pub fn corner_at(&self, which: usize, radius: f64) -> DVec3 {
    self.corners[which] * radius
  }

  /// The 4 child scopes (spherical midpoint subdivision).
  pub fn split(&self) -> [Scope; 4] {
    let [ll, lr, ul, ur] = self.corners;
    let mb = (ll + lr).normalize();
    let ml = (ll + ul).normalize();
    let mr = (lr + ur).normalize();
    let mt = (ul + ur).normalize();
    let center = self.centroid();
    [
      Scope { corners: [ll, mb, ml, center] },
      Scope { corners: [mb, lr, center, mr] },
      Scope { corners: [ml, center, ul, mt] },
      Scope { corners: [center, mr, mt, ur] },
    ]
  }

  /// Single child scope.
  #[inline]
  pub fn child(&self, which: u8) -> Scope {
    self.split()[which as usize & 3]
  }

  /// Solid angle covered by the patch (steradians).
  ///
  /// Sum of the two geodesic triangles either side of the LL-UR diagonal.
  pub fn spherical_area(&self) -> f64 {
    let [ll, lr, ul, ur] = self.corners;
    triangle_solid_angle(ll, lr, ur) + triangle_solid_angle(ll, ur, ul)
  }

  /// True when the corners wind counter-clockwise seen from outside.
  pub fn is_outward(&self) -> bool {
    let [ll, lr, ul, _] = self.corners;
    (lr - ll).cross(ul - ll).dot(self.centroid()) > 0.0
  }
}

/// Van Oosterom-Strackee solid angle of a geodesic triangle of unit vectors.
fn triangle_solid_angle(a: DVec3, b: DVec3, c: DVec3) -> f64 {
  let numerator = a.dot(b.cross(c)).abs();
  let denominator = 1.0 + a.dot(b) + b.dot(c) + c.dot(a);
  2.0 * numerator.atan2(denominator)
}
