//! View - per-frame camera state supplied by the host.

use glam::{DMat4, DVec3};
use smallvec::SmallVec;

use crate::geometry::Frustum;

/// Region of interest that keeps detail high around it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Focus {
  pub center: DVec3,
  /// Distance over which refinement is not dampened.
  pub radius: f64,
}

/// Camera state for one frame.
#[derive(Clone, Debug)]
pub struct View {
  /// Eye position in planet-centered coordinates.
  pub eye: DVec3,
  pub frustum: Frustum,
  /// Pixels per unit of tangent at the image plane:
  /// `viewport_height / (2 * tan(fovy / 2))`.
  pub focal_px: f64,
  /// Extra clip volumes (e.g. the second eye, a shadow caster).
  pub auxiliary: SmallVec<[Frustum; 2]>,
  pub focus: Option<Focus>,
}

impl View {
  pub fn new(eye: DVec3, frustum: Frustum, focal_px: f64) -> Self {
    Self {
      eye,
      frustum,
      focal_px,
      auxiliary: SmallVec::new(),
      focus: None,
    }
  }

  /// Right-handed perspective camera looking from `eye` at `target`.
  pub fn perspective(
    eye: DVec3,
    target: DVec3,
    up: DVec3,
    fovy_radians: f64,
    viewport: [u32; 2],
    near: f64,
    far: f64,
  ) -> Self {
    let aspect = viewport[0].max(1) as f64 / viewport[1].max(1) as f64;
    let view = DMat4::look_at_rh(eye, target, up);
    let projection = DMat4::perspective_rh(fovy_radians, aspect, near, far);
    let frustum = Frustum::from_view_projection(projection * view);
    let focal_px = viewport[1] as f64 / (2.0 * (0.5 * fovy_radians).tan());
    Self::new(eye, frustum, focal_px)
  }

  pub fn with_focus(mut self, focus: Focus) -> Self {
    self.focus = Some(focus);
    self
  }

  pub fn with_auxiliary(mut self, frustum: Frustum) -> Self {
    self.auxiliary.push(frustum);
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_perspective_focal_length() {
    let view = View::perspective(
      DVec3::new(0.0, 0.0, 10.0),
      DVec3::ZERO,
      DVec3::Y,
      90f64.to_radians(),
      [800, 600],
      0.1,
      100.0,
    );
    // tan(45°) = 1, so focal = 600 / 2.
    assert!((view.focal_px - 300.0).abs() < 1e-9);
    assert!(view.frustum.contains_point(DVec3::ZERO));
    assert!(!view.frustum.contains_point(DVec3::new(0.0, 0.0, 20.0)));
    assert!(view.focus.is_none());
  }
}
