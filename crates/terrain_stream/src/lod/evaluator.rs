//! LOD evaluators - score how far a node is from ideal detail.
//!
//! ```text
//!   projected_px = focal_px * r / max(d, r)
//!   score        = scale * ln(projected_px / (tile_resolution * 0.55)) + bias
//!
//!   score  >= +1   too coarse, split
//!   score  <= -1   too fine, merge
//! ```
//!
//! Each level halves a node's radius, so one level of refinement lowers the
//! score by `scale * ln 2`.

use super::view::View;
use crate::constants::LOD_TILE_FACTOR;
use crate::tree::Node;

/// Refine/coarsen urgency of a node.
pub trait LodEvaluator: Send {
  /// Signed score; 0 is ideal detail.
  fn evaluate(&self, node: &Node, view: &View) -> f64;
}

/// Screen-space error from the bounding sphere's projected radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrustumLod {
  pub scale: f64,
  pub bias: f64,
  pub tile_resolution: usize,
}

impl FrustumLod {
  pub fn new(scale: f64, bias: f64, tile_resolution: usize) -> Self {
    Self {
      scale,
      bias,
      tile_resolution,
    }
  }

  /// Unscaled score: log of projected size over native tile size.
  pub fn compute(&self, node: &Node, view: &View) -> f64 {
    let radius = node.bounds.radius.max(f64::MIN_POSITIVE);
    let distance = view.eye.distance(node.bounds.center).max(radius);
    let projected = view.focal_px * radius / distance;
    (projected / (self.tile_resolution as f64 * LOD_TILE_FACTOR)).ln()
  }
}

impl LodEvaluator for FrustumLod {
  #[inline]
  fn evaluate(&self, node: &Node, view: &View) -> f64 {
    self.scale * self.compute(node, view) + self.bias
  }
}

/// [`FrustumLod`] dampened with distance from the view's focus.
///
/// Without a focus it scores exactly like the inner evaluator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FocusLod {
  pub inner: FrustumLod,
}

impl FocusLod {
  pub fn new(inner: FrustumLod) -> Self {
    Self { inner }
  }
}

impl LodEvaluator for FocusLod {
  fn evaluate(&self, node: &Node, view: &View) -> f64 {
    let score = self.inner.evaluate(node, view);
    let Some(focus) = view.focus else {
      return score;
    };
    let gap = (node.bounds.center.distance(focus.center) - node.bounds.radius).max(0.0);
    score - self.inner.scale * (1.0 + gap / focus.radius.max(f64::MIN_POSITIVE)).ln()
  }
}

#[cfg(test)]
mod tests {
  use glam::DVec3;

  use super::*;
  use crate::geometry::{BoundingSphere, Polyhedron};
  use crate::index::TreeIndex;
  use crate::lod::view::Focus;

  fn node_at(center: DVec3, radius: f64) -> Node {
    let mut node = Node::new(TreeIndex::root(0), Polyhedron::Cube.scopes()[0], None);
    node.bounds = BoundingSphere::new(center, radius);
    node.has_bounds = true;
    node
  }

  fn view_from(eye: DVec3) -> View {
    View::perspective(eye, DVec3::ZERO, DVec3::Y, 60f64.to_radians(), [1000, 1000], 0.1, 1e7)
  }

  #[test]
  fn test_ideal_projection_scores_zero() {
    let lod = FrustumLod::new(1.0, 0.0, 65);
    let view = view_from(DVec3::new(0.0, 0.0, 1000.0));
    // Pick a radius whose projection is exactly 65 * 0.55 px.
    let radius = 65.0 * LOD_TILE_FACTOR * 1000.0 / view.focal_px;
    let score = lod.evaluate(&node_at(DVec3::ZERO, radius), &view);
    assert!(score.abs() < 1e-9, "score {score}");
  }

  #[test]
  fn test_closer_scores_higher() {
    let lod = FrustumLod::new(1.0, 0.0, 65);
    let node = node_at(DVec3::ZERO, 10.0);
    let near = lod.evaluate(&node, &view_from(DVec3::new(0.0, 0.0, 50.0)));
    let far = lod.evaluate(&node, &view_from(DVec3::new(0.0, 0.0, 5000.0)));
    assert!(near > far);
    assert!((near - far - 100f64.ln()).abs() < 1e-9);
  }

  #[test]
  fn test_halving_radius_lowers_by_ln2() {
    let lod = FrustumLod::new(2.0, 0.5, 33);
    let view = view_from(DVec3::new(0.0, 0.0, 1000.0));
    let big = lod.evaluate(&node_at(DVec3::ZERO, 20.0), &view);
    let small = lod.evaluate(&node_at(DVec3::ZERO, 10.0), &view);
    assert!((big - small - 2.0 * std::f64::consts::LN_2).abs() < 1e-9);
  }

  #[test]
  fn test_eye_inside_bounds_is_finite() {
    let lod = FrustumLod::new(1.0, 0.0, 65);
    let node = node_at(DVec3::ZERO, 100.0);
    let score = lod.evaluate(&node, &view_from(DVec3::new(0.0, 0.0, 1.0)));
    assert!(score.is_finite());
    assert!(score > 1.0);
  }

  #[test]
  fn test_focus_dampens_far_nodes_only() {
    let inner = FrustumLod::new(1.0, 0.0, 65);
    let lod = FocusLod::new(inner);
    let view = view_from(DVec3::new(0.0, 0.0, 1000.0));
    let near_focus = node_at(DVec3::new(10.0, 0.0, 0.0), 5.0);
    let far_from_focus = node_at(DVec3::new(-500.0, 0.0, 0.0), 5.0);

    // No focus: identical to the inner evaluator.
    assert_eq!(lod.evaluate(&far_from_focus, &view), inner.evaluate(&far_from_focus, &view));

    let view = view.with_focus(Focus {
      center: DVec3::new(10.0, 0.0, 0.0),
      radius: 50.0,
    });
    assert_eq!(lod.evaluate(&near_focus, &view), inner.evaluate(&near_focus, &view));
    assert!(lod.evaluate(&far_from_focus, &view) < inner.evaluate(&far_from_focus, &view) - 1.0);
  }
}
