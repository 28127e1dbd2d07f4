//! Visibility evaluators - decide whether a node can contribute this frame.

use super::view::View;
use crate::tree::Node;

pub trait VisibilityEvaluator: Send {
  fn evaluate(&self, node: &Node, view: &View) -> bool;
}

/// Bounding sphere against the main frustum or any auxiliary frustum.
///
/// Nodes without bounds yet are treated as visible.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrustumVisibility;

impl VisibilityEvaluator for FrustumVisibility {
  fn evaluate(&self, node: &Node, view: &View) -> bool {
    if !node.has_bounds {
      return true;
    }
    let (center, radius) = (node.bounds.center, node.bounds.radius);
    view.frustum.intersects_sphere(center, radius)
      || view
        .auxiliary
        .iter()
        .any(|f| f.intersects_sphere(center, radius))
  }
}

/// Everything is visible (offline tools, whole-planet traversals).
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysVisible;

impl VisibilityEvaluator for AlwaysVisible {
  fn evaluate(&self, _node: &Node, _view: &View) -> bool {
    true
  }
}

#[cfg(test)]
mod tests {
  use glam::DVec3;

  use super::*;
  use crate::geometry::{BoundingSphere, Polyhedron};
  use crate::index::TreeIndex;

  fn node_at(center: DVec3) -> Node {
    let mut node = Node::new(TreeIndex::root(0), Polyhedron::Cube.scopes()[0], None);
    node.bounds = BoundingSphere::new(center, 1.0);
    node.has_bounds = true;
    node
  }

  fn view_towards(target: DVec3) -> View {
    View::perspective(DVec3::ZERO, target, DVec3::Y, 60f64.to_radians(), [640, 480], 0.1, 1000.0)
  }

  #[test]
  fn test_main_frustum() {
    let view = view_towards(DVec3::NEG_Z);
    assert!(FrustumVisibility.evaluate(&node_at(DVec3::new(0.0, 0.0, -10.0)), &view));
    assert!(!FrustumVisibility.evaluate(&node_at(DVec3::new(0.0, 0.0, 10.0)), &view));
  }

  #[test]
  fn test_auxiliary_frustum_extends_visibility() {
    let behind = node_at(DVec3::new(0.0, 0.0, 10.0));
    let view = view_towards(DVec3::NEG_Z).with_auxiliary(view_towards(DVec3::Z).frustum);
    assert!(FrustumVisibility.evaluate(&behind, &view));
  }

  #[test]
  fn test_unloaded_node_is_visible() {
    let mut node = node_at(DVec3::new(0.0, 0.0, 10.0));
    node.has_bounds = false;
    assert!(FrustumVisibility.evaluate(&node, &view_towards(DVec3::NEG_Z)));
    assert!(AlwaysVisible.evaluate(&node, &view_towards(DVec3::NEG_Z)));
  }
}
