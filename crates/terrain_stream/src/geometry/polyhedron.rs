//! Base polyhedra whose faces become the quadtree forest's patch roots.
//!
//! Each face is projected radially onto the unit sphere. Faces are emitted
//! with outward winding (LL -> LR -> UR -> UL counter-clockwise seen from
//! outside), and adjacent faces share their edge corners exactly.

use glam::DVec3;
use serde::Deserialize;
use smallvec::SmallVec;

use super::Scope;

/// Polyhedron used to split the sphere into base patches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polyhedron {
  /// 6 square patches.
  Cube,
  /// 30 rhombic patches of near-uniform area.
  #[default]
  Triacontahedron,
}

impl Polyhedron {
  /// Number of base patches.
  pub fn num_patches(&self) -> usize {
    match self {
      Polyhedron::Cube => 6,
      Polyhedron::Triacontahedron => 30,
    }
  }

  /// Scopes of all base patches, indexed by patch id.
  pub fn scopes(&self) -> Vec<Scope> {
    match self {
      Polyhedron::Cube => cube_scopes(),
      Polyhedron::Triacontahedron => triacontahedron_scopes(),
    }
  }
}

fn cube_scopes() -> Vec<Scope> {
  // (normal, u, v) with u x v = normal.
  let faces = [
    (DVec3::X, DVec3::Y, DVec3::Z),
    (DVec3::NEG_X, DVec3::Z, DVec3::Y),
    (DVec3::Y, DVec3::Z, DVec3::X),
    (DVec3::NEG_Y, DVec3::X, DVec3::Z),
    (DVec3::Z, DVec3::X, DVec3::Y),
    (DVec3::NEG_Z, DVec3::Y, DVec3::X),
  ];
  faces
    .iter()
    .map(|&(n, u, v)| Scope::new([n - u - v, n + u - v, n - u + v, n + u + v]))
    .collect()
}

/// Rhombic triacontahedron: one rhombus per icosahedron edge, spanned by the
/// edge's two endpoints and the centers of the two triangles sharing it.
fn triacontahedron_scopes() -> Vec<Scope> {
  let phi = (1.0 + 5.0_f64.sqrt()) * 0.5;
  let mut vertices: Vec<DVec3> = Vec::with_capacity(12);
  for a in [-1.0, 1.0] {
    for b in [-phi, phi] {
      vertices.push(DVec3::new(0.0, a, b));
      vertices.push(DVec3::new(a, b, 0.0));
      vertices.push(DVec3::new(b, 0.0, a));
    }
  }

  // Icosahedron edges have length 2 with these coordinates.
  let adjacent = |i: usize, j: usize| (vertices[i].distance_squared(vertices[j]) - 4.0).abs() < 1e-9;

  let mut scopes = Vec::with_capacity(30);
  for i in 0..vertices.len() {
    for j in (i + 1)..vertices.len() {
      if !adjacent(i, j) {
        continue;
      }
      let apexes: SmallVec<[usize; 2]> = (0..vertices.len())
        .filter(|&k| k != i && k != j && adjacent(i, k) && adjacent(j, k))
        .collect();
      debug_assert_eq!(apexes.len(), 2, "icosahedron edge must border two faces");
      if apexes.len() != 2 {
        continue;
      }

      let a = vertices[i].normalize();
      let b = vertices[j].normalize();
      let mut f1 = (vertices[i] + vertices[j] + vertices[apexes[0]]).normalize();
      let mut f2 = (vertices[i] + vertices[j] + vertices[apexes[1]]).normalize();
      if (f1 - a).cross(f2 - a).dot(a + b) < 0.0 {
        std::mem::swap(&mut f1, &mut f2);
      }
      scopes.push(Scope::new([a, f1, f2, b]));
    }
  }
  scopes
}
