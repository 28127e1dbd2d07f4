//! Spherical geometry for quadtree patches.
//!
//! - [`scope`]: `Scope` - patch corners and spherical subdivision
//! - [`polyhedron`]: `Polyhedron` - base patches of the forest
//! - [`sphere`]: `BoundingSphere` - per-node bounds
//! - [`frustum`]: `Frustum` - view volume tests

pub mod frustum;
pub mod polyhedron;
pub mod scope;
pub mod sphere;

pub use frustum::Frustum;
pub use polyhedron::Polyhedron;
pub use scope::Scope;
pub use sphere::BoundingSphere;
