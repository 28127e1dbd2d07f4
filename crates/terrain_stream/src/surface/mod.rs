//! Refinement traversal and its output.
//!
//! - [`budget`]: `RefinementBudget`, `RefinementStats` - per-frame limits and counters
//! - [`approximation`]: `SurfaceApproximation`, `SurfaceTile` - renderable tiling
//! - [`refinement`]: `refine` - the per-frame refine/coarsen walk

pub mod approximation;
pub mod budget;
pub mod refinement;

pub use approximation::{SurfaceApproximation, SurfaceTile};
pub use budget::{RefinementBudget, RefinementStats};
pub use refinement::{refine, RefinementInput};
