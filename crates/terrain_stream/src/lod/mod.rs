//! View-dependent policies.
//!
//! - [`view`]: `View`, `Focus` - per-frame camera state
//! - [`evaluator`]: `LodEvaluator` (`FrustumLod`, `FocusLod`) - refine/coarsen score
//! - [`visibility`]: `VisibilityEvaluator` (`FrustumVisibility`, `AlwaysVisible`)

pub mod evaluator;
pub mod view;
pub mod visibility;

pub use evaluator::{FocusLod, FrustumLod, LodEvaluator};
pub use view::{Focus, View};
pub use visibility::{AlwaysVisible, FrustumVisibility, VisibilityEvaluator};
