//! Rate limiting configuration for tree refinement.
//!
//! Prevents frame spikes from unbounded cascading operations by limiting
//! the number of splits and coarsens per frame.

/// Rate limiting configuration for tree refinement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefinementBudget {
  /// Maximum leaf splits per frame (0 = unlimited).
  pub max_splits: usize,
  /// Maximum subtree coarsens per frame (0 = unlimited).
  pub max_coarsens: usize,
}

impl RefinementBudget {
  /// Default budget with reasonable limits.
  pub const DEFAULT: Self = Self {
    max_splits: 64,
    max_coarsens: 64,
  };

  /// Unlimited budget for testing or special cases.
  pub const UNLIMITED: Self = Self {
    max_splits: 0,
    max_coarsens: 0,
  };

  /// Check if more splits can be performed.
  #[inline]
  pub fn can_split(&self, performed: usize) -> bool {
    self.max_splits == 0 || performed < self.max_splits
  }

  /// Check if more coarsens can be performed.
  #[inline]
  pub fn can_coarsen(&self, performed: usize) -> bool {
    self.max_coarsens == 0 || performed < self.max_coarsens
  }
}

impl Default for RefinementBudget {
  fn default() -> Self {
    Self::DEFAULT
  }
}

/// Statistics from one traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefinementStats {
  /// Nodes the traversal looked at.
  pub nodes_visited: usize,
  /// Nodes rejected by the visibility evaluator.
  pub nodes_culled: usize,
  /// Leaves given 4 children.
  pub splits_performed: usize,
  /// Interior nodes collapsed back into leaves.
  pub coarsens_performed: usize,
  /// Nodes dropped from the tree below invisible or abandoned parents.
  /// Their cached data is kept.
  pub nodes_released: usize,
  /// Children reattached to still-resident cached data.
  pub reattached: usize,
  /// Fetch requests issued.
  pub requests_issued: usize,
  /// Tiles in the surface approximation.
  pub contributing: usize,
  /// Contributing tiles that got a fresh GPU slot.
  pub gpu_uploads: usize,
  /// Contributing tiles left without a GPU slot.
  pub gpu_deferred: usize,
}

impl RefinementStats {
  /// Total number of structural changes performed.
  #[inline]
  pub fn total_transitions(&self) -> usize {
    self.splits_performed + self.coarsens_performed
  }
}
