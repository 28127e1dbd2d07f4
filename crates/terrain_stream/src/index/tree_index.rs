//! TreeIndex - immutable bit-packed address of a quadtree node.
//!
//! ```text
//!  63      59 58  54 53 52 51    46 45                                   0
//! ┌──────────┬──────┬─────┬────────┬──────────────────────────────────────┐
//! │  patch   │ data │child│ level  │ path: one 2-bit digit per level      │
//! │  5 bits  │5 bits│2 bit│ 6 bits │ digit 0 = root's child (LSB first)   │
//! └──────────┴──────┴─────┴────────┴──────────────────────────────────────┘
//! ```
//!
//! The data field is always zero in a `TreeIndex`; [`super::DataIndex`] uses
//! the same layout with a non-zero data id.

use std::fmt;

pub(crate) const INDEX_BITS: u32 = 46;
pub(crate) const LEVEL_SHIFT: u32 = INDEX_BITS;
pub(crate) const LEVEL_BITS: u32 = 6;
pub(crate) const CHILD_SHIFT: u32 = LEVEL_SHIFT + LEVEL_BITS;
pub(crate) const DATA_SHIFT: u32 = CHILD_SHIFT + 2;
pub(crate) const DATA_BITS: u32 = 5;
pub(crate) const PATCH_SHIFT: u32 = DATA_SHIFT + DATA_BITS;

pub(crate) const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;
pub(crate) const LEVEL_MASK: u64 = (1 << LEVEL_BITS) - 1;
pub(crate) const DATA_MASK: u64 = (1 << DATA_BITS) - 1;

/// Quadtree node address - immutable value type.
///
/// Equality and hashing use the raw bit pattern.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeIndex(u64);

impl TreeIndex {
  /// Deepest level addressable by the path field.
  pub const MAX_LEVEL: u8 = (INDEX_BITS / 2) as u8;

  /// Largest number of base patches.
  pub const MAX_PATCHES: usize = 32;

  /// Canonical root of a base patch.
  #[inline]
  pub fn root(patch: u8) -> Self {
    debug_assert!((patch as usize) < Self::MAX_PATCHES, "patch {patch} out of range");
    Self((patch as u64) << PATCH_SHIFT)
  }

  /// Build an index from its parts.
  ///
  /// `child` is derived from the top digit of `index`.
  pub fn new(patch: u8, level: u8, index: u64) -> Self {
    debug_assert!((patch as usize) < Self::MAX_PATCHES, "patch {patch} out of range");
    debug_assert!(level <= Self::MAX_LEVEL, "level {level} out of range");
    debug_assert!(
      level as u32 * 2 >= 64 || index >> (level as u32 * 2) == 0,
      "path has digits above level {level}"
    );
    let child = if level == 0 {
      0
    } else {
      (index >> ((level as u32 - 1) * 2)) & 3
    };
    Self(
      (patch as u64) << PATCH_SHIFT
        | child << CHILD_SHIFT
        | (level as u64) << LEVEL_SHIFT
        | (index & INDEX_MASK),
    )
  }

  /// Reinterpret a raw bit pattern.
  #[inline]
  pub const fn from_raw(raw: u64) -> Self {
    Self(raw & !(DATA_MASK << DATA_SHIFT))
  }

  /// Raw bit pattern.
  #[inline]
  pub const fn raw(self) -> u64 {
    self.0
  }

  /// Base patch this node belongs to.
  #[inline]
  pub const fn patch(self) -> u8 {
    (self.0 >> PATCH_SHIFT) as u8
  }

  /// Depth from the patch root (0 = root).
  #[inline]
  pub const fn level(self) -> u8 {
    ((self.0 >> LEVEL_SHIFT) & LEVEL_MASK) as u8
  }

  /// Which of its 4 siblings this node is (0 for roots).
  #[inline]
  pub const fn child(self) -> u8 {
    ((self.0 >> CHILD_SHIFT) & 3) as u8
  }

  /// Path from the root, one 2-bit digit per level.
  #[inline]
  pub const fn index(self) -> u64 {
    self.0 & INDEX_MASK
  }

  /// True for the canonical root of a patch.
  #[inline]
  pub const fn is_root(self) -> bool {
    self.level() == 0
  }

  /// Child digit taken at `depth` (0 = the root's child).
  #[inline]
  pub fn digit(self, depth: u8) -> u8 {
    debug_assert!(depth < self.level());
    ((self.index() >> (depth as u32 * 2)) & 3) as u8
  }

  /// Address of child `which` (0-3).
  ///
  /// Child bits follow the scope corner order:
  /// - bit 0: right half
  /// - bit 1: upper half
  pub fn down(self, which: u8) -> Self {
    debug_assert!(which < 4, "child selector {which} out of range");
    debug_assert!(self.level() < Self::MAX_LEVEL, "cannot descend below MAX_LEVEL");
    let level = self.level() as u32;
    let index = self.index() | ((which as u64 & 3) << (level * 2));
    Self(
      (self.patch() as u64) << PATCH_SHIFT
        | (which as u64 & 3) << CHILD_SHIFT
        | ((level + 1) as u64) << LEVEL_SHIFT
        | index,
    )
  }

  /// Address of the parent node.
  ///
  /// Calling this on a root is a programmer error.
  pub fn up(self) -> Self {
    debug_assert!(self.level() > 0, "up() called on a patch root");
    let level = self.level().saturating_sub(1);
    if level == 0 {
      return Self::root(self.patch());
    }
    let index = self.index() & ((1u64 << (level as u32 * 2)) - 1);
    Self::new(self.patch(), level, index)
  }

  /// Ancestor at `level` (must not exceed this node's level).
  pub fn ancestor(self, level: u8) -> Self {
    debug_assert!(level <= self.level());
    if level == 0 {
      return Self::root(self.patch());
    }
    let index = self.index() & ((1u64 << (level as u32 * 2)) - 1);
    Self::new(self.patch(), level, index)
  }

  /// True if `self` is `other` or one of its ancestors.
  pub fn is_ancestor_of(self, other: TreeIndex) -> bool {
    self.patch() == other.patch()
      && self.level() <= other.level()
      && other.ancestor(self.level()) == self
  }
}

impl fmt::Debug for TreeIndex {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "TreeIndex({self})")
  }
}

impl fmt::Display for TreeIndex {
  /// Formats as `patch:path`, e.g. `3:021` for the node reached from patch 3
  /// by children 0, 2, 1.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:", self.patch())?;
    if self.is_root() {
      return write!(f, "-");
    }
    for depth in 0..self.level() {
      write!(f, "{}", self.digit(depth))?;
    }
    Ok(())
  }
}

#[cfg(test)]
#[path = "tree_index_test.rs"]
mod tree_index_test;
