//! DataIndex - cache key combining a node address with a data layer id.

use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasherDefault, Hasher};

use super::tree_index::{TreeIndex, DATA_MASK, DATA_SHIFT};

/// Which kind of cached data an entry holds for its node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DataId(u8);

impl DataId {
  /// CPU-resident node data (all layers, geometry and bounds).
  pub const MAIN: Self = Self(0);
  /// GPU geometry / texture slot.
  pub const GPU_GEOMETRY: Self = Self(1);
  /// Largest id that fits the packed field.
  pub const MAX: u8 = DATA_MASK as u8;

  pub const fn new(id: u8) -> Self {
    Self(id)
  }

  #[inline]
  pub const fn raw(self) -> u8 {
    self.0
  }
}

/// Cache key: a [`TreeIndex`] plus a [`DataId`].
///
/// The all-ones pattern is the [`DataIndex::INVALID`] sentinel. Its level
/// field (63) exceeds [`TreeIndex::MAX_LEVEL`], so no real index can collide
/// with it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataIndex(u64);

impl DataIndex {
  /// Sentinel for "no owner".
  pub const INVALID: Self = Self(u64::MAX);

  pub fn new(index: TreeIndex, data: DataId) -> Self {
    debug_assert!(data.0 <= DataId::MAX, "data id {} out of range", data.0);
    Self(index.raw() | ((data.0 as u64) & DATA_MASK) << DATA_SHIFT)
  }

  /// Main-data key for a node.
  #[inline]
  pub fn main(index: TreeIndex) -> Self {
    Self::new(index, DataId::MAIN)
  }

  #[inline]
  pub const fn raw(self) -> u64 {
    self.0
  }

  #[inline]
  pub fn is_valid(self) -> bool {
    self != Self::INVALID
  }

  /// Node address with the data id stripped.
  #[inline]
  pub const fn tree_index(self) -> TreeIndex {
    TreeIndex::from_raw(self.0)
  }

  #[inline]
  pub const fn data_id(self) -> DataId {
    DataId(((self.0 >> DATA_SHIFT) & DATA_MASK) as u8)
  }
}

impl fmt::Debug for DataIndex {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_valid() {
      write!(f, "DataIndex({}#{})", self.tree_index(), self.data_id().raw())
    } else {
      write!(f, "DataIndex(INVALID)")
    }
  }
}

/// Hasher for index keys.
///
/// Keys are already unique 64-bit patterns; only the bit mixing matters. Uses
/// the splitmix64 finalizer so nearby paths spread across buckets.
#[derive(Default, Clone, Copy)]
pub struct IndexHasher(u64);

impl Hasher for IndexHasher {
  #[inline]
  fn finish(&self) -> u64 {
    let mut z = self.0;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
  }

  #[inline]
  fn write(&mut self, bytes: &[u8]) {
    for &b in bytes {
      self.0 = self.0.rotate_left(8) ^ b as u64;
    }
  }

  #[inline]
  fn write_u64(&mut self, value: u64) {
    self.0 ^= value;
  }
}

/// Hash map keyed by index types.
pub type IndexMap<K, V> = HashMap<K, V, BuildHasherDefault<IndexHasher>>;
