//! Pooled cache with LRU eviction and generation-checked claims.
//!
//! - [`allocator`]: `Allocator` - creates/destroys slot payloads
//! - [`pool`]: `Pool` - fixed-capacity slot array with frame stamps
//!
//! The cache owns every pool. Pools are registered once at startup and live
//! until the cache is dropped; only slot ownership churns per frame.
//!
//! # Frame protocol
//!
//! ```text
//! advance_frame()          frame += 1, swap counters reset
//!   touch(claim)           stamp = max(stamp, frame)   "still needed"
//!   grab_new(pool, key)    reuse the oldest stamp < frame, or fail
//!   pin(claim, true)       stamp = MAX                  never evicted
//!   invalidate(claim)      release early, stamp = 0
//! ```
//!
//! A [`Claim`] is `(pool, slot, generation)`. Reassigning or releasing a slot
//! bumps its generation, so every claim issued before that point fails
//! [`Cache::is_valid`] and every accessor returns `None` for it.

pub mod allocator;
pub mod pool;

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use tracing::info;

pub use allocator::{Allocator, GpuHandle, SequentialGpuHandles};
pub use pool::{Pool, PoolStats};

use crate::index::DataIndex;

// =============================================================================
// Handles
// =============================================================================

/// Typed identifier of a registered pool.
pub struct PoolId<T> {
  index: u32,
  _marker: PhantomData<fn() -> T>,
}

impl<T> PoolId<T> {
  #[inline]
  pub fn index(self) -> u32 {
    self.index
  }
}

impl<T> Clone for PoolId<T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T> Copy for PoolId<T> {}

impl<T> PartialEq for PoolId<T> {
  fn eq(&self, other: &Self) -> bool {
    self.index == other.index
  }
}

impl<T> Eq for PoolId<T> {}

impl<T> fmt::Debug for PoolId<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "PoolId({})", self.index)
  }
}

/// Generation-checked handle to one slot of a pool.
pub struct Claim<T> {
  pool: PoolId<T>,
  slot: u32,
  generation: u32,
}

impl<T> Claim<T> {
  #[inline]
  pub fn pool(self) -> PoolId<T> {
    self.pool
  }

  /// Slot position inside the pool (stable for the pool's lifetime).
  #[inline]
  pub fn slot(self) -> u32 {
    self.slot
  }

  #[inline]
  pub fn generation(self) -> u32 {
    self.generation
  }
}

impl<T> Clone for Claim<T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T> Copy for Claim<T> {}

impl<T> PartialEq for Claim<T> {
  fn eq(&self, other: &Self) -> bool {
    self.pool == other.pool && self.slot == other.slot && self.generation == other.generation
  }
}

impl<T> Eq for Claim<T> {}

impl<T> Hash for Claim<T> {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.pool.index.hash(state);
    self.slot.hash(state);
    self.generation.hash(state);
  }
}

impl<T> fmt::Debug for Claim<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Claim({}:{}@{})", self.pool.index, self.slot, self.generation)
  }
}

// =============================================================================
// Type erasure
// =============================================================================

trait ErasedPool: Send {
  fn begin_frame(&mut self);
  fn stats(&self, frame: u64) -> PoolStats;
  fn as_any(&self) -> &dyn Any;
  fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Send + 'static> ErasedPool for Pool<T> {
  fn begin_frame(&mut self) {
    Pool::begin_frame(self);
  }

  fn stats(&self, frame: u64) -> PoolStats {
    Pool::stats(self, frame)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn as_any_mut(&mut self) -> &mut dyn Any {
    self
  }
}

// =============================================================================
// Cache
// =============================================================================

/// Owner of all slot pools and the global frame counter.
pub struct Cache {
  frame: u64,
  pools: Vec<Box<dyn ErasedPool>>,
}

impl Default for Cache {
  fn default() -> Self {
    Self::new()
  }
}

impl Cache {
  /// Empty cache. The frame counter starts at 1 so freshly created slots
  /// (stamp 0) are immediately evictable.
  pub fn new() -> Self {
    Self {
      frame: 1,
      pools: Vec::new(),
    }
  }

  /// Current frame number.
  #[inline]
  pub fn frame_number(&self) -> u64 {
    self.frame
  }

  /// Create a pool of `capacity` slots, allocating every payload up front.
  ///
  /// `max_swaps_per_frame` bounds successful [`grab_new`](Self::grab_new)
  /// calls per frame (0 = unlimited).
  pub fn register_pool<T: Send + 'static>(
    &mut self,
    name: impl Into<String>,
    capacity: usize,
    max_swaps_per_frame: usize,
    allocator: Box<dyn Allocator<T>>,
  ) -> PoolId<T> {
    let name = name.into();
    let pool = Pool::new(name.clone(), capacity, allocator, max_swaps_per_frame);
    info!(
      pool = %name,
      capacity,
      bytes = capacity * pool.stats(self.frame).allocation_size,
      "registered cache pool"
    );
    let index = self.pools.len() as u32;
    self.pools.push(Box::new(pool));
    PoolId {
      index,
      _marker: PhantomData,
    }
  }

  /// Borrow a pool (e.g. to bind every GPU payload for drawing).
  pub fn pool<T: Send + 'static>(&self, id: PoolId<T>) -> &Pool<T> {
    self.pools[id.index as usize]
      .as_any()
      .downcast_ref::<Pool<T>>()
      .expect("PoolId type matches its registered pool")
  }

  fn pool_mut<T: Send + 'static>(&mut self, id: PoolId<T>) -> &mut Pool<T> {
    self.pools[id.index as usize]
      .as_any_mut()
      .downcast_mut::<Pool<T>>()
      .expect("PoolId type matches its registered pool")
  }

  /// Claim a slot for `index`, evicting the least recently confirmed slot.
  ///
  /// Returns `None` when every unpinned slot was confirmed this frame or the
  /// pool's swap budget is spent. The previous owner's claim becomes stale.
  pub fn grab_new<T: Send + 'static>(&mut self, pool: PoolId<T>, index: DataIndex) -> Option<Claim<T>> {
    debug_assert!(index.is_valid(), "cannot grab a slot for the invalid index");
    let frame = self.frame;
    let (slot, generation) = self.pool_mut(pool).grab(frame, index)?;
    Some(Claim {
      pool,
      slot,
      generation,
    })
  }

  /// Mark a claim as needed this frame. Returns false for a stale claim.
  pub fn touch<T: Send + 'static>(&mut self, claim: Claim<T>) -> bool {
    let frame = self.frame;
    self
      .pool_mut(claim.pool)
      .touch(claim.slot, claim.generation, frame)
  }

  /// Pin (`want = true`) or unpin a claim. Returns false for a stale claim.
  ///
  /// Unpinning stamps the slot with the current frame; it becomes evictable
  /// from the next frame on.
  pub fn pin<T: Send + 'static>(&mut self, claim: Claim<T>, want: bool) -> bool {
    let frame = self.frame;
    self
      .pool_mut(claim.pool)
      .pin(claim.slot, claim.generation, want, frame)
  }

  pub fn is_pinned<T: Send + 'static>(&self, claim: Claim<T>) -> bool {
    self.pool(claim.pool).is_pinned(claim.slot, claim.generation)
  }

  /// Release a claim early. Returns false if it was already stale.
  pub fn invalidate<T: Send + 'static>(&mut self, claim: Claim<T>) -> bool {
    self
      .pool_mut(claim.pool)
      .invalidate(claim.slot, claim.generation)
  }

  #[inline]
  pub fn is_valid<T: Send + 'static>(&self, claim: Claim<T>) -> bool {
    self.pool(claim.pool).is_live(claim.slot, claim.generation)
  }

  /// Still-resident claim for `index`, if any.
  pub fn find<T: Send + 'static>(&self, pool: PoolId<T>, index: DataIndex) -> Option<Claim<T>> {
    let (slot, generation) = self.pool(pool).find(index)?;
    Some(Claim {
      pool,
      slot,
      generation,
    })
  }

  /// Key a live claim is bound to.
  pub fn owner<T: Send + 'static>(&self, claim: Claim<T>) -> Option<DataIndex> {
    self.pool(claim.pool).owner(claim.slot, claim.generation)
  }

  /// Frame stamp of a live claim ([`PINNED_FRAME`](crate::constants::PINNED_FRAME) when pinned).
  pub fn frame_stamp<T: Send + 'static>(&self, claim: Claim<T>) -> Option<u64> {
    self.pool(claim.pool).frame_stamp(claim.slot, claim.generation)
  }

  pub fn get<T: Send + 'static>(&self, claim: Claim<T>) -> Option<&T> {
    self.pool(claim.pool).get(claim.slot, claim.generation)
  }

  pub fn get_mut<T: Send + 'static>(&mut self, claim: Claim<T>) -> Option<&mut T> {
    self
      .pool_mut(claim.pool)
      .get_mut(claim.slot, claim.generation)
  }

  /// Advance the global frame counter and reset every pool's swap counter.
  pub fn advance_frame(&mut self) {
    self.frame += 1;
    for pool in &mut self.pools {
      pool.begin_frame();
    }
  }

  /// Occupancy of every pool, in registration order.
  pub fn stats(&self) -> Vec<PoolStats> {
    self.pools.iter().map(|p| p.stats(self.frame)).collect()
  }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod cache_test;
