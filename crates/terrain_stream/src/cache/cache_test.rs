use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;
use crate::constants::PINNED_FRAME;
use crate::index::TreeIndex;

/// Allocator handing out increasing integers and counting releases.
struct CountingAllocator {
  next: u32,
  released: Arc<AtomicUsize>,
}

impl CountingAllocator {
  fn boxed() -> Box<dyn Allocator<u32>> {
    Self::with_counter(Arc::new(AtomicUsize::new(0)))
  }

  fn with_counter(released: Arc<AtomicUsize>) -> Box<dyn Allocator<u32>> {
    Box::new(Self { next: 0, released })
  }
}

impl Allocator<u32> for CountingAllocator {
  fn allocate(&mut self) -> u32 {
    self.next += 1;
    self.next
  }

  fn allocation_size(&self) -> usize {
    4
  }

  fn release(&mut self, _payload: u32) {
    self.released.fetch_add(1, Ordering::Relaxed);
  }
}

fn key(patch: u8, which: u8) -> DataIndex {
  DataIndex::main(TreeIndex::root(patch).down(which))
}

fn cache_with_pool(capacity: usize, swaps: usize) -> (Cache, PoolId<u32>) {
  let mut cache = Cache::new();
  let pool = cache.register_pool("test", capacity, swaps, CountingAllocator::boxed());
  (cache, pool)
}

// =============================================================================
// Batch 1: Capacity and frame headroom
// =============================================================================

#[test]
fn test_capacity_n_accepts_exactly_n_grabs_per_frame() {
  for capacity in [1usize, 2, 4, 7] {
    let (mut cache, pool) = cache_with_pool(capacity, 0);
    for i in 0..capacity {
      let claim = cache
        .grab_new(pool, key((i / 4) as u8, (i % 4) as u8))
        .expect("slot available");
      assert!(cache.touch(claim));
    }
    assert!(cache.grab_new(pool, key(9, 0)).is_none(), "capacity {capacity}");

    cache.advance_frame();
    assert!(cache.grab_new(pool, key(9, 0)).is_some());
  }
}

#[test]
fn test_empty_pool_never_grants() {
  let (mut cache, pool) = cache_with_pool(0, 0);
  assert!(cache.grab_new(pool, key(0, 0)).is_none());
  cache.advance_frame();
  assert!(cache.grab_new(pool, key(0, 0)).is_none());
  assert_eq!(cache.stats()[0].failed_grabs, 2);
}

#[test]
fn test_grab_stamps_current_frame() {
  let (mut cache, pool) = cache_with_pool(2, 0);
  cache.advance_frame();
  cache.advance_frame();
  let claim = cache.grab_new(pool, key(0, 0)).unwrap();
  assert_eq!(cache.frame_stamp(claim), Some(3));
  assert_eq!(cache.owner(claim), Some(key(0, 0)));
}

// =============================================================================
// Batch 2: Touch
// =============================================================================

#[test]
fn test_touch_is_idempotent_within_frame() {
  let (mut cache, pool) = cache_with_pool(2, 0);
  let claim = cache.grab_new(pool, key(0, 0)).unwrap();
  cache.advance_frame();
  assert!(cache.touch(claim));
  let stamp = cache.frame_stamp(claim);
  assert!(cache.touch(claim));
  assert!(cache.touch(claim));
  assert_eq!(cache.frame_stamp(claim), stamp);
  assert_eq!(stamp, Some(cache.frame_number()));
}

#[test]
fn test_touched_slot_outlives_untouched_slot() {
  let (mut cache, pool) = cache_with_pool(2, 0);
  let a = cache.grab_new(pool, key(0, 0)).unwrap();
  let b = cache.grab_new(pool, key(0, 1)).unwrap();

  cache.advance_frame();
  cache.touch(a);
  let c = cache.grab_new(pool, key(0, 2)).unwrap();

  assert!(cache.is_valid(a));
  assert!(!cache.is_valid(b));
  assert!(cache.is_valid(c));
  assert_eq!(c.slot(), b.slot());
}

#[test]
fn test_touch_stale_claim_reports_false() {
  let (mut cache, pool) = cache_with_pool(1, 0);
  let a = cache.grab_new(pool, key(0, 0)).unwrap();
  cache.advance_frame();
  let _b = cache.grab_new(pool, key(0, 1)).unwrap();
  assert!(!cache.touch(a));
  assert!(cache.get(a).is_none());
}

// =============================================================================
// Batch 3: Pin
// =============================================================================

#[test]
fn test_pinned_slot_is_never_evicted() {
  let (mut cache, pool) = cache_with_pool(2, 0);
  let a = cache.grab_new(pool, key(0, 0)).unwrap();
  let b = cache.grab_new(pool, key(0, 1)).unwrap();
  assert!(cache.pin(a, true));
  assert!(cache.is_pinned(a));
  assert_eq!(cache.frame_stamp(a), Some(PINNED_FRAME));

  // Touch b so it is newer than a's original stamp.
  cache.advance_frame();
  cache.touch(b);
  assert!(cache.grab_new(pool, key(0, 2)).is_none());

  cache.advance_frame();
  let c = cache.grab_new(pool, key(0, 2)).unwrap();
  assert!(cache.is_valid(a));
  assert!(!cache.is_valid(b));

  // Unpinning restores ordinary LRU eligibility.
  assert!(cache.pin(a, false));
  assert!(!cache.is_pinned(a));
  assert_eq!(cache.frame_stamp(a), Some(cache.frame_number()));
  cache.advance_frame();
  cache.touch(c);
  let _d = cache.grab_new(pool, key(0, 3)).unwrap();
  assert!(!cache.is_valid(a));
  assert!(cache.is_valid(c));
}

#[test]
fn test_touch_keeps_pin() {
  let (mut cache, pool) = cache_with_pool(1, 0);
  let a = cache.grab_new(pool, key(0, 0)).unwrap();
  cache.pin(a, true);
  cache.advance_frame();
  cache.touch(a);
  assert!(cache.is_pinned(a));
  assert_eq!(cache.stats()[0].pinned, 1);
}

#[test]
fn test_fully_pinned_pool_rejects_grabs() {
  let (mut cache, pool) = cache_with_pool(2, 0);
  for which in 0..2 {
    let claim = cache.grab_new(pool, key(0, which)).unwrap();
    cache.pin(claim, true);
  }
  for _ in 0..3 {
    cache.advance_frame();
    assert!(cache.grab_new(pool, key(1, 0)).is_none());
  }
}

#[test]
fn test_grab_for_pinned_key_keeps_pinned_copy() {
  let (mut cache, pool) = cache_with_pool(2, 0);
  let a = cache.grab_new(pool, key(0, 0)).unwrap();
  cache.pin(a, true);
  cache.advance_frame();

  assert!(cache.grab_new(pool, key(0, 0)).is_none());
  assert!(cache.is_valid(a));
  assert!(cache.is_pinned(a));
  assert_eq!(cache.find(pool, key(0, 0)), Some(a));
  assert_eq!(cache.stats()[0].failed_grabs, 1);

  // Once unpinned, a fresh grab supersedes the old copy again.
  cache.pin(a, false);
  cache.advance_frame();
  let b = cache.grab_new(pool, key(0, 0)).unwrap();
  assert!(!cache.is_valid(a));
  assert_eq!(cache.find(pool, key(0, 0)), Some(b));
}

// =============================================================================
// Batch 4: Eviction and invalidation
// =============================================================================

#[test]
fn test_eviction_clears_only_previous_owner() {
  let (mut cache, pool) = cache_with_pool(4, 0);
  let claims: Vec<_> = (0..4).map(|w| cache.grab_new(pool, key(0, w)).unwrap()).collect();

  cache.advance_frame();
  for &claim in &claims[1..] {
    cache.touch(claim);
  }
  let newcomer = cache.grab_new(pool, key(1, 0)).unwrap();

  assert!(!cache.is_valid(claims[0]));
  for &claim in &claims[1..] {
    assert!(cache.is_valid(claim));
    assert!(cache.get(claim).is_some());
  }
  assert_eq!(newcomer.slot(), claims[0].slot());
  assert_ne!(newcomer.generation(), claims[0].generation());
  assert_eq!(cache.find(pool, key(0, 0)), None);
  assert_eq!(cache.find(pool, key(1, 0)), Some(newcomer));
  assert_eq!(cache.stats()[0].evictions, 1);
}

#[test]
fn test_invalidate_frees_slot_within_frame() {
  let (mut cache, pool) = cache_with_pool(1, 0);
  let a = cache.grab_new(pool, key(0, 0)).unwrap();
  assert!(cache.grab_new(pool, key(0, 1)).is_none());

  assert!(cache.invalidate(a));
  assert!(!cache.invalidate(a), "second invalidate is a no-op");
  assert!(!cache.is_valid(a));
  assert_eq!(cache.find(pool, key(0, 0)), None);

  let b = cache.grab_new(pool, key(0, 1)).unwrap();
  assert!(cache.is_valid(b));
  // Released slots are not counted as evictions.
  assert_eq!(cache.stats()[0].evictions, 0);
}

#[test]
fn test_regrab_same_key_supersedes_old_copy() {
  let (mut cache, pool) = cache_with_pool(3, 0);
  let first = cache.grab_new(pool, key(0, 0)).unwrap();
  let second = cache.grab_new(pool, key(0, 0)).unwrap();
  assert!(!cache.is_valid(first));
  assert_eq!(cache.find(pool, key(0, 0)), Some(second));
  assert_eq!(cache.stats()[0].resident, 1);
}

#[test]
fn test_payload_survives_eviction_but_access_does_not() {
  let (mut cache, pool) = cache_with_pool(1, 0);
  let a = cache.grab_new(pool, key(0, 0)).unwrap();
  *cache.get_mut(a).unwrap() = 77;
  cache.advance_frame();
  let b = cache.grab_new(pool, key(0, 1)).unwrap();
  assert!(cache.get_mut(a).is_none());
  // Payloads are reused in place; the new owner sees the old contents.
  assert_eq!(cache.get(b), Some(&77));
}

// =============================================================================
// Batch 5: Swap budget, stats, teardown
// =============================================================================

#[test]
fn test_swap_budget_limits_grabs_per_frame() {
  let (mut cache, pool) = cache_with_pool(4, 2);
  assert_eq!(cache.pool(pool).swaps_remaining(), Some(2));
  assert!(cache.grab_new(pool, key(0, 0)).is_some());
  assert!(cache.grab_new(pool, key(0, 1)).is_some());
  assert_eq!(cache.pool(pool).swaps_remaining(), Some(0));
  assert!(cache.grab_new(pool, key(0, 2)).is_none());

  cache.advance_frame();
  assert!(cache.grab_new(pool, key(0, 2)).is_some());
  assert_eq!(cache.stats()[0].swaps_this_frame, 1);
}

#[test]
fn test_unlimited_swap_budget() {
  let (cache, pool) = cache_with_pool(4, 0);
  assert_eq!(cache.pool(pool).swaps_remaining(), None);
}

#[test]
fn test_stats_snapshot() {
  let (mut cache, pool) = cache_with_pool(4, 0);
  let a = cache.grab_new(pool, key(0, 0)).unwrap();
  let _b = cache.grab_new(pool, key(0, 1)).unwrap();
  cache.pin(a, true);
  cache.advance_frame();

  let stats = &cache.stats()[0];
  assert_eq!(stats.name, "test");
  assert_eq!(stats.capacity, 4);
  assert_eq!(stats.allocation_size, 4);
  assert_eq!(stats.resident, 2);
  assert_eq!(stats.pinned, 1);
  assert_eq!(stats.touched, 0);
}

#[test]
fn test_pools_are_independent() {
  let mut cache = Cache::new();
  let small = cache.register_pool("small", 1, 0, CountingAllocator::boxed());
  let gpu: PoolId<GpuHandle> = cache.register_pool("gpu", 1, 0, Box::new(SequentialGpuHandles::new(16)));

  let a = cache.grab_new(small, key(0, 0)).unwrap();
  let g = cache.grab_new(gpu, key(0, 0)).unwrap();
  assert!(cache.grab_new(small, key(0, 1)).is_none());
  assert!(cache.is_valid(a));
  assert_eq!(cache.get(g), Some(&GpuHandle(0)));
  assert_eq!(cache.pool(gpu).payloads().count(), 1);
}

#[test]
fn test_drop_releases_every_payload() {
  let released = Arc::new(AtomicUsize::new(0));
  {
    let mut cache = Cache::new();
    let pool = cache.register_pool("drop", 5, 0, CountingAllocator::with_counter(released.clone()));
    cache.grab_new(pool, key(0, 0)).unwrap();
  }
  assert_eq!(released.load(Ordering::Relaxed), 5);
}
