//! Pool - fixed-capacity set of reusable slots with LRU eviction.
//!
//! ```text
//!   slot:      0        1        2        3
//!   frame:    41       43      MAX       40     <- current frame 43
//!   owner:   A#0      B#0      R#0      C#0
//!                              pinned    ▲
//!                                        └── grab_new() evicts this slot:
//!                                            smallest stamp, not pinned,
//!                                            not touched this frame
//! ```
//!
//! Each slot carries a generation counter that is bumped every time the slot
//! is reassigned or released. Claims remember the generation they were issued
//! with, so a claim on a reclaimed slot is detectably stale instead of
//! dangling.

use tracing::trace;

use super::allocator::Allocator;
use crate::constants::PINNED_FRAME;
use crate::index::{DataIndex, IndexMap};

pub(crate) struct Slot<T> {
  payload: T,
  frame: u64,
  generation: u32,
  owner: DataIndex,
}

/// Fixed-capacity slot pool.
pub struct Pool<T> {
  name: String,
  slots: Vec<Slot<T>>,
  allocator: Box<dyn Allocator<T>>,
  lookup: IndexMap<DataIndex, u32>,
  max_swaps_per_frame: usize,
  swaps_this_frame: usize,
  evictions: u64,
  failed_grabs: u64,
}

/// Snapshot of a pool's occupancy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
  pub name: String,
  pub capacity: usize,
  /// Bytes per slot as reported by the allocator.
  pub allocation_size: usize,
  /// Slots currently owned by some index.
  pub resident: usize,
  /// Slots confirmed live this frame (pinned slots excluded).
  pub touched: usize,
  pub pinned: usize,
  pub swaps_this_frame: usize,
  /// Owned slots reassigned to a different owner since startup.
  pub evictions: u64,
  /// grab_new calls that found no slot since startup.
  pub failed_grabs: u64,
}

impl<T> Pool<T> {
  pub(crate) fn new(
    name: String,
    capacity: usize,
    mut allocator: Box<dyn Allocator<T>>,
    max_swaps_per_frame: usize,
  ) -> Self {
    let slots = (0..capacity)
      .map(|_| Slot {
        payload: allocator.allocate(),
        frame: 0,
        generation: 0,
        owner: DataIndex::INVALID,
      })
      .collect();
    Self {
      name,
      slots,
      allocator,
      lookup: IndexMap::default(),
      max_swaps_per_frame,
      swaps_this_frame: 0,
      evictions: 0,
      failed_grabs: 0,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn capacity(&self) -> usize {
    self.slots.len()
  }

  /// Swaps still allowed this frame (`None` = unlimited).
  pub fn swaps_remaining(&self) -> Option<usize> {
    if self.max_swaps_per_frame == 0 {
      None
    } else {
      Some(self.max_swaps_per_frame.saturating_sub(self.swaps_this_frame))
    }
  }

  /// Iterate every payload, owned or not (e.g. to bind a texture array).
  pub fn payloads(&self) -> impl Iterator<Item = &T> {
    self.slots.iter().map(|s| &s.payload)
  }

  pub(crate) fn begin_frame(&mut self) {
    self.swaps_this_frame = 0;
  }

  /// Reassign the least recently confirmed slot to `index`.
  ///
  /// Returns `(slot, generation)` or `None` when every unpinned slot was
  /// confirmed this frame, the swap budget is spent, or `index` is held by a
  /// pinned slot.
  pub(crate) fn grab(&mut self, frame: u64, index: DataIndex) -> Option<(u32, u32)> {
    if self.max_swaps_per_frame > 0 && self.swaps_this_frame >= self.max_swaps_per_frame {
      self.failed_grabs += 1;
      return None;
    }
    // A pinned copy is never superseded.
    if let Some(&held) = self.lookup.get(&index) {
      if self.slots[held as usize].frame == PINNED_FRAME {
        self.failed_grabs += 1;
        return None;
      }
    }

    let victim = self
      .slots
      .iter()
      .enumerate()
      .filter(|(_, s)| s.frame != PINNED_FRAME)
      .min_by_key(|(_, s)| s.frame)
      .map(|(i, s)| (i, s.frame));
    let Some((victim, stamp)) = victim else {
      self.failed_grabs += 1;
      return None;
    };
    if stamp >= frame {
      self.failed_grabs += 1;
      return None;
    }

    // A key maps to at most one slot; a fresh grab supersedes the old copy.
    if let Some(previous) = self.lookup.get(&index).copied() {
      if previous as usize != victim {
        self.release_slot(previous as usize);
      }
    }

    let slot = &mut self.slots[victim];
    if slot.owner.is_valid() {
      trace!(pool = %self.name, evicted = ?slot.owner, by = ?index, "evict");
      self.lookup.remove(&slot.owner);
      self.evictions += 1;
    }
    slot.generation = slot.generation.wrapping_add(1);
    slot.owner = index;
    slot.frame = frame;
    let generation = slot.generation;
    self.lookup.insert(index, victim as u32);
    self.swaps_this_frame += 1;
    Some((victim as u32, generation))
  }

  #[inline]
  fn live_slot(&self, slot: u32, generation: u32) -> Option<&Slot<T>> {
    self
      .slots
      .get(slot as usize)
      .filter(|s| s.generation == generation && s.owner.is_valid())
  }

  #[inline]
  fn live_slot_mut(&mut self, slot: u32, generation: u32) -> Option<&mut Slot<T>> {
    self
      .slots
      .get_mut(slot as usize)
      .filter(|s| s.generation == generation && s.owner.is_valid())
  }

  pub(crate) fn is_live(&self, slot: u32, generation: u32) -> bool {
    self.live_slot(slot, generation).is_some()
  }

  pub(crate) fn touch(&mut self, slot: u32, generation: u32, frame: u64) -> bool {
    match self.live_slot_mut(slot, generation) {
      Some(s) => {
        if s.frame != PINNED_FRAME {
          s.frame = s.frame.max(frame);
        }
        true
      }
      None => false,
    }
  }

  pub(crate) fn pin(&mut self, slot: u32, generation: u32, want: bool, frame: u64) -> bool {
    match self.live_slot_mut(slot, generation) {
      Some(s) => {
        if want {
          s.frame = PINNED_FRAME;
        } else if s.frame == PINNED_FRAME {
          s.frame = frame;
        }
        true
      }
      None => false,
    }
  }

  pub(crate) fn is_pinned(&self, slot: u32, generation: u32) -> bool {
    self
      .live_slot(slot, generation)
      .map_or(false, |s| s.frame == PINNED_FRAME)
  }

  pub(crate) fn invalidate(&mut self, slot: u32, generation: u32) -> bool {
    if !self.is_live(slot, generation) {
      return false;
    }
    self.release_slot(slot as usize);
    true
  }

  /// Drop ownership and move the slot to the front of the eviction order.
  fn release_slot(&mut self, slot: usize) {
    let s = &mut self.slots[slot];
    if s.owner.is_valid() {
      self.lookup.remove(&s.owner);
    }
    s.owner = DataIndex::INVALID;
    s.frame = 0;
    s.generation = s.generation.wrapping_add(1);
  }

  pub(crate) fn find(&self, index: DataIndex) -> Option<(u32, u32)> {
    let slot = *self.lookup.get(&index)?;
    let generation = self.slots[slot as usize].generation;
    Some((slot, generation))
  }

  pub(crate) fn owner(&self, slot: u32, generation: u32) -> Option<DataIndex> {
    self.live_slot(slot, generation).map(|s| s.owner)
  }

  pub(crate) fn frame_stamp(&self, slot: u32, generation: u32) -> Option<u64> {
    self.live_slot(slot, generation).map(|s| s.frame)
  }

  pub(crate) fn get(&self, slot: u32, generation: u32) -> Option<&T> {
    self.live_slot(slot, generation).map(|s| &s.payload)
  }

  pub(crate) fn get_mut(&mut self, slot: u32, generation: u32) -> Option<&mut T> {
    self.live_slot_mut(slot, generation).map(|s| &mut s.payload)
  }

  pub(crate) fn stats(&self, frame: u64) -> PoolStats {
    let mut stats = PoolStats {
      name: self.name.clone(),
      capacity: self.slots.len(),
      allocation_size: self.allocator.allocation_size(),
      swaps_this_frame: self.swaps_this_frame,
      evictions: self.evictions,
      failed_grabs: self.failed_grabs,
      ..Default::default()
    };
    for s in &self.slots {
      if s.owner.is_valid() {
        stats.resident += 1;
      }
      if s.frame == PINNED_FRAME {
        stats.pinned += 1;
      } else if s.frame >= frame {
        stats.touched += 1;
      }
    }
    stats
  }
}

impl<T> Drop for Pool<T> {
  fn drop(&mut self) {
    for slot in std::mem::take(&mut self.slots) {
      self.allocator.release(slot.payload);
    }
  }
}
