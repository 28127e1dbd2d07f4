//! Engine-agnostic metrics collection for streaming statistics.
//!
//! Feature-gated and runtime-toggled to ensure zero overhead when disabled.
//!
//! # Usage
//!
//! ```ignore
//! use terrain_stream::metrics::{StreamMetrics, COLLECT_METRICS};
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! // After each frame:
//! metrics.record_frame(streamer.last_frame(), streamer.surface());
//! metrics.record_pools(&streamer.cache().stats());
//! ```

use std::collections::VecDeque;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;
use std::sync::atomic::AtomicBool;

use crate::cache::PoolStats;
use crate::index::TreeIndex;
use crate::streamer::FrameStats;
use crate::surface::SurfaceApproximation;

const LEVELS: usize = TreeIndex::MAX_LEVEL as usize + 1;

/// Runtime toggle for metrics collection.
/// Set to false to disable metrics gathering at runtime.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
  #[cfg(feature = "metrics")]
  {
    COLLECT_METRICS.load(Ordering::Relaxed)
  }
  #[cfg(not(feature = "metrics"))]
  {
    false
  }
}

/// Rolling window for storing recent values (e.g., timing history).
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
  buffer: VecDeque<T>,
  capacity: usize,
}

impl<T> RollingWindow<T> {
  /// Create a new rolling window with the given capacity.
  pub fn new(capacity: usize) -> Self {
    Self {
      buffer: VecDeque::with_capacity(capacity),
      capacity,
    }
  }

  /// Push a new value, evicting the oldest if at capacity.
  pub fn push(&mut self, value: T) {
    if self.buffer.len() >= self.capacity {
      self.buffer.pop_front();
    }
    self.buffer.push_back(value);
  }

  pub fn len(&self) -> usize {
    self.buffer.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
  }

  /// Iterate over values (oldest to newest).
  pub fn iter(&self) -> impl Iterator<Item = &T> {
    self.buffer.iter()
  }

  /// Get the most recent value.
  pub fn last(&self) -> Option<&T> {
    self.buffer.back()
  }
}

impl<T: Copy + Default + std::ops::Add<Output = T>> RollingWindow<T> {
  /// Compute the sum of all values.
  pub fn sum(&self) -> T {
    self.buffer.iter().copied().fold(T::default(), |acc, x| acc + x)
  }
}

impl RollingWindow<u64> {
  /// Compute the average of all values.
  pub fn average(&self) -> f64 {
    if self.buffer.is_empty() {
      0.0
    } else {
      self.sum() as f64 / self.buffer.len() as f64
    }
  }

  /// Get min and max values.
  pub fn min_max(&self) -> Option<(u64, u64)> {
    let min = *self.buffer.iter().min()?;
    let max = *self.buffer.iter().max()?;
    Some((min, max))
  }
}

impl Default for RollingWindow<u64> {
  fn default() -> Self {
    Self::new(128) // ~2 seconds at 60fps
  }
}

/// Streaming statistics updated once per frame.
#[derive(Debug, Clone)]
pub struct StreamMetrics {
  // Surface
  /// Contributing tiles at each level (index = level).
  pub tiles_per_level: [u32; LEVELS],
  pub contributing: u32,
  /// Tiles whose GPU slot was freshly claimed last frame.
  pub pending_uploads: u32,

  // Pools
  /// Occupied slots per pool, in registration order.
  pub pool_resident: Vec<(String, usize)>,
  /// Bytes held by all pool payloads.
  pub pool_memory_bytes: u64,

  // Timing
  /// Rolling window of traversal times in microseconds.
  pub refine_timings: RollingWindow<u64>,
  /// Rolling window of fetch servicing times in microseconds.
  pub service_timings: RollingWindow<u64>,
  pub last_refine_us: u64,
  pub last_service_us: u64,

  // Cumulative
  /// Nodes loaded this session.
  pub total_loaded: u64,
  /// Failed tile loads this session.
  pub total_failed: u64,
}

impl Default for StreamMetrics {
  fn default() -> Self {
    Self {
      tiles_per_level: [0; LEVELS],
      contributing: 0,
      pending_uploads: 0,
      pool_resident: Vec::new(),
      pool_memory_bytes: 0,
      refine_timings: RollingWindow::new(128),
      service_timings: RollingWindow::new(128),
      last_refine_us: 0,
      last_service_us: 0,
      total_loaded: 0,
      total_failed: 0,
    }
  }
}

impl StreamMetrics {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reset all metrics to zero.
  pub fn reset(&mut self) {
    self.tiles_per_level.fill(0);
    self.contributing = 0;
    self.pending_uploads = 0;
    self.pool_resident.clear();
    self.pool_memory_bytes = 0;
    self.refine_timings.clear();
    self.service_timings.clear();
    self.last_refine_us = 0;
    self.last_service_us = 0;
    // Cumulative counters survive a reset.
  }

  /// Record the outcome of one `advance_frame`.
  pub fn record_frame(&mut self, frame: &FrameStats, surface: &SurfaceApproximation) {
    if !is_enabled() {
      return;
    }

    self.tiles_per_level.fill(0);
    for (level, count) in surface.tiles_per_level().into_iter().enumerate().take(LEVELS) {
      self.tiles_per_level[level] = count as u32;
    }
    self.contributing = surface.len() as u32;
    self.pending_uploads = surface.pending_uploads().count() as u32;

    self.refine_timings.push(frame.refine_us);
    self.service_timings.push(frame.service_us);
    self.last_refine_us = frame.refine_us;
    self.last_service_us = frame.service_us;

    self.total_loaded += frame.fetch.serviced as u64;
    self.total_failed += frame.fetch.failed as u64;
  }

  /// Record pool occupancy.
  pub fn record_pools(&mut self, pools: &[PoolStats]) {
    if !is_enabled() {
      return;
    }

    self.pool_resident = pools.iter().map(|p| (p.name.clone(), p.resident)).collect();
    self.pool_memory_bytes = pools
      .iter()
      .map(|p| (p.capacity * p.allocation_size) as u64)
      .sum();
  }

  pub fn avg_refine_timing_us(&self) -> f64 {
    self.refine_timings.average()
  }

  pub fn avg_service_timing_us(&self) -> f64 {
    self.service_timings.average()
  }

  /// Pool memory in megabytes.
  pub fn pool_memory_mb(&self) -> f64 {
    self.pool_memory_bytes as f64 / 1_048_576.0
  }
}
