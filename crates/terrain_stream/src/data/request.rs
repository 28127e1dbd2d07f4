//! Fetch requests - LOD-prioritized, deduplicated per-frame load queue.
//!
//! The queue is rebuilt by every traversal and drained by
//! [`DataManager::service`](super::DataManager::service). Requests left over
//! after the per-frame budget are dropped; the next traversal reissues them if
//! they still matter.

use std::cmp::Ordering;

use crate::index::TreeIndex;
use crate::tree::NodeId;

/// Request to load one child of a tree node.
#[derive(Clone, Copy, Debug)]
pub struct FetchRequest {
  /// LOD score of the parent; larger magnitude is more urgent.
  pub priority: f64,
  pub parent: NodeId,
  pub child: u8,
  /// Address of the child; stale if the tree changed before servicing.
  pub index: TreeIndex,
}

impl FetchRequest {
  pub fn new(priority: f64, parent: NodeId, child: u8, index: TreeIndex) -> Self {
    Self {
      priority,
      parent,
      child,
      index,
    }
  }

  /// Urgency order: larger `|priority|` first, ties broken by address.
  #[inline]
  pub fn urgency_cmp(&self, other: &Self) -> Ordering {
    other
      .priority
      .abs()
      .total_cmp(&self.priority.abs())
      .then_with(|| self.index.cmp(&other.index))
  }
}

/// Requests naming the same target are equal.
impl PartialEq for FetchRequest {
  fn eq(&self, other: &Self) -> bool {
    self.index == other.index
  }
}

impl Eq for FetchRequest {}

/// One frame's worth of fetch requests.
#[derive(Debug, Default)]
pub struct FetchQueue {
  requests: Vec<FetchRequest>,
}

impl FetchQueue {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, request: FetchRequest) {
    self.requests.push(request);
  }

  pub fn len(&self) -> usize {
    self.requests.len()
  }

  pub fn is_empty(&self) -> bool {
    self.requests.is_empty()
  }

  pub fn clear(&mut self) {
    self.requests.clear();
  }

  /// Sort by urgency and collapse requests for the same target, keeping the
  /// most urgent copy. Returns the number of duplicates removed.
  pub fn prepare(&mut self) -> usize {
    let before = self.requests.len();
    // Group by target first so duplicates are adjacent, most urgent leading.
    self.requests.sort_by(|a, b| {
      a.index
        .cmp(&b.index)
        .then_with(|| b.priority.abs().total_cmp(&a.priority.abs()))
    });
    self.requests.dedup();
    self.requests.sort_by(FetchRequest::urgency_cmp);
    before - self.requests.len()
  }

  /// Prepared requests, most urgent first.
  pub fn as_slice(&self) -> &[FetchRequest] {
    &self.requests
  }

  /// Take every request out, leaving the queue empty.
  pub fn drain(&mut self) -> std::vec::Drain<'_, FetchRequest> {
    self.requests.drain(..)
  }
}
