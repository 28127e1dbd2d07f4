//! NodeArena - slab of quadtree nodes addressed by stable ids.
//!
//! ```text
//!   ids:   0   1 .. R-1 | R  R+1 R+2 R+3 | R+4 .. R+7 | ...
//!          roots (one   | child block     | child block
//!          per patch)   | (4 siblings)    |
//! ```
//!
//! Roots are allocated singly at startup and never freed. Children are
//! allocated as blocks of 4 contiguous ids; freed blocks are recycled
//! through a free list, so ids of live nodes never move.

use std::ops::{Index, IndexMut};

use super::node::{Node, NodeId};
use crate::constants::CHILD_COUNT;

#[derive(Default)]
pub struct NodeArena {
  slots: Vec<Option<Node>>,
  free_blocks: Vec<NodeId>,
  roots: Vec<NodeId>,
  live: usize,
}

impl NodeArena {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of live nodes.
  pub fn len(&self) -> usize {
    self.live
  }

  pub fn is_empty(&self) -> bool {
    self.live == 0
  }

  /// Root ids in insertion order (one per patch).
  pub fn roots(&self) -> &[NodeId] {
    &self.roots
  }

  /// Number of free child blocks awaiting reuse.
  pub fn free_blocks(&self) -> usize {
    self.free_blocks.len()
  }

  pub fn insert_root(&mut self, node: Node) -> NodeId {
    debug_assert!(node.parent.is_none());
    let id = NodeId::from_raw(self.slots.len() as u32);
    self.slots.push(Some(node));
    self.roots.push(id);
    self.live += 1;
    id
  }

  /// Attach 4 children to a leaf. Returns the first child id.
  pub fn insert_children(&mut self, parent: NodeId, children: [Node; CHILD_COUNT]) -> NodeId {
    debug_assert!(self[parent].is_leaf(), "{parent:?} already has children");
    let first = match self.free_blocks.pop() {
      Some(first) => first,
      None => {
        let first = NodeId::from_raw(self.slots.len() as u32);
        self.slots.extend((0..CHILD_COUNT).map(|_| None));
        first
      }
    };
    for (which, mut child) in children.into_iter().enumerate() {
      child.parent = Some(parent);
      self.slots[first.offset(which as u8).raw() as usize] = Some(child);
    }
    self.live += CHILD_COUNT;
    self[parent].first_child = Some(first);
    first
  }

  pub fn get(&self, id: NodeId) -> Option<&Node> {
    self.slots.get(id.raw() as usize)?.as_ref()
  }

  pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
    self.slots.get_mut(id.raw() as usize)?.as_mut()
  }

  /// Ids of the 4 children, if the node is live and interior.
  pub fn children(&self, id: NodeId) -> Option<[NodeId; CHILD_COUNT]> {
    let first = self.get(id)?.first_child?;
    Some([0, 1, 2, 3].map(|which| first.offset(which)))
  }

  /// Remove every descendant of `parent`, handing each removed node to
  /// `visit` (children before their parent). `parent` becomes a leaf.
  pub fn remove_children(&mut self, parent: NodeId, mut visit: impl FnMut(Node)) -> usize {
    let Some(first) = self.get_mut(parent).and_then(|n| n.first_child.take()) else {
      return 0;
    };
    let mut removed = 0;
    let mut stack = vec![(first, false)];
    while let Some((block, expanded)) = stack.pop() {
      if !expanded {
        stack.push((block, true));
        for which in 0..CHILD_COUNT as u8 {
          if let Some(grandchildren) = self[block.offset(which)].first_child {
            stack.push((grandchildren, false));
          }
        }
        continue;
      }
      for which in 0..CHILD_COUNT as u8 {
        if let Some(node) = self.slots[block.offset(which).raw() as usize].take() {
          visit(node);
          removed += 1;
        }
      }
      self.free_blocks.push(block);
    }
    self.live -= removed;
    removed
  }

  /// Ids of every live node below `id` (excluding `id`), depth first.
  pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = self.children(id).map(|c| c.to_vec()).unwrap_or_default();
    while let Some(next) = stack.pop() {
      out.push(next);
      if let Some(children) = self.children(next) {
        stack.extend(children);
      }
    }
    out
  }

  /// Ids of every live leaf, in ascending id order.
  pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
    self.slots.iter().enumerate().filter_map(|(i, slot)| {
      slot
        .as_ref()
        .filter(|n| n.is_leaf())
        .map(|_| NodeId::from_raw(i as u32))
    })
  }
}

impl Index<NodeId> for NodeArena {
  type Output = Node;

  fn index(&self, id: NodeId) -> &Node {
    match self.get(id) {
      Some(node) => node,
      None => panic!("{id:?} is not a live node"),
    }
  }
}

impl IndexMut<NodeId> for NodeArena {
  fn index_mut(&mut self, id: NodeId) -> &mut Node {
    match self.get_mut(id) {
      Some(node) => node,
      None => panic!("{id:?} is not a live node"),
    }
  }
}

#[cfg(test)]
#[path = "arena_test.rs"]
mod arena_test;
