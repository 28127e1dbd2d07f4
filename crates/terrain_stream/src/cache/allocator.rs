//! Slot payload allocation.
//!
//! A pool calls its allocator once per slot when it is registered and hands
//! every payload back when it is dropped. Renderers implement
//! [`Allocator<GpuHandle>`] to back GPU pools with real textures or buffers.

/// Creates and destroys the payload behind each cache slot.
pub trait Allocator<T>: Send {
  /// Create one slot payload.
  fn allocate(&mut self) -> T;

  /// Approximate size in bytes of one payload (accounting only).
  fn allocation_size(&self) -> usize;

  /// Destroy a payload when its pool is torn down.
  fn release(&mut self, payload: T) {
    drop(payload);
  }
}

/// Opaque handle to a GPU-side resource owned by the renderer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct GpuHandle(pub u64);

/// Headless GPU allocator handing out sequential handle ids.
///
/// Used when no renderer is attached (tools, tests, benches).
#[derive(Debug, Default)]
pub struct SequentialGpuHandles {
  next: u64,
  released: usize,
  bytes_per_handle: usize,
}

impl SequentialGpuHandles {
  pub fn new(bytes_per_handle: usize) -> Self {
    Self {
      next: 0,
      released: 0,
      bytes_per_handle,
    }
  }

  /// Number of handles created so far.
  pub fn allocated(&self) -> u64 {
    self.next
  }

  /// Number of handles handed back.
  pub fn released(&self) -> usize {
    self.released
  }
}

impl Allocator<GpuHandle> for SequentialGpuHandles {
  fn allocate(&mut self) -> GpuHandle {
    let handle = GpuHandle(self.next);
    self.next += 1;
    handle
  }

  fn allocation_size(&self) -> usize {
    self.bytes_per_handle
  }

  fn release(&mut self, _payload: GpuHandle) {
    self.released += 1;
  }
}
