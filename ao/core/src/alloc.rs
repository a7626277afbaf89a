//! Polymorphic allocation contract for signal storage.
//!
//! Signal kinds name an *allocator class*: a type that resolves to a
//! process-wide [`MemoryResource`]. The default class is [`HeapAllocator`];
//! pool-backed classes are declared with the `allocator_class!` macro in
//! `ao-mem` and bound once at startup.

use core::alloc::Layout;
use core::ptr::NonNull;

use thiserror::Error;

/// Allocation failure surfaced to the caller of `make`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The backing resource has no free block left.
    #[error("allocator exhausted")]
    Exhausted,
}

/// A memory resource signal blocks are carved from.
///
/// Implementations are shared across producer and consumer threads and must
/// synchronize internally.
pub trait MemoryResource: Send + Sync {
    /// Hand out a block satisfying `layout`.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Return a block to the resource.
    ///
    /// # Safety
    ///
    /// `ptr` must have been obtained from [`allocate`](Self::allocate) on
    /// this resource with the same `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Type-level tag binding signal kinds to a concrete [`MemoryResource`].
pub trait AllocatorClass: 'static {
    /// The resource instances of this class allocate from.
    fn resource() -> &'static dyn MemoryResource;
}

/// Allocator class forwarding to the process heap.
pub struct HeapAllocator;

struct HeapResource;

impl MemoryResource for HeapResource {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(layout.size() > 0);
        // SAFETY: signal control blocks are never zero-sized.
        let raw = unsafe { std::alloc::alloc(layout) };
        NonNull::new(raw).ok_or(AllocError::Exhausted)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded from `allocate` per the trait contract.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

static HEAP: HeapResource = HeapResource;

impl AllocatorClass for HeapAllocator {
    fn resource() -> &'static dyn MemoryResource {
        &HEAP
    }
}
