//! Intrusive free list threaded through unused pool slots.
//!
//! Next-pointers live inside the free slots themselves, so the list costs no
//! storage beyond the arena. Allocation pops the head, deallocation pushes
//! the tail (FIFO reuse).

use core::ptr::NonNull;

pub(crate) struct FreeNode {
    next: Option<NonNull<FreeNode>>,
}

pub(crate) struct FreeList {
    head: Option<NonNull<FreeNode>>,
    tail: Option<NonNull<FreeNode>>,
}

impl FreeList {
    pub(crate) const fn new() -> Self {
        Self {
            head: None,
            tail: None,
        }
    }

    /// Append a slot to the tail of the list.
    ///
    /// # Safety
    ///
    /// `slot` must point to writable memory of at least
    /// `size_of::<FreeNode>()` bytes, aligned for `FreeNode`, that stays
    /// untouched until [`pop`](Self::pop) hands it back out.
    pub(crate) unsafe fn push(&mut self, slot: NonNull<u8>) {
        let node = slot.cast::<FreeNode>();
        // SAFETY: caller guarantees the slot is writable, aligned and unused.
        unsafe { node.as_ptr().write(FreeNode { next: None }) };
        match self.tail {
            // SAFETY: `tail` was written by a previous `push` and is still free.
            Some(tail) => unsafe { (*tail.as_ptr()).next = Some(node) },
            None => self.head = Some(node),
        }
        self.tail = Some(node);
    }

    /// Detach and return the head slot.
    pub(crate) fn pop(&mut self) -> Option<NonNull<u8>> {
        let node = self.head?;
        // SAFETY: list nodes are valid FreeNodes written by `push`.
        self.head = unsafe { node.as_ref().next };
        if self.head.is_none() {
            self.tail = None;
        }
        Some(node.cast())
    }
}

// SAFETY: the raw pointers only ever refer to slots of the owning pool's
// arena; the pool serializes access behind its mutex.
unsafe impl Send for FreeList {}
