#![doc = r#"# ao-core

Signal primitives for the active-object framework.

Events are modelled as *signals*: immutable values with a numeric identity
that are shared by reference-counted handles. Construction always goes
through an allocator class, so a signal built from a pool returns its block
to that pool when the last handle drops.

## Module Overview
- [`id`]     – numeric signal identity.
- [`alloc`]  – polymorphic allocation contract and the heap allocator class.
- [`signal`] – handles, the [`SignalKind`] declaration trait and the checked
  downcast.

The crate is deliberately small; pools live in `ao-mem` and the dispatch
machinery in `ao-hsm`/`ao-rt`.
"#]

pub mod alloc;
pub mod id;
pub mod signal;

pub use alloc::{AllocError, AllocatorClass, HeapAllocator, MemoryResource};
pub use id::SignalId;
pub use signal::{Handle, Signal, SignalError, SignalKind};
