#![doc = r#"# ao-mem

Fixed-capacity block pools implementing the `MemoryResource` contract from
`ao-core`, so signal allocation stays deterministic on systems that cannot
tolerate the heap in steady state.

## Module Overview
- [`pool`]        – [`Pool`], sized at runtime over a heap arena.
- [`static_pool`] – [`StaticPool`], sized at compile time, no heap at any
  point.
- [`allocator_class!`] – declares a process-wide one-shot binding from an
  allocator class to a concrete resource.

Both pools share the same free-list algorithm: a singly-linked FIFO threaded
through the unused slots, a mutex across list mutation and an atomic fill
level for lock-free inspection.
"#]

mod freelist;
pub mod pool;
pub mod static_pool;

pub use ao_core::{AllocError, AllocatorClass, MemoryResource};
pub use pool::Pool;
pub use static_pool::StaticPool;

/// Declare an allocator class with one-shot process-wide binding.
///
/// The class starts unbound; `set` (own a resource, leak it into the
/// process) or `bind` (reference a `static` resource) installs the backing
/// [`MemoryResource`] exactly once. A second installation panics, as does
/// allocating through an unbound class.
///
/// ```
/// use ao_mem::Pool;
///
/// ao_mem::allocator_class!(pub EventAllocator);
///
/// let pool = EventAllocator::set(Pool::new(64, 8, "events"));
/// assert_eq!(pool.capacity(), 8);
/// ```
#[macro_export]
macro_rules! allocator_class {
    ($(#[$meta:meta])* $vis:vis $name:ident) => {
        $(#[$meta])*
        $vis struct $name;

        impl $name {
            fn cell() -> &'static ::std::sync::OnceLock<&'static dyn $crate::MemoryResource> {
                static CELL: ::std::sync::OnceLock<&'static dyn $crate::MemoryResource> =
                    ::std::sync::OnceLock::new();
                &CELL
            }

            /// Install an owned resource, leaking it for the process lifetime.
            /// One-shot; panics when the class is already bound.
            #[allow(dead_code)]
            $vis fn set<R: $crate::MemoryResource + 'static>(resource: R) -> &'static R {
                let leaked: &'static R = ::std::boxed::Box::leak(::std::boxed::Box::new(resource));
                Self::bind(leaked);
                leaked
            }

            /// Install a `static` resource. One-shot; panics when the class
            /// is already bound.
            #[allow(dead_code)]
            $vis fn bind(resource: &'static dyn $crate::MemoryResource) {
                if Self::cell().set(resource).is_err() {
                    panic!(concat!(
                        "allocator class `",
                        stringify!($name),
                        "` is already bound"
                    ));
                }
            }
        }

        impl $crate::AllocatorClass for $name {
            fn resource() -> &'static dyn $crate::MemoryResource {
                match Self::cell().get() {
                    Some(resource) => *resource,
                    None => panic!(concat!(
                        "allocator class `",
                        stringify!($name),
                        "` used before it was bound"
                    )),
                }
            }
        }
    };
}
