//! Reference-counted signal handles.
//!
//! A signal is allocated exactly once through [`SignalKind::make`] and then
//! only ever shared: [`Handle<K>`] is the typed view, [`Signal`] the
//! type-erased view used by mailboxes and dispatch code. Both views point at
//! the same [`ControlBlock`], a bookkeeping header followed by the payload,
//! and the last handle to drop destroys the payload and returns the block to
//! the resource it came from.

use core::alloc::Layout;
use core::any::TypeId;
use core::fmt;
use core::marker::PhantomData;
use core::ops::Deref;
use core::ptr::{self, NonNull};
use core::sync::atomic::{fence, AtomicUsize, Ordering};

use thiserror::Error;

use crate::alloc::{AllocError, AllocatorClass, MemoryResource};
use crate::id::SignalId;

/// Downcast failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignalError {
    /// The handle refers to a different signal kind.
    #[error("signal kind mismatch: expected {expected}, got {actual}")]
    WrongSignalKind {
        /// Id of the requested kind.
        expected: SignalId,
        /// Id carried by the handle.
        actual: SignalId,
    },
}

/// Declares a payload type as a signal kind.
///
/// Each kind fixes its numeric [`ID`](Self::ID) at compile time and names the
/// [`AllocatorClass`] its instances are carved from. Unit kinds are most
/// conveniently declared with the [`signals!`](crate::signals) macro; kinds
/// with payload fields implement the trait by hand:
///
/// ```
/// use ao_core::{HeapAllocator, SignalId, SignalKind};
///
/// struct Measurement {
///     millivolts: u32,
/// }
///
/// impl SignalKind for Measurement {
///     const ID: SignalId = SignalId(7);
///     type Allocator = HeapAllocator;
/// }
///
/// let handle = Measurement { millivolts: 1250 }.make().unwrap();
/// assert_eq!(handle.millivolts, 1250);
/// ```
pub trait SignalKind: Send + Sync + Sized + 'static {
    /// Compile-time identity, unique within the machine's event universe.
    const ID: SignalId;

    /// Allocator class instances of this kind are allocated from.
    type Allocator: AllocatorClass;

    /// Human-readable kind name, used by logging.
    fn name() -> &'static str {
        core::any::type_name::<Self>()
    }

    /// Allocate the payload via [`Self::Allocator`] and return the first
    /// handle. This is the only way to construct a signal.
    fn make(self) -> Result<Handle<Self>, AllocError> {
        Handle::alloc(self)
    }

    /// Checked downcast from a type-erased handle.
    fn from_signal(signal: &Signal) -> Result<Handle<Self>, SignalError> {
        signal.downcast()
    }
}

// Refcount saturation guard, same threshold as std's Arc.
const MAX_REFCOUNT: usize = isize::MAX as usize;

struct Header {
    refs: AtomicUsize,
    id: SignalId,
    type_id: TypeId,
    name: &'static str,
    resource: &'static dyn MemoryResource,
    layout: Layout,
    drop_block: unsafe fn(NonNull<Header>),
}

/// Storage layout of an allocated signal: header followed by the payload.
///
/// `size_of::<ControlBlock<K>>()` is what a pool slot must accommodate for
/// kind `K`; see [`pool_block_size!`](crate::pool_block_size).
#[repr(C)]
pub struct ControlBlock<K> {
    header: Header,
    payload: K,
}

/// Size a pool slot needs for signal kind `K`.
pub const fn block_size_of<K>() -> usize {
    core::mem::size_of::<ControlBlock<K>>()
}

/// Alignment a pool slot needs for signal kind `K`.
pub const fn block_align_of<K>() -> usize {
    core::mem::align_of::<ControlBlock<K>>()
}

fn retain(ptr: NonNull<Header>) -> NonNull<Header> {
    // SAFETY: `ptr` belongs to a live handle, so the block is alive.
    let old = unsafe { ptr.as_ref() }.refs.fetch_add(1, Ordering::Relaxed);
    if old > MAX_REFCOUNT {
        std::process::abort();
    }
    ptr
}

fn release(ptr: NonNull<Header>) {
    // SAFETY: `ptr` belongs to the handle being dropped; the block stays
    // alive until the count hits zero, and the Release/Acquire pair orders
    // all payload access before the destructor runs.
    unsafe {
        if ptr.as_ref().refs.fetch_sub(1, Ordering::Release) == 1 {
            fence(Ordering::Acquire);
            (ptr.as_ref().drop_block)(ptr);
        }
    }
}

unsafe fn drop_block<K: SignalKind>(ptr: NonNull<Header>) {
    let block = ptr.cast::<ControlBlock<K>>();
    // SAFETY: the caller is the last owner; the header stays readable until
    // `deallocate`, and nothing observes the block afterwards.
    unsafe {
        let resource = block.as_ref().header.resource;
        let layout = block.as_ref().header.layout;
        ptr::drop_in_place(block.as_ptr());
        resource.deallocate(ptr.cast::<u8>(), layout);
    }
}

/// Type-erased, reference-counted signal handle.
///
/// Cloning increments the count; the last drop destroys the payload and
/// returns the block to its allocator. Equality is handle identity: two
/// handles are equal when they refer to the same allocation.
pub struct Signal {
    ptr: NonNull<Header>,
}

// SAFETY: every payload is Send + Sync (enforced by the SignalKind bounds at
// construction) and the header is only touched through atomics.
unsafe impl Send for Signal {}
unsafe impl Sync for Signal {}

impl Signal {
    fn header(&self) -> &Header {
        // SAFETY: the handle keeps the block alive.
        unsafe { self.ptr.as_ref() }
    }

    /// Numeric identity of the underlying signal.
    pub fn id(&self) -> SignalId {
        self.header().id
    }

    /// Kind name of the underlying signal.
    pub fn name(&self) -> &'static str {
        self.header().name
    }

    /// Number of handles currently sharing the signal. Diagnostic only;
    /// the value may be stale by the time it is read.
    pub fn use_count(&self) -> usize {
        self.header().refs.load(Ordering::Relaxed)
    }

    /// Whether the signal is of kind `K`.
    pub fn is<K: SignalKind>(&self) -> bool {
        self.id() == K::ID
    }

    /// Checked downcast to a typed handle.
    ///
    /// # Panics
    ///
    /// Panics if the ids match but the payload types differ; two kinds
    /// sharing one id is a declaration bug.
    pub fn downcast<K: SignalKind>(&self) -> Result<Handle<K>, SignalError> {
        let header = self.header();
        if header.id != K::ID {
            return Err(SignalError::WrongSignalKind {
                expected: K::ID,
                actual: header.id,
            });
        }
        assert!(
            header.type_id == TypeId::of::<K>(),
            "signal id {} is declared by more than one kind",
            header.id
        );
        Ok(Handle {
            ptr: retain(self.ptr),
            _kind: PhantomData,
        })
    }
}

impl Clone for Signal {
    fn clone(&self) -> Self {
        Self {
            ptr: retain(self.ptr),
        }
    }
}

impl Drop for Signal {
    fn drop(&mut self) {
        release(self.ptr);
    }
}

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl Eq for Signal {}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}

/// Typed signal handle; derefs to the payload.
pub struct Handle<K: SignalKind> {
    ptr: NonNull<Header>,
    _kind: PhantomData<ControlBlock<K>>,
}

// SAFETY: K is Send + Sync per the SignalKind supertraits.
unsafe impl<K: SignalKind> Send for Handle<K> {}
unsafe impl<K: SignalKind> Sync for Handle<K> {}

impl<K: SignalKind> Handle<K> {
    fn alloc(payload: K) -> Result<Self, AllocError> {
        let layout = Layout::new::<ControlBlock<K>>();
        let resource = K::Allocator::resource();
        let raw = resource.allocate(layout)?;
        let block = raw.cast::<ControlBlock<K>>();
        // SAFETY: `raw` satisfies `layout` per the resource contract and is
        // exclusively ours until the first handle is returned.
        unsafe {
            block.as_ptr().write(ControlBlock {
                header: Header {
                    refs: AtomicUsize::new(1),
                    id: K::ID,
                    type_id: TypeId::of::<K>(),
                    name: K::name(),
                    resource,
                    layout,
                    drop_block: drop_block::<K>,
                },
                payload,
            });
        }
        Ok(Self {
            ptr: block.cast::<Header>(),
            _kind: PhantomData,
        })
    }

    /// Erase the payload type. Free: the handle is the same pointer.
    pub fn upcast(self) -> Signal {
        let ptr = self.ptr;
        core::mem::forget(self);
        Signal { ptr }
    }

    /// Numeric identity (`K::ID`).
    pub fn id(&self) -> SignalId {
        K::ID
    }

    /// Number of handles currently sharing the signal.
    pub fn use_count(&self) -> usize {
        // SAFETY: the handle keeps the block alive.
        unsafe { self.ptr.as_ref() }.refs.load(Ordering::Relaxed)
    }
}

impl<K: SignalKind> Deref for Handle<K> {
    type Target = K;

    fn deref(&self) -> &K {
        // SAFETY: the handle keeps a live ControlBlock<K> alive; repr(C)
        // places the payload behind the header.
        unsafe { &self.ptr.cast::<ControlBlock<K>>().as_ref().payload }
    }
}

impl<K: SignalKind> Clone for Handle<K> {
    fn clone(&self) -> Self {
        Self {
            ptr: retain(self.ptr),
            _kind: PhantomData,
        }
    }
}

impl<K: SignalKind> Drop for Handle<K> {
    fn drop(&mut self) {
        release(self.ptr);
    }
}

impl<K: SignalKind> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<K: SignalKind> Eq for Handle<K> {}

impl<K: SignalKind> PartialEq<Signal> for Handle<K> {
    fn eq(&self, other: &Signal) -> bool {
        self.ptr == other.ptr
    }
}

impl<K: SignalKind> From<Handle<K>> for Signal {
    fn from(handle: Handle<K>) -> Self {
        handle.upcast()
    }
}

impl<K: SignalKind + fmt::Debug> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &K::ID)
            .field("payload", &**self)
            .finish()
    }
}

/// Declare a chain of unit signal kinds sharing one allocator class.
///
/// The first entry fixes the starting id; later entries without an explicit
/// id continue the sequence:
///
/// ```
/// use ao_core::HeapAllocator;
///
/// ao_core::signals! {
///     allocator = HeapAllocator;
///     pub struct TurnOn = 0;
///     pub struct TurnOff;
///     pub struct Reset = 16;
///     pub struct Calibrate;
/// }
///
/// use ao_core::SignalKind;
/// assert_eq!(TurnOff::ID.raw(), 1);
/// assert_eq!(Calibrate::ID.raw(), 17);
/// ```
#[macro_export]
macro_rules! signals {
    (
        allocator = $alloc:ty;
        $(#[$meta:meta])* $vis:vis struct $first:ident = $id:expr;
        $($rest:tt)*
    ) => {
        $crate::signals!(@declare $alloc, $(#[$meta])* $vis $first, $crate::SignalId($id));
        $crate::signals!(@chain $alloc, $first; $($rest)*);
    };
    (@chain $alloc:ty, $prev:ident;) => {};
    (@chain $alloc:ty, $prev:ident;
        $(#[$meta:meta])* $vis:vis struct $name:ident = $id:expr;
        $($rest:tt)*
    ) => {
        $crate::signals!(@declare $alloc, $(#[$meta])* $vis $name, $crate::SignalId($id));
        $crate::signals!(@chain $alloc, $name; $($rest)*);
    };
    (@chain $alloc:ty, $prev:ident;
        $(#[$meta:meta])* $vis:vis struct $name:ident;
        $($rest:tt)*
    ) => {
        $crate::signals!(@declare $alloc, $(#[$meta])* $vis $name,
            <$prev as $crate::SignalKind>::ID.next());
        $crate::signals!(@chain $alloc, $name; $($rest)*);
    };
    (@declare $alloc:ty, $(#[$meta:meta])* $vis:vis $name:ident, $id:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        $vis struct $name;

        impl $crate::SignalKind for $name {
            const ID: $crate::SignalId = $id;
            type Allocator = $alloc;
        }
    };
}

/// Largest [`ControlBlock`] size over the signal kinds sharing a pool.
///
/// Evaluates in const context, so it can size a `StaticPool` slot.
#[macro_export]
macro_rules! pool_block_size {
    ($($kind:ty),+ $(,)?) => {{
        let mut max = 0usize;
        $(
            let size = $crate::signal::block_size_of::<$kind>();
            if size > max {
                max = size;
            }
        )+
        max
    }};
}

/// Largest [`ControlBlock`] alignment over the signal kinds sharing a pool.
#[macro_export]
macro_rules! pool_block_align {
    ($($kind:ty),+ $(,)?) => {{
        let mut max = 1usize;
        $(
            let align = $crate::signal::block_align_of::<$kind>();
            if align > max {
                max = align;
            }
        )+
        max
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::HeapAllocator;

    crate::signals! {
        allocator = HeapAllocator;
        struct Ping = 0;
        struct Pong;
    }

    #[derive(Debug)]
    struct Sample {
        value: i32,
    }

    impl SignalKind for Sample {
        const ID: SignalId = Pong::ID.next();
        type Allocator = HeapAllocator;
    }

    #[test]
    fn sequential_ids() {
        assert_eq!(Ping::ID, SignalId(0));
        assert_eq!(Pong::ID, SignalId(1));
        assert_eq!(Sample::ID, SignalId(2));
    }

    #[test]
    fn payload_is_reachable_through_the_handle() {
        let handle = Sample { value: 4 }.make().unwrap();
        assert_eq!(handle.value, 4);
        assert_eq!(handle.id(), SignalId(2));
    }

    #[test]
    fn clone_and_drop_track_the_count() {
        let handle = Ping.make().unwrap();
        assert_eq!(handle.use_count(), 1);
        let second = handle.clone();
        assert_eq!(handle.use_count(), 2);
        drop(second);
        assert_eq!(handle.use_count(), 1);
    }

    #[test]
    fn downcast_round_trip() {
        let handle = Sample { value: 9 }.make().unwrap();
        let erased = handle.clone().upcast();
        assert_eq!(erased.id(), Sample::ID);

        let back = Sample::from_signal(&erased).unwrap();
        assert_eq!(back, handle);
        assert_eq!(back.value, 9);
    }

    #[test]
    fn downcast_to_wrong_kind_fails() {
        let erased: Signal = Ping.make().unwrap().upcast();
        let err = Sample::from_signal(&erased).unwrap_err();
        assert_eq!(
            err,
            SignalError::WrongSignalKind {
                expected: Sample::ID,
                actual: Ping::ID,
            }
        );
        // The failed downcast must not leak a reference.
        assert_eq!(erased.use_count(), 1);
    }

    #[test]
    fn payload_drop_runs_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static DROPS: AtomicUsize = AtomicUsize::new(0);

        struct Tracked;

        impl Drop for Tracked {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::SeqCst);
            }
        }

        impl SignalKind for Tracked {
            const ID: SignalId = SignalId(100);
            type Allocator = HeapAllocator;
        }

        let handle = Tracked.make().unwrap();
        let erased = handle.clone().upcast();
        drop(handle);
        assert_eq!(DROPS.load(Ordering::SeqCst), 0);
        drop(erased);
        assert_eq!(DROPS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn block_size_covers_header_and_payload() {
        const BLOCK: usize = crate::pool_block_size!(Ping, Sample);
        assert!(BLOCK >= core::mem::size_of::<ControlBlock<Sample>>());
        assert!(BLOCK >= core::mem::size_of::<ControlBlock<Ping>>());
    }
}
