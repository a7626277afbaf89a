#![doc = r#"# ao-rt

Active-object runtime on OS threads.

Each logical object owns a state machine, receives signals through a
thread-safe mailbox and dispatches them one at a time on the worker thread
of its [`Domain`]. Producers on any thread call [`ActiveObject::take`]; all
handler, action and hook code of one object runs on exactly one thread, so
owner state needs no locking in user code.

## Module Overview
- [`sync`]      – counting semaphore (the mailbox's only blocking primitive).
- [`mailbox`]   – FIFO, priority and bounded mailbox variants.
- [`active`]    – the [`ActiveObject`] contract and its base plumbing.
- [`domain`]    – the worker loop and object registration.
- [`hsm_actor`] – adapter driving an `ao-hsm` machine from dequeued signals,
  with event deferral and recall through the mailbox.
"#]

pub mod active;
pub mod domain;
pub mod hsm_actor;
pub mod mailbox;
pub mod sync;

pub use active::{ActiveObject, ActiveObjectBase, ActiveObjectRef};
pub use domain::Domain;
pub use hsm_actor::{Deferral, HsmActor};
pub use mailbox::{
    BoundedMailbox, Envelope, FifoMailbox, Mailbox, MailboxError, OverflowPolicy, Priority,
    PriorityMailbox,
};
pub use sync::Semaphore;
