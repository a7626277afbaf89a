//! The active-object contract.

use std::sync::{Arc, OnceLock, Weak};

use ao_core::Signal;

use crate::mailbox::{Envelope, Mailbox, MailboxError};

/// Shared reference to a registered active object.
pub type ActiveObjectRef = Arc<dyn ActiveObject>;

/// An object whose signals are dispatched on its domain's worker thread.
///
/// Producers on any thread hand signals over with [`take`](Self::take);
/// the domain worker later invokes [`dispatch`](Self::dispatch) with them,
/// one at a time.
pub trait ActiveObject: Send + Sync {
    /// Bind the object to its domain's mailbox. One-shot: binding twice is
    /// a precondition violation (debug-asserted, ignored in release).
    fn set_mailbox(&self, mailbox: Arc<dyn Mailbox>);

    /// Enqueue a signal at the back of the mailbox.
    fn take(&self, signal: Signal) -> Result<(), MailboxError>;

    /// Enqueue a signal at the front, ahead of pending entries. Used to
    /// re-dispatch recalled events before newer ones.
    fn take_high_priority(&self, signal: Signal) -> Result<(), MailboxError>;

    /// Worker-side entry point; runs on the domain thread only.
    fn dispatch(&self, signal: &Signal);
}

/// Mailbox-binding and enqueue plumbing shared by active objects.
///
/// Concrete objects embed a base, [`attach`](Self::attach) a weak reference
/// to themselves right after `Arc` construction (so envelopes can name them
/// as target), and forward the trait's `set_mailbox`/`take` calls here.
pub struct ActiveObjectBase {
    mailbox: OnceLock<Arc<dyn Mailbox>>,
    self_ref: OnceLock<Weak<dyn ActiveObject>>,
}

impl ActiveObjectBase {
    pub fn new() -> Self {
        Self {
            mailbox: OnceLock::new(),
            self_ref: OnceLock::new(),
        }
    }

    /// Store the owning object's weak self reference. Called once during
    /// construction, typically from `Arc::new_cyclic`.
    pub fn attach(&self, self_ref: Weak<dyn ActiveObject>) {
        let fresh = self.self_ref.set(self_ref).is_ok();
        debug_assert!(fresh, "active object attached twice");
    }

    /// One-shot mailbox binding.
    pub fn set_mailbox(&self, mailbox: Arc<dyn Mailbox>) {
        let fresh = self.mailbox.set(mailbox).is_ok();
        debug_assert!(fresh, "active object already bound to a mailbox");
    }

    fn target(&self) -> ActiveObjectRef {
        self.self_ref
            .get()
            .expect("active object base not attached")
            .upgrade()
            .expect("active object dropped while taking")
    }

    fn mailbox(&self) -> &Arc<dyn Mailbox> {
        self.mailbox
            .get()
            .expect("active object not registered with a domain")
    }

    pub fn take(&self, signal: Signal) -> Result<(), MailboxError> {
        self.mailbox().enqueue_back(Envelope::Deliver {
            target: self.target(),
            signal,
        })
    }

    pub fn take_high_priority(&self, signal: Signal) -> Result<(), MailboxError> {
        self.mailbox().enqueue_front(Envelope::Deliver {
            target: self.target(),
            signal,
        })
    }
}

impl Default for ActiveObjectBase {
    fn default() -> Self {
        Self::new()
    }
}
