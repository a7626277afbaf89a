//! Active object driving a hierarchical state machine.
//!
//! [`HsmActor`] binds an `ao-hsm` [`Statemachine`] and its owner to a
//! mailbox and wires event deferral into the runtime: a handler returning
//! `Transition::Defer` parks the signal in a buffer, and recall re-enqueues
//! the buffered signals at the mailbox front, iterating in reverse so that
//! repeated front-pushes restore original arrival order.

use std::sync::{Arc, Mutex, Weak};

use ao_core::Signal;
use ao_hsm::{State, Statemachine};

use crate::active::{ActiveObject, ActiveObjectBase};
use crate::mailbox::{Mailbox, MailboxError};

type DeferredQueue = Arc<Mutex<Vec<Signal>>>;

/// Handle to an actor's deferral buffer, meant to be embedded in the owner
/// so exit actions can trigger recall mid-dispatch.
pub struct Deferral {
    queue: DeferredQueue,
    target: Weak<dyn ActiveObject>,
}

impl Deferral {
    /// Re-enqueue all deferred signals at the front of the mailbox,
    /// preserving their arrival order and placing them ahead of envelopes
    /// that arrived after the deferral.
    pub fn recall(&self) {
        let drained: Vec<Signal> =
            std::mem::take(&mut *self.queue.lock().expect("deferral mutex poisoned"));
        if drained.is_empty() {
            return;
        }
        let Some(target) = self.target.upgrade() else {
            return;
        };
        tracing::trace!(count = drained.len(), "recalling deferred events");
        for signal in drained.into_iter().rev() {
            let _ = target.take_high_priority(signal);
        }
    }

    /// Number of signals currently parked.
    pub fn pending(&self) -> usize {
        self.queue.lock().expect("deferral mutex poisoned").len()
    }
}

impl Clone for Deferral {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            target: Weak::clone(&self.target),
        }
    }
}

struct Inner<I: 'static> {
    fsm: Statemachine<I, Signal>,
    owner: I,
}

/// Active object whose `dispatch` feeds signals to a state machine.
///
/// The machine and owner live behind a mutex that only the construction-time
/// caller and the domain worker touch, keeping the single-threaded execution
/// guarantee of the active-object pattern.
pub struct HsmActor<I: Send + 'static> {
    base: ActiveObjectBase,
    inner: Mutex<Inner<I>>,
    deferred: DeferredQueue,
}

impl<I: Send + 'static> HsmActor<I> {
    /// Build an actor. `build` receives the [`Deferral`] handle (so the
    /// owner can keep it for recall from exit actions) and returns the
    /// machine plus its owner. The defer/recall hooks are wired here;
    /// anything else set on the machine in `build` is preserved.
    pub fn new<F>(build: F) -> Arc<Self>
    where
        F: FnOnce(Deferral) -> (Statemachine<I, Signal>, I),
    {
        let deferred: DeferredQueue = Arc::new(Mutex::new(Vec::new()));
        Arc::new_cyclic(|weak: &Weak<HsmActor<I>>| {
            let target: Weak<dyn ActiveObject> = weak.clone();
            let deferral = Deferral {
                queue: Arc::clone(&deferred),
                target,
            };
            let recaller = deferral.clone();
            let (mut fsm, owner) = build(deferral);

            let defer_queue = Arc::clone(&deferred);
            fsm.on_defer_event = Some(Box::new(
                move |_owner: &mut I, _state: &State<I, Signal>, signal: &Signal| {
                    defer_queue
                        .lock()
                        .expect("deferral mutex poisoned")
                        .push(signal.clone());
                },
            ));
            fsm.on_recall_deferred_events = Some(Box::new(
                move |_owner: &mut I, _state: &State<I, Signal>| {
                    recaller.recall();
                },
            ));

            let base = ActiveObjectBase::new();
            base.attach(weak.clone());
            Self {
                base,
                inner: Mutex::new(Inner { fsm, owner }),
                deferred,
            }
        })
    }

    /// Enter the machine's initial state. Call after registering the actor
    /// with its domain.
    pub fn start(&self) {
        let inner = &mut *self.inner.lock().expect("hsm actor mutex poisoned");
        inner.fsm.start(&mut inner.owner);
    }

    /// Current leaf state of the machine.
    pub fn current_state(&self) -> Option<&'static State<I, Signal>> {
        self.inner
            .lock()
            .expect("hsm actor mutex poisoned")
            .fsm
            .current_state()
    }

    /// Run `f` with the machine and owner; inspection and test hook.
    pub fn with<R>(&self, f: impl FnOnce(&mut Statemachine<I, Signal>, &mut I) -> R) -> R {
        let inner = &mut *self.inner.lock().expect("hsm actor mutex poisoned");
        f(&mut inner.fsm, &mut inner.owner)
    }

    /// Number of signals currently deferred.
    pub fn deferred_len(&self) -> usize {
        self.deferred.lock().expect("deferral mutex poisoned").len()
    }
}

impl<I: Send + 'static> ActiveObject for HsmActor<I> {
    fn set_mailbox(&self, mailbox: Arc<dyn Mailbox>) {
        self.base.set_mailbox(mailbox);
    }

    fn take(&self, signal: Signal) -> Result<(), MailboxError> {
        self.base.take(signal)
    }

    fn take_high_priority(&self, signal: Signal) -> Result<(), MailboxError> {
        self.base.take_high_priority(signal)
    }

    fn dispatch(&self, signal: &Signal) {
        let inner = &mut *self.inner.lock().expect("hsm actor mutex poisoned");
        inner.fsm.react(&mut inner.owner, signal);
    }
}
