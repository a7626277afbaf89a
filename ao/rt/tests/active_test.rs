//! Domain and active-object plumbing tests.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use ao_core::{HeapAllocator, Signal, SignalId, SignalKind};
use ao_rt::{ActiveObject, ActiveObjectBase, ActiveObjectRef, Domain, FifoMailbox, MailboxError};

ao_core::signals! {
    allocator = HeapAllocator;
    struct One = 1;
    struct Two;
    struct Three;
}

/// Records the ids it is dispatched, in order.
struct Collector {
    base: ActiveObjectBase,
    seen: Mutex<Vec<SignalId>>,
}

impl Collector {
    fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak: &std::sync::Weak<Self>| {
            let base = ActiveObjectBase::new();
            base.attach(weak.clone());
            Self {
                base,
                seen: Mutex::new(Vec::new()),
            }
        })
    }

    fn seen(&self) -> Vec<SignalId> {
        self.seen.lock().unwrap().clone()
    }
}

impl ActiveObject for Collector {
    fn set_mailbox(&self, mailbox: Arc<dyn ao_rt::Mailbox>) {
        self.base.set_mailbox(mailbox);
    }

    fn take(&self, signal: Signal) -> Result<(), MailboxError> {
        self.base.take(signal)
    }

    fn take_high_priority(&self, signal: Signal) -> Result<(), MailboxError> {
        self.base.take_high_priority(signal)
    }

    fn dispatch(&self, signal: &Signal) {
        self.seen.lock().unwrap().push(signal.id());
    }
}

fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn worker_dispatches_in_fifo_order() {
    let domain = Domain::new(Arc::new(FifoMailbox::new()));
    let collector = Collector::new();
    let object: ActiveObjectRef = collector.clone();
    domain.register_object(&object);

    collector.take(One.make().unwrap().upcast()).unwrap();
    collector.take(Two.make().unwrap().upcast()).unwrap();
    collector.take(Three.make().unwrap().upcast()).unwrap();

    wait_until("three dispatches", || collector.seen().len() == 3);
    assert_eq!(collector.seen(), [One::ID, Two::ID, Three::ID]);
}

#[test]
fn high_priority_take_jumps_pending_entries() {
    // No domain: inspect the mailbox ordering by starting the worker late.
    let mailbox = Arc::new(FifoMailbox::new());
    let collector = Collector::new();
    let object: ActiveObjectRef = collector.clone();
    object.set_mailbox(mailbox.clone());

    collector.take(One.make().unwrap().upcast()).unwrap();
    collector.take(Two.make().unwrap().upcast()).unwrap();
    collector
        .take_high_priority(Three.make().unwrap().upcast())
        .unwrap();

    let domain = Domain::new(mailbox);
    wait_until("three dispatches", || collector.seen().len() == 3);
    assert_eq!(collector.seen(), [Three::ID, One::ID, Two::ID]);
    drop(domain);
}

#[test]
fn events_after_stop_are_discarded() {
    let domain = Domain::new(Arc::new(FifoMailbox::new()));
    let collector = Collector::new();
    let object: ActiveObjectRef = collector.clone();
    domain.register_object(&object);

    collector.take(One.make().unwrap().upcast()).unwrap();
    domain.stop();
    collector.take(Two.make().unwrap().upcast()).unwrap();

    drop(domain); // joins the worker

    let seen = collector.seen();
    assert_eq!(seen, [One::ID], "entries behind the sentinel must be dropped");
}

#[test]
fn stop_is_idempotent() {
    let domain = Domain::new(Arc::new(FifoMailbox::new()));
    domain.stop();
    domain.stop();
}
