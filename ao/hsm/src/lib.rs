#![doc = r#"# ao-hsm

Hierarchical state machine engine: UML-style states with entry/exit actions,
transitions with actions, shallow history and cooperative event deferral.

States are immutable descriptors declared as `static` items (see [`State`]);
the engine itself ([`Statemachine`]) holds only per-instance bookkeeping.
The owner (the object handlers and actions operate on) is *not* stored in
the machine: `start` and `react` take it as a parameter, which keeps the
back-reference stateless and the borrows sound.

## Module Overview
- [`state`]      – descriptors, action and handler types.
- [`transition`] – the [`Transition`] sum type handlers return.
- The engine lives at the crate root.

Dispatch is strictly synchronous; asynchronous delivery, mailboxes and
worker threads live in `ao-rt`.
"#]

pub mod state;
pub mod transition;

pub use state::{Action, EntryExit, Handler, State, StateFlags};
pub use transition::Transition;

#[cfg(test)]
mod tests;

/// Hook receiving a state: entry/exit observation.
pub type StateHook<O, E> = Box<dyn Fn(&mut O, &State<O, E>) + Send>;
/// Hook receiving a state and the event being handled.
pub type EventHook<O, E> = Box<dyn Fn(&mut O, &State<O, E>, &E) + Send>;
/// Hook receiving the event and the `(from, to)` leaves of a completed
/// external transition.
pub type ChangeHook<O, E> = Box<dyn Fn(&mut O, &E, &State<O, E>, &State<O, E>) + Send>;

enum Current<O: 'static, E: 'static> {
    NotStarted,
    /// Transient while exit/action/entry chains run, so user code observing
    /// the machine cannot see a half-entered configuration.
    InTransition,
    At(&'static State<O, E>),
}

// Manual impls: the only payload is a `'static` reference, so the copy is
// unconditional on `O` and `E`.
impl<O, E> Clone for Current<O, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O, E> Copy for Current<O, E> {}

/// A hierarchical state machine instance.
///
/// Create with [`new`](Self::new), then [`start`](Self::start) it once and
/// feed it events through [`react`](Self::react). Between top-level calls,
/// [`current_state`](Self::current_state) is always a leaf of the graph.
///
/// All hooks are optional public fields assigned directly:
///
/// ```ignore
/// let mut fsm = Statemachine::new("player", &IDLE);
/// fsm.on_state_entry = Some(Box::new(|_, state| println!("enter {}", state.name())));
/// fsm.start(&mut player);
/// ```
pub struct Statemachine<O: 'static, E: 'static> {
    name: String,
    initial: &'static State<O, E>,
    current: Current<O, E>,
    working: bool,
    /// Shallow history: last exited direct substate per HISTORY-flagged
    /// state. Flat map; bounded by the number of flagged states.
    history: Vec<(&'static State<O, E>, &'static State<O, E>)>,

    /// A state is entered.
    pub on_state_entry: Option<StateHook<O, E>>,
    /// A state is exited. History is recorded before this fires.
    pub on_state_exit: Option<StateHook<O, E>>,
    /// An event is about to be passed to a state handler.
    pub on_handle_event: Option<EventHook<O, E>>,
    /// No state in the chain accepted the event. Fires once per `react`,
    /// with the state dispatch started from.
    pub on_unhandled_event: Option<EventHook<O, E>>,
    /// A completed external transition changed the current leaf.
    pub on_state_change: Option<ChangeHook<O, E>>,
    /// A handler returned [`Transition::Defer`]. Must be installed before
    /// any handler defers.
    pub on_defer_event: Option<EventHook<O, E>>,
    /// [`recall_events`](Self::recall_events) was invoked.
    pub on_recall_deferred_events: Option<StateHook<O, E>>,
}

impl<O, E> Statemachine<O, E> {
    /// Machine entering `initial` (after drilling) on [`start`](Self::start).
    pub fn new(name: impl Into<String>, initial: &'static State<O, E>) -> Self {
        Self {
            name: name.into(),
            initial,
            current: Current::NotStarted,
            working: false,
            history: Vec::new(),
            on_state_entry: None,
            on_state_exit: None,
            on_handle_event: None,
            on_unhandled_event: None,
            on_state_change: None,
            on_defer_event: None,
            on_recall_deferred_events: None,
        }
    }

    /// Machine name, useful for logging.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current leaf state; `None` before `start` and while a transition is
    /// in progress.
    pub fn current_state(&self) -> Option<&'static State<O, E>> {
        match self.current {
            Current::At(state) => Some(state),
            _ => None,
        }
    }

    /// Enter the initial state, drilling into initial substates until a leaf
    /// is reached. Clears history; restarting an already-started machine
    /// resets it without running exit actions.
    pub fn start(&mut self, owner: &mut O) {
        debug_assert!(
            !self.working,
            "statemachine `{}`: start called from within react",
            self.name
        );
        self.history.clear();
        self.current = Current::InTransition;
        self.enter_from_down_to(owner, None, self.initial);
    }

    /// Synchronously dispatch one event.
    ///
    /// Preconditions (debug-asserted, no effect in release): the machine is
    /// started and `react` is not already on the stack.
    pub fn react(&mut self, owner: &mut O, event: &E) {
        let Current::At(origin) = self.current else {
            debug_assert!(
                false,
                "statemachine `{}`: react before start",
                self.name
            );
            return;
        };
        if self.working {
            debug_assert!(
                false,
                "statemachine `{}`: react called from within react",
                self.name
            );
            return;
        }
        self.working = true;

        // Walk the handler chain from the current leaf towards the root.
        let mut cursor = Some(origin);
        let mut outcome = Transition::Unhandled;
        while let Some(state) = cursor {
            if let Some(hook) = &self.on_handle_event {
                hook(owner, state, event);
            }
            outcome = (state.handler())(owner, state, event);
            match outcome {
                Transition::Defer => {
                    debug_assert!(
                        self.on_defer_event.is_some(),
                        "statemachine `{}`: Defer without an on_defer_event hook",
                        self.name
                    );
                    if let Some(hook) = &self.on_defer_event {
                        hook(owner, state, event);
                    }
                    self.working = false;
                    return;
                }
                Transition::Unhandled => cursor = state.parent(),
                _ => break,
            }
        }

        match outcome {
            Transition::Unhandled => {
                tracing::trace!(
                    machine = %self.name,
                    state = origin.name(),
                    "unhandled event"
                );
                if let Some(hook) = &self.on_unhandled_event {
                    hook(owner, origin, event);
                }
            }
            Transition::Internal(actions) => {
                for action in actions {
                    action(owner, event);
                }
            }
            Transition::Goto(target, actions) => {
                let lca = find_common_parent(origin, target);
                self.current = Current::InTransition;
                self.exit_from_up_to(owner, origin, lca);
                for action in actions {
                    action(owner, event);
                }
                self.enter_from_down_to(owner, lca, target);

                let Current::At(leaf) = self.current else {
                    unreachable!("entry chain always lands on a leaf");
                };
                if !leaf.is(origin) {
                    if let Some(hook) = &self.on_state_change {
                        hook(owner, event, origin, leaf);
                    }
                }
            }
            Transition::Defer => unreachable!("defer returns early"),
        }

        self.working = false;
    }

    /// Ask the runtime to re-inject deferred events by firing the installed
    /// `on_recall_deferred_events` hook with the current state.
    pub fn recall_events(&self, owner: &mut O) {
        debug_assert!(
            self.on_recall_deferred_events.is_some(),
            "statemachine `{}`: recall without an on_recall_deferred_events hook",
            self.name
        );
        let Current::At(state) = self.current else {
            debug_assert!(false, "statemachine `{}`: recall before start", self.name);
            return;
        };
        if let Some(hook) = &self.on_recall_deferred_events {
            hook(owner, state);
        }
    }

    /// Exit chain: from `from` (inclusive) up to `top` (exclusive, or the
    /// root when `None`). Records history before observers run.
    fn exit_from_up_to(
        &mut self,
        owner: &mut O,
        from: &'static State<O, E>,
        top: Option<&'static State<O, E>>,
    ) {
        let mut cursor = Some(from);
        while let Some(state) = cursor {
            if let Some(top) = top {
                if state.is(top) {
                    break;
                }
            }
            if let Some(parent) = state.parent() {
                if parent.has_history() {
                    self.record_history(parent, state);
                }
            }
            tracing::trace!(machine = %self.name, state = state.name(), "exit");
            if let Some(hook) = &self.on_state_exit {
                hook(owner, state);
            }
            for action in state.exit_actions() {
                action(owner, state);
            }
            cursor = state.parent();
        }
    }

    /// Entry chain: ancestors of `target` below `top`, then `target`, then
    /// drill initial/history substates down to a leaf.
    fn enter_from_down_to(
        &mut self,
        owner: &mut O,
        top: Option<&'static State<O, E>>,
        target: &'static State<O, E>,
    ) {
        self.enter_path(owner, top, target);

        let mut leaf = target;
        while let Some(next) = self.effective_initial(leaf) {
            self.enter_state(owner, next);
            leaf = next;
        }
        self.current = Current::At(leaf);
    }

    fn enter_path(
        &self,
        owner: &mut O,
        top: Option<&'static State<O, E>>,
        target: &'static State<O, E>,
    ) {
        if let Some(top) = top {
            if target.is(top) {
                return;
            }
        }
        if let Some(parent) = target.parent() {
            self.enter_path(owner, top, parent);
        }
        self.enter_state(owner, target);
    }

    fn enter_state(&self, owner: &mut O, state: &'static State<O, E>) {
        tracing::trace!(machine = %self.name, state = state.name(), "enter");
        if let Some(hook) = &self.on_state_entry {
            hook(owner, state);
        }
        for action in state.entry_actions() {
            action(owner, state);
        }
    }

    /// The substate entered when `state` is the end of an entry chain: the
    /// remembered history substate for HISTORY states, else the declared
    /// initial.
    fn effective_initial(&self, state: &'static State<O, E>) -> Option<&'static State<O, E>> {
        if state.has_history() {
            if let Some(&(_, child)) = self.history.iter().find(|(parent, _)| parent.is(state)) {
                return Some(child);
            }
        }
        state.initial()
    }

    fn record_history(&mut self, parent: &'static State<O, E>, child: &'static State<O, E>) {
        if let Some(slot) = self.history.iter_mut().find(|(p, _)| p.is(parent)) {
            slot.1 = child;
        } else {
            self.history.push((parent, child));
        }
    }
}

/// Lowest common ancestor of `a` and `b`.
///
/// The chain of `a` includes `a` itself; the chain of `b` starts at its
/// parent. A transition whose target equals the source therefore computes
/// the source's parent, which makes `Goto(current)` an external
/// self-transition (exit and re-enter). `None` means the transition crosses
/// the root.
pub fn find_common_parent<O, E>(
    a: &'static State<O, E>,
    b: &'static State<O, E>,
) -> Option<&'static State<O, E>> {
    let mut outer = Some(a);
    while let Some(candidate) = outer {
        let mut inner = b.parent();
        while let Some(ancestor) = inner {
            if candidate.is(ancestor) {
                return Some(candidate);
            }
            inner = ancestor.parent();
        }
        outer = candidate.parent();
    }
    None
}
