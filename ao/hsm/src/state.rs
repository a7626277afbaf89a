//! Immutable state descriptors.
//!
//! States are declared as `static` items and linked by reference into a
//! hierarchy; the graph is never mutated after construction. Identity is
//! address identity ([`State::is`]).

use core::fmt;

use crate::transition::Transition;

/// Event handler of a state: `(owner, state, event) -> Transition`.
pub type Handler<O, E> = fn(&mut O, &State<O, E>, &E) -> Transition<O, E>;

/// Transition action; receives the triggering event.
pub type Action<O, E> = fn(&mut O, &E);

/// Entry/exit action; receives the state being entered or exited.
pub type EntryExit<O, E> = fn(&mut O, &State<O, E>);

/// State property flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateFlags(u8);

impl StateFlags {
    /// No special properties.
    pub const NONE: StateFlags = StateFlags(0);
    /// Shallow history: re-entry restores the last active direct substate.
    pub const HISTORY: StateFlags = StateFlags(1);

    /// Whether all flags in `other` are set.
    pub const fn contains(self, other: StateFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A state of a hierarchical machine.
///
/// `O` is the owner (implementation) type handlers and actions operate on,
/// `E` the event type. Composite states name an `initial` substate; the
/// engine drills into it (or the history substate) until a leaf is reached.
///
/// ```
/// use ao_hsm::{State, Transition};
///
/// struct Player;
/// enum Input { Play, Stop }
///
/// fn idle(_: &mut Player, _: &State<Player, Input>, event: &Input) -> Transition<Player, Input> {
///     match event {
///         Input::Play => Transition::to(&PLAYING),
///         _ => Transition::Unhandled,
///     }
/// }
///
/// fn playing(_: &mut Player, _: &State<Player, Input>, event: &Input) -> Transition<Player, Input> {
///     match event {
///         Input::Stop => Transition::to(&IDLE),
///         _ => Transition::Unhandled,
///     }
/// }
///
/// static IDLE: State<Player, Input> = State::new("Idle", idle);
/// static PLAYING: State<Player, Input> = State::new("Playing", playing);
/// ```
pub struct State<O: 'static, E: 'static> {
    name: &'static str,
    parent: Option<&'static State<O, E>>,
    initial: Option<&'static State<O, E>>,
    entry: &'static [EntryExit<O, E>],
    exit: &'static [EntryExit<O, E>],
    handler: Handler<O, E>,
    flags: StateFlags,
}

impl<O, E> State<O, E> {
    /// Leaf state with no parent, actions or flags; refine with the `with_*`
    /// builders.
    pub const fn new(name: &'static str, handler: Handler<O, E>) -> Self {
        Self {
            name,
            parent: None,
            initial: None,
            entry: &[],
            exit: &[],
            handler,
            flags: StateFlags::NONE,
        }
    }

    /// Nest under `parent`.
    pub const fn with_parent(mut self, parent: &'static State<O, E>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Declare the initial substate entered when this state is the target.
    pub const fn with_initial(mut self, initial: &'static State<O, E>) -> Self {
        self.initial = Some(initial);
        self
    }

    /// Entry actions, run in declaration order.
    pub const fn with_entry(mut self, actions: &'static [EntryExit<O, E>]) -> Self {
        self.entry = actions;
        self
    }

    /// Exit actions, run in declaration order.
    pub const fn with_exit(mut self, actions: &'static [EntryExit<O, E>]) -> Self {
        self.exit = actions;
        self
    }

    /// Mark as a shallow-history state.
    pub const fn with_history(mut self) -> Self {
        self.flags = StateFlags::HISTORY;
        self
    }

    /// State name, useful for logging.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Parent state, if any.
    pub const fn parent(&self) -> Option<&'static State<O, E>> {
        self.parent
    }

    /// Declared initial substate, if any.
    pub const fn initial(&self) -> Option<&'static State<O, E>> {
        self.initial
    }

    /// Property flags.
    pub const fn flags(&self) -> StateFlags {
        self.flags
    }

    /// Whether this state keeps shallow history.
    pub const fn has_history(&self) -> bool {
        self.flags.contains(StateFlags::HISTORY)
    }

    pub(crate) fn handler(&self) -> Handler<O, E> {
        self.handler
    }

    pub(crate) fn entry_actions(&self) -> &'static [EntryExit<O, E>] {
        self.entry
    }

    pub(crate) fn exit_actions(&self) -> &'static [EntryExit<O, E>] {
        self.exit
    }

    /// Address identity: whether `self` and `other` are the same descriptor.
    pub fn is(&self, other: &State<O, E>) -> bool {
        core::ptr::eq(self, other)
    }
}

impl<O, E> fmt::Debug for State<O, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State").field("name", &self.name).finish()
    }
}
