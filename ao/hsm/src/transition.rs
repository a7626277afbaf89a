//! Handler outcomes.

use crate::state::{Action, State};

/// What a state handler decided to do with an event.
///
/// Replaces sentinel-state encodings with an explicit sum type: a real state
/// reference can never be mistaken for "unhandled" or "defer".
pub enum Transition<O: 'static, E: 'static> {
    /// Not consumed here; the engine asks the parent state next.
    Unhandled,
    /// Park the event; the runtime recalls it later in arrival order.
    Defer,
    /// Consumed without leaving the state; the actions run, no exit/entry.
    Internal(&'static [Action<O, E>]),
    /// External transition: exit up to the common ancestor, run the actions,
    /// enter down to `target`.
    Goto(&'static State<O, E>, &'static [Action<O, E>]),
}

impl<O, E> Transition<O, E> {
    /// External transition without actions.
    pub const fn to(target: &'static State<O, E>) -> Self {
        Self::Goto(target, &[])
    }

    /// External transition running `actions` between exit and entry.
    pub const fn to_with(
        target: &'static State<O, E>,
        actions: &'static [Action<O, E>],
    ) -> Self {
        Self::Goto(target, actions)
    }

    /// Internal transition without actions.
    pub const fn internal() -> Self {
        Self::Internal(&[])
    }

    /// Internal transition running `actions`.
    pub const fn internal_with(actions: &'static [Action<O, E>]) -> Self {
        Self::Internal(actions)
    }
}

// Manual impls: the variants only hold `'static` references and function
// pointers, so the copy is unconditional on `O` and `E`.
impl<O, E> Clone for Transition<O, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O, E> Copy for Transition<O, E> {}
