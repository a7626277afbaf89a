//! Signal identity.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Numeric identifier of a signal kind.
///
/// Ids are fixed at declaration time and must be distinct within the event
/// universe of a machine. Sequential declaration is supported through
/// [`SignalId::next`] and the [`signals!`](crate::signals) macro.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(pub u32);

impl SignalId {
    /// Create an id from a raw value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw id value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The id following this one; used for sequential signal declarations.
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u32> for SignalId {
    #[inline]
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SIG({:#06x})", self.0)
    }
}
