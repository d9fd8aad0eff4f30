//! Backend selection for [`Local`](crate::Local).

use serde::{Deserialize, Serialize};

/// Which backend a [`Local`](crate::Local) stores its values in.
///
/// Fixed at construction. Deserializes from `"thread_isolated"` or
/// `"fork_propagated"` so host configuration can pick it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// One slice per OS thread; nothing propagates across threads.
    ThreadIsolated,
    /// One propagation slot per key; forked contexts inherit a snapshot.
    #[default]
    ForkPropagated,
}

impl Mode {
    /// Returns `true` for [`Mode::ThreadIsolated`].
    #[inline]
    pub const fn is_thread_critical(self) -> bool {
        matches!(self, Self::ThreadIsolated)
    }

    /// The configuration name of this mode.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ThreadIsolated => "thread_isolated",
            Self::ForkPropagated => "fork_propagated",
        }
    }
}

impl From<bool> for Mode {
    /// Maps the `thread_critical` flag onto a mode.
    fn from(thread_critical: bool) -> Self {
        if thread_critical {
            Self::ThreadIsolated
        } else {
            Self::ForkPropagated
        }
    }
}

impl core::fmt::Display for Mode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`Mode`] name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError(String);

impl core::fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "unknown mode `{}` (expected `thread_isolated` or `fork_propagated`)",
            self.0
        )
    }
}

impl std::error::Error for ParseModeError {}

impl core::str::FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thread_isolated" | "thread" => Ok(Self::ThreadIsolated),
            "fork_propagated" | "context" => Ok(Self::ForkPropagated),
            other => Err(ParseModeError(other.to_owned())),
        }
    }
}
