//! The deletion marker and the slot contents built around it.

/// Marks a key as explicitly deleted in a context lineage.
///
/// There is exactly one `Tombstone` in the process ([`Tombstone::get`]); it is
/// recognised by address, never by value.
pub struct Tombstone {
    // Non-zero size so the singleton has a unique address.
    _private: u8,
}

static TOMBSTONE: Tombstone = Tombstone { _private: 0 };

impl Tombstone {
    /// Returns the process-wide tombstone.
    #[inline]
    pub fn get() -> &'static Tombstone {
        &TOMBSTONE
    }

    /// Returns `true` if `candidate` is the process-wide tombstone.
    #[inline]
    pub fn is(candidate: &Tombstone) -> bool {
        core::ptr::eq(candidate, &TOMBSTONE)
    }
}

impl core::fmt::Debug for Tombstone {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Tombstone")
    }
}

/// What a propagation slot holds in one context.
pub(crate) enum Entry<V> {
    Live(V),
    Deleted(&'static Tombstone),
}

impl<V> Entry<V> {
    pub(crate) fn deleted() -> Self {
        Self::Deleted(Tombstone::get())
    }

    /// The stored value, or `None` for a tombstone.
    pub(crate) fn live(&self) -> Option<&V> {
        match self {
            Self::Live(value) => Some(value),
            Self::Deleted(marker) => {
                debug_assert!(Tombstone::is(marker));
                None
            }
        }
    }
}
