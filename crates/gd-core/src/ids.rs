use core::fmt;
use core::num::NonZeroU32;
use core::sync::atomic::{AtomicU32, Ordering};

/// Compact identifier for every object placed in a grid tree.
///
/// Identity is what membership checks and alert routing key on, so two
/// objects never share an id unless one was cloned from the other.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Id(NonZeroU32);

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

impl Id {
    /// 0-based allocation order, used for display.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }

    /// Allocate a fresh id, distinct from every id handed out before.
    pub fn next() -> Self {
        let raw = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU32::new(raw).unwrap_or(NonZeroU32::MAX))
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index())
    }
}

/// Identifier of a component, container, or monitor.
pub type ObjectId = Id;
