use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// A set of readiness conditions to watch a source for.
///
/// `Interest` is a checked bit-set over readable and writable
/// readiness. Sets are combined with `|` and inspected with the
/// `is_*` accessors; invalid bit patterns cannot be constructed.
///
/// An empty set is a legal registration: the source stays tracked by
/// the poller but produces no events until a `reregister` gives it a
/// non-empty interest again.
///
/// # Examples
///
/// ```rust,ignore
/// let both = Interest::READABLE | Interest::WRITABLE;
///
/// assert!(both.is_readable());
/// assert!(both.is_writable());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interest(u8);

const READABLE: u8 = 0b01;
const WRITABLE: u8 = 0b10;

impl Interest {
    /// The empty set. A source registered with no interest is dormant.
    pub const NONE: Interest = Interest(0);

    /// Interest in read readiness.
    pub const READABLE: Interest = Interest(READABLE);

    /// Interest in write readiness.
    pub const WRITABLE: Interest = Interest(WRITABLE);

    /// Returns `true` if the set contains read readiness.
    pub const fn is_readable(self) -> bool {
        self.0 & READABLE != 0
    }

    /// Returns `true` if the set contains write readiness.
    pub const fn is_writable(self) -> bool {
        self.0 & WRITABLE != 0
    }

    /// Returns `true` if the set is empty.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every condition in `other` is also in `self`.
    pub const fn contains(self, other: Interest) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Interest {
    type Output = Interest;

    fn bitor(self, other: Interest) -> Interest {
        Interest(self.0 | other.0)
    }
}

impl BitOrAssign for Interest {
    fn bitor_assign(&mut self, other: Interest) {
        self.0 |= other.0;
    }
}

impl fmt::Debug for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_readable(), self.is_writable()) {
            (true, true) => write!(f, "READABLE | WRITABLE"),
            (true, false) => write!(f, "READABLE"),
            (false, true) => write!(f, "WRITABLE"),
            (false, false) => write!(f, "NONE"),
        }
    }
}

/// How readiness for a registered source is reported.
///
/// The mode is fixed per registration and only changes through a
/// `reregister`. All three modes map directly onto flags of the
/// underlying OS facility (`EPOLLET`/`EPOLLONESHOT` on epoll,
/// `EV_CLEAR`/`EV_ONESHOT` on kqueue); nothing is emulated in
/// userspace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerMode {
    /// Report the source on every poll while the condition holds.
    Level,

    /// Report the source once per transition into readiness.
    Edge,

    /// Report the source once, then disarm it until an explicit
    /// `reregister`, even if the condition still holds.
    EdgeOneshot,
}

impl TriggerMode {
    /// Returns `true` for the edge-triggered modes.
    pub const fn is_edge(self) -> bool {
        matches!(self, TriggerMode::Edge | TriggerMode::EdgeOneshot)
    }

    /// Returns `true` if the source disarms after one event.
    pub const fn is_oneshot(self) -> bool {
        matches!(self, TriggerMode::EdgeOneshot)
    }
}
