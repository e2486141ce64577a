//! Error types surfaced by the library.
//!
//! Every fallible call reports its failure synchronously to its
//! caller; nothing here ever tears down the event loop. The single
//! fatal condition, an unusable OS poller, is reported as the
//! `io::Error` returned from [`EventLoop::run`](crate::EventLoop::run).

use std::error;
use std::fmt;
use std::io;

/// Registration-lifecycle errors reported by [`Poll`](crate::Poll).
#[derive(Debug)]
pub enum Error {
    /// The token or the descriptor is already tracked by the poller.
    AlreadyRegistered,

    /// The descriptor is not tracked by the poller.
    NotRegistered,

    /// The OS facility rejected the operation.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AlreadyRegistered => f.write_str("source or token already registered"),
            Error::NotRegistered => f.write_str("source not registered"),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

/// Error returned by [`Sender::send`](crate::Sender::send).
///
/// Both variants hand the undelivered message back to the sender so
/// it can be retried or dropped deliberately; the channel itself
/// never silently discards a message.
pub enum NotifyError<M> {
    /// The channel is at capacity. The message was not enqueued.
    Full(M),

    /// The event loop has been dropped. The message was not enqueued.
    Closed(M),
}

impl<M> NotifyError<M> {
    /// Recovers the message that could not be delivered.
    pub fn into_inner(self) -> M {
        match self {
            NotifyError::Full(msg) | NotifyError::Closed(msg) => msg,
        }
    }
}

impl<M> fmt::Debug for NotifyError<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Full(_) => f.write_str("Full(..)"),
            NotifyError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<M> fmt::Display for NotifyError<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Full(_) => f.write_str("notification channel is full"),
            NotifyError::Closed(_) => f.write_str("notification channel is closed"),
        }
    }
}

impl<M> error::Error for NotifyError<M> {}

/// Error returned when scheduling a timer.
#[derive(Debug, PartialEq, Eq)]
pub enum TimerError {
    /// The timer queue is at its configured capacity.
    Overflow,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerError::Overflow => f.write_str("timer capacity exceeded"),
        }
    }
}

impl error::Error for TimerError {}
