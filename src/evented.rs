use crate::error::Error;
use crate::interest::{Interest, TriggerMode};
use crate::poll::Poll;
use crate::token::Token;

use std::os::unix::io::RawFd;

/// The capability a source must implement to be monitored.
///
/// `Evented` is the sole extension point of the library: a new
/// source kind participates in readiness monitoring by implementing
/// these three operations, and the poller and event loop never
/// special-case concrete source types.
///
/// Implementations for descriptor-backed sources should delegate to
/// [`SourceFd`] rather than talking to [`Poll`] internals:
///
/// ```rust,ignore
/// impl Evented for MySocket {
///     fn register(
///         &self,
///         poll: &mut Poll,
///         token: Token,
///         interest: Interest,
///         mode: TriggerMode,
///     ) -> Result<(), Error> {
///         SourceFd(&self.fd).register(poll, token, interest, mode)
///     }
///
///     // reregister / deregister likewise
/// }
/// ```
pub trait Evented {
    /// Starts monitoring the source under `token`.
    fn register(
        &self,
        poll: &mut Poll,
        token: Token,
        interest: Interest,
        mode: TriggerMode,
    ) -> Result<(), Error>;

    /// Replaces the interest, trigger mode, or token of an existing
    /// registration.
    fn reregister(
        &self,
        poll: &mut Poll,
        token: Token,
        interest: Interest,
        mode: TriggerMode,
    ) -> Result<(), Error>;

    /// Stops monitoring the source.
    fn deregister(&self, poll: &mut Poll) -> Result<(), Error>;
}

/// Adapter registering a raw file descriptor.
///
/// The descriptor must be non-blocking and must stay open for as
/// long as the registration exists; the adapter borrows it and
/// takes no ownership.
pub struct SourceFd<'a>(pub &'a RawFd);

impl Evented for SourceFd<'_> {
    fn register(
        &self,
        poll: &mut Poll,
        token: Token,
        interest: Interest,
        mode: TriggerMode,
    ) -> Result<(), Error> {
        poll.register_fd(*self.0, token, interest, mode)
    }

    fn reregister(
        &self,
        poll: &mut Poll,
        token: Token,
        interest: Interest,
        mode: TriggerMode,
    ) -> Result<(), Error> {
        poll.reregister_fd(*self.0, token, interest, mode)
    }

    fn deregister(&self, poll: &mut Poll) -> Result<(), Error> {
        poll.deregister_fd(*self.0)
    }
}
