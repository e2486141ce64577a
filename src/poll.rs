//! The readiness multiplexer.
//!
//! [`Poll`] wraps the platform poller backend and tracks every live
//! registration. It is responsible for:
//! - enforcing the one-registration-per-token and per-descriptor
//!   invariants,
//! - blocking for readiness with an optional timeout,
//! - retrying transient signal interruption so it never surfaces.
//!
//! `Poll` is single-threaded by construction: it is owned by one
//! [`EventLoop`](crate::EventLoop) (or driven directly by one
//! thread) and keeps its bookkeeping in plain maps, no locks.

use crate::error::Error;
use crate::event::Events;
use crate::evented::Evented;
use crate::interest::{Interest, TriggerMode};
use crate::poller::{Poller, Waker};
use crate::token::{Token, WAKE_TOKEN};

use log::trace;
use std::collections::HashMap;
use std::io;
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// A registration tracked by the multiplexer.
struct Registration {
    token: Token,
    interest: Interest,
    mode: TriggerMode,
}

/// The readiness multiplexer.
///
/// Sources are registered through the [`Evented`] capability and
/// identified by caller-supplied [`Token`]s. One `poll` call fills
/// the caller's [`Events`] buffer with everything that became ready,
/// or returns with an empty buffer on timeout.
pub struct Poll {
    poller: Poller,
    tokens: HashMap<Token, RawFd>,
    fds: HashMap<RawFd, Registration>,
}

impl Poll {
    /// Creates a multiplexer with the default event capacity.
    pub fn new() -> io::Result<Poll> {
        Poll::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Creates a multiplexer able to report up to `event_capacity`
    /// readiness events per poll call.
    pub fn with_capacity(event_capacity: usize) -> io::Result<Poll> {
        Ok(Poll {
            poller: Poller::new(event_capacity)?,
            tokens: HashMap::new(),
            fds: HashMap::new(),
        })
    }

    /// Starts monitoring `source` under `token`.
    ///
    /// Fails with [`Error::AlreadyRegistered`] if the token or the
    /// source's descriptor is already tracked. The reserved internal
    /// wake token is always tracked, so registering it fails the
    /// same way.
    pub fn register<E>(
        &mut self,
        source: &E,
        token: Token,
        interest: Interest,
        mode: TriggerMode,
    ) -> Result<(), Error>
    where
        E: Evented + ?Sized,
    {
        source.register(self, token, interest, mode)
    }

    /// Replaces the interest, trigger mode, or token of an existing
    /// registration. The update is atomic from the caller's
    /// perspective.
    ///
    /// Fails with [`Error::NotRegistered`] if the source was never
    /// registered, and with [`Error::AlreadyRegistered`] if the new
    /// token is taken by another source.
    ///
    /// This is also the only way to re-arm an
    /// [`EdgeOneshot`](TriggerMode::EdgeOneshot) source after it
    /// fired.
    pub fn reregister<E>(
        &mut self,
        source: &E,
        token: Token,
        interest: Interest,
        mode: TriggerMode,
    ) -> Result<(), Error>
    where
        E: Evented + ?Sized,
    {
        source.reregister(self, token, interest, mode)
    }

    /// Stops monitoring `source`.
    ///
    /// Deregistering a source that is not registered is an error
    /// ([`Error::NotRegistered`]), not a silent no-op.
    pub fn deregister<E>(&mut self, source: &E) -> Result<(), Error>
    where
        E: Evented + ?Sized,
    {
        source.deregister(self)
    }

    /// Blocks until a registered source is ready, `timeout` elapses,
    /// or the internal wake source is triggered.
    ///
    /// `None` waits indefinitely. On timeout the buffer comes back
    /// empty. Signal interruption is retried internally against the
    /// original deadline and never observed by the caller; only a
    /// genuine failure of the OS facility is returned, and it is
    /// fatal for the caller's loop.
    pub fn poll(&mut self, events: &mut Events, timeout: Option<Duration>) -> io::Result<()> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));

            match self.poller.poll(events, remaining) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                result => return result,
            }
        }
    }

    pub(crate) fn waker(&self) -> Arc<Waker> {
        self.poller.waker()
    }

    pub(crate) fn register_fd(
        &mut self,
        fd: RawFd,
        token: Token,
        interest: Interest,
        mode: TriggerMode,
    ) -> Result<(), Error> {
        if token == WAKE_TOKEN || self.tokens.contains_key(&token) || self.fds.contains_key(&fd) {
            return Err(Error::AlreadyRegistered);
        }

        self.poller.register(fd, token, interest, mode)?;

        trace!("registered fd={} token={:?} interest={:?} mode={:?}", fd, token, interest, mode);

        self.tokens.insert(token, fd);
        self.fds.insert(
            fd,
            Registration {
                token,
                interest,
                mode,
            },
        );

        Ok(())
    }

    pub(crate) fn reregister_fd(
        &mut self,
        fd: RawFd,
        token: Token,
        interest: Interest,
        mode: TriggerMode,
    ) -> Result<(), Error> {
        let previous = match self.fds.get(&fd) {
            Some(registration) => registration.token,
            None => return Err(Error::NotRegistered),
        };

        if token != previous && (token == WAKE_TOKEN || self.tokens.contains_key(&token)) {
            return Err(Error::AlreadyRegistered);
        }

        self.poller.reregister(fd, token, interest, mode)?;

        trace!("reregistered fd={} token={:?} interest={:?} mode={:?}", fd, token, interest, mode);

        self.tokens.remove(&previous);
        self.tokens.insert(token, fd);
        self.fds.insert(
            fd,
            Registration {
                token,
                interest,
                mode,
            },
        );

        Ok(())
    }

    pub(crate) fn deregister_fd(&mut self, fd: RawFd) -> Result<(), Error> {
        let registration = match self.fds.remove(&fd) {
            Some(registration) => registration,
            None => return Err(Error::NotRegistered),
        };

        self.tokens.remove(&registration.token);
        self.poller.deregister(fd)?;

        trace!(
            "deregistered fd={} token={:?} interest={:?} mode={:?}",
            fd,
            registration.token,
            registration.interest,
            registration.mode
        );

        Ok(())
    }
}
