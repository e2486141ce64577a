//! Linux `epoll`-based poller backend.
//!
//! Responsibilities:
//! - Register file descriptors with interest and trigger-mode flags
//! - Block waiting for I/O readiness, bounded by the poll timeout
//! - Own the `eventfd` wake source that interrupts a blocked wait
//!
//! Trigger modes map directly onto `EPOLLET` and `EPOLLONESHOT`;
//! level-triggered is epoll's default. This backend is selected
//! automatically on Linux targets.

use crate::event::{Event, Events};
use crate::interest::{Interest, TriggerMode};
use crate::poller::unix::{sys_close, sys_read, sys_write};
use crate::token::{Token, WAKE_TOKEN};

use libc::{
    epoll_create1, epoll_ctl, epoll_event, epoll_wait, EPOLLERR, EPOLLHUP, EPOLLIN, EPOLLOUT,
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD,
};
use std::io;
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::time::Duration;

/// Linux `epoll` poller.
///
/// The poller owns an `epoll` instance, an internal `eventfd`
/// registered under the reserved wake token, and a reusable buffer
/// for raw `epoll_event`s. Wake events are consumed here and never
/// surface to the caller.
pub(crate) struct Poller {
    /// Epoll file descriptor.
    epoll: RawFd,

    /// Reusable buffer for raw epoll events.
    events: Vec<epoll_event>,

    /// Waker wrapping the internal eventfd.
    waker: Arc<Waker>,
}

/// Wake handle for the epoll backend, backed by an `eventfd`.
///
/// Writing to the eventfd makes a blocked `epoll_wait` return
/// immediately. The handle is shared with notification senders and
/// shutdown handles, so the descriptor stays open until the last
/// clone is gone.
pub(crate) struct Waker {
    fd: RawFd,
}

impl Waker {
    /// Interrupts a blocked `epoll_wait`.
    pub(crate) fn wake(&self) {
        let buf: u64 = 1;
        sys_write(self.fd, &buf.to_ne_bytes());
    }

    /// Consumes a pending wake so the eventfd goes quiet again.
    fn drain(&self) {
        let mut buf = [0u8; 8];
        sys_read(self.fd, &mut buf);
    }
}

impl Drop for Waker {
    fn drop(&mut self) {
        sys_close(self.fd);
    }
}

impl Poller {
    /// Creates the epoll instance and its wake source.
    ///
    /// The `eventfd` is created non-blocking and registered into
    /// epoll as a persistent level-triggered read source under
    /// the reserved wake token.
    pub(crate) fn new(event_capacity: usize) -> io::Result<Poller> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        let eventfd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
        if eventfd < 0 {
            let err = io::Error::last_os_error();
            sys_close(epoll);
            return Err(err);
        }

        let mut event = epoll_event {
            events: EPOLLIN as u32,
            u64: WAKE_TOKEN.0 as u64,
        };

        let rc = unsafe { epoll_ctl(epoll, EPOLL_CTL_ADD, eventfd, &mut event) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            sys_close(eventfd);
            sys_close(epoll);
            return Err(err);
        }

        Ok(Poller {
            epoll,
            events: Vec::with_capacity(event_capacity),
            waker: Arc::new(Waker { fd: eventfd }),
        })
    }

    /// Returns the shared wake handle.
    pub(crate) fn waker(&self) -> Arc<Waker> {
        self.waker.clone()
    }

    /// Registers a file descriptor with the given interest and mode.
    pub(crate) fn register(
        &self,
        fd: RawFd,
        token: Token,
        interest: Interest,
        mode: TriggerMode,
    ) -> io::Result<()> {
        let mut event = epoll_event {
            events: epoll_flags(interest, mode),
            u64: token.0 as u64,
        };

        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_ADD, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Updates interest, mode, or token of a registered descriptor.
    ///
    /// This is also how an `EdgeOneshot` registration is re-armed
    /// after it fired.
    pub(crate) fn reregister(
        &self,
        fd: RawFd,
        token: Token,
        interest: Interest,
        mode: TriggerMode,
    ) -> io::Result<()> {
        let mut event = epoll_event {
            events: epoll_flags(interest, mode),
            u64: token.0 as u64,
        };

        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_MOD, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Removes a file descriptor from the poller.
    pub(crate) fn deregister(&self, fd: RawFd) -> io::Result<()> {
        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, std::ptr::null_mut()) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Waits for readiness events.
    ///
    /// Blocks until at least one registered descriptor is ready, the
    /// wake source is triggered, or `timeout` expires. Signal
    /// interruption surfaces as `ErrorKind::Interrupted`; the caller
    /// retries against its own deadline.
    pub(crate) fn poll(
        &mut self,
        events: &mut Events,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        let timeout_ms = timeout.map(millis_round_up).unwrap_or(-1);

        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                timeout_ms,
            )
        };

        if n < 0 {
            return Err(io::Error::last_os_error());
        }

        unsafe {
            self.events.set_len(n as usize);
        }

        events.clear();

        for ev in &self.events {
            if ev.u64 == WAKE_TOKEN.0 as u64 {
                self.waker.drain();
                continue;
            }

            let mut readiness = Interest::NONE;

            // Error and hang-up are folded into read readiness so a
            // subsequent read observes them.
            if ev.events & ((EPOLLIN | EPOLLERR | EPOLLHUP) as u32) != 0 {
                readiness |= Interest::READABLE;
            }
            if ev.events & (EPOLLOUT as u32) != 0 {
                readiness |= Interest::WRITABLE;
            }

            events.push(Event {
                token: Token(ev.u64 as usize),
                readiness,
            });
        }

        Ok(())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        sys_close(self.epoll);
    }
}

fn epoll_flags(interest: Interest, mode: TriggerMode) -> u32 {
    let mut flags: u32 = 0;

    if interest.is_readable() {
        flags |= EPOLLIN as u32;
    }
    if interest.is_writable() {
        flags |= EPOLLOUT as u32;
    }

    match mode {
        TriggerMode::Level => {}
        TriggerMode::Edge => flags |= libc::EPOLLET as u32,
        TriggerMode::EdgeOneshot => flags |= (libc::EPOLLET | libc::EPOLLONESHOT) as u32,
    }

    flags
}

/// Converts a poll timeout to whole milliseconds, rounding up so a
/// timer deadline is never undershot.
fn millis_round_up(timeout: Duration) -> i32 {
    let ms = timeout
        .checked_add(Duration::from_nanos(999_999))
        .unwrap_or(timeout)
        .as_millis();

    ms.min(i32::MAX as u128) as i32
}
