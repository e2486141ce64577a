//! `kqueue`-based poller backend for macOS.
//!
//! Responsibilities:
//! - Register file descriptors as read/write kevent filters
//! - Block waiting for I/O readiness, bounded by the poll timeout
//! - Own the self-pipe wake source that interrupts a blocked wait
//!
//! Trigger modes map directly onto `EV_CLEAR` and `EV_ONESHOT`;
//! level-triggered is kqueue's default. Both filters are always
//! added for a registered descriptor, with the ones outside the
//! current interest disabled, so interest changes are plain
//! enable/disable updates.

use crate::event::{Event, Events};
use crate::interest::{Interest, TriggerMode};
use crate::poller::unix::{sys_close, sys_pipe, sys_read, sys_set_cloexec, sys_write};
use crate::token::{Token, WAKE_TOKEN};

use libc::{kevent, kqueue, timespec, EVFILT_READ, EVFILT_WRITE, EV_EOF, EV_ERROR};
use std::io;
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::time::Duration;

/// `kqueue` poller.
///
/// The poller owns a kqueue instance, a self-pipe whose read end is
/// registered under the reserved wake token, and a reusable buffer
/// for raw `kevent`s. Wake events are consumed here and never
/// surface to the caller.
pub(crate) struct Poller {
    /// Kqueue file descriptor.
    kq: RawFd,

    /// Reusable buffer for raw kevents.
    events: Vec<kevent>,

    /// Waker wrapping the self-pipe.
    waker: Arc<Waker>,
}

// The kevent buffer holds raw `udata` pointers, which are only ever
// token values, never dereferenced.
unsafe impl Send for Poller {}

/// Wake handle for the kqueue backend, backed by a self-pipe.
///
/// Writing a byte to the pipe makes a blocked `kevent` call return
/// immediately. The handle is shared with notification senders and
/// shutdown handles, so the descriptors stay open until the last
/// clone is gone.
pub(crate) struct Waker {
    read: RawFd,
    write: RawFd,
}

impl Waker {
    /// Interrupts a blocked `kevent` wait.
    pub(crate) fn wake(&self) {
        sys_write(self.write, &[1u8]);
    }

    /// Consumes pending wakes so the pipe goes quiet again.
    fn drain(&self) {
        let mut buf = [0u8; 64];
        while sys_read(self.read, &mut buf) > 0 {}
    }
}

impl Drop for Waker {
    fn drop(&mut self) {
        sys_close(self.read);
        sys_close(self.write);
    }
}

impl Poller {
    /// Creates the kqueue instance and its wake source.
    pub(crate) fn new(event_capacity: usize) -> io::Result<Poller> {
        let kq = unsafe { kqueue() };
        if kq < 0 {
            return Err(io::Error::last_os_error());
        }

        if let Err(err) = sys_set_cloexec(kq) {
            sys_close(kq);
            return Err(err);
        }

        let (read, write) = match sys_pipe() {
            Ok(fds) => fds,
            Err(err) => {
                sys_close(kq);
                return Err(err);
            }
        };

        let poller = Poller {
            kq,
            events: Vec::with_capacity(event_capacity),
            waker: Arc::new(Waker { read, write }),
        };

        // Only the read filter; the write end of the pipe never
        // enters the kqueue.
        let change = raw_kevent(read, EVFILT_READ, libc::EV_ADD, WAKE_TOKEN.0);
        let rc = unsafe { kevent(kq, &change, 1, std::ptr::null_mut(), 0, std::ptr::null()) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(poller)
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
        self.submit(fd, token, interest, mode, libc::EV_ADD)
    }

    /// Updates interest, mode, or token of a registered descriptor.
    ///
    /// Re-adding is kqueue's native update; this is also how an
    /// `EdgeOneshot` registration is re-armed after it fired.
    pub(crate) fn reregister(
        &self,
        fd: RawFd,
        token: Token,
        interest: Interest,
        mode: TriggerMode,
    ) -> io::Result<()> {
        self.submit(fd, token, interest, mode, libc::EV_ADD)
    }

    /// Removes a file descriptor from the poller.
    ///
    /// A filter already gone (for example after an `EV_ONESHOT`
    /// fired) is not an error.
    pub(crate) fn deregister(&self, fd: RawFd) -> io::Result<()> {
        for filter in [EVFILT_READ, EVFILT_WRITE] {
            let change = raw_kevent(fd, filter, libc::EV_DELETE, 0);

            let rc =
                unsafe { kevent(self.kq, &change, 1, std::ptr::null_mut(), 0, std::ptr::null()) };
            if rc < 0 {
                let err = io::Error::last_os_error();
                if err.raw_os_error() != Some(libc::ENOENT) {
                    return Err(err);
                }
            }
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
        let ts = timeout.map(|t| timespec {
            tv_sec: t.as_secs() as libc::time_t,
            tv_nsec: t.subsec_nanos() as libc::c_long,
        });
        let ts_ptr = ts
            .as_ref()
            .map(|ts| ts as *const timespec)
            .unwrap_or(std::ptr::null());

        let n = unsafe {
            kevent(
                self.kq,
                std::ptr::null(),
                0,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                ts_ptr,
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
            let token = Token(ev.udata as usize);

            if token == WAKE_TOKEN {
                self.waker.drain();
                continue;
            }

            let mut readiness = Interest::NONE;

            // Error and end-of-file are folded into read readiness so
            // a subsequent read observes them.
            if ev.filter == EVFILT_READ || ev.flags & (EV_EOF | EV_ERROR) != 0 {
                readiness |= Interest::READABLE;
            }
            if ev.filter == EVFILT_WRITE {
                readiness |= Interest::WRITABLE;
            }

            events.push(Event { token, readiness });
        }

        Ok(())
    }

    /// Submits the read and write filters for a descriptor, enabling
    /// the ones inside `interest` and disabling the rest.
    fn submit(
        &self,
        fd: RawFd,
        token: Token,
        interest: Interest,
        mode: TriggerMode,
        base: u16,
    ) -> io::Result<()> {
        let mut flags = base;

        match mode {
            TriggerMode::Level => {}
            TriggerMode::Edge => flags |= libc::EV_CLEAR,
            TriggerMode::EdgeOneshot => flags |= libc::EV_CLEAR | libc::EV_ONESHOT,
        }

        let changes = [
            raw_kevent(
                fd,
                EVFILT_READ,
                flags
                    | if interest.is_readable() {
                        libc::EV_ENABLE
                    } else {
                        libc::EV_DISABLE
                    },
                token.0,
            ),
            raw_kevent(
                fd,
                EVFILT_WRITE,
                flags
                    | if interest.is_writable() {
                        libc::EV_ENABLE
                    } else {
                        libc::EV_DISABLE
                    },
                token.0,
            ),
        ];

        let rc = unsafe {
            kevent(
                self.kq,
                changes.as_ptr(),
                changes.len() as i32,
                std::ptr::null_mut(),
                0,
                std::ptr::null(),
            )
        };

        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        sys_close(self.kq);
    }
}

fn raw_kevent(fd: RawFd, filter: i16, flags: u16, token: usize) -> kevent {
    kevent {
        ident: fd as libc::uintptr_t,
        filter,
        flags,
        fflags: 0,
        data: 0,
        udata: token as *mut libc::c_void,
    }
}
