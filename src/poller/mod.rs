//! Platform-specific readiness backends.
//!
//! This module provides a unified interface over the OS readiness
//! facilities the poller is built on (`epoll` on Linux, `kqueue` on
//! macOS).
//!
//! A backend is responsible for:
//! - registering descriptors with interest and trigger-mode flags,
//! - blocking for readiness with an optional timeout,
//! - owning the wake descriptor that interrupts a blocked wait.
//!
//! The concrete implementation is selected at compile time depending
//! on the target operating system.

pub(crate) mod unix;

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(target_os = "macos")]
mod kqueue;

#[cfg(target_os = "linux")]
pub(crate) use epoll::{Poller, Waker};

#[cfg(target_os = "macos")]
pub(crate) use kqueue::{Poller, Waker};
