//! # Pulsis
//!
//! **Pulsis** is a single-threaded readiness event loop for Rust, designed as the
//! dedicated I/O dispatch layer for the **Nebula** ecosystem.
//!
//! Unlike a full async runtime, Pulsis stays at the readiness level: it lets one
//! thread monitor many non-blocking sources and timers and dispatches whatever
//! becomes ready to caller-supplied callbacks, without spawning a thread per
//! connection and without any locking on the dispatch path.
//!
//! Pulsis is built from the ground up with simplicity and predictability in mind,
//! offering:
//!
//! - A **readiness multiplexer** ([`Poll`]) over epoll (Linux) and kqueue
//!   (macOS), with level, edge, and edge-oneshot trigger modes
//! - A **deadline-ordered timer queue** whose earliest deadline bounds the poll
//!   wait
//! - A **bounded cross-thread channel** whose sends wake a blocked loop within
//!   bounded latency
//! - A **driver** ([`EventLoop`]) dispatching readiness, timeouts, messages, and a
//!   per-cycle tick to a [`Handler`], in that contractual order
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pulsis::{EventLoop, Handler, Interest, SourceFd, Token, TriggerMode};
//!
//! struct Echo;
//!
//! impl Handler for Echo {
//!     type Timeout = ();
//!     type Message = ();
//!
//!     fn ready(&mut self, event_loop: &mut EventLoop<Self>, token: Token, readiness: Interest) {
//!         // read from / write to the source behind `token`
//!     }
//! }
//!
//! let mut event_loop = EventLoop::new()?;
//! event_loop.register(&SourceFd(&fd), Token(0), Interest::READABLE, TriggerMode::Edge)?;
//! event_loop.run(&mut Echo)?;
//! ```
//!
//! ## Concurrency model
//!
//! Registration, timers, and callbacks all happen on the one thread that calls
//! [`EventLoop::run`]. The only cross-thread surfaces are [`Sender::send`]
//! and [`ShutdownHandle`], both of which wake the loop through its internal wake
//! descriptor. Independent loops coexist freely; there is no global state.
//!
//! Pulsis logs through the [`log`] facade and never installs a logger.

mod error;
mod event;
mod event_loop;
mod evented;
mod interest;
mod notify;
mod poll;
mod poller;
mod timer;
mod token;

pub use error::{Error, NotifyError, TimerError};
pub use event::{Event, Events};
pub use event_loop::{EventLoop, EventLoopConfig, Handler, ShutdownHandle};
pub use evented::{Evented, SourceFd};
pub use interest::{Interest, TriggerMode};
pub use notify::Sender;
pub use poll::Poll;
pub use timer::{TimerQueue, Timeout};
pub use token::Token;
