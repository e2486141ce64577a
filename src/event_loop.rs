//! The event-loop driver.
//!
//! [`EventLoop`] owns the multiplexer, the timer queue, and the
//! receive side of the notification channel, and runs the dispatch
//! cycle against a caller-supplied [`Handler`]:
//!
//! 1. bound the wait by the earliest timer deadline,
//! 2. block in the multiplexer,
//! 3. dispatch readiness events,
//! 4. dispatch expired timers in deadline order,
//! 5. dispatch queued cross-thread messages in enqueue order,
//! 6. call `tick` once, whether or not anything fired.
//!
//! That order is contractual within a cycle. Timer mutation,
//! registration changes, and handler callbacks all happen on the
//! one thread calling [`run`](EventLoop::run), so none of it is
//! locked. Stopping is cooperative: a shutdown request takes effect
//! at the next cycle boundary, never mid-callback.

use crate::error::{Error, TimerError};
use crate::event::Events;
use crate::evented::Evented;
use crate::interest::{Interest, TriggerMode};
use crate::notify::{self, Sender};
use crate::poll::Poll;
use crate::poller::Waker;
use crate::timer::{Timeout, TimerQueue};
use crate::token::Token;

use log::{debug, error};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The callback surface the caller implements.
///
/// All callbacks run on the loop thread, receive the loop itself so
/// they can mutate registrations and timers, and run to completion
/// before the cycle proceeds. Every method has an empty default, so
/// a handler only implements what it uses.
///
/// Panics inside a callback are not caught; they propagate out of
/// [`EventLoop::run`] and containing them is the handler's business.
pub trait Handler: Sized {
    /// Payload handed back when a scheduled timer fires.
    type Timeout;

    /// Message type carried by the notification channel.
    type Message: Send;

    /// A registered source became ready.
    ///
    /// For an [`EdgeOneshot`](TriggerMode::EdgeOneshot) source the
    /// loop does not re-arm anything: no further event arrives for
    /// `token` until the source is explicitly reregistered.
    fn ready(&mut self, event_loop: &mut EventLoop<Self>, token: Token, readiness: Interest) {
        let _ = (event_loop, token, readiness);
    }

    /// A scheduled timer expired.
    fn timeout(&mut self, event_loop: &mut EventLoop<Self>, payload: Self::Timeout) {
        let _ = (event_loop, payload);
    }

    /// A cross-thread message arrived.
    fn notify(&mut self, event_loop: &mut EventLoop<Self>, msg: Self::Message) {
        let _ = (event_loop, msg);
    }

    /// End-of-cycle housekeeping hook, called exactly once per
    /// cycle even when nothing fired.
    fn tick(&mut self, event_loop: &mut EventLoop<Self>) {
        let _ = event_loop;
    }
}

/// Configuration for an [`EventLoop`].
///
/// # Examples
///
/// ```rust,ignore
/// let mut event_loop = EventLoop::configured(
///     EventLoopConfig::new()
///         .notify_capacity(1024)
///         .messages_per_tick(64),
/// )?;
/// ```
#[derive(Clone, Copy, Debug)]
pub struct EventLoopConfig {
    notify_capacity: usize,
    messages_per_tick: usize,
    timer_capacity: usize,
    event_capacity: usize,
}

impl EventLoopConfig {
    /// Creates the default configuration.
    pub fn new() -> EventLoopConfig {
        EventLoopConfig {
            notify_capacity: 4096,
            messages_per_tick: 256,
            timer_capacity: 65_536,
            event_capacity: 1024,
        }
    }

    /// Bounded capacity of the notification channel. Sends past it
    /// are rejected with `NotifyError::Full`.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn notify_capacity(mut self, n: usize) -> EventLoopConfig {
        assert!(n > 0, "notify_capacity must be > 0");

        self.notify_capacity = n;
        self
    }

    /// Maximum messages dispatched per cycle. The remainder stays
    /// queued and the loop re-wakes itself for the next cycle.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn messages_per_tick(mut self, n: usize) -> EventLoopConfig {
        assert!(n > 0, "messages_per_tick must be > 0");

        self.messages_per_tick = n;
        self
    }

    /// Maximum live timers before `schedule` reports overflow.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn timer_capacity(mut self, n: usize) -> EventLoopConfig {
        assert!(n > 0, "timer_capacity must be > 0");

        self.timer_capacity = n;
        self
    }

    /// Readiness events received per poll call.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn event_capacity(mut self, n: usize) -> EventLoopConfig {
        assert!(n > 0, "event_capacity must be > 0");

        self.event_capacity = n;
        self
    }
}

impl Default for EventLoopConfig {
    fn default() -> EventLoopConfig {
        EventLoopConfig::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Stopped,
}

/// Single-threaded readiness event loop.
///
/// The loop exclusively owns its [`Poll`], its [`TimerQueue`], and
/// the receive side of the notification channel; the handler is
/// lent to [`run`](EventLoop::run) for its duration. Independent
/// loops (one per worker thread, for instance) do not interfere:
/// there is no shared global state anywhere in the library.
pub struct EventLoop<H: Handler> {
    poll: Poll,
    events: Events,
    timer: TimerQueue<H::Timeout>,

    notify_tx: Sender<H::Message>,
    notify_rx: Receiver<H::Message>,
    messages_per_tick: usize,

    waker: Arc<Waker>,
    shutdown: Arc<AtomicBool>,
    state: RunState,
}

impl<H: Handler> EventLoop<H> {
    /// Creates an event loop with the default configuration.
    pub fn new() -> io::Result<EventLoop<H>> {
        EventLoop::configured(EventLoopConfig::new())
    }

    /// Creates an event loop with the given configuration.
    pub fn configured(config: EventLoopConfig) -> io::Result<EventLoop<H>> {
        let poll = Poll::with_capacity(config.event_capacity)?;
        let waker = poll.waker();
        let (notify_tx, notify_rx) = notify::channel(config.notify_capacity, waker.clone());

        debug!("event loop created, config: {:?}", config);

        Ok(EventLoop {
            poll,
            events: Events::with_capacity(config.event_capacity),
            timer: TimerQueue::with_capacity(config.timer_capacity),
            notify_tx,
            notify_rx,
            messages_per_tick: config.messages_per_tick,
            waker,
            shutdown: Arc::new(AtomicBool::new(false)),
            state: RunState::Idle,
        })
    }

    /// Returns a sender for pushing messages into the loop from
    /// other threads.
    pub fn channel(&self) -> Sender<H::Message> {
        self.notify_tx.clone()
    }

    /// Returns a handle that stops the loop from any thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown: self.shutdown.clone(),
            waker: self.waker.clone(),
        }
    }

    /// Requests the loop to stop.
    ///
    /// Intended for use inside handler callbacks; the current
    /// cycle's dispatch finishes and `run` returns at the cycle
    /// boundary. From another thread, use a [`ShutdownHandle`].
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Returns `true` while the loop is inside [`run`](EventLoop::run).
    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// Starts monitoring `source` under `token`.
    /// See [`Poll::register`].
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
        self.poll.register(source, token, interest, mode)
    }

    /// Replaces interest, trigger mode, or token of a registration.
    /// See [`Poll::reregister`].
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
        self.poll.reregister(source, token, interest, mode)
    }

    /// Stops monitoring `source`. See [`Poll::deregister`].
    pub fn deregister<E>(&mut self, source: &E) -> Result<(), Error>
    where
        E: Evented + ?Sized,
    {
        self.poll.deregister(source)
    }

    /// Schedules `payload` to be handed to
    /// [`Handler::timeout`] after `delay`.
    pub fn schedule(&mut self, delay: Duration, payload: H::Timeout) -> Result<Timeout, TimerError> {
        self.timer.schedule(delay, payload)
    }

    /// Schedules `payload` to fire at an absolute deadline.
    pub fn schedule_at(
        &mut self,
        deadline: Instant,
        payload: H::Timeout,
    ) -> Result<Timeout, TimerError> {
        self.timer.schedule_at(deadline, payload)
    }

    /// Cancels a pending timer. Returns `true` if it was removed
    /// before dispatch; cancelling a fired or unknown handle is a
    /// benign no-op reporting `false`.
    pub fn cancel(&mut self, timeout: Timeout) -> bool {
        self.timer.cancel(timeout)
    }

    /// Runs the dispatch cycle until shutdown is requested or the
    /// OS poller fails.
    ///
    /// Returns `Ok(())` after a requested shutdown, or the fatal
    /// poller error. After a fatal error no further callback fires.
    /// A stopped loop may be run again.
    pub fn run(&mut self, handler: &mut H) -> io::Result<()> {
        self.shutdown.store(false, Ordering::Release);
        self.state = RunState::Running;
        debug!("event loop running");

        let result = loop {
            if self.shutdown.load(Ordering::Acquire) {
                break Ok(());
            }

            if let Err(err) = self.cycle(handler, None) {
                break Err(err);
            }
        };

        self.state = RunState::Stopped;
        match &result {
            Ok(()) => debug!("event loop stopped"),
            Err(err) => error!("event loop failed: {}", err),
        }

        result
    }

    /// Runs a single dispatch cycle, waiting at most `max_wait` (on
    /// top of the timer bound) for readiness.
    pub fn run_once(&mut self, handler: &mut H, max_wait: Option<Duration>) -> io::Result<()> {
        self.cycle(handler, max_wait)
    }

    fn cycle(&mut self, handler: &mut H, max_wait: Option<Duration>) -> io::Result<()> {
        let now = Instant::now();
        let timer_wait = self
            .timer
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now));

        let wait = match (timer_wait, max_wait) {
            (Some(timer), Some(cap)) => Some(timer.min(cap)),
            (Some(timer), None) => Some(timer),
            (None, cap) => cap,
        };

        self.poll.poll(&mut self.events, wait)?;

        // A shutdown observed here arrived while the loop was
        // blocked; nothing of this cycle is dispatched.
        if self.shutdown.load(Ordering::Acquire) {
            return Ok(());
        }

        self.dispatch_readiness(handler);
        self.dispatch_timers(handler);
        self.dispatch_messages(handler);

        handler.tick(self);

        Ok(())
    }

    fn dispatch_readiness(&mut self, handler: &mut H) {
        let events = std::mem::replace(&mut self.events, Events::with_capacity(0));

        for event in &events {
            handler.ready(self, event.token(), event.readiness());
        }

        self.events = events;
    }

    fn dispatch_timers(&mut self, handler: &mut H) {
        let now = Instant::now();

        // One at a time, so a cancel issued inside a callback still
        // stops any expired-but-undispatched timer.
        while let Some((_, payload)) = self.timer.pop_expired(now) {
            handler.timeout(self, payload);
        }
    }

    fn dispatch_messages(&mut self, handler: &mut H) {
        let mut dispatched = 0;

        loop {
            if dispatched == self.messages_per_tick {
                // Leftover messages must not wait for unrelated I/O;
                // make the next poll return immediately.
                self.waker.wake();
                break;
            }

            match self.notify_rx.try_recv() {
                Ok(msg) => {
                    handler.notify(self, msg);
                    dispatched += 1;
                }
                Err(_) => break,
            }
        }
    }
}

/// Stops a running [`EventLoop`] from any thread.
///
/// The handle sets the shutdown flag and wakes the poller, so a
/// loop blocked in an indefinite wait returns within bounded
/// latency. Shutdown remains cooperative: in-flight callbacks run
/// to completion and the loop exits at the cycle boundary.
pub struct ShutdownHandle {
    shutdown: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    /// Requests the loop to stop and wakes it.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.waker.wake();
    }
}

impl Clone for ShutdownHandle {
    fn clone(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown: self.shutdown.clone(),
            waker: self.waker.clone(),
        }
    }
}
