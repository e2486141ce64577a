//! Deadline-ordered timer queue.
//!
//! The queue holds scheduled deadlines with their payloads and is
//! responsible for:
//! - O(log n) insertion ordered by deadline,
//! - telling the driver how long it may sleep (`next_deadline`),
//! - handing back expired entries in firing order.
//!
//! Cancellation is lazy: a cancelled entry stays in the heap and is
//! skipped when it reaches the top. The driver pops expired entries
//! one at a time, so a timer cancelled from inside a callback is
//! still stopped if it has not been dispatched yet.

use crate::error::TimerError;

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

const DEFAULT_CAPACITY: usize = 65_536;

/// Opaque handle to a scheduled timer, used to cancel it.
///
/// The handle stays valid until the timer fires or is cancelled;
/// after that, cancelling it is a no-op that reports `false`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timeout {
    id: u64,
}

/// An entry in the timer heap.
struct TimerEntry {
    deadline: Instant,

    /// Insertion sequence number. Entries with equal deadlines fire
    /// in insertion order, and cancelled entries are recognized by
    /// their id no longer being live.
    id: u64,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Ord for TimerEntry {
    /// Orders entries by deadline, then insertion order.
    ///
    /// The comparison is **reversed** so that a
    /// `BinaryHeap<TimerEntry>` behaves as a min-heap, where the
    /// earliest deadline is popped first.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.deadline, other.id).cmp(&(self.deadline, self.id))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Deadline-ordered queue of pending timers.
///
/// `T` is the opaque payload handed back when a timer expires. The
/// queue is owned by a single thread; inside the event loop that is
/// the driver thread, and no locking is involved anywhere.
pub struct TimerQueue<T> {
    heap: BinaryHeap<TimerEntry>,

    /// Payloads of live (not yet fired, not cancelled) timers.
    payloads: HashMap<u64, T>,

    next_id: u64,
    capacity: usize,
}

impl<T> TimerQueue<T> {
    /// Creates a queue with the default capacity.
    pub fn new() -> TimerQueue<T> {
        TimerQueue::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a queue holding at most `capacity` live timers.
    pub fn with_capacity(capacity: usize) -> TimerQueue<T> {
        TimerQueue {
            heap: BinaryHeap::new(),
            payloads: HashMap::new(),
            next_id: 0,
            capacity,
        }
    }

    /// Schedules `payload` to fire at `deadline`.
    ///
    /// Fails with [`TimerError::Overflow`] once the queue holds its
    /// configured capacity of live timers.
    pub fn schedule_at(&mut self, deadline: Instant, payload: T) -> Result<Timeout, TimerError> {
        if self.payloads.len() >= self.capacity {
            return Err(TimerError::Overflow);
        }

        let id = self.next_id;
        self.next_id += 1;

        self.heap.push(TimerEntry { deadline, id });
        self.payloads.insert(id, payload);

        Ok(Timeout { id })
    }

    /// Schedules `payload` to fire after `delay` from now.
    pub fn schedule(&mut self, delay: Duration, payload: T) -> Result<Timeout, TimerError> {
        self.schedule_at(Instant::now() + delay, payload)
    }

    /// Cancels a pending timer.
    ///
    /// Returns `true` if the timer was found and removed before
    /// firing. Cancelling a fired, drained, or unknown handle
    /// returns `false`; it is a benign no-op, not an error.
    pub fn cancel(&mut self, timeout: Timeout) -> bool {
        self.payloads.remove(&timeout.id).is_some()
    }

    /// The earliest pending deadline, or `None` when no live timer
    /// exists and the driver may sleep indefinitely.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        loop {
            let entry = self.heap.peek()?;

            if self.payloads.contains_key(&entry.id) {
                return Some(entry.deadline);
            }

            // Cancelled entry, discard.
            self.heap.pop();
        }
    }

    /// Removes and returns the earliest timer expired at `now`.
    ///
    /// The driver calls this once per dispatched timeout so that a
    /// `cancel` issued from inside the callback still stops any
    /// later expired entry that has not been popped yet.
    pub fn pop_expired(&mut self, now: Instant) -> Option<(Timeout, T)> {
        loop {
            let entry = self.heap.peek()?;

            if entry.deadline > now {
                return None;
            }

            let id = self.heap.pop().expect("peeked entry disappeared").id;

            if let Some(payload) = self.payloads.remove(&id) {
                return Some((Timeout { id }, payload));
            }
        }
    }

    /// Removes and returns every timer expired at `now`, ordered by
    /// deadline ascending, ties in insertion order.
    ///
    /// Handles returned here count as fired: cancelling them
    /// afterwards reports `false`.
    pub fn drain_expired(&mut self, now: Instant) -> Vec<(Timeout, T)> {
        let mut expired = Vec::new();

        while let Some(entry) = self.pop_expired(now) {
            expired.push(entry);
        }

        expired
    }

    /// Number of live timers.
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Returns `true` if no live timer is pending.
    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> TimerQueue<T> {
        TimerQueue::new()
    }
}
