use crate::interest::Interest;
use crate::token::Token;

/// A readiness event reported by the poller.
///
/// An `Event` pairs the [`Token`] of a registered source with the
/// subset of its interest that was actually observed ready. Events
/// are produced only by [`Poll::poll`](crate::Poll::poll) and
/// consumed by the caller (or, inside the event loop, dispatched to
/// [`Handler::ready`](crate::Handler::ready)).
#[derive(Clone, Copy, Debug)]
pub struct Event {
    pub(crate) token: Token,
    pub(crate) readiness: Interest,
}

impl Event {
    /// Token of the registration this event belongs to.
    pub fn token(&self) -> Token {
        self.token
    }

    /// The conditions observed ready.
    ///
    /// Hang-up and error states on the descriptor are folded into
    /// read readiness so a subsequent read observes them.
    pub fn readiness(&self) -> Interest {
        self.readiness
    }
}

/// A reusable buffer of readiness events.
///
/// The buffer is filled by [`Poll::poll`](crate::Poll::poll) and
/// cleared on every call; allocating it once with a fixed capacity
/// keeps the hot path allocation-free.
pub struct Events {
    events: Vec<Event>,
}

impl Events {
    /// Creates an empty buffer able to receive `capacity` events per
    /// poll without reallocating.
    pub fn with_capacity(capacity: usize) -> Events {
        Events {
            events: Vec::with_capacity(capacity),
        }
    }

    /// Number of events received by the last poll.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if the last poll produced no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterates over the events of the last poll.
    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
    }

    /// Appends an event, merging it into an existing entry when the
    /// backend reports the same token twice in one batch.
    pub(crate) fn push(&mut self, event: Event) {
        if let Some(e) = self.events.iter_mut().find(|e| e.token == event.token) {
            e.readiness |= event.readiness;
        } else {
            self.events.push(event);
        }
    }
}

impl<'a> IntoIterator for &'a Events {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
