//! Cross-thread notification channel.
//!
//! The channel is the only cross-thread surface of the event loop:
//! any thread may push messages through a [`Sender`], and the send
//! path couples the bounded queue with the poller's wake source so
//! a loop blocked in its wait returns promptly.
//!
//! The receive side is owned exclusively by the driver and drained
//! inside its own thread; no other reader exists.

use crate::error::NotifyError;
use crate::poller::Waker;

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;

/// Creates the bounded channel, coupling its send side to `waker`.
pub(crate) fn channel<M>(capacity: usize, waker: Arc<Waker>) -> (Sender<M>, Receiver<M>) {
    let (tx, rx) = sync_channel(capacity);

    (Sender { tx, waker }, rx)
}

/// Sends messages into the event loop from any thread.
///
/// Senders are cheap to clone and share. Each message is delivered
/// exactly once, in the order it was enqueued relative to other
/// messages from the same producer.
pub struct Sender<M> {
    tx: SyncSender<M>,
    waker: Arc<Waker>,
}

impl<M> Sender<M> {
    /// Enqueues a message and wakes the loop.
    ///
    /// The send never blocks. Past the channel capacity it fails
    /// with [`NotifyError::Full`], and once the event loop has been
    /// dropped with [`NotifyError::Closed`]; both hand the message
    /// back. A loop that merely stopped running still accepts
    /// messages and delivers them on its next run.
    pub fn send(&self, msg: M) -> Result<(), NotifyError<M>> {
        match self.tx.try_send(msg) {
            Ok(()) => {
                self.waker.wake();
                Ok(())
            }
            Err(TrySendError::Full(msg)) => Err(NotifyError::Full(msg)),
            Err(TrySendError::Disconnected(msg)) => Err(NotifyError::Closed(msg)),
        }
    }
}

impl<M> Clone for Sender<M> {
    fn clone(&self) -> Sender<M> {
        Sender {
            tx: self.tx.clone(),
            waker: self.waker.clone(),
        }
    }
}
