//! Set-request protocol and notify handle
//!
//! A [`SetRequest`] pairs a candidate value with a private one-shot reply.
//! The owner answers it exactly once by consuming it with
//! [`SetRequest::respond`]; dropping it unanswered wakes the requester with
//! [`StoreError::NoResponse`].

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::{BoxError, StoreError, StoreResult};

/// Outcome the owner reports for a set request
pub type SetResponse = Result<(), BoxError>;

/// A queued mutation proposal
#[derive(Debug)]
pub struct SetRequest<T> {
    value: T,
    reply: oneshot::Sender<SetResponse>,
}

impl<T> SetRequest<T> {
    pub(crate) fn new(value: T) -> (Self, oneshot::Receiver<SetResponse>) {
        let (reply, reply_rx) = oneshot::channel();
        (Self { value, reply }, reply_rx)
    }

    /// The candidate value
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Answer the requester, consuming the request
    ///
    /// Returns false if the requester stopped waiting.
    pub fn respond<E>(self, result: Result<(), E>) -> bool
    where
        E: Into<BoxError>,
    {
        let delivered = self.reply.send(result.map_err(Into::into)).is_ok();
        if !delivered {
            debug!("SetRequest::respond: requester gone");
        }
        delivered
    }

    /// Answer the requester with success
    pub fn respond_ok(self) -> bool {
        self.respond(Ok::<(), BoxError>(()))
    }
}

/// Owner-side receiver of set requests
#[derive(Debug)]
pub struct SetRequests<T> {
    rx: mpsc::Receiver<SetRequest<T>>,
}

impl<T> SetRequests<T> {
    pub(crate) fn new(rx: mpsc::Receiver<SetRequest<T>>) -> Self {
        Self { rx }
    }

    /// Wait for the next pending request
    ///
    /// Returns `None` once every store handle is gone.
    pub async fn recv(&mut self) -> Option<SetRequest<T>> {
        self.rx.recv().await
    }
}

/// Send-only handle for a store's notify stream
///
/// Must only be used by the owner, after releasing the store lock.
#[derive(Debug)]
pub struct Notifier<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Clone for Notifier<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T> Notifier<T> {
    pub(crate) fn new(tx: mpsc::Sender<T>) -> Self {
        Self { tx }
    }

    /// Publish a committed value
    ///
    /// Waits until the notify channel has room, i.e. until the fanout (or
    /// whoever holds the receive half) takes the previous value.
    pub async fn publish(&self, value: T) -> StoreResult<()> {
        self.tx.send(value).await.map_err(|_| StoreError::NotifyChannelClosed)
    }
}
