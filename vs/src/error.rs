//! Store errors

use thiserror::Error;

/// Error type an owner may report back through a set request
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The owner applied the request and reported a failure
    #[error("Set request rejected: {0}")]
    Rejected(#[source] BoxError),

    /// Nobody is draining set requests anymore
    #[error("Set request channel closed")]
    RequestChannelClosed,

    /// The owner dropped the request without responding
    #[error("Set request dropped without a response")]
    NoResponse,

    /// The notify receiver is gone
    #[error("Notify channel closed")]
    NotifyChannelClosed,

    /// A single-consumer receive half was already handed out
    #[error("{0} receiver already taken")]
    ReceiverTaken(&'static str),
}

impl StoreError {
    /// Downcast the owner's rejection to a concrete error type
    pub fn rejection<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Rejected(source) => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
