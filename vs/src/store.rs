//! Store - mutex-guarded holder of one value
//!
//! Readers take snapshots with [`Store::get_data`]. Writers never touch the
//! value directly: [`Store::set_data`] queues a [`SetRequest`] and waits for
//! the owner's answer. The owner drains requests, mutates the value through a
//! [`StoreGuard`], releases the guard, then publishes the committed value
//! through its [`Notifier`].

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::messages::{Notifier, SetRequest, SetRequests};

/// Default capacity for the set-request and notify channels
///
/// Tokio's bounded channels need at least one slot, so this is the closest
/// thing to an unbuffered channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1;

struct Shared<T> {
    value: Mutex<T>,
    set_tx: mpsc::Sender<SetRequest<T>>,
    set_rx: Mutex<Option<mpsc::Receiver<SetRequest<T>>>>,
    notify_tx: mpsc::Sender<T>,
    notify_rx: Mutex<Option<mpsc::Receiver<T>>>,
}

/// Handle to a shared value with a single owner
///
/// Cloning is cheap; every clone addresses the same value and channels.
pub struct Store<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> std::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl<T> Store<T> {
    /// Create a store holding `initial`
    pub fn new(initial: T) -> Self {
        Self::with_notify_capacity(initial, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a store whose notify channel buffers up to `capacity` values
    ///
    /// Anything above one slot lets the owner run ahead of a slow fanout.
    pub fn with_notify_capacity(initial: T, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        debug!(capacity, "Store::with_notify_capacity: called");
        let (set_tx, set_rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        let (notify_tx, notify_rx) = mpsc::channel(capacity);
        Self {
            shared: Arc::new(Shared {
                value: Mutex::new(initial),
                set_tx,
                set_rx: Mutex::new(Some(set_rx)),
                notify_tx,
                notify_rx: Mutex::new(Some(notify_rx)),
            }),
        }
    }

    /// Take a snapshot of the current value
    pub fn get_data(&self) -> T
    where
        T: Clone,
    {
        self.lock_value().clone()
    }

    /// Ask the owner to replace the value and wait for its answer
    ///
    /// Blocks until some task drains the set-request channel and responds.
    /// If nothing ever drains it, this never returns.
    pub async fn set_data(&self, value: T) -> StoreResult<()> {
        let (request, reply_rx) = SetRequest::new(value);
        self.shared
            .set_tx
            .send(request)
            .await
            .map_err(|_| StoreError::RequestChannelClosed)?;
        debug!("Store::set_data: request queued, waiting for response");
        reply_rx
            .await
            .map_err(|_| StoreError::NoResponse)?
            .map_err(StoreError::Rejected)
    }

    /// Acquire the lock for an owner-side critical section
    ///
    /// The guard releases on drop. Nothing may be sent on any channel while
    /// it is alive.
    pub fn lock(&self) -> StoreGuard<'_, T> {
        StoreGuard {
            guard: self.lock_value(),
        }
    }

    /// Hand out the owner's set-request receiver (once)
    pub fn take_set_requests(&self) -> StoreResult<SetRequests<T>> {
        take_once(&self.shared.set_rx, "set request").map(SetRequests::new)
    }

    /// Hand out the notify stream's receive half (once)
    ///
    /// Something must keep draining it; usually a fanout.
    pub fn take_notifications(&self) -> StoreResult<mpsc::Receiver<T>> {
        take_once(&self.shared.notify_rx, "notify")
    }

    /// Send-only handle for the notify stream
    pub fn notifier(&self) -> Notifier<T> {
        Notifier::new(self.shared.notify_tx.clone())
    }

    fn lock_value(&self) -> MutexGuard<'_, T> {
        self.shared.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn take_once<R>(slot: &Mutex<Option<R>>, name: &'static str) -> StoreResult<R> {
    slot.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
        .ok_or(StoreError::ReceiverTaken(name))
}

/// Scoped lock on a store's value
///
/// `get` and `set` are the unsynchronized accessors: they exist only on the
/// guard, so they can only run while the lock is held.
pub struct StoreGuard<'a, T> {
    guard: MutexGuard<'a, T>,
}

impl<T> StoreGuard<'_, T> {
    /// Copy of the value under the held lock
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.guard.clone()
    }

    /// Replace the value under the held lock
    pub fn set(&mut self, value: T) {
        *self.guard = value;
    }
}

impl<T> Deref for StoreGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for StoreGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

/// Lock two stores for one atomic section
///
/// Locks are taken in argument order and released in the same order when the
/// tuple drops. Every call site locking the same pair must pass them in the
/// same order.
pub fn lock_both<'a, A, B>(first: &'a Store<A>, second: &'a Store<B>) -> (StoreGuard<'a, A>, StoreGuard<'a, B>) {
    let first = first.lock();
    let second = second.lock();
    (first, second)
}

/// Read-only view of a store
pub trait DataGetter<T>: Send + Sync {
    fn get_data(&self) -> T;
}

/// Write-only view of a store
#[async_trait]
pub trait DataSetter<T: Send + 'static>: Send + Sync {
    async fn set_data(&self, value: T) -> StoreResult<()>;
}

/// Read/write view for producer tasks
pub trait DataGetSet<T: Send + 'static>: DataGetter<T> + DataSetter<T> {}

impl<T: Send + 'static, S: DataGetter<T> + DataSetter<T>> DataGetSet<T> for S {}

impl<T: Clone + Send> DataGetter<T> for Store<T> {
    fn get_data(&self) -> T {
        Store::get_data(self)
    }
}

#[async_trait]
impl<T: Send + 'static> DataSetter<T> for Store<T> {
    async fn set_data(&self, value: T) -> StoreResult<()> {
        Store::set_data(self, value).await
    }
}
