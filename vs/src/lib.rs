//! ValueStore - share one mutable value across concurrent tasks
//!
//! A [`Store`] holds a value of any `Clone` type behind a mutex. Exactly one
//! task, the *owner*, mutates it; everybody else either reads snapshots or
//! asks the owner for a change and waits for the answer. Every committed
//! value is published on the store's notify stream, and a [`fanout`] task
//! replicates that stream to any number of consumers.
//!
//! # Architecture
//!
//! ```text
//!   producers ──set_data()──▶ set-request channel ──▶ ┌───────────┐
//!                 ◀── one-shot reply ──────────────── │   owner   │◀── ticker
//!   readers ───get_data()──▶ [ Mutex<T> ] ◀──guard─── │   loop    │◀── cancel
//!                                                     └─────┬─────┘
//!                                       notify (after unlock)│
//!                                                            ▼
//!                                                   ┌──────────────┐
//!                                                   │    fanout    │──▶ consumer 1
//!                                                   │ (in order)   │──▶ consumer 2
//!                                                   └──────────────┘──▶ ...
//! ```
//!
//! # Owner rules
//!
//! - Only the owner calls [`StoreGuard::set`].
//! - Two stores mutated together are locked with [`lock_both`], always in the
//!   same order.
//! - Nothing is sent on any channel while a guard is alive. The guard is
//!   `!Send`, so a spawned owner that holds it across an `.await` does not
//!   compile.
//! - Every notify stream needs a live reader (usually a fanout) or the
//!   owner's first publish blocks.
//! - Blocking waits are raced against a shared
//!   [`CancellationToken`](tokio_util::sync::CancellationToken).
//!
//! # Example
//!
//! ```ignore
//! use valuestore::{Store, spawn_fanout};
//!
//! let store = Store::new(0u64);
//! let mut requests = store.take_set_requests()?;
//! let notifier = store.notifier();
//! spawn_fanout(cancel.clone(), store.take_notifications()?, vec![printer_tx]);
//!
//! // owner
//! while let Some(req) = requests.recv().await {
//!     let committed = {
//!         let mut guard = store.lock();
//!         guard.set(*req.value());
//!         guard.get()
//!     };
//!     req.respond_ok();
//!     notifier.publish(committed).await?;
//! }
//! ```

mod error;
mod fanout;
mod messages;
mod store;

pub use error::{BoxError, StoreError, StoreResult};
pub use fanout::{fanout, spawn_fanout};
pub use messages::{Notifier, SetRequest, SetRequests, SetResponse};
pub use store::{DEFAULT_CHANNEL_CAPACITY, DataGetSet, DataGetter, DataSetter, Store, StoreGuard, lock_both};
