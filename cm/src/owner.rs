//! Owner loop - the only writer of the car stores
//!
//! Waits on cancellation, set requests and the refresh ticker. Mutations happen
//! with both store locks held (data first, then status); every send happens
//! after they are released.
//!
//! A failed speed change is not rolled back: the data store still gets the
//! fresh device reading and the status store flips to disconnected. Both
//! commits are published.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use valuestore::{Notifier, SetRequest, SetRequests, Store, StoreResult, lock_both};

use crate::device::CarDevice;
use crate::domain::{CarData, CarStatus};

const TASK: &str = "owner";

enum Event {
    Cancelled,
    Request(Option<SetRequest<CarData>>),
    Tick,
}

/// Periods driving the owner loop
#[derive(Debug, Clone, Copy)]
pub struct OwnerTiming {
    pub refresh: Duration,
    pub reconnect: Duration,
}

/// Owns the device and both stores' write side
pub struct OwnerLoop<D: CarDevice> {
    device: D,
    data: Store<CarData>,
    status: Store<CarStatus>,
    requests: SetRequests<CarData>,
    data_notifier: Notifier<CarData>,
    status_notifier: Notifier<CarStatus>,
    timing: OwnerTiming,
}

impl<D: CarDevice> OwnerLoop<D> {
    /// Claim the write side of both stores
    ///
    /// Fails if another owner already took the data store's set requests.
    pub fn new(device: D, data: Store<CarData>, status: Store<CarStatus>, timing: OwnerTiming) -> StoreResult<Self> {
        let requests = data.take_set_requests()?;
        Ok(Self {
            device,
            data_notifier: data.notifier(),
            status_notifier: status.notifier(),
            data,
            status,
            requests,
            timing,
        })
    }

    /// Run until cancelled
    pub async fn run(mut self, cancel: CancellationToken) {
        debug!(task = TASK, ?self.timing, "run: called");
        let mut ticker = interval_at(Instant::now() + self.timing.refresh, self.timing.refresh);
        // Ticks missed while disconnected are dropped, not replayed
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if !self.status.get_data().connected {
                if !self.wait_for_link(&cancel).await {
                    return;
                }
                continue;
            }

            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => Event::Cancelled,
                request = self.requests.recv() => Event::Request(request),
                _ = ticker.tick() => Event::Tick,
            };

            let keep_running = match event {
                Event::Cancelled => {
                    info!(task = TASK, "got done signal, exit");
                    false
                }
                Event::Request(None) => {
                    info!(task = TASK, "set request channel closed, exit");
                    false
                }
                Event::Request(Some(request)) => self.apply(request, &cancel).await,
                Event::Tick => self.refresh(&cancel).await,
            };
            if !keep_running {
                return;
            }
        }
    }

    /// Re-read the link state while disconnected
    ///
    /// Returns false when cancelled.
    async fn wait_for_link(&mut self, cancel: &CancellationToken) -> bool {
        let status = {
            let mut guard = self.status.lock();
            guard.set(self.device.read_status());
            guard.get()
        };
        if !publish(&self.status_notifier, status, cancel).await {
            return false;
        }
        if status.connected {
            info!(task = TASK, "car connected");
            return true;
        }

        error!(task = TASK, "car status is disconnected, wait until connected");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(task = TASK, "got done signal, exit");
                false
            }
            _ = tokio::time::sleep(self.timing.reconnect) => true,
        }
    }

    async fn apply(&mut self, request: SetRequest<CarData>, cancel: &CancellationToken) -> bool {
        let (data, status, result) = {
            let (mut data_guard, mut status_guard) = lock_both(&self.data, &self.status);
            debug!(task = TASK, "locked data store, status store");
            let result = self.device.set_speed(request.value().speed);
            if result.is_err() {
                status_guard.set(CarStatus { connected: false });
            }
            data_guard.set(self.device.read_data());
            (data_guard.get(), status_guard.get(), result)
        };
        debug!(task = TASK, "unlocked data store, status store");

        let failed = match &result {
            Ok(()) => false,
            Err(e) => {
                warn!(task = TASK, error = %e, "set speed failed");
                true
            }
        };
        request.respond(result);

        if !publish(&self.data_notifier, data, cancel).await {
            return false;
        }
        if failed {
            return publish(&self.status_notifier, status, cancel).await;
        }
        true
    }

    async fn refresh(&mut self, cancel: &CancellationToken) -> bool {
        let data = {
            let (mut data_guard, _status_guard) = lock_both(&self.data, &self.status);
            data_guard.set(self.device.read_data());
            data_guard.get()
        };
        debug!(task = TASK, speed = data.speed, "refreshed from device");
        publish(&self.data_notifier, data, cancel).await
    }
}

/// Publish unless cancelled first; returns false when cancelled
async fn publish<T>(notifier: &Notifier<T>, value: T, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!(task = TASK, "got done signal while publishing, exit");
            false
        }
        sent = notifier.publish(value) => {
            if let Err(e) = sent {
                warn!(task = TASK, error = %e, "notify stream has no reader");
            }
            true
        }
    }
}
