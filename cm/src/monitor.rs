//! CarMonitor - wires the stores, owner loop, fanouts and consumers together

use std::time::Duration;

use eyre::{Result, eyre};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use valuestore::{Store, spawn_fanout};

use crate::config::Config;
use crate::device::CarDevice;
use crate::domain::{CarData, CarStatus};
use crate::owner::{OwnerLoop, OwnerTiming};
use crate::sink::FileSink;
use crate::tasks::{run_printer, run_speed_increaser};

/// Running set of car monitor tasks
///
/// Every task observes the same cancellation token; cancel it, then call
/// [`CarMonitor::join`].
pub struct CarMonitor {
    data: Store<CarData>,
    status: Store<CarStatus>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    config: Config,
}

impl CarMonitor {
    /// Start all tasks
    ///
    /// Opening the output file is the only thing that can fail here.
    pub fn start<D: CarDevice>(config: &Config, device: D, cancel: CancellationToken) -> Result<Self> {
        debug!(?config, "CarMonitor::start: called");
        let buffer = config.output.notify_buffer;

        let sink = FileSink::open(&config.output.path)?;
        info!(path = %sink.path().display(), "writing telemetry");

        let data = Store::with_notify_capacity(CarData::default(), buffer);
        let status = Store::new(CarStatus::default());

        let timing = OwnerTiming {
            refresh: config.timing.refresh(),
            reconnect: config.timing.reconnect(),
        };
        let owner = OwnerLoop::new(device, data.clone(), status.clone(), timing)?;

        let mut tasks = Vec::new();
        let mut data_outputs = Vec::new();

        if config.output.console {
            let (tx, rx) = mpsc::channel(buffer.max(1));
            data_outputs.push(tx);
            tasks.push((
                "printer",
                tokio::spawn(run_printer(rx, std::io::stdout(), cancel.clone())),
            ));
        }

        let (sink_tx, sink_rx) = mpsc::channel(buffer.max(1));
        data_outputs.push(sink_tx);
        tasks.push(("file_sink", tokio::spawn(sink.run(sink_rx, cancel.clone()))));

        tasks.push((
            "data_fanout",
            spawn_fanout(cancel.clone(), data.take_notifications()?, data_outputs),
        ));
        // Nobody consumes status changes yet, but the stream must be drained
        tasks.push((
            "status_fanout",
            spawn_fanout(cancel.clone(), status.take_notifications()?, Vec::new()),
        ));

        tasks.push(("owner", tokio::spawn(owner.run(cancel.clone()))));
        tasks.push((
            "speed_increaser",
            tokio::spawn(run_speed_increaser(
                data.clone(),
                config.timing.increase(),
                cancel.clone(),
            )),
        ));

        info!(tasks = tasks.len(), "CarMonitor started");
        Ok(Self {
            data,
            status,
            tasks,
            config: config.clone(),
        })
    }

    /// Data store handle for readers and producers
    pub fn data(&self) -> &Store<CarData> {
        &self.data
    }

    /// Status store handle for readers
    pub fn status(&self) -> &Store<CarStatus> {
        &self.status
    }

    /// Wait for every task to exit, bounded by the shutdown timeout
    pub async fn join(self) -> Result<()> {
        let timeout = self.config.timing.shutdown_timeout();
        debug!(?timeout, "CarMonitor::join: called");
        join_tasks(self.tasks, timeout).await?;
        info!("CarMonitor stopped");
        Ok(())
    }
}

/// Join every task against one shared deadline
///
/// Tasks still running at the deadline are aborted. A panicked task does not
/// stop the others from being joined; the first panic is reported.
async fn join_tasks(tasks: Vec<(&'static str, JoinHandle<()>)>, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let mut first_panic = None;
    let mut stuck = Vec::new();

    for (name, mut handle) in tasks {
        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(())) => debug!(task = name, "task finished"),
            Ok(Err(e)) => {
                error!(task = name, error = %e, "task failed");
                if first_panic.is_none() {
                    first_panic = Some(eyre::Report::new(e).wrap_err(format!("Task {} panicked", name)));
                }
            }
            Err(_) => {
                warn!(task = name, "task did not stop in time, aborting");
                handle.abort();
                stuck.push((name, handle));
            }
        }
    }

    // Aborted tasks drop their store handles and files before we return
    for (name, handle) in &mut stuck {
        match handle.await {
            Err(e) if !e.is_cancelled() => error!(task = *name, error = %e, "task failed while aborting"),
            _ => debug!(task = *name, "task aborted"),
        }
    }

    if let Some(e) = first_panic {
        return Err(e);
    }
    if !stuck.is_empty() {
        let names: Vec<_> = stuck.iter().map(|(name, _)| *name).collect();
        return Err(eyre!("Tasks did not stop within {:?}: {}", timeout, names.join(", ")));
    }
    Ok(())
}
