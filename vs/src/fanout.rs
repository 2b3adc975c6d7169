//! Fanout - replicate one notify stream to many consumers
//!
//! There is no buffering beyond the channels themselves: the fanout holds one
//! value at a time and does not receive the next one until every output has
//! accepted the current one. A slow consumer therefore stalls every other
//! consumer and, through the notify channel, the owner. All consumers must
//! keep pace, or be given larger channels by whoever creates them.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Forward every value from `input` to each of `outputs`, in order
///
/// Runs until `cancel` fires or `input` closes. With no outputs it simply
/// drains `input`. Outputs whose receivers are gone are dropped after the
/// value in flight.
pub async fn fanout<T: Clone>(cancel: CancellationToken, mut input: mpsc::Receiver<T>, mut outputs: Vec<mpsc::Sender<T>>) {
    debug!(outputs = outputs.len(), "fanout: started");

    loop {
        let value = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("fanout: cancelled");
                return;
            }
            received = input.recv() => match received {
                Some(value) => value,
                None => {
                    debug!("fanout: input closed");
                    return;
                }
            },
        };

        let mut closed = 0;
        for output in &outputs {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("fanout: cancelled mid-delivery");
                    return;
                }
                sent = output.send(value.clone()) => {
                    if sent.is_err() {
                        closed += 1;
                    }
                }
            }
        }

        if closed > 0 {
            outputs.retain(|output| !output.is_closed());
            warn!(closed, remaining = outputs.len(), "fanout: dropped closed outputs");
        }
    }
}

/// Spawn [`fanout`] as a background task
pub fn spawn_fanout<T>(cancel: CancellationToken, input: mpsc::Receiver<T>, outputs: Vec<mpsc::Sender<T>>) -> JoinHandle<()>
where
    T: Clone + Send + 'static,
{
    tokio::spawn(fanout(cancel, input, outputs))
}
