//! Producer and console consumer tasks

use std::io::Write;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use valuestore::DataGetSet;

use crate::domain::CarData;

/// Bump the car's speed by one every `period`
///
/// Failed requests are logged and the next tick tries again.
pub async fn run_speed_increaser<S>(store: S, period: Duration, cancel: CancellationToken)
where
    S: DataGetSet<CarData>,
{
    debug!(task = "speed_increaser", ?period, "run_speed_increaser: called");
    let mut ticker = interval_at(Instant::now() + period, period);
    // A set blocked behind a disconnected owner must not turn into a burst
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(task = "speed_increaser", "got done signal, exit");
                return;
            }
            _ = ticker.tick() => {}
        }

        let speed = store.get_data().speed;
        let request = CarData {
            speed: speed + 1.0,
            ..CarData::default()
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(task = "speed_increaser", "got done signal while waiting for owner, exit");
                return;
            }
            result = store.set_data(request) => match result {
                Ok(()) => debug!(task = "speed_increaser", speed = request.speed, "speed increased"),
                Err(e) => warn!(task = "speed_increaser", error = %e, "failed to increase speed"),
            },
        }
    }
}

/// Format one value the way the console shows it
pub fn format_line(data: &CarData) -> String {
    format!("Speed: {:.6}, Location: {:.6}", data.speed, data.location)
}

/// Print every received value to `out`
pub async fn run_printer<W: Write + Send>(mut rx: mpsc::Receiver<CarData>, mut out: W, cancel: CancellationToken) {
    debug!(task = "printer", "run_printer: called");
    loop {
        let data = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(task = "printer", "got done signal, exit");
                return;
            }
            data = rx.recv() => match data {
                Some(data) => data,
                None => {
                    debug!(task = "printer", "channel closed, exit");
                    return;
                }
            },
        };
        if let Err(e) = writeln!(out, "{}", format_line(&data)) {
            warn!(task = "printer", error = %e, "failed to print");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use valuestore::Store;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_format_line() {
        let line = format_line(&CarData {
            speed: 2.0,
            location: 4.0,
        });
        assert_eq!(line, "Speed: 2.000000, Location: 4.000000");
    }

    #[tokio::test]
    async fn test_printer_writes_each_value() {
        let (tx, rx) = mpsc::channel(1);
        let buf = SharedBuf::default();
        let handle = tokio::spawn(run_printer(rx, buf.clone(), CancellationToken::new()));

        tx.send(CarData { speed: 1.0, location: 2.0 }).await.unwrap();
        tx.send(CarData { speed: 2.0, location: 4.0 }).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(
            buf.text(),
            "Speed: 1.000000, Location: 2.000000\nSpeed: 2.000000, Location: 4.000000\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_increaser_requests_next_speed() {
        let store = Store::new(CarData { speed: 4.0, location: 8.0 });
        let mut requests = store.take_set_requests().unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_speed_increaser(
            store.clone(),
            Duration::from_secs(5),
            cancel.clone(),
        ));

        let begin = Instant::now();
        let request = requests.recv().await.unwrap();
        assert!(begin.elapsed() >= Duration::from_secs(5));
        assert_eq!(request.value().speed, 5.0);
        request.respond_ok();

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_increaser_survives_rejection() {
        let store = Store::new(CarData::default());
        let mut requests = store.take_set_requests().unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_speed_increaser(
            store.clone(),
            Duration::from_secs(1),
            cancel.clone(),
        ));

        let first = requests.recv().await.unwrap();
        first.respond(Err(std::io::Error::other("no link")));
        let second = requests.recv().await.unwrap();
        assert_eq!(second.value().speed, 1.0);
        second.respond_ok();

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_increaser_cancel_while_waiting() {
        let store = Store::new(CarData::default());
        let _requests = store.take_set_requests().unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_speed_increaser(
            store.clone(),
            Duration::from_secs(1),
            cancel.clone(),
        ));

        // The request is queued but never answered
        tokio::time::sleep(Duration::from_secs(3)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("increaser exits")
            .unwrap();
    }
}
