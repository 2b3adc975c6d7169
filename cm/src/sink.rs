//! File sink - appends every committed value to a log file
//!
//! The sink subscribes to one fanout output and writes a timestamped line per
//! value. Write failures are logged and dropped; they never push back into
//! the notify pipeline.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use eyre::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::domain::CarData;

/// Append-only telemetry writer
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    /// Open (or create) the log file in append mode
    pub fn open(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!(?path, "FileSink::open: called");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context(format!("Failed to open {}", path.display()))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line for `data` stamped with `at`
    pub fn write_data_at(&mut self, data: &CarData, at: DateTime<Local>) -> std::io::Result<()> {
        writeln!(
            self.writer,
            "Date: {}, Speed: {:.6}, Location: {:.6}",
            at.format("%Y-%m-%d %H:%M:%S"),
            data.speed,
            data.location
        )?;
        self.writer.flush()
    }

    /// Append one line for `data` stamped with the current local time
    pub fn write_data(&mut self, data: &CarData) -> std::io::Result<()> {
        self.write_data_at(data, Local::now())
    }

    /// Write every received value until cancelled or the channel closes
    pub async fn run(mut self, mut rx: mpsc::Receiver<CarData>, cancel: CancellationToken) {
        debug!(path = ?self.path, "FileSink::run: starting");
        loop {
            let data = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(task = "file_sink", "got done signal, exit");
                    break;
                }
                data = rx.recv() => match data {
                    Some(data) => data,
                    None => {
                        debug!(task = "file_sink", "channel closed, exit");
                        break;
                    }
                },
            };
            if let Err(e) = self.write_data(&data) {
                error!(task = "file_sink", path = ?self.path, error = %e, "failed to write data");
            }
        }

        if let Err(e) = self.writer.flush() {
            error!(task = "file_sink", error = %e, "failed to flush on shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_write_data_line_format() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("log.txt");
        let mut sink = FileSink::open(&path).unwrap();

        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        sink.write_data_at(&CarData { speed: 1.5, location: 3.0 }, at)
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Date: 2024-03-09 14:05:07, Speed: 1.500000, Location: 3.000000\n"
        );
    }

    #[test]
    fn test_open_appends() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("log.txt");
        fs::write(&path, "earlier\n").unwrap();

        let mut sink = FileSink::open(&path).unwrap();
        sink.write_data(&CarData::default()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.starts_with("earlier\n"));
    }

    #[test]
    fn test_open_missing_directory_fails() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nope").join("log.txt");
        assert!(FileSink::open(path).is_err());
    }

    #[tokio::test]
    async fn test_run_writes_until_closed() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("log.txt");
        let sink = FileSink::open(&path).unwrap();
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(sink.run(rx, CancellationToken::new()));

        for speed in 1..=3 {
            tx.send(CarData {
                speed: speed as f64,
                location: speed as f64 * 2.0,
            })
            .await
            .unwrap();
        }
        drop(tx);
        handle.await.unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].ends_with("Speed: 3.000000, Location: 6.000000"));
    }
}
