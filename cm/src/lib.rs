//! CarMonitor - simulated car telemetry on top of `valuestore`
//!
//! One owner task talks to the car and is the only writer of two stores: the
//! car's readings and its link status. A producer task raises the speed on a
//! timer through the set-request protocol, and every committed reading is
//! fanned out to the console and an append-only log file.
//!
//! # Modules
//!
//! - [`device`] - car capability and the simulated car
//! - [`owner`] - the owner loop
//! - [`tasks`] - speed producer and console printer
//! - [`sink`] - durable file sink
//! - [`monitor`] - wiring and shutdown
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod device;
pub mod domain;
pub mod monitor;
pub mod owner;
pub mod sink;
pub mod tasks;

pub use config::{Config, OutputConfig, TimingConfig};
pub use device::{CarDevice, DeviceError, LinkSwitch, SimulatedCar};
pub use domain::{CarData, CarStatus};
pub use monitor::CarMonitor;
pub use owner::{OwnerLoop, OwnerTiming};
pub use sink::FileSink;
pub use tasks::{format_line, run_printer, run_speed_increaser};
