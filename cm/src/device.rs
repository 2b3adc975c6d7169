//! Car device capability and a simulated implementation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::debug;

use crate::domain::{CarData, CarStatus};

/// Errors reported by a car device
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Anything the owner loop can read telemetry from and send speed to
pub trait CarDevice: Send + 'static {
    fn is_connected(&self) -> bool;
    fn speed(&self) -> f64;
    fn set_speed(&mut self, speed: f64) -> Result<(), DeviceError>;
    fn location(&self) -> f64;

    /// Snapshot of the readings
    fn read_data(&self) -> CarData {
        CarData {
            speed: self.speed(),
            location: self.location(),
        }
    }

    /// Snapshot of the link state
    fn read_status(&self) -> CarStatus {
        CarStatus {
            connected: self.is_connected(),
        }
    }
}

/// Shared switch to cut or restore a simulated car's link
#[derive(Debug, Clone)]
pub struct LinkSwitch {
    up: Arc<AtomicBool>,
}

impl LinkSwitch {
    fn new() -> Self {
        Self {
            up: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn cut(&self) {
        debug!("LinkSwitch::cut: called");
        self.up.store(false, Ordering::SeqCst);
    }

    pub fn restore(&self) {
        debug!("LinkSwitch::restore: called");
        self.up.store(true, Ordering::SeqCst);
    }

    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::SeqCst)
    }
}

/// In-memory car; location is always twice the speed
#[derive(Debug)]
pub struct SimulatedCar {
    speed: f64,
    link: LinkSwitch,
}

impl SimulatedCar {
    pub fn new() -> Self {
        Self {
            speed: 0.0,
            link: LinkSwitch::new(),
        }
    }

    /// Handle for injecting link failures
    pub fn link(&self) -> LinkSwitch {
        self.link.clone()
    }
}

impl Default for SimulatedCar {
    fn default() -> Self {
        Self::new()
    }
}

impl CarDevice for SimulatedCar {
    fn is_connected(&self) -> bool {
        self.link.is_up()
    }

    fn speed(&self) -> f64 {
        self.speed
    }

    fn set_speed(&mut self, speed: f64) -> Result<(), DeviceError> {
        if !self.link.is_up() {
            return Err(DeviceError::Connection("link down".to_string()));
        }
        self.speed = speed;
        Ok(())
    }

    fn location(&self) -> f64 {
        self.speed * 2.0
    }
}
