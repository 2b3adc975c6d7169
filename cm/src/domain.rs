//! Car telemetry values held in the stores

/// Latest readings from the car
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CarData {
    pub speed: f64,
    pub location: f64,
}

/// Link state between the monitor and the car
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CarStatus {
    pub connected: bool,
}
