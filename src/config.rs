//! Engine configuration.
//!
//! Every field has a default, so a configuration file only needs to name the
//! values it changes:
//!
//! ```json
//! { "tick_ms": 20, "line_threshold": 35 }
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::block_types::SensorPort;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Poll/suspension tick in milliseconds.
    pub tick_ms: u64,
    /// A collaborator call slower than this is a fatal failure.
    pub io_timeout_ms: u64,
    /// Transient sink failures retried on later ticks before becoming fatal.
    pub max_send_retries: u32,
    pub turn_duty: f64,
    pub home_duty: f64,
    pub home_ramp_ms: u64,
    /// Sensor port watched by the start-line blocks.
    pub line_port: u8,
    /// The start line is seen while the reading is below this value.
    pub line_threshold: f64,
    /// Sensor port sampled by the PID and smoothing blocks.
    pub primary_port: u8,
    pub pid_setpoint: f64,
    pub pid_base_duty: f64,
    pub calibration_timeout_ms: u64,
    pub initial_state: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            tick_ms: 25,
            io_timeout_ms: 500,
            max_send_retries: 3,
            turn_duty: 70.0,
            home_duty: 60.0,
            home_ramp_ms: 1000,
            line_port: 1,
            line_threshold: 40.0,
            primary_port: 1,
            pid_setpoint: 128.0,
            pid_base_duty: 50.0,
            calibration_timeout_ms: 10_000,
            initial_state: "IDLE".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load a JSON configuration file. Missing fields keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tick_ms == 0 {
            anyhow::bail!("tick_ms must be positive");
        }
        if self.io_timeout_ms == 0 {
            anyhow::bail!("io_timeout_ms must be positive");
        }
        for (name, port) in [("line_port", self.line_port), ("primary_port", self.primary_port)] {
            if SensorPort::new(port).is_none() {
                anyhow::bail!("{} must be between 1 and 4, got {}", name, port);
            }
        }
        if self.initial_state.trim().is_empty() {
            anyhow::bail!("initial_state must not be empty");
        }
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn home_ramp(&self) -> Duration {
        Duration::from_millis(self.home_ramp_ms)
    }

    pub fn calibration_timeout(&self) -> Duration {
        Duration::from_millis(self.calibration_timeout_ms)
    }

    pub fn line_port(&self) -> SensorPort {
        SensorPort::new(self.line_port).unwrap_or(SensorPort::MIN)
    }

    pub fn primary_port(&self) -> SensorPort {
        SensorPort::new(self.primary_port).unwrap_or(SensorPort::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let c = EngineConfig::default();
        assert_eq!(c.tick(), Duration::from_millis(25));
        assert_eq!(c.initial_state, "IDLE");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{ "tick_ms": 20, "initial_state": "SEARCH" }}"#).unwrap();
        let c = EngineConfig::load(f.path()).unwrap();
        assert_eq!(c.tick_ms, 20);
        assert_eq!(c.initial_state, "SEARCH");
        assert_eq!(c.io_timeout_ms, 500);
    }

    #[test]
    fn test_rejects_bad_port() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{ "line_port": 7 }}"#).unwrap();
        assert!(EngineConfig::load(f.path()).is_err());
    }
}
