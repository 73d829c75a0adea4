use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::GpioError;

/// Pin numbering mode. `Board` counts physical header pins, `Bcm` uses the
/// SoC line numbers directly. `Unknown` exists only so that callers porting
/// from the legacy API can pass it and get the legacy rejection.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    Board,
    Bcm,
    Unknown,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    In,
    Out,
}

/// Pull resistor setting, inputs only.
#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Pull {
    #[default]
    Off,
    Up,
    Down,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Edge {
    Rising,
    Falling,
    Both,
}

impl Edge {
    /// Whether an observed transition qualifies for this requested edge.
    pub fn matches(self, observed: Edge) -> bool {
        match self {
            Edge::Rising => observed == Edge::Rising,
            Edge::Falling => observed == Edge::Falling,
            Edge::Both => matches!(observed, Edge::Rising | Edge::Falling),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

impl From<u8> for Level {
    fn from(value: u8) -> Self {
        if value == 0 { Level::Low } else { Level::High }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> Self {
        level.is_high()
    }
}

/// Which gpiochip device the hardware backend opens, and the consumer label
/// it attaches to its line requests.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChipConfig {
    pub chip: String,
    pub consumer: String,
}

impl Default for ChipConfig {
    fn default() -> Self {
        Self {
            chip: "/dev/gpiochip0".to_string(),
            consumer: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

impl ChipConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, GpioError> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| GpioError::Config(format!("Failed to read config: {e}")))?;
        serde_json::from_str(&contents)
            .map_err(|e| GpioError::Config(format!("Invalid config json: {e}")))
    }
}
