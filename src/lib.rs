//! GPIO channel control layer in the style of the classic RPi.GPIO API:
//! pin-numbering modes, channel validation, line setup and I/O, and
//! edge-triggered event detection with per-channel background watchers.

mod args;
pub mod backend;
mod config;
mod error;
mod events;
mod gpio;
mod pins;
mod state;

pub use args::{Channels, Levels};
pub use backend::{GpioBackend, LineHandle, LineRequest, MockGpioBackend};
pub use config::{ChipConfig, Direction, Edge, Level, Mode, Pull};
pub use error::GpioError;
pub use events::Callback;
pub use gpio::Gpio;
pub use state::{LineInfo, StateSnapshot, WatcherInfo};

#[cfg(feature = "hardware-gpio")]
pub use backend::LibgpiodBackend;
