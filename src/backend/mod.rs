use std::sync::Arc;
use std::time::Duration;

use crate::config::{Direction, Edge, Level, Pull};
use crate::error::GpioError;

#[cfg(feature = "hardware-gpio")]
pub mod libgpiod;
pub mod mock;

#[cfg(feature = "hardware-gpio")]
pub use libgpiod::LibgpiodBackend;
pub use mock::MockGpioBackend;

/// Parameters for a line acquisition. `initial` applies to outputs only.
#[derive(Debug, Clone, Copy)]
pub struct LineRequest {
    pub direction: Direction,
    pub pull: Pull,
    pub initial: Option<Level>,
}

/// An acquired hardware line. The channel layer owns the handle exclusively;
/// dropping the last clone releases the line, so there is exactly one
/// release per acquire.
pub trait LineHandle: Send + Sync {
    fn read(&self) -> Result<Level, GpioError>;
    fn write(&self, level: Level) -> Result<(), GpioError>;
    /// Blocks up to `timeout` for a transition matching `edge`, returning
    /// whether one occurred.
    fn wait_edge(&self, edge: Edge, timeout: Duration) -> Result<bool, GpioError>;
}

pub trait GpioBackend: Send + Sync + 'static {
    fn acquire(&self, line: u32, request: &LineRequest)
    -> Result<Arc<dyn LineHandle>, GpioError>;
}
