use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use libgpiod::{chip::Chip, line, line::EventClock, request};
use parking_lot::FairMutex;

use crate::backend::{GpioBackend, LineHandle, LineRequest};
use crate::config::{ChipConfig, Direction, Edge, Level, Pull};
use crate::error::GpioError;

const EVENT_BUFFER_CAPACITY: usize = 64;

/// Backend over the Linux GPIO character device. Each acquisition opens the
/// configured chip and requests a single line.
pub struct LibgpiodBackend {
    config: ChipConfig,
}

impl LibgpiodBackend {
    pub fn new() -> Self {
        Self {
            config: ChipConfig::default(),
        }
    }

    pub fn with_config(config: ChipConfig) -> Self {
        Self { config }
    }

    fn make_line_settings(request: &LineRequest) -> Result<line::Settings, GpioError> {
        let mut settings =
            line::Settings::new().map_err(|e| GpioError::Gpio(format!("libgpiod settings: {e}")))?;

        match request.direction {
            Direction::Out => {
                settings
                    .set_direction(line::Direction::Output)
                    .map_err(|e| GpioError::Gpio(format!("set direction: {e}")))?;
                settings
                    .set_drive(line::Drive::PushPull)
                    .map_err(|e| GpioError::Gpio(format!("set drive: {e}")))?;
                if let Some(initial) = request.initial {
                    settings
                        .set_output_value(level_to_value(initial))
                        .map_err(|e| GpioError::Gpio(format!("set output value: {e}")))?;
                }
            }
            Direction::In => {
                settings
                    .set_direction(line::Direction::Input)
                    .map_err(|e| GpioError::Gpio(format!("set direction: {e}")))?;
                settings
                    .set_bias(match request.pull {
                        Pull::Off => None,
                        Pull::Up => Some(line::Bias::PullUp),
                        Pull::Down => Some(line::Bias::PullDown),
                    })
                    .map_err(|e| GpioError::Gpio(format!("set bias: {e}")))?;
                // inputs are requested with both-edge detection so wait_edge
                // can observe events; debounce is applied by the event
                // engine, not the kernel
                settings
                    .set_edge_detection(Some(line::Edge::Both))
                    .map_err(|e| GpioError::Gpio(format!("set edge detection: {e}")))?;
                settings
                    .set_event_clock(EventClock::Realtime)
                    .map_err(|e| GpioError::Gpio(format!("set event clock: {e}")))?;
            }
        }

        Ok(settings)
    }

    fn make_line_config(
        offset: u32,
        settings: line::Settings,
    ) -> Result<line::Config, GpioError> {
        let mut config =
            line::Config::new().map_err(|e| GpioError::Gpio(format!("line config: {e}")))?;
        config
            .add_line_settings(&[offset], settings)
            .map_err(|e| GpioError::Gpio(format!("line config add settings: {e}")))?;
        Ok(config)
    }
}

impl Default for LibgpiodBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioBackend for LibgpiodBackend {
    fn acquire(
        &self,
        line: u32,
        request: &LineRequest,
    ) -> Result<Arc<dyn LineHandle>, GpioError> {
        let settings = Self::make_line_settings(request)?;
        let line_cfg = Self::make_line_config(line, settings)?;

        let path = PathBuf::from(&self.config.chip);
        let chip = Chip::open(&path)
            .map_err(|e| GpioError::Gpio(format!("open chip {}: {e}", self.config.chip)))?;
        let mut req_cfg =
            request::Config::new().map_err(|e| GpioError::Gpio(format!("request config: {e}")))?;
        req_cfg
            .set_consumer(&self.config.consumer)
            .map_err(|e| GpioError::Gpio(format!("request consumer: {e}")))?;
        let req = chip
            .request_lines(Some(&req_cfg), &line_cfg)
            .map_err(|e| GpioError::Gpio(format!("request lines: {e}")))?;

        Ok(Arc::new(LibgpiodHandle {
            offset: line,
            request: FairMutex::new(req),
        }))
    }
}

struct LibgpiodHandle {
    offset: u32,
    request: FairMutex<request::Request>,
}

impl LineHandle for LibgpiodHandle {
    fn read(&self) -> Result<Level, GpioError> {
        let value = self
            .request
            .lock()
            .value(self.offset)
            .map_err(|e| GpioError::Gpio(format!("get value: {e}")))?;
        Ok(match value {
            line::Value::InActive => Level::Low,
            line::Value::Active => Level::High,
        })
    }

    fn write(&self, level: Level) -> Result<(), GpioError> {
        self.request
            .lock()
            .set_value(self.offset, level_to_value(level))
            .map_err(|e| GpioError::Gpio(format!("set value: {e}")))?;
        Ok(())
    }

    fn wait_edge(&self, edge: Edge, timeout: Duration) -> Result<bool, GpioError> {
        let request = self.request.lock();
        let has_event = request
            .wait_edge_events(Some(timeout))
            .map_err(|e| GpioError::Gpio(format!("wait edge events: {e}")))?;
        if !has_event {
            return Ok(false);
        }

        let mut buffer = request::Buffer::new(EVENT_BUFFER_CAPACITY)
            .map_err(|e| GpioError::Gpio(format!("event buffer: {e}")))?;
        let events = request
            .read_edge_events(&mut buffer)
            .map_err(|e| GpioError::Gpio(format!("read edge events: {e}")))?;

        let mut matched = false;
        for event in events {
            let Ok(event) = event else { continue };
            let observed = match event.event_type() {
                Ok(line::EdgeKind::Rising) => Edge::Rising,
                Ok(line::EdgeKind::Falling) => Edge::Falling,
                Err(_) => continue,
            };
            if edge.matches(observed) {
                matched = true;
            }
        }
        Ok(matched)
    }
}

fn level_to_value(level: Level) -> line::Value {
    match level {
        Level::Low => line::Value::InActive,
        Level::High => line::Value::Active,
    }
}
