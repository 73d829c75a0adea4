use std::sync::Arc;
use std::time::{Duration, Instant};

use log::warn;
use parking_lot::Mutex;

use crate::args::{Channels, Levels};
use crate::backend::{GpioBackend, LineHandle, LineRequest};
use crate::config::{Direction, Edge, Level, Mode, Pull};
use crate::error::GpioError;
use crate::events::{Callback, EVENT_WAIT_SLICE, EventWatcher};
use crate::pins;
use crate::state::{LineConfig, State, StateSnapshot};

/// Channel state manager. One context owns every line and watcher acquired
/// through it; `reset` returns it to the freshly-constructed state.
///
/// Line and watcher entries are guarded by a single store lock, so a setup
/// and a watcher can never race on the same hardware handle. Watcher threads
/// only ever touch the separately-locked latched-event set.
pub struct Gpio<B: GpioBackend> {
    backend: Arc<B>,
    state: Mutex<State>,
}

impl<B: GpioBackend> Gpio<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            state: Mutex::new(State::default()),
        }
    }

    /// The underlying backend, mainly for tests driving a mock.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Sets the numbering mode for this context. Fails once any mode has
    /// been set, until `reset`.
    pub fn set_mode(&self, mode: Mode) -> Result<(), GpioError> {
        if mode == Mode::Unknown {
            return Err(GpioError::InvalidMode);
        }
        let mut state = self.state.lock();
        if state.mode.is_some() {
            return Err(GpioError::ModeAlreadySet);
        }
        state.mode = Some(mode);
        Ok(())
    }

    pub fn mode(&self) -> Option<Mode> {
        self.state.lock().mode
    }

    pub fn set_warnings(&self, on: bool) {
        self.state.lock().warnings = on;
    }

    pub fn warnings(&self) -> bool {
        self.state.lock().warnings
    }

    fn warn_user(state: &mut State, message: String) {
        if state.warnings {
            warn!("{message}");
            state.warning_log.push(message);
        }
    }

    /// Configures one channel or a batch. The whole batch is validated
    /// before any line is acquired; a validation failure configures nothing.
    /// A channel already in use is released, reported with a non-fatal
    /// "already in use" warning and reconfigured.
    pub fn setup(
        &self,
        channels: impl Into<Channels>,
        direction: Direction,
        pull: Pull,
        initial: Option<Levels>,
    ) -> Result<(), GpioError> {
        let channels = channels.into().into_vec()?;

        // whole-batch validation before any line is acquired
        let (lines, initial) = {
            let state = self.state.lock();
            let mut lines = Vec::with_capacity(channels.len());
            for channel in &channels {
                lines.push(pins::resolve(state.mode, *channel)?);
            }
            let initial = match direction {
                Direction::Out => {
                    if pull != Pull::Off {
                        return Err(GpioError::PullOnOutput);
                    }
                    match initial {
                        Some(levels) => levels
                            .for_count(channels.len())?
                            .into_iter()
                            .map(Some)
                            .collect(),
                        None => vec![None; channels.len()],
                    }
                }
                Direction::In => {
                    if initial.is_some() {
                        return Err(GpioError::InitialOnInput);
                    }
                    vec![None; channels.len()]
                }
            };
            (lines, initial)
        };

        for (line, initial) in lines.into_iter().zip(initial) {
            let evicted = {
                let mut state = self.state.lock();
                let prior = state.lines.remove(&line);
                if prior.is_some() {
                    Self::warn_user(
                        &mut state,
                        format!(
                            "Line {line} is already in use, continuing anyway. \
                             Use set_warnings(false) to disable warnings."
                        ),
                    );
                }
                (state.watchers.remove(&line), prior)
            };
            // the watcher join and the release of the old request happen
            // outside the store lock, so an in-flight callback can still
            // call back into the API; the line must be free again before
            // it is re-acquired
            drop(evicted);

            let request = LineRequest {
                direction,
                pull,
                initial,
            };
            let handle = self.backend.acquire(line, &request)?;
            self.state.lock().lines.insert(
                line,
                LineConfig {
                    direction,
                    pull,
                    handle,
                },
            );
        }
        Ok(())
    }

    /// Writes levels to output channels. A scalar value broadcasts over the
    /// batch; a sequence must match the channel count. A channel not
    /// configured as an output is skipped with a warning, never written.
    pub fn output(
        &self,
        channels: impl Into<Channels>,
        values: impl Into<Levels>,
    ) -> Result<(), GpioError> {
        let channels = channels.into().into_vec()?;
        let values = values.into().for_count(channels.len())?;
        let mut state = self.state.lock();

        let mut lines = Vec::with_capacity(channels.len());
        for channel in &channels {
            lines.push(pins::resolve(state.mode, *channel)?);
        }

        // batch fully validated; nothing has been written if any check
        // above failed
        for ((channel, line), value) in channels.iter().zip(lines).zip(values) {
            let writable = state
                .lines
                .get(&line)
                .filter(|cfg| cfg.direction == Direction::Out)
                .map(|cfg| cfg.handle.clone());
            match writable {
                Some(handle) => handle.write(value)?,
                None => Self::warn_user(
                    &mut state,
                    format!("Channel {channel} has not been set up as an OUTPUT"),
                ),
            }
        }
        Ok(())
    }

    /// Reads the current logic level of a single channel. Reading a channel
    /// configured as an output is allowed and returns its driven value.
    pub fn input(&self, channel: u32) -> Result<Level, GpioError> {
        let state = self.state.lock();
        let line = pins::resolve(state.mode, channel)?;
        let cfg = state.lines.get(&line).ok_or(GpioError::NotConfigured)?;
        cfg.handle.read()
    }

    /// Blocks the calling thread until the requested edge occurs, returning
    /// the channel on an edge and `None` when the timeout elapses or the
    /// channel is released by `cleanup`/`reset` while waiting. An
    /// unconfigured channel is transparently acquired as a pull-off input
    /// and stays configured afterwards, so a later `setup` on it warns.
    pub fn wait_for_edge(
        &self,
        channel: u32,
        edge: Edge,
        bouncetime: Option<Duration>,
        timeout: Option<Duration>,
    ) -> Result<Option<u32>, GpioError> {
        if bouncetime.is_some_and(|bt| bt.is_zero()) {
            return Err(GpioError::InvalidBouncetime);
        }
        let (line, handle) = {
            let mut state = self.state.lock();
            let line = pins::resolve(state.mode, channel)?;
            let handle = self.ensure_input(&mut state, line)?;
            (line, handle)
        };

        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            // stop waiting when the line was released under us, so the
            // handle clone does not outlive a reset
            {
                let state = self.state.lock();
                match state.lines.get(&line) {
                    Some(cfg) if Arc::ptr_eq(&cfg.handle, &handle) => {}
                    _ => return Ok(None),
                }
            }
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    EVENT_WAIT_SLICE.min(deadline - now)
                }
                None => EVENT_WAIT_SLICE,
            };
            if handle.wait_edge(edge, slice)? {
                return Ok(Some(channel));
            }
        }
    }

    // Ensure-configured step for wait_for_edge: acquires the line as a
    // pull-off input when unconfigured, without the in-use warning.
    fn ensure_input(
        &self,
        state: &mut State,
        line: u32,
    ) -> Result<Arc<dyn LineHandle>, GpioError> {
        if let Some(cfg) = state.lines.get(&line) {
            return Ok(cfg.handle.clone());
        }
        let request = LineRequest {
            direction: Direction::In,
            pull: Pull::Off,
            initial: None,
        };
        let handle = self.backend.acquire(line, &request)?;
        state.lines.insert(
            line,
            LineConfig {
                direction: Direction::In,
                pull: Pull::Off,
                handle: handle.clone(),
            },
        );
        Ok(handle)
    }

    /// Starts edge detection on an input channel: a background watcher that
    /// latches the detected-event flag on each qualifying edge and invokes
    /// the registered callbacks in order. At most one watcher per channel.
    pub fn add_event_detect(
        &self,
        channel: u32,
        edge: Edge,
        callback: Option<Callback>,
        bouncetime: Option<Duration>,
    ) -> Result<(), GpioError> {
        if bouncetime.is_some_and(|bt| bt.is_zero()) {
            return Err(GpioError::InvalidBouncetime);
        }
        let mut state = self.state.lock();
        let line = pins::resolve(state.mode, channel)?;
        let cfg = state.lines.get(&line).ok_or(GpioError::NotConfigured)?;
        if cfg.direction != Direction::In {
            return Err(GpioError::NotInput);
        }
        if state.watchers.contains_key(&line) {
            return Err(GpioError::EventAlreadyAdded);
        }

        let handle = cfg.handle.clone();
        let latched = state.latched.clone();
        let watcher =
            EventWatcher::spawn(channel, line, handle, edge, bouncetime, callback, latched);
        state.watchers.insert(line, watcher);
        Ok(())
    }

    /// Appends a callback to an existing watcher. Callbacks run in
    /// registration order.
    pub fn add_event_callback(&self, channel: u32, callback: Callback) -> Result<(), GpioError> {
        let state = self.state.lock();
        let line = pins::resolve(state.mode, channel)?;
        let watcher = state
            .watchers
            .get(&line)
            .ok_or(GpioError::NoEventDetection)?;
        watcher.add_callback(callback);
        Ok(())
    }

    /// Stops and joins the channel's watcher.
    pub fn remove_event_detect(&self, channel: u32) -> Result<(), GpioError> {
        let watcher = {
            let mut state = self.state.lock();
            let line = pins::resolve(state.mode, channel)?;
            state.watchers.remove(&line).ok_or(GpioError::EventNotSetup)?
        };
        // joins the watcher thread outside the store lock
        drop(watcher);
        Ok(())
    }

    /// Returns and clears the latched-event flag for the channel: true
    /// exactly once per detected edge.
    pub fn event_detected(&self, channel: u32) -> Result<bool, GpioError> {
        let state = self.state.lock();
        let line = pins::resolve(state.mode, channel)?;
        let detected = state.latched.lock().remove(&line);
        Ok(detected)
    }

    /// Releases the given channels: stops their watchers, drops their line
    /// handles and clears their latched flags. Warns for channels that were
    /// never set up.
    pub fn cleanup(&self, channels: impl Into<Channels>) -> Result<(), GpioError> {
        let channels = channels.into().into_vec()?;
        let mut evicted = Vec::with_capacity(channels.len());
        {
            let mut state = self.state.lock();

            let mut lines = Vec::with_capacity(channels.len());
            for channel in &channels {
                lines.push(pins::resolve(state.mode, *channel)?);
            }

            for (channel, line) in channels.iter().zip(lines) {
                let watcher = state.watchers.remove(&line);
                let cfg = state.lines.remove(&line);
                state.latched.lock().remove(&line);
                if watcher.is_none() && cfg.is_none() {
                    Self::warn_user(
                        &mut state,
                        format!("Channel {channel} was not set up - nothing to clean up"),
                    );
                }
                evicted.push((watcher, cfg));
            }
        }
        // watcher joins happen outside the store lock, so an in-flight
        // callback can still call back into the API
        drop(evicted);
        Ok(())
    }

    /// Returns every field to default. All watchers observe their
    /// cancellation flag and are joined before the lines they were blocking
    /// on are released; safe to call at any time.
    pub fn reset(&self) {
        let (lines, watchers) = {
            let mut state = self.state.lock();
            state.mode = None;
            state.warnings = true;
            state.warning_log.clear();
            (
                std::mem::take(&mut state.lines),
                std::mem::take(&mut state.watchers),
            )
        };
        // watchers first: each drop cancels and joins its thread, so no
        // watcher can latch against the cleared store below
        drop(watchers);
        drop(lines);
        self.state.lock().latched.lock().clear();
    }

    /// Raw view of the store for diagnostics and tests.
    pub fn state_snapshot(&self) -> StateSnapshot {
        self.state.lock().snapshot()
    }
}
