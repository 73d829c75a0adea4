use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;

use crate::backend::{GpioBackend, LineHandle, LineRequest};
use crate::config::{Direction, Edge, Level, Pull};
use crate::error::GpioError;

/// In-memory backend with the observable semantics of a gpiochip: exclusive
/// line requests, level reads/writes and queued edge events. Tests simulate
/// external signals with [`MockGpioBackend::drive`].
#[derive(Default)]
pub struct MockGpioBackend {
    lines: Mutex<FxHashMap<u32, Arc<MockLine>>>, // keyed by line offset
}

struct MockLine {
    state: Mutex<LineState>,
    edges: Condvar,
}

struct LineState {
    requested: bool,
    direction: Direction,
    level: Level,
    history: Vec<Edge>, // grows monotonically; handles keep cursors into it
}

impl MockGpioBackend {
    fn line(&self, line: u32) -> Arc<MockLine> {
        self.lines
            .lock()
            .entry(line)
            .or_insert_with(|| {
                Arc::new(MockLine {
                    state: Mutex::new(LineState {
                        requested: false,
                        direction: Direction::In,
                        level: Level::Low,
                        history: Vec::new(),
                    }),
                    edges: Condvar::new(),
                })
            })
            .clone()
    }

    /// Simulates an external signal driving the line, queueing an edge event
    /// when the level actually changes.
    pub fn drive(&self, line: u32, level: Level) {
        let line = self.line(line);
        let mut state = line.state.lock();
        if let Some(edge) = transition(state.level, level) {
            state.level = level;
            state.history.push(edge);
            line.edges.notify_all();
        }
    }

    /// Current level of the line, requested or not.
    pub fn level(&self, line: u32) -> Level {
        self.line(line).state.lock().level
    }

    /// Whether the line currently has an active request.
    pub fn is_requested(&self, line: u32) -> bool {
        self.line(line).state.lock().requested
    }
}

fn transition(from: Level, to: Level) -> Option<Edge> {
    match (from, to) {
        (Level::Low, Level::High) => Some(Edge::Rising),
        (Level::High, Level::Low) => Some(Edge::Falling),
        _ => None,
    }
}

impl GpioBackend for MockGpioBackend {
    fn acquire(
        &self,
        line: u32,
        request: &LineRequest,
    ) -> Result<Arc<dyn LineHandle>, GpioError> {
        let line_ref = self.line(line);
        let cursor = {
            let mut state = line_ref.state.lock();
            if state.requested {
                return Err(GpioError::LineBusy(line));
            }
            state.requested = true;
            state.direction = request.direction;
            match request.direction {
                Direction::Out => {
                    if let Some(initial) = request.initial {
                        state.level = initial;
                    }
                }
                Direction::In => match request.pull {
                    // a floating input keeps whatever is externally driven
                    Pull::Off => {}
                    Pull::Up => state.level = Level::High,
                    Pull::Down => state.level = Level::Low,
                },
            }
            state.history.len()
        };
        Ok(Arc::new(MockHandle {
            line: line_ref,
            cursor: Mutex::new(cursor),
        }))
    }
}

struct MockHandle {
    line: Arc<MockLine>,
    // position in the line's edge history already consumed by this request
    cursor: Mutex<usize>,
}

impl LineHandle for MockHandle {
    fn read(&self) -> Result<Level, GpioError> {
        Ok(self.line.state.lock().level)
    }

    fn write(&self, level: Level) -> Result<(), GpioError> {
        let mut state = self.line.state.lock();
        if state.direction != Direction::Out {
            return Err(GpioError::Gpio("line is not requested for output".into()));
        }
        if let Some(edge) = transition(state.level, level) {
            state.level = level;
            state.history.push(edge);
            self.line.edges.notify_all();
        }
        Ok(())
    }

    fn wait_edge(&self, edge: Edge, timeout: Duration) -> Result<bool, GpioError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.line.state.lock();
        loop {
            {
                let mut cursor = self.cursor.lock();
                while *cursor < state.history.len() {
                    let observed = state.history[*cursor];
                    *cursor += 1;
                    if edge.matches(observed) {
                        return Ok(true);
                    }
                }
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            self.line.edges.wait_until(&mut state, deadline);
        }
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.line.state.lock().requested = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_request() -> LineRequest {
        LineRequest {
            direction: Direction::In,
            pull: Pull::Off,
            initial: None,
        }
    }

    #[test]
    fn double_acquire_is_busy() {
        let backend = MockGpioBackend::default();
        let _handle = backend.acquire(4, &input_request()).unwrap();
        assert!(matches!(
            backend.acquire(4, &input_request()),
            Err(GpioError::LineBusy(4))
        ));
    }

    #[test]
    fn drop_releases_the_line() {
        let backend = MockGpioBackend::default();
        let handle = backend.acquire(4, &input_request()).unwrap();
        assert!(backend.is_requested(4));
        drop(handle);
        assert!(!backend.is_requested(4));
        backend.acquire(4, &input_request()).unwrap();
    }

    #[test]
    fn edges_queue_between_waits() {
        let backend = MockGpioBackend::default();
        let handle = backend.acquire(4, &input_request()).unwrap();
        // edge arrives before anyone is waiting
        backend.drive(4, Level::High);
        assert!(
            handle
                .wait_edge(Edge::Rising, Duration::from_millis(1))
                .unwrap()
        );
        // consumed; a second wait times out
        assert!(
            !handle
                .wait_edge(Edge::Rising, Duration::from_millis(1))
                .unwrap()
        );
    }

    #[test]
    fn non_matching_edges_are_skipped() {
        let backend = MockGpioBackend::default();
        let handle = backend.acquire(4, &input_request()).unwrap();
        backend.drive(4, Level::High);
        backend.drive(4, Level::Low);
        assert!(
            handle
                .wait_edge(Edge::Falling, Duration::from_millis(1))
                .unwrap()
        );
    }
}
