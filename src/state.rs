use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::backend::LineHandle;
use crate::config::{Direction, Edge, Mode, Pull};
use crate::events::EventWatcher;

/// Per-line configuration record. Owns the backend handle; dropping the last
/// clone releases the line.
pub(crate) struct LineConfig {
    pub(crate) direction: Direction,
    pub(crate) pull: Pull,
    pub(crate) handle: Arc<dyn LineHandle>,
}

/// The store behind one [`crate::Gpio`] context: numbering mode, warnings
/// flag, configured lines, active watchers and the latched-event set. The
/// latched set is shared with watcher threads through its own lock so they
/// never touch the store itself.
pub(crate) struct State {
    pub(crate) mode: Option<Mode>,
    pub(crate) warnings: bool,
    pub(crate) lines: FxHashMap<u32, LineConfig>,
    pub(crate) watchers: FxHashMap<u32, EventWatcher>,
    pub(crate) latched: Arc<Mutex<FxHashSet<u32>>>,
    pub(crate) warning_log: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            mode: None,
            warnings: true,
            lines: FxHashMap::default(),
            watchers: FxHashMap::default(),
            latched: Arc::new(Mutex::new(FxHashSet::default())),
            warning_log: Vec::new(),
        }
    }
}

impl State {
    pub(crate) fn snapshot(&self) -> StateSnapshot {
        let mut lines: Vec<LineInfo> = self
            .lines
            .iter()
            .map(|(line, cfg)| LineInfo {
                line: *line,
                direction: cfg.direction,
                pull: cfg.pull,
            })
            .collect();
        lines.sort_by_key(|info| info.line);

        let mut watched: Vec<WatcherInfo> = self
            .watchers
            .iter()
            .map(|(line, watcher)| WatcherInfo {
                line: *line,
                edge: watcher.edge,
                bouncetime_ms: watcher.bouncetime.map(|bt| bt.as_millis() as u64),
            })
            .collect();
        watched.sort_by_key(|info| info.line);

        let mut latched: Vec<u32> = self.latched.lock().iter().copied().collect();
        latched.sort_unstable();

        StateSnapshot {
            mode: self.mode,
            warnings: self.warnings,
            lines,
            watched,
            latched,
            warning_log: self.warning_log.clone(),
        }
    }
}

/// Point-in-time view of the store, for diagnostics and tests only.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub mode: Option<Mode>,
    pub warnings: bool,
    pub lines: Vec<LineInfo>,
    pub watched: Vec<WatcherInfo>,
    pub latched: Vec<u32>,
    pub warning_log: Vec<String>,
}

impl StateSnapshot {
    pub fn line(&self, line: u32) -> Option<&LineInfo> {
        self.lines.iter().find(|info| info.line == line)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LineInfo {
    pub line: u32,
    pub direction: Direction,
    pub pull: Pull,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatcherInfo {
    pub line: u32,
    pub edge: Edge,
    pub bouncetime_ms: Option<u64>,
}
