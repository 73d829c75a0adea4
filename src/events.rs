use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::warn;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::backend::LineHandle;
use crate::config::Edge;

/// Edge callback, invoked with the caller-visible channel number.
pub type Callback = Box<dyn Fn(u32) + Send + Sync + 'static>;

// stored shared so dispatch can clone one out and invoke it unlocked
type SharedCallback = Arc<dyn Fn(u32) + Send + Sync + 'static>;

/// How long a watcher blocks on the line per cycle before re-checking its
/// cancellation flag.
pub(crate) const EVENT_WAIT_SLICE: Duration = Duration::from_millis(10);

/// Background watcher for one channel: blocks on the line's edge
/// notification, filters bounces, latches the detected-event flag and runs
/// the registered callbacks in order. Cancelled and joined on drop.
pub(crate) struct EventWatcher {
    pub(crate) edge: Edge,
    pub(crate) bouncetime: Option<Duration>,
    callbacks: Arc<Mutex<Vec<SharedCallback>>>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl EventWatcher {
    pub(crate) fn spawn(
        channel: u32,
        line: u32,
        handle: Arc<dyn LineHandle>,
        edge: Edge,
        bouncetime: Option<Duration>,
        callback: Option<Callback>,
        latched: Arc<Mutex<FxHashSet<u32>>>,
    ) -> Self {
        let initial: Vec<SharedCallback> = callback.into_iter().map(Arc::from).collect();
        let callbacks = Arc::new(Mutex::new(initial));
        let cancel = Arc::new(AtomicBool::new(false));

        let cancel_flag = cancel.clone();
        let dispatch = callbacks.clone();
        let thread = std::thread::spawn(move || {
            let mut last_accepted: Option<Instant> = None;
            while !cancel_flag.load(Ordering::Relaxed) {
                match handle.wait_edge(edge, EVENT_WAIT_SLICE) {
                    Ok(false) => continue,
                    Ok(true) => {}
                    Err(e) => {
                        warn!("wait edge failed for channel {channel}: {e}");
                        std::thread::yield_now();
                        continue;
                    }
                }
                if cancel_flag.load(Ordering::Relaxed) {
                    break;
                }

                let now = Instant::now();
                if let (Some(bouncetime), Some(last)) = (bouncetime, last_accepted)
                    && now.duration_since(last) < bouncetime
                {
                    continue;
                }
                last_accepted = Some(now);

                latched.lock().insert(line);

                // registration order, one callback at a time, with the
                // list unlocked during each call so a callback may itself
                // register further callbacks
                let mut index = 0;
                loop {
                    let callback = {
                        let callbacks = dispatch.lock();
                        let Some(callback) = callbacks.get(index) else {
                            break;
                        };
                        callback.clone()
                    };
                    index += 1;
                    if catch_unwind(AssertUnwindSafe(|| callback(channel))).is_err() {
                        warn!("event callback panicked for channel {channel}");
                    }
                }
            }
        });

        Self {
            edge,
            bouncetime,
            callbacks,
            cancel,
            thread: Some(thread),
        }
    }

    pub(crate) fn add_callback(&self, callback: Callback) {
        self.callbacks.lock().push(Arc::from(callback));
    }
}

impl Drop for EventWatcher {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
