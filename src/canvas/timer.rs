//! Timer registry
//!
//! Registrations own their state record; the callback gets it by `&mut`
//! together with a [`TimerContext`] on every firing. Due timers fire in
//! registration order, at most once per loop iteration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{Result, VizError};
use crate::scene::Scene;

/// Opaque id of a registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Events a callback can be connected to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Periodic, every `interval` seconds
    Timer,
    /// Every loop iteration
    Frame,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Timer => "timer",
            EventKind::Frame => "frame",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timer" => Ok(EventKind::Timer),
            "frame" => Ok(EventKind::Frame),
            _ => Err(VizError::UnknownName {
                what: "event",
                name: s.to_string(),
            }),
        }
    }
}

/// What a callback can see and do during one firing.
pub struct TimerContext<'a> {
    scene: &'a mut Scene,
    now: Duration,
    frame: u64,
    handle: TimerHandle,
    count: u64,
    stop: &'a mut bool,
    cancelled: &'a mut Vec<TimerHandle>,
}

impl TimerContext<'_> {
    pub fn scene(&mut self) -> &mut Scene {
        self.scene
    }

    /// Loop time of the current iteration.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Index of the frame about to be rendered.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn handle(&self) -> TimerHandle {
        self.handle
    }

    /// Number of times this registration has fired, this firing included.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Ask the loop to return after the current iteration.
    pub fn stop(&mut self) {
        *self.stop = true;
    }

    /// Remove this registration; it never fires again.
    pub fn cancel(&mut self) {
        self.cancelled.push(self.handle);
    }

    /// Remove another registration. Takes effect immediately, so a later
    /// timer cancelled here won't fire in this iteration either.
    pub fn cancel_timer(&mut self, handle: TimerHandle) {
        self.cancelled.push(handle);
    }
}

/// A connected callback.
pub trait TimerCallback {
    fn call(&mut self, ctx: &mut TimerContext<'_>) -> Result<()>;
}

/// Callback closure plus the state record it owns.
struct Registration<S, F> {
    state: S,
    callback: F,
}

impl<S, F> TimerCallback for Registration<S, F>
where
    F: FnMut(&mut TimerContext<'_>, &mut S) -> Result<()>,
{
    fn call(&mut self, ctx: &mut TimerContext<'_>) -> Result<()> {
        (self.callback)(ctx, &mut self.state)
    }
}

struct Timer {
    handle: TimerHandle,
    kind: EventKind,
    interval: Duration,
    last_fired: Duration,
    enabled: bool,
    removed: bool,
    count: u64,
    callback: Box<dyn TimerCallback>,
}

impl Timer {
    fn is_due(&self, now: Duration) -> bool {
        match self.kind {
            EventKind::Frame => true,
            EventKind::Timer => now.saturating_sub(self.last_fired) >= self.interval,
        }
    }

    fn advance(&mut self, now: Duration) {
        if self.kind == EventKind::Timer {
            self.last_fired += self.interval;
            // More than one interval behind: skip the backlog
            if now.saturating_sub(self.last_fired) >= self.interval {
                self.last_fired = now;
            }
        }
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("handle", &self.handle)
            .field("kind", &self.kind)
            .field("interval", &self.interval)
            .field("last_fired", &self.last_fired)
            .field("enabled", &self.enabled)
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}

/// Registered callbacks, in registration order.
#[derive(Debug, Default)]
pub struct Timers {
    timers: Vec<Timer>,
    next_id: u64,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` with its `state`. `interval` (seconds) must be
    /// finite and positive for [`EventKind::Timer`]; it's ignored for
    /// [`EventKind::Frame`].
    pub fn connect<S, F>(
        &mut self,
        kind: EventKind,
        interval: f64,
        now: Duration,
        state: S,
        callback: F,
    ) -> Result<TimerHandle>
    where
        S: 'static,
        F: FnMut(&mut TimerContext<'_>, &mut S) -> Result<()> + 'static,
    {
        self.register(kind, interval, now, Box::new(Registration { state, callback }))
    }

    /// Register a callback object; same interval rules as [`Timers::connect`].
    pub fn register(
        &mut self,
        kind: EventKind,
        interval: f64,
        now: Duration,
        callback: Box<dyn TimerCallback>,
    ) -> Result<TimerHandle> {
        let interval = match kind {
            EventKind::Timer => {
                if !interval.is_finite() || interval <= 0.0 {
                    return Err(VizError::Domain(format!(
                        "timer interval {interval} must be a positive number of seconds"
                    )));
                }
                Duration::try_from_secs_f64(interval).map_err(|e| {
                    VizError::Domain(format!("timer interval {interval} out of range: {e}"))
                })?
            }
            EventKind::Frame => Duration::ZERO,
        };

        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            handle,
            kind,
            interval,
            last_fired: now,
            enabled: true,
            removed: false,
            count: 0,
            callback,
        });

        debug!(?handle, %kind, ?interval, "Callback connected");
        Ok(handle)
    }

    /// Returns false if the handle isn't registered.
    pub fn remove(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.handle != handle);
        let removed = self.timers.len() != before;
        if removed {
            debug!(?handle, "Callback removed");
        }
        removed
    }

    pub fn set_enabled(&mut self, handle: TimerHandle, enabled: bool) -> bool {
        match self.timers.iter_mut().find(|t| t.handle == handle) {
            Some(timer) => {
                timer.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, handle: TimerHandle) -> bool {
        self.timers.iter().any(|t| t.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Times `handle` has fired so far.
    pub fn count(&self, handle: TimerHandle) -> Option<u64> {
        self.timers.iter().find(|t| t.handle == handle).map(|t| t.count)
    }

    /// Fire every due callback once, in registration order. Returns whether
    /// a callback asked the loop to stop.
    ///
    /// Validation errors from a callback are logged and only abort that
    /// invocation; a fatal error is returned right away.
    pub fn fire_due(&mut self, scene: &mut Scene, now: Duration, frame: u64) -> Result<bool> {
        let mut stop = false;
        let mut cancelled = Vec::new();
        let mut fatal = None;

        for i in 0..self.timers.len() {
            let timer = &mut self.timers[i];
            if timer.removed || !timer.enabled || !timer.is_due(now) {
                continue;
            }

            timer.count += 1;
            let mut ctx = TimerContext {
                scene: &mut *scene,
                now,
                frame,
                handle: timer.handle,
                count: timer.count,
                stop: &mut stop,
                cancelled: &mut cancelled,
            };
            let result = timer.callback.call(&mut ctx);
            timer.advance(now);
            trace!(handle = ?timer.handle, count = timer.count, "Callback fired");

            for handle in cancelled.drain(..) {
                if let Some(t) = self.timers.iter_mut().find(|t| t.handle == handle) {
                    t.removed = true;
                }
            }

            match result {
                Ok(()) => {}
                Err(e) if e.is_fatal() => {
                    fatal = Some(e);
                    break;
                }
                Err(e) => warn!(handle = ?self.timers[i].handle, error = %e, "Callback failed"),
            }
        }

        self.timers.retain(|t| {
            if t.removed {
                debug!(handle = ?t.handle, "Callback cancelled");
            }
            !t.removed
        });

        match fatal {
            Some(e) => Err(e),
            None => Ok(stop),
        }
    }
}
