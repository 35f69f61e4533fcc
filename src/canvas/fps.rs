//! Frame rate measurement over a sliding window

use std::collections::VecDeque;
use std::time::Duration;

/// Frames kept in the window.
const WINDOW: usize = 60;

/// FPS counter fed with loop timestamps
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frames: VecDeque<Duration>,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            frames: VecDeque::with_capacity(WINDOW + 1),
        }
    }

    pub fn tick(&mut self, now: Duration) {
        self.frames.push_back(now);
        if self.frames.len() > WINDOW {
            self.frames.pop_front();
        }
    }

    pub fn fps(&self) -> f64 {
        let (Some(first), Some(last)) = (self.frames.front(), self.frames.back()) else {
            return 0.0;
        };
        let elapsed = last.saturating_sub(*first).as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }
        (self.frames.len() as f64 - 1.0) / elapsed
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}
