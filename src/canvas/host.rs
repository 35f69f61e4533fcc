//! Window/input collaborator
//!
//! The engine doesn't own a window. Whatever does implements [`Host`] and
//! hands over events once per loop iteration.

use std::collections::VecDeque;

use glam::Vec2;

use crate::scene::PanelId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Escape,
    Char(char),
}

/// Input and lifecycle events, in the order the host observed them.
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    Close,
    Resize { width: u32, height: u32 },
    Key(Key),
    /// Drag on a panel, NDC units
    Pan { panel: PanelId, delta: Vec2 },
    /// Scroll on a panel, scaling about `anchor` (NDC)
    Zoom {
        panel: PanelId,
        factor: f32,
        anchor: Vec2,
    },
    /// Drag on an arcball panel, NDC units
    Rotate { panel: PanelId, delta: Vec2 },
}

pub trait Host {
    /// Events received since the previous call.
    fn poll_events(&mut self) -> Vec<HostEvent>;
}

/// Scripted host: replays events at given poll indices, optionally closing
/// after a number of polls.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    script: VecDeque<(u64, HostEvent)>,
    polls: u64,
    close_after: Option<u64>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` on poll number `poll` (0-based).
    pub fn with_event(mut self, poll: u64, event: HostEvent) -> Self {
        let at = self.script.partition_point(|(p, _)| *p <= poll);
        self.script.insert(at, (poll, event));
        self
    }

    /// Emit `Close` on poll number `polls`.
    pub fn close_after(mut self, polls: u64) -> Self {
        self.close_after = Some(polls);
        self
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }
}

impl Host for HeadlessHost {
    fn poll_events(&mut self) -> Vec<HostEvent> {
        let poll = self.polls;
        self.polls += 1;

        let mut events = Vec::new();
        while self.script.front().is_some_and(|(p, _)| *p <= poll) {
            if let Some((_, event)) = self.script.pop_front() {
                events.push(event);
            }
        }
        if self.close_after == Some(poll) {
            events.push(HostEvent::Close);
        }
        events
    }
}
