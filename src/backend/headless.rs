//! In-memory backend
//!
//! - buffers live in `Vec<u8>` and can be read back (tests only; the engine never does)
//! - writes, draw calls and presented frames are logged; each log keeps
//!   its most recent entries only
//! - an optional memory budget simulates device exhaustion

use std::collections::HashMap;

use bytemuck::Pod;
use glam::Mat4;
use tracing::{debug, trace};

use super::{Backend, BackendError, BoundBuffer, BufferId, DrawCall, FrameInfo};
use crate::visual::{Topology, VisualKind};

/// Entries kept per log unless overridden with [`HeadlessBackend::with_log_limit`].
pub const DEFAULT_LOG_LIMIT: usize = 100_000;

/// Append to a log, dropping the oldest half once it exceeds `limit`.
fn push_bounded<T>(log: &mut Vec<T>, item: T, limit: usize) {
    if log.len() >= limit.max(1) {
        let excess = log.len() - limit.max(1) / 2;
        log.drain(..excess);
    }
    log.push(item);
}

/// Owned copy of a [`DrawCall`], kept in the draw log.
#[derive(Clone, Debug)]
pub struct DrawRecord {
    pub frame: u64,
    pub panel: usize,
    pub visual: usize,
    pub kind: VisualKind,
    pub topology: Topology,
    pub vertex_count: u32,
    pub groups: Vec<u32>,
    pub buffers: Vec<BoundBuffer>,
    pub transform: Mat4,
    pub viewport: [f32; 4],
}

/// Host-memory implementation of [`Backend`].
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    buffers: HashMap<BufferId, Vec<u8>>,
    next_id: u64,
    /// Total bytes allowed across live buffers
    memory_limit: Option<u64>,
    allocated: u64,
    /// Number of `create_buffer` calls that succeeded
    allocations: usize,
    /// (buffer, byte offset, byte length) of every write
    writes: Vec<(BufferId, u64, u64)>,
    destroyed: Vec<BufferId>,
    draws: Vec<DrawRecord>,
    frames: Vec<FrameInfo>,
    current_frame: u64,
    size: [u32; 2],
    /// Presenting this frame index (or later) reports a lost device
    lost_at_frame: Option<u64>,
    log_limit: Option<usize>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail allocations once live buffers would exceed `bytes`.
    pub fn with_memory_limit(bytes: u64) -> Self {
        Self {
            memory_limit: Some(bytes),
            ..Self::default()
        }
    }

    /// Keep at most `entries` writes, draws and frames in each log.
    pub fn with_log_limit(mut self, entries: usize) -> Self {
        self.log_limit = Some(entries);
        self
    }

    /// Forget logged writes, draws and frames. Buffers are untouched.
    pub fn clear_log(&mut self) {
        self.writes.clear();
        self.draws.clear();
        self.frames.clear();
    }

    fn log_limit(&self) -> usize {
        self.log_limit.unwrap_or(DEFAULT_LOG_LIMIT)
    }

    /// Simulate a device loss when frame `index` is presented.
    pub fn lose_device_at(mut self, index: u64) -> Self {
        self.lost_at_frame = Some(index);
        self
    }

    /// Raw bytes of a live buffer.
    pub fn read_back(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    /// Buffer contents reinterpreted as `T` elements.
    pub fn read_back_as<T: Pod>(&self, buffer: BufferId) -> Option<Vec<T>> {
        self.read_back(buffer)
            .map(|bytes| bytemuck::pod_collect_to_vec::<u8, T>(bytes))
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn allocations(&self) -> usize {
        self.allocations
    }

    pub fn writes(&self) -> &[(BufferId, u64, u64)] {
        &self.writes
    }

    /// Buffers in the order they were destroyed.
    pub fn destroyed(&self) -> &[BufferId] {
        &self.destroyed
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Draw calls issued during frame `index`.
    pub fn draws_in_frame(&self, index: u64) -> impl Iterator<Item = &DrawRecord> {
        self.draws.iter().filter(move |d| d.frame == index)
    }

    pub fn frames(&self) -> &[FrameInfo] {
        &self.frames
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }
}

impl Backend for HeadlessBackend {
    fn create_buffer(&mut self, label: &str, size: u64) -> Result<BufferId, BackendError> {
        if let Some(limit) = self.memory_limit {
            if self.allocated + size > limit {
                return Err(BackendError::OutOfMemory { requested: size });
            }
        }

        let id = BufferId(self.next_id);
        self.next_id += 1;
        self.buffers.insert(id, vec![0; size as usize]);
        self.allocated += size;
        self.allocations += 1;

        debug!(label, ?id, size, "Buffer created");
        Ok(id)
    }

    fn write_buffer(
        &mut self,
        buffer: BufferId,
        offset: u64,
        bytes: &[u8],
    ) -> Result<(), BackendError> {
        let data = self
            .buffers
            .get_mut(&buffer)
            .ok_or(BackendError::UnknownBuffer(buffer))?;

        let len = bytes.len() as u64;
        let size = data.len() as u64;
        if offset.checked_add(len).unwrap_or(u64::MAX) > size {
            return Err(BackendError::OutOfBounds {
                buffer,
                offset,
                len,
                size,
            });
        }

        let start = offset as usize;
        data[start..start + bytes.len()].copy_from_slice(bytes);
        let limit = self.log_limit();
        push_bounded(&mut self.writes, (buffer, offset, len), limit);

        trace!(?buffer, offset, len, "Buffer written");
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        if let Some(data) = self.buffers.remove(&buffer) {
            self.allocated -= data.len() as u64;
            self.destroyed.push(buffer);
            debug!(?buffer, "Buffer destroyed");
        }
    }

    fn begin_frame(&mut self, frame: &FrameInfo) -> Result<(), BackendError> {
        self.current_frame = frame.index;
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), BackendError> {
        for bound in call.buffers {
            if !self.buffers.contains_key(&bound.buffer) {
                return Err(BackendError::UnknownBuffer(bound.buffer));
            }
        }

        let limit = self.log_limit();
        let record = DrawRecord {
            frame: self.current_frame,
            panel: call.panel,
            visual: call.visual,
            kind: call.kind,
            topology: call.topology,
            vertex_count: call.vertex_count,
            groups: call.groups.to_vec(),
            buffers: call.buffers.to_vec(),
            transform: call.transform,
            viewport: call.viewport,
        };
        push_bounded(&mut self.draws, record, limit);
        Ok(())
    }

    fn present(&mut self, frame: &FrameInfo) -> Result<(), BackendError> {
        if self.lost_at_frame.is_some_and(|at| frame.index >= at) {
            return Err(BackendError::DeviceLost(format!("frame {}", frame.index)));
        }
        let limit = self.log_limit();
        push_bounded(&mut self.frames, frame.clone(), limit);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = [width, height];
    }
}
