//! Device collaborator
//!
//! The engine never talks to a GPU API directly. Everything that touches
//! device memory or submits work goes through [`Backend`], which a real
//! renderer implements on top of its device/queue. [`HeadlessBackend`]
//! keeps buffers in host memory and records draw calls; it is what the
//! tests and the CLI demo run against.

mod headless;

pub use headless::{DrawRecord, HeadlessBackend};

use glam::Mat4;
use std::time::Duration;

use crate::visual::{Topology, VisualKind};

/// Opaque handle to a device buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Device-level failures. Always fatal for the frame loop.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("device out of memory allocating {requested} bytes")]
    OutOfMemory { requested: u64 },
    #[error("buffer {0:?} does not exist")]
    UnknownBuffer(BufferId),
    #[error("write of {len} bytes at {offset} overflows buffer {buffer:?} ({size} bytes)")]
    OutOfBounds {
        buffer: BufferId,
        offset: u64,
        len: u64,
        size: u64,
    },
    #[error("device lost: {0}")]
    DeviceLost(String),
}

/// One prop buffer bound for a draw.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundBuffer {
    pub prop: &'static str,
    pub buffer: BufferId,
    /// Element count; 1 for a broadcast prop.
    pub count: u32,
    pub broadcast: bool,
}

/// Everything a backend needs to issue the draw for one visual.
#[derive(Clone, Debug)]
pub struct DrawCall<'a> {
    pub panel: usize,
    pub visual: usize,
    pub kind: VisualKind,
    pub topology: Topology,
    pub vertex_count: u32,
    /// Vertex count of each group, for grouped topologies (line strips).
    pub groups: &'a [u32],
    pub buffers: &'a [BoundBuffer],
    /// Panel transform (controller state composed with data normalization).
    pub transform: Mat4,
    /// Pixel viewport `[x, y, width, height]`.
    pub viewport: [f32; 4],
}

/// Per-frame information handed to the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameInfo {
    pub index: u64,
    pub time: Duration,
    pub size: [u32; 2],
    pub clear_color: [u8; 4],
    /// Frame rate to overlay, when the canvas is configured with `show_fps`.
    pub fps: Option<f64>,
}

/// GPU device abstraction: buffer management, draw submission, presentation.
pub trait Backend {
    /// Allocate a buffer of exactly `size` bytes.
    fn create_buffer(&mut self, label: &str, size: u64) -> Result<BufferId, BackendError>;

    /// Host-to-device copy of `bytes` at byte `offset`.
    fn write_buffer(
        &mut self,
        buffer: BufferId,
        offset: u64,
        bytes: &[u8],
    ) -> Result<(), BackendError>;

    fn destroy_buffer(&mut self, buffer: BufferId);

    fn begin_frame(&mut self, frame: &FrameInfo) -> Result<(), BackendError>;

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), BackendError>;

    fn present(&mut self, frame: &FrameInfo) -> Result<(), BackendError>;

    /// Surface size changed.
    fn resize(&mut self, _width: u32, _height: u32) {}
}
