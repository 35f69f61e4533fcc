//! panelviz - real-time visualization engine core
//!
//! Scene graph of render targets (canvas → panel → visual → prop → buffer),
//! a typed data-binding layer with full and partial uploads, color mapping,
//! and a single-threaded frame loop with periodic callbacks.
//!
//! ```no_run
//! use panelviz::{colormap, Alpha, Canvas, CanvasConfig, ControllerKind, EventKind, Palette, VisualKind};
//!
//! let mut canvas = Canvas::headless(CanvasConfig::default())?;
//! let panel = canvas.panel(ControllerKind::Axes, None)?;
//! let id = panel.add_visual(VisualKind::Marker);
//!
//! let values: Vec<f64> = (0..3).map(f64::from).collect();
//! let scene = canvas.scene_mut();
//! scene.data(id, "pos", vec![[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [2.0, 0.5, 0.0]])?;
//! scene.data(id, "color", colormap(&values, Palette::Viridis, None, None, Alpha::Opaque)?)?;
//! scene.data(id, "ms", vec![10.0f32])?;
//!
//! canvas.connect(EventKind::Timer, 0.05, id, |ctx, id| {
//!     let y = ctx.now().as_secs_f64().sin();
//!     ctx.scene().update_range(*id, "pos", vec![[1.0, y, 0.0]], 1)
//! })?;
//! canvas.run()?;
//! # Ok::<(), panelviz::VizError>(())
//! ```
//!
//! The GPU device and the window are collaborators behind the [`Backend`]
//! and [`Host`] traits; [`HeadlessBackend`] and [`HeadlessHost`] keep
//! everything in memory.

pub mod backend;
pub mod canvas;
pub mod colormap;
pub mod data;
pub mod error;
pub mod panel;
pub mod scene;
pub mod visual;

pub use backend::{Backend, BackendError, BufferId, DrawCall, FrameInfo, HeadlessBackend};
pub use canvas::{
    Canvas, CanvasConfig, Clock, EventKind, HeadlessHost, Host, HostEvent, Key, ManualClock,
    SystemClock, TimerContext, TimerHandle,
};
pub use colormap::{colormap, colormap_index, colormap_scalar, Alpha, Palette, PaletteKind, Rgba, Values};
pub use data::{Array, ArrayData, DType};
pub use error::{Result, VizError};
pub use panel::{Controller, ControllerKind, Panel, Viewport};
pub use scene::{PanelId, Scene, VisualId};
pub use visual::{Visual, VisualKind};
