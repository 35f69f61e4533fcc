//! Canvas and frame loop
//!
//! The canvas owns the scene, the timer registry and its three
//! collaborators: the [`Backend`] (device), the [`Host`] (window events)
//! and the [`Clock`]. One loop iteration:
//!
//! 1. poll host events (close, resize, escape, pan/zoom/rotate)
//! 2. fire due callbacks in registration order
//! 3. flush staged uploads, draw every panel's visuals in order
//! 4. present
//! 5. wait for the next frame slot
//!
//! Everything runs on the calling thread.

mod clock;
mod config;
mod fps;
mod host;
mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CanvasConfig;
pub use fps::FpsCounter;
pub use host::{HeadlessHost, Host, HostEvent, Key};
pub use timer::{EventKind, TimerCallback, TimerContext, TimerHandle, Timers};

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::backend::{Backend, FrameInfo, HeadlessBackend};
use crate::error::{Result, VizError};
use crate::panel::{ControllerKind, Panel, Viewport};
use crate::scene::{PanelId, Scene};

const FPS_LOG_INTERVAL: Duration = Duration::from_secs(1);

pub struct Canvas<B: Backend = HeadlessBackend, H: Host = HeadlessHost, C: Clock = SystemClock> {
    config: CanvasConfig,
    backend: B,
    host: H,
    clock: C,
    scene: Scene,
    timers: Timers,
    fps: FpsCounter,
    frame_interval: Duration,
    frame: u64,
    size: [u32; 2],
    /// Set by a host close, the escape key or a callback stop request
    closed: bool,
    last_fps_log: Duration,
}

impl Canvas {
    /// Canvas on the in-memory backend and a host that never closes.
    pub fn headless(config: CanvasConfig) -> Result<Self> {
        Canvas::new(config, HeadlessBackend::new(), HeadlessHost::new(), SystemClock::new())
    }
}

impl<B: Backend, H: Host, C: Clock> Canvas<B, H, C> {
    pub fn new(config: CanvasConfig, mut backend: B, host: H, clock: C) -> Result<Self> {
        config.validate()?;
        let frame_interval = config.frame_interval()?;
        let size = config.size;
        backend.resize(size[0], size[1]);

        info!(
            title = %config.title,
            width = size[0],
            height = size[1],
            frame_rate = config.frame_rate,
            "Canvas created"
        );
        let now = clock.now();
        Ok(Self {
            config,
            backend,
            host,
            clock,
            scene: Scene::new(),
            timers: Timers::new(),
            fps: FpsCounter::new(),
            frame_interval,
            frame: 0,
            size,
            closed: false,
            last_fps_log: now,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    /// Frames rendered so far.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    pub fn fps(&self) -> f64 {
        self.fps.fps()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Make `run()` return after the current iteration.
    pub fn close(&mut self) {
        self.closed = true;
    }

    // ========================================================================
    // Scene construction
    // ========================================================================

    /// Add a panel covering `viewport` (the whole canvas if `None`).
    pub fn panel(&mut self, controller: ControllerKind, viewport: Option<Viewport>) -> Result<&mut Panel> {
        self.scene.add_panel(controller, viewport.unwrap_or_default())
    }

    /// `rows × cols` panels in row-major order.
    pub fn grid(&mut self, rows: usize, cols: usize, controller: ControllerKind) -> Result<Vec<PanelId>> {
        self.scene.grid(rows, cols, controller)
    }

    pub fn panel_mut(&mut self, id: PanelId) -> Option<&mut Panel> {
        self.scene.panel_mut(id)
    }

    // ========================================================================
    // Callbacks
    // ========================================================================

    /// Connect `callback` to `event`. The callback owns `state` and gets it
    /// by `&mut` on each firing.
    pub fn connect<S, F>(&mut self, event: EventKind, interval: f64, state: S, callback: F) -> Result<TimerHandle>
    where
        S: 'static,
        F: FnMut(&mut TimerContext<'_>, &mut S) -> Result<()> + 'static,
    {
        let now = self.clock.now();
        self.timers.connect(event, interval, now, state, callback)
    }

    pub fn remove_timer(&mut self, handle: TimerHandle) -> bool {
        self.timers.remove(handle)
    }

    pub fn set_timer_enabled(&mut self, handle: TimerHandle, enabled: bool) -> bool {
        self.timers.set_enabled(handle, enabled)
    }

    // ========================================================================
    // Loop
    // ========================================================================

    /// Run until the host closes, a callback stops the loop or
    /// `max_frames` is reached. Backend failures end the loop with an error.
    pub fn run(&mut self) -> Result<()> {
        info!(frame = self.frame, "Loop started");
        loop {
            if self.config.max_frames.is_some_and(|max| self.frame >= max) {
                debug!(frame = self.frame, "Frame limit reached");
                break;
            }
            if !self.step()? {
                break;
            }
        }
        info!(frames = self.frame, fps = self.fps.fps(), "Loop stopped");
        Ok(())
    }

    /// Run at most `n` iterations, stopping early like [`Canvas::run`].
    /// Returns the number of iterations run.
    pub fn run_frames(&mut self, n: u64) -> Result<u64> {
        for i in 0..n {
            if !self.step()? {
                return Ok(i + 1);
            }
        }
        Ok(n)
    }

    /// One loop iteration. Returns whether the loop should go on.
    pub fn step(&mut self) -> Result<bool> {
        let start = self.clock.now();

        self.handle_events();

        match self.timers.fire_due(&mut self.scene, start, self.frame) {
            Ok(stop) => {
                if stop {
                    debug!(frame = self.frame, "Stop requested by callback");
                    self.closed = true;
                }
            }
            Err(e) => return Err(self.fatal(e)),
        }

        self.fps.tick(start);
        let info = FrameInfo {
            index: self.frame,
            time: start,
            size: self.size,
            clear_color: self.config.clear_color,
            fps: self.config.show_fps.then(|| self.fps.fps()),
        };
        if let Err(e) = self.render(&info) {
            return Err(self.fatal(e));
        }
        self.frame += 1;

        if start.saturating_sub(self.last_fps_log) >= FPS_LOG_INTERVAL {
            info!(fps = format_args!("{:.1}", self.fps.fps()), frame = self.frame, "Frame rate");
            self.last_fps_log = start;
        }

        self.clock.sleep_until(start.saturating_add(self.frame_interval));
        Ok(!self.closed)
    }

    fn render(&mut self, info: &FrameInfo) -> Result<()> {
        self.scene.flush(&mut self.backend)?;
        self.backend.begin_frame(info)?;
        self.scene.render(&mut self.backend, self.size)?;
        self.backend.present(info)?;
        Ok(())
    }

    fn fatal(&mut self, e: VizError) -> VizError {
        error!(frame = self.frame, error = %e, "Fatal error, stopping loop");
        self.closed = true;
        e
    }

    fn handle_events(&mut self) {
        for event in self.host.poll_events() {
            match event {
                HostEvent::Close => {
                    debug!("Close requested by host");
                    self.closed = true;
                }
                HostEvent::Resize { width, height } => {
                    if width == 0 || height == 0 {
                        debug!(width, height, "Ignoring empty resize");
                        continue;
                    }
                    self.size = [width, height];
                    self.backend.resize(width, height);
                    debug!(width, height, "Canvas resized");
                }
                HostEvent::Key(Key::Escape) if self.config.close_on_esc => {
                    debug!("Escape pressed, closing");
                    self.closed = true;
                }
                HostEvent::Key(_) => {}
                HostEvent::Pan { panel, delta } => {
                    if let Some(p) = self.scene.panel_mut(panel) {
                        p.controller_mut().apply_pan(delta);
                    }
                }
                HostEvent::Zoom {
                    panel,
                    factor,
                    anchor,
                } => {
                    if let Some(p) = self.scene.panel_mut(panel) {
                        if let Err(e) = p.controller_mut().apply_zoom(factor, anchor) {
                            warn!(panel = panel.0, error = %e, "Zoom ignored");
                        }
                    }
                }
                HostEvent::Rotate { panel, delta } => {
                    if let Some(p) = self.scene.panel_mut(panel) {
                        if let Err(e) = p.controller_mut().apply_drag(delta) {
                            warn!(panel = panel.0, error = %e, "Rotation ignored");
                        }
                    }
                }
            }
        }
    }

    /// Release every device buffer, depth-first: panels in order, their
    /// visuals in order, each visual's props in table order. Also runs on
    /// drop; calling it twice is harmless.
    pub fn destroy(&mut self) {
        self.scene.release(&mut self.backend);
        self.closed = true;
    }
}

impl<B: Backend, H: Host, C: Clock> Drop for Canvas<B, H, C> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::data::Array;
    use crate::scene::VisualId;
    use crate::visual::VisualKind;
    use glam::Vec2;
    use std::cell::Cell;
    use std::rc::Rc;

    type TestCanvas = Canvas<HeadlessBackend, HeadlessHost, ManualClock>;

    fn canvas_with(config: CanvasConfig, backend: HeadlessBackend, host: HeadlessHost) -> TestCanvas {
        Canvas::new(config, backend, host, ManualClock::new()).unwrap()
    }

    fn canvas() -> TestCanvas {
        canvas_with(CanvasConfig::default(), HeadlessBackend::new(), HeadlessHost::new())
    }

    fn signal(n: usize, t: f64) -> Vec<[f64; 3]> {
        (0..n)
            .map(|i| {
                let x = i as f64 / n as f64;
                [x, (x * 10.0 + t).sin(), 0.0]
            })
            .collect()
    }

    #[test]
    fn test_timer_rate_over_one_second() {
        let mut canvas = canvas();
        let fired = Rc::new(Cell::new(0u32));
        let counter = fired.clone();
        canvas
            .connect(EventKind::Timer, 0.05, (), move |_, _| {
                counter.set(counter.get() + 1);
                Ok(())
            })
            .unwrap();

        // 60 iterations at 60 fps span one second of loop time
        canvas.run_frames(60).unwrap();
        assert!(canvas.clock().now() >= Duration::from_millis(999));
        assert!((18..=20).contains(&fired.get()), "fired {} times", fired.get());
    }

    #[test]
    fn test_timer_removed_in_own_callback_never_fires_again() {
        let mut canvas = canvas();
        let fired = Rc::new(Cell::new(0u32));
        let counter = fired.clone();
        let handle = canvas
            .connect(EventKind::Timer, 0.05, (), move |ctx, _| {
                counter.set(counter.get() + 1);
                if ctx.count() == 2 {
                    ctx.cancel();
                }
                Ok(())
            })
            .unwrap();

        canvas.run_frames(120).unwrap();
        assert_eq!(fired.get(), 2);
        assert!(!canvas.timers().contains(handle));
        assert!(!canvas.remove_timer(handle));
    }

    #[test]
    fn test_callback_updates_visible_in_same_frame() {
        let mut canvas = canvas();
        let panel = canvas.panel(ControllerKind::Panzoom, None).unwrap();
        let id = panel.add_visual(VisualKind::LineStrip);
        canvas.scene_mut().data(id, "pos", signal(100, 0.0)).unwrap();
        canvas.scene_mut().data(id, "length", vec![100u32]).unwrap();

        canvas
            .connect(EventKind::Frame, 0.0, id, |ctx, id: &mut VisualId| {
                let t = ctx.frame() as f64;
                let tail = signal(100, t)[90..].to_vec();
                ctx.scene().update_range(*id, "pos", tail, 90)
            })
            .unwrap();
        canvas.run_frames(3).unwrap();

        let visual = canvas.scene().visual(id).unwrap();
        let buffer = visual.prop("pos").unwrap().buffer().unwrap();
        let data: Vec<f64> = canvas.backend().read_back_as(buffer).unwrap();
        // Frame 2's callback wrote the tail right before frame 2 was drawn
        let expected = signal(100, 2.0);
        assert_eq!(data[90 * 3..], *expected[90..].as_flattened());
        let head = signal(100, 0.0);
        assert_eq!(data[..90 * 3], *head[..90].as_flattened());
        assert_eq!(canvas.backend().allocations(), 2);
    }

    #[test]
    fn test_callback_validation_error_keeps_loop_running() {
        let mut canvas = canvas();
        let id = canvas.panel(ControllerKind::None, None).unwrap().add_visual(VisualKind::Point);
        canvas.scene_mut().data(id, "pos", vec![[0.0; 3]; 4]).unwrap();
        canvas
            .connect(EventKind::Frame, 0.0, id, |ctx, id| {
                // Out of range: rejected, nothing staged
                ctx.scene().update_range(*id, "pos", vec![[1.0; 3]; 2], 3)
            })
            .unwrap();

        assert_eq!(canvas.run_frames(5).unwrap(), 5);
        assert_eq!(canvas.backend().draws().len(), 5);
    }

    #[test]
    fn test_stop_from_callback_finishes_iteration() {
        let mut canvas = canvas();
        canvas
            .connect(EventKind::Frame, 0.0, (), |ctx, _| {
                if ctx.frame() == 3 {
                    ctx.stop();
                }
                Ok(())
            })
            .unwrap();
        canvas.run().unwrap();
        assert_eq!(canvas.frame_count(), 4);
        assert_eq!(canvas.backend().frames().len(), 4);
    }

    #[test]
    fn test_escape_closes() {
        let host = HeadlessHost::new().with_event(2, HostEvent::Key(Key::Escape));
        let mut canvas = canvas_with(CanvasConfig::default(), HeadlessBackend::new(), host);
        canvas.run().unwrap();
        assert!(canvas.is_closed());
        assert_eq!(canvas.frame_count(), 3);

        let config = CanvasConfig {
            close_on_esc: false,
            max_frames: Some(10),
            ..CanvasConfig::default()
        };
        let host = HeadlessHost::new().with_event(2, HostEvent::Key(Key::Escape));
        let mut canvas = canvas_with(config, HeadlessBackend::new(), host);
        canvas.run().unwrap();
        assert_eq!(canvas.frame_count(), 10);
    }

    #[test]
    fn test_host_close_and_resize() {
        let host = HeadlessHost::new()
            .with_event(1, HostEvent::Resize { width: 1024, height: 768 })
            .close_after(4);
        let mut canvas = canvas_with(CanvasConfig::default(), HeadlessBackend::new(), host);
        canvas.run().unwrap();
        assert_eq!(canvas.frame_count(), 5);
        assert_eq!(canvas.size(), [1024, 768]);
        assert_eq!(canvas.backend().size(), [1024, 768]);
        assert_eq!(canvas.backend().frames()[0].size, [800, 600]);
        assert_eq!(canvas.backend().frames()[1].size, [1024, 768]);
    }

    #[test]
    fn test_host_input_drives_controller() {
        let host = HeadlessHost::new()
            .with_event(0, HostEvent::Pan { panel: PanelId(0), delta: Vec2::new(0.5, 0.0) })
            .with_event(0, HostEvent::Zoom { panel: PanelId(0), factor: -1.0, anchor: Vec2::ZERO })
            .with_event(0, HostEvent::Pan { panel: PanelId(7), delta: Vec2::ONE });
        let mut canvas = canvas_with(CanvasConfig::default(), HeadlessBackend::new(), host);
        canvas
            .panel(ControllerKind::Panzoom, None)
            .unwrap()
            .visual(VisualKind::Point)
            .data("pos", vec![[0.0; 3]])
            .unwrap();
        canvas.run_frames(1).unwrap();

        let draw = &canvas.backend().draws()[0];
        let moved = draw.transform.transform_point3(glam::Vec3::ZERO);
        assert!((moved.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_show_fps_forwards_rate() {
        let config = CanvasConfig {
            show_fps: true,
            ..CanvasConfig::default()
        };
        let mut canvas = canvas_with(config, HeadlessBackend::new(), HeadlessHost::new());
        canvas.run_frames(10).unwrap();
        let fps = canvas.backend().frames()[9].fps.unwrap();
        assert!((fps - 60.0).abs() < 0.5, "fps {fps}");

        let mut quiet = canvas_with(CanvasConfig::default(), HeadlessBackend::new(), HeadlessHost::new());
        quiet.run_frames(3).unwrap();
        assert!(quiet.backend().frames().iter().all(|f| f.fps.is_none()));
    }

    #[test]
    fn test_fatal_backend_error_terminates_run() {
        let backend = HeadlessBackend::new().lose_device_at(3);
        let mut canvas = canvas_with(CanvasConfig::default(), backend, HeadlessHost::new());
        let err = canvas.run().unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, VizError::Backend(BackendError::DeviceLost(_))));
        assert_eq!(canvas.backend().frames().len(), 3);
    }

    #[test]
    fn test_out_of_memory_on_flush_is_fatal() {
        let backend = HeadlessBackend::with_memory_limit(64);
        let mut canvas = canvas_with(CanvasConfig::default(), backend, HeadlessHost::new());
        let visual = canvas.panel(ControllerKind::None, None).unwrap().visual(VisualKind::Point);
        // Validation passes; the device refuses the allocation at flush time
        visual.data("pos", vec![[0.0; 3]; 100]).unwrap();
        let err = canvas.run_frames(2).unwrap_err();
        assert!(matches!(err, VizError::Backend(BackendError::OutOfMemory { .. })));
    }

    #[test]
    fn test_fatal_error_from_callback() {
        let mut canvas = canvas();
        canvas
            .connect(EventKind::Timer, 0.05, (), |_, _| {
                Err(BackendError::DeviceLost("driver reset".into()).into())
            })
            .unwrap();
        assert!(canvas.run().unwrap_err().is_fatal());
        assert!(canvas.frame_count() < 10);
    }

    #[test]
    fn test_line_strip_mismatch_skipped_not_fatal() {
        let mut canvas = canvas();
        let panel = canvas.panel(ControllerKind::Axes, None).unwrap();
        let ok = panel.add_visual(VisualKind::LineStrip);
        let bad = panel.add_visual(VisualKind::LineStrip);
        canvas.scene_mut().data(ok, "pos", signal(10, 0.0)).unwrap();
        canvas.scene_mut().data(ok, "length", vec![4u32, 6]).unwrap();
        canvas.scene_mut().data(bad, "pos", signal(10, 0.0)).unwrap();
        canvas.scene_mut().data(bad, "length", vec![4u32, 5]).unwrap();

        assert_eq!(canvas.run_frames(3).unwrap(), 3);
        assert_eq!(canvas.backend().draws().len(), 3);
        assert!(canvas.backend().draws().iter().all(|d| d.visual == ok.index));
    }

    #[test]
    fn test_axes_panel_survives_subnormal_extent() {
        let mut canvas = canvas();
        let id = canvas.panel(ControllerKind::Axes, None).unwrap().add_visual(VisualKind::Point);
        let tiny = 5e-324;
        canvas
            .scene_mut()
            .data(id, "pos", vec![[0.0, 0.0, 0.0], [tiny, tiny, 0.0]])
            .unwrap();

        assert_eq!(canvas.run_frames(1).unwrap(), 1);
        assert_eq!(canvas.backend().draws().len(), 1);
    }

    #[test]
    fn test_teardown_is_depth_first() {
        let mut canvas = canvas();
        let ids = canvas.grid(1, 2, ControllerKind::Panzoom).unwrap();
        let mut visuals = Vec::new();
        for &panel in &ids {
            for _ in 0..2 {
                let id = canvas.panel_mut(panel).unwrap().add_visual(VisualKind::Marker);
                canvas.scene_mut().data(id, "pos", vec![[0.0; 3]; 3]).unwrap();
                canvas.scene_mut().data(id, "ms", Array::from(vec![5.0f32])).unwrap();
                visuals.push(id);
            }
        }
        canvas.run_frames(1).unwrap();

        let expected: Vec<_> = visuals
            .iter()
            .flat_map(|&id| {
                let visual = canvas.scene().visual(id).unwrap();
                ["pos", "ms"].map(|name| visual.prop(name).and_then(|p| p.buffer()))
            })
            .flatten()
            .collect();
        assert_eq!(expected.len(), 8);

        canvas.destroy();
        assert_eq!(canvas.backend().destroyed(), expected.as_slice());
        assert_eq!(canvas.backend().live_buffers(), 0);

        // Second teardown (from drop) finds nothing left
        canvas.destroy();
        assert_eq!(canvas.backend().destroyed().len(), 8);
    }

    #[test]
    fn test_invalid_viewport() {
        let mut canvas = canvas();
        let bad = Viewport {
            x: 0.5,
            y: 0.0,
            w: 0.75,
            h: 1.0,
        };
        assert!(matches!(
            canvas.panel(ControllerKind::Panzoom, Some(bad)),
            Err(VizError::Domain(_))
        ));
    }

    #[test]
    fn test_headless_constructor() {
        let canvas = Canvas::headless(CanvasConfig::default()).unwrap();
        assert_eq!(canvas.size(), [800, 600]);
        assert!(Canvas::headless(CanvasConfig {
            frame_rate: -1.0,
            ..CanvasConfig::default()
        })
        .is_err());
    }

    #[test]
    fn test_huge_frame_interval_rejected_and_timer_checked() {
        let config = CanvasConfig {
            frame_rate: 1e-20,
            ..CanvasConfig::default()
        };
        let err = Canvas::new(config, HeadlessBackend::new(), HeadlessHost::new(), ManualClock::new()).err();
        assert!(matches!(err, Some(VizError::Domain(_))));

        let mut canvas = canvas();
        let err = canvas.connect(EventKind::Timer, 1e20, (), |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, VizError::Domain(_)));
        assert!(canvas.timers().is_empty());
        assert!(canvas.step().unwrap());
    }
}
