//! Panels: sub-regions of the canvas with their own controller
//!
//! A panel owns an ordered list of visuals (draw order = insertion order)
//! and derives its view transform from the controller. It only ever reads
//! visual data; the axes controller picks up new data bounds whenever a
//! visual's `pos` prop is fully rebound.

mod axes;
mod controller;

pub use axes::{nice_ticks, Axes};
pub use controller::{Arcball, Controller, ControllerKind, PanZoom, ZOOM_MAX, ZOOM_MIN};

use glam::Mat4;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::{Backend, BackendError};
use crate::error::{Result, VizError};
use crate::scene::{PanelId, VisualId};
use crate::visual::{Bounds, DrawTarget, Visual, VisualKind};

/// Panel rectangle in canvas-normalized coordinates, origin top-left.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Viewport {
    pub const FULL: Viewport = Viewport {
        x: 0.0,
        y: 0.0,
        w: 1.0,
        h: 1.0,
    };

    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Result<Self> {
        let viewport = Self { x, y, w, h };
        viewport.validate()?;
        Ok(viewport)
    }

    pub fn validate(&self) -> Result<()> {
        let Viewport { x, y, w, h } = *self;
        let unit = 0.0..=1.0;
        let valid = [x, y, w, h].iter().all(|v| unit.contains(v))
            && w > 0.0
            && h > 0.0
            && x + w <= 1.0 + 1e-5
            && y + h <= 1.0 + 1e-5;
        if !valid {
            return Err(VizError::Domain(format!(
                "viewport [{x}, {y}, {w}, {h}] is outside the canvas"
            )));
        }
        Ok(())
    }

    /// `[x, y, width, height]` in pixels for a canvas of `size`.
    pub fn to_pixels(&self, size: [u32; 2]) -> [f32; 4] {
        let (width, height) = (size[0] as f32, size[1] as f32);
        [self.x * width, self.y * height, self.w * width, self.h * height]
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::FULL
    }
}

#[derive(Debug)]
pub struct Panel {
    id: PanelId,
    viewport: Viewport,
    controller: Controller,
    visuals: Vec<Visual>,
    /// `pos` generation of each visual last seen by the controller
    synced: Vec<u64>,
}

impl Panel {
    pub(crate) fn new(id: PanelId, controller: ControllerKind, viewport: Viewport) -> Self {
        Self {
            id,
            viewport,
            controller: Controller::new(controller),
            visuals: Vec::new(),
            synced: Vec::new(),
        }
    }

    pub fn id(&self) -> PanelId {
        self.id
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Create a visual of `kind` at the end of the draw order.
    pub fn visual(&mut self, kind: VisualKind) -> &mut Visual {
        let id = self.add_visual(kind);
        &mut self.visuals[id.index]
    }

    /// Like [`Panel::visual`], returning a handle for later access.
    pub fn add_visual(&mut self, kind: VisualKind) -> VisualId {
        self.visuals.push(Visual::new(kind));
        self.synced.push(0);
        let index = self.visuals.len() - 1;
        debug!(panel = self.id.0, index, kind = kind.name(), "Visual added");
        VisualId {
            panel: self.id,
            index,
        }
    }

    pub fn visuals(&self) -> &[Visual] {
        &self.visuals
    }

    pub fn visual_at(&self, index: usize) -> Option<&Visual> {
        self.visuals.get(index)
    }

    pub fn visual_mut(&mut self, index: usize) -> Option<&mut Visual> {
        self.visuals.get_mut(index)
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }

    /// View transform from the controller's current state.
    pub fn transform(&self) -> Mat4 {
        self.controller.transform()
    }

    /// Refresh controller bookkeeping from the visuals. Only the axes
    /// controller reads anything, and only after a full `pos` bind.
    pub fn sync(&mut self) {
        let Controller::Axes(axes) = &mut self.controller else {
            return;
        };

        let changed = self
            .visuals
            .iter()
            .zip(&self.synced)
            .any(|(v, &seen)| v.pos_generation() != seen);
        if !changed {
            return;
        }

        let bounds = self
            .visuals
            .iter()
            .filter_map(Visual::bounds)
            .reduce(Bounds::union);
        axes.set_data_bounds(bounds);
        for (seen, visual) in self.synced.iter_mut().zip(&self.visuals) {
            *seen = visual.pos_generation();
        }

        let (x_ticks, y_ticks) = axes.ticks();
        debug!(
            panel = self.id.0,
            x_ticks = x_ticks.len(),
            y_ticks = y_ticks.len(),
            "Axes recomputed"
        );
    }

    pub(crate) fn flush(&mut self, backend: &mut dyn Backend) -> Result<(), BackendError> {
        for visual in &mut self.visuals {
            visual.flush(backend)?;
        }
        Ok(())
    }

    /// Draw every visual in order. Inconsistent visuals are skipped for this
    /// frame; only backend failures are returned. Returns the number drawn.
    pub(crate) fn render(
        &mut self,
        backend: &mut dyn Backend,
        size: [u32; 2],
    ) -> Result<usize, BackendError> {
        self.sync();
        let transform = self.transform();
        let viewport = self.viewport.to_pixels(size);

        let mut drawn = 0;
        for (index, visual) in self.visuals.iter().enumerate() {
            let target = DrawTarget {
                panel: self.id.0,
                visual: index,
                transform,
                viewport,
            };
            match visual.draw(&target, backend) {
                Ok(true) => drawn += 1,
                Ok(false) => {}
                Err(VizError::Backend(e)) => return Err(e),
                Err(e) => warn!(panel = self.id.0, index, error = %e, "Visual skipped"),
            }
        }
        Ok(drawn)
    }

    /// Release visuals in order, each destroying its buffers.
    pub(crate) fn release(&mut self, backend: &mut dyn Backend) {
        for visual in &mut self.visuals {
            visual.release(backend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use glam::{DVec3, Vec2};

    #[test]
    fn test_viewport_validation() {
        assert!(Viewport::new(0.0, 0.0, 0.5, 0.5).is_ok());
        assert!(Viewport::new(0.5, 0.5, 0.5, 0.5).is_ok());
        assert!(Viewport::new(0.0, 0.0, 0.0, 1.0).is_err());
        assert!(Viewport::new(0.6, 0.0, 0.5, 1.0).is_err());
        assert!(Viewport::new(-0.1, 0.0, 0.5, 1.0).is_err());
        assert!(Viewport::new(0.0, 0.0, f32::NAN, 1.0).is_err());
        assert_eq!(
            Viewport::new(0.5, 0.0, 0.5, 1.0).unwrap().to_pixels([800, 600]),
            [400.0, 0.0, 400.0, 600.0]
        );
    }

    #[test]
    fn test_render_skips_inconsistent_visual() {
        let mut backend = HeadlessBackend::new();
        let mut panel = Panel::new(PanelId(0), ControllerKind::Panzoom, Viewport::FULL);
        panel.visual(VisualKind::Point).data("pos", vec![[0.0; 3]; 2]).unwrap();
        let broken = panel.visual(VisualKind::Point);
        broken.data("pos", vec![[0.0; 3]; 2]).unwrap();
        broken.data("color", vec![[0u8; 4]; 3]).unwrap();
        panel.visual(VisualKind::Point).data("pos", vec![[0.0; 3]; 4]).unwrap();

        panel.flush(&mut backend).unwrap();
        assert_eq!(panel.render(&mut backend, [100, 100]).unwrap(), 2);
        let drawn: Vec<usize> = backend.draws().iter().map(|d| d.visual).collect();
        assert_eq!(drawn, vec![0, 2]);
    }

    #[test]
    fn test_axes_follow_full_rebind_only() {
        let mut panel = Panel::new(PanelId(0), ControllerKind::Axes, Viewport::FULL);
        let id = panel.add_visual(VisualKind::Point);
        let visual = panel.visual_mut(id.index).unwrap();
        visual.data("pos", vec![[0.0, 0.0, 0.0], [10.0, 1.0, 0.0]]).unwrap();
        panel.sync();

        let Controller::Axes(axes) = panel.controller() else {
            panic!("axes controller expected");
        };
        let ticks = axes.ticks().0.to_vec();
        assert_eq!(axes.bounds().unwrap().max, DVec3::new(10.0, 1.0, 0.0));

        // Partial updates don't move the axes
        let visual = panel.visual_mut(id.index).unwrap();
        visual.update_range("pos", vec![[500.0, 50.0, 0.0]], 1).unwrap();
        panel.sync();
        let Controller::Axes(axes) = panel.controller() else {
            panic!("axes controller expected");
        };
        assert_eq!(axes.ticks().0, ticks.as_slice());

        let visual = panel.visual_mut(id.index).unwrap();
        visual.data("pos", vec![[0.0, 0.0, 0.0], [500.0, 50.0, 0.0]]).unwrap();
        panel.sync();
        let Controller::Axes(axes) = panel.controller() else {
            panic!("axes controller expected");
        };
        assert_ne!(axes.ticks().0, ticks.as_slice());
        assert_eq!(axes.bounds().unwrap().max.x, 500.0);
    }

    #[test]
    fn test_transform_tracks_controller() {
        let mut panel = Panel::new(PanelId(0), ControllerKind::Panzoom, Viewport::FULL);
        assert_eq!(panel.transform(), Mat4::IDENTITY);
        panel.controller_mut().apply_pan(Vec2::new(0.5, 0.0));
        assert_ne!(panel.transform(), Mat4::IDENTITY);
        panel.controller_mut().reset();
        assert_eq!(panel.transform(), Mat4::IDENTITY);
    }
}
