//! Scene graph: the ordered panels of a canvas
//!
//! Callbacks get a `&mut Scene` (through the timer context) and address
//! panels and visuals with the ids handed out at creation.

use tracing::debug;

use crate::backend::{Backend, BackendError};
use crate::data::{Array, BindOutcome};
use crate::error::{Result, VizError};
use crate::panel::{ControllerKind, Panel, Viewport};
use crate::visual::Visual;

/// Index of a panel in its canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanelId(pub usize);

/// A visual, addressed by its panel and its position in the draw order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VisualId {
    pub panel: PanelId,
    pub index: usize,
}

#[derive(Debug, Default)]
pub struct Scene {
    panels: Vec<Panel>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a panel. Fails on viewports outside the canvas.
    pub fn add_panel(&mut self, controller: ControllerKind, viewport: Viewport) -> Result<&mut Panel> {
        viewport.validate()?;
        let id = PanelId(self.panels.len());
        debug!(panel = id.0, %controller, ?viewport, "Panel added");
        self.panels.push(Panel::new(id, controller, viewport));
        Ok(&mut self.panels[id.0])
    }

    /// `rows × cols` panels covering the canvas, row-major.
    pub fn grid(&mut self, rows: usize, cols: usize, controller: ControllerKind) -> Result<Vec<PanelId>> {
        if rows == 0 || cols == 0 {
            return Err(VizError::Domain(format!("grid of {rows}x{cols} panels")));
        }
        let (w, h) = (1.0 / cols as f32, 1.0 / rows as f32);
        let mut ids = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let viewport = Viewport::new(col as f32 * w, row as f32 * h, w, h)?;
                ids.push(self.add_panel(controller, viewport)?.id());
            }
        }
        Ok(ids)
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn panel(&self, id: PanelId) -> Option<&Panel> {
        self.panels.get(id.0)
    }

    pub fn panel_mut(&mut self, id: PanelId) -> Option<&mut Panel> {
        self.panels.get_mut(id.0)
    }

    pub fn visual(&self, id: VisualId) -> Option<&Visual> {
        self.panel(id.panel)?.visual_at(id.index)
    }

    pub fn visual_mut(&mut self, id: VisualId) -> Option<&mut Visual> {
        self.panel_mut(id.panel)?.visual_mut(id.index)
    }

    /// Full bind on the visual behind `id`.
    pub fn data(&mut self, id: VisualId, name: &str, array: impl Into<Array>) -> Result<BindOutcome> {
        self.require(id)?.data(name, array)
    }

    /// Partial update on the visual behind `id`.
    pub fn update_range(
        &mut self,
        id: VisualId,
        name: &str,
        array: impl Into<Array>,
        offset: usize,
    ) -> Result<()> {
        self.require(id)?.update_range(name, array, offset)
    }

    fn require(&mut self, id: VisualId) -> Result<&mut Visual> {
        self.visual_mut(id).ok_or_else(|| VizError::UnknownName {
            what: "visual",
            name: format!("{}/{}", id.panel.0, id.index),
        })
    }

    pub(crate) fn flush(&mut self, backend: &mut dyn Backend) -> Result<(), BackendError> {
        for panel in &mut self.panels {
            panel.flush(backend)?;
        }
        Ok(())
    }

    /// Draw every panel in order; returns the number of visuals drawn.
    pub(crate) fn render(&mut self, backend: &mut dyn Backend, size: [u32; 2]) -> Result<usize, BackendError> {
        let mut drawn = 0;
        for panel in &mut self.panels {
            drawn += panel.render(backend, size)?;
        }
        Ok(drawn)
    }

    /// Depth-first teardown: panels in order, then their visuals, then props.
    pub(crate) fn release(&mut self, backend: &mut dyn Backend) {
        for panel in &mut self.panels {
            panel.release(backend);
        }
        self.panels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use crate::visual::VisualKind;

    #[test]
    fn test_grid_is_row_major() {
        let mut scene = Scene::new();
        let ids = scene.grid(2, 3, ControllerKind::Panzoom).unwrap();
        assert_eq!(ids.len(), 6);
        let vp = scene.panel(ids[4]).unwrap().viewport();
        assert!((vp.x - 1.0 / 3.0).abs() < 1e-6);
        assert!((vp.y - 0.5).abs() < 1e-6);
        assert!(scene.grid(0, 3, ControllerKind::Panzoom).is_err());
    }

    #[test]
    fn test_invalid_viewport_adds_nothing() {
        let mut scene = Scene::new();
        let bad = Viewport {
            x: 0.0,
            y: 0.0,
            w: 2.0,
            h: 1.0,
        };
        assert!(matches!(
            scene.add_panel(ControllerKind::None, bad),
            Err(VizError::Domain(_))
        ));
        assert!(scene.panels().is_empty());
    }

    #[test]
    fn test_unknown_visual_id() {
        let mut scene = Scene::new();
        let id = VisualId {
            panel: PanelId(3),
            index: 0,
        };
        assert!(matches!(
            scene.data(id, "pos", vec![[0.0; 3]]),
            Err(VizError::UnknownName { what: "visual", .. })
        ));
    }

    #[test]
    fn test_release_is_depth_first() {
        let mut backend = HeadlessBackend::new();
        let mut scene = Scene::new();
        let mut ids = Vec::new();
        for _ in 0..2 {
            let panel = scene.add_panel(ControllerKind::Panzoom, Viewport::FULL).unwrap();
            for _ in 0..2 {
                ids.push(panel.add_visual(VisualKind::Point));
            }
        }
        for &id in &ids {
            scene.data(id, "pos", vec![[0.0; 3]; 2]).unwrap();
            scene.data(id, "color", vec![[0u8; 4]]).unwrap();
        }
        scene.flush(&mut backend).unwrap();

        let expected: Vec<_> = ids
            .iter()
            .flat_map(|&id| {
                let visual = scene.visual(id).unwrap();
                visual.props().iter().filter_map(|p| p.buffer()).collect::<Vec<_>>()
            })
            .collect();
        assert_eq!(expected.len(), 8);

        scene.release(&mut backend);
        assert_eq!(backend.destroyed(), expected.as_slice());
        assert_eq!(backend.live_buffers(), 0);
    }
}
