//! Interaction controllers
//!
//! Each controller is a small state machine driven by the host
//! (`apply_pan`, `apply_zoom`, `apply_rotation`) that yields the panel's
//! view transform. Coordinates are normalized device coordinates.

use std::fmt;
use std::str::FromStr;

use glam::{Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::axes::Axes;
use crate::error::{Result, VizError};

pub const ZOOM_MIN: f32 = 1e-4;
pub const ZOOM_MAX: f32 = 1e4;

// ============================================================================
// Pan / zoom
// ============================================================================

/// 2D camera: `screen = world * zoom + pan`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanZoom {
    pub pan: Vec2,
    pub zoom: Vec2,
}

impl Default for PanZoom {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: Vec2::ONE,
        }
    }
}

impl PanZoom {
    pub fn apply_pan(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Scale by `factor` about `anchor` (screen space), then translate so
    /// that the anchor stays put.
    pub fn apply_zoom(&mut self, factor: f32, anchor: Vec2) -> Result<()> {
        check_factor(factor)?;
        let zoom = (self.zoom * factor).clamp(Vec2::splat(ZOOM_MIN), Vec2::splat(ZOOM_MAX));
        // Clamping may shorten the step on either axis
        let effective = zoom / self.zoom;
        self.pan = anchor - (anchor - self.pan) * effective;
        self.zoom = zoom;
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        world * self.zoom + self.pan
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        (screen - self.pan) / self.zoom
    }

    pub fn transform(&self) -> Mat4 {
        Mat4::from_translation(self.pan.extend(0.0)) * Mat4::from_scale(self.zoom.extend(1.0))
    }
}

fn check_factor(factor: f32) -> Result<()> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(VizError::Domain(format!("zoom factor {factor} must be positive")));
    }
    Ok(())
}

// ============================================================================
// Arcball
// ============================================================================

/// 3D orientation controller.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Arcball {
    pub orientation: Quat,
}

impl Arcball {
    /// Compose `delta` onto the current orientation and renormalize.
    pub fn apply_rotation(&mut self, delta: Quat) -> Result<()> {
        if !delta.is_finite() || delta.length_squared() < f32::EPSILON {
            return Err(VizError::Domain(format!("invalid rotation {delta:?}")));
        }
        self.orientation = (delta.normalize() * self.orientation).normalize();
        Ok(())
    }

    /// Rotation for a pointer drag of `(dx, dy)` in NDC; a drag across the
    /// full viewport turns by half a revolution.
    pub fn apply_drag(&mut self, dx: f32, dy: f32) -> Result<()> {
        let drag = Vec2::new(dx, dy);
        if !drag.is_finite() {
            return Err(VizError::Domain(format!("invalid drag {drag}")));
        }
        let len = drag.length();
        if len == 0.0 {
            return Ok(());
        }
        let axis = Vec3::new(-dy, dx, 0.0) / len;
        self.apply_rotation(Quat::from_axis_angle(axis, len * std::f32::consts::FRAC_PI_2))
    }

    pub fn reset(&mut self) {
        self.orientation = Quat::IDENTITY;
    }

    pub fn transform(&self) -> Mat4 {
        Mat4::from_quat(self.orientation)
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Controller names accepted by `Canvas::panel`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    None,
    #[default]
    Panzoom,
    Axes,
    Arcball,
}

impl ControllerKind {
    pub const ALL: &'static [ControllerKind] = &[
        ControllerKind::None,
        ControllerKind::Panzoom,
        ControllerKind::Axes,
        ControllerKind::Arcball,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ControllerKind::None => "none",
            ControllerKind::Panzoom => "panzoom",
            ControllerKind::Axes => "axes",
            ControllerKind::Arcball => "arcball",
        }
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ControllerKind {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        ControllerKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == needle)
            .ok_or_else(|| VizError::UnknownName {
                what: "controller",
                name: s.to_string(),
            })
    }
}

/// Live controller state of a panel.
#[derive(Clone, Debug, PartialEq)]
pub enum Controller {
    None,
    PanZoom(PanZoom),
    Axes(Axes),
    Arcball(Arcball),
}

impl Controller {
    pub fn new(kind: ControllerKind) -> Self {
        match kind {
            ControllerKind::None => Controller::None,
            ControllerKind::Panzoom => Controller::PanZoom(PanZoom::default()),
            ControllerKind::Axes => Controller::Axes(Axes::default()),
            ControllerKind::Arcball => Controller::Arcball(Arcball::default()),
        }
    }

    pub fn kind(&self) -> ControllerKind {
        match self {
            Controller::None => ControllerKind::None,
            Controller::PanZoom(_) => ControllerKind::Panzoom,
            Controller::Axes(_) => ControllerKind::Axes,
            Controller::Arcball(_) => ControllerKind::Arcball,
        }
    }

    fn panzoom_mut(&mut self) -> Option<&mut PanZoom> {
        match self {
            Controller::PanZoom(pz) => Some(pz),
            Controller::Axes(axes) => Some(axes.panzoom_mut()),
            _ => None,
        }
    }

    /// Ignored by controllers without a pan state.
    pub fn apply_pan(&mut self, delta: Vec2) {
        if let Some(pz) = self.panzoom_mut() {
            pz.apply_pan(delta);
        }
    }

    pub fn apply_zoom(&mut self, factor: f32, anchor: Vec2) -> Result<()> {
        check_factor(factor)?;
        match self.panzoom_mut() {
            Some(pz) => pz.apply_zoom(factor, anchor),
            None => Ok(()),
        }
    }

    pub fn apply_rotation(&mut self, delta: Quat) -> Result<()> {
        match self {
            Controller::Arcball(ball) => ball.apply_rotation(delta),
            _ => Ok(()),
        }
    }

    /// Pointer drag: pans 2D controllers, rotates the arcball.
    pub fn apply_drag(&mut self, delta: Vec2) -> Result<()> {
        match self {
            Controller::Arcball(ball) => ball.apply_drag(delta.x, delta.y),
            _ => {
                self.apply_pan(delta);
                Ok(())
            }
        }
    }

    pub fn reset(&mut self) {
        match self {
            Controller::None => {}
            Controller::PanZoom(pz) => pz.reset(),
            Controller::Axes(axes) => axes.panzoom_mut().reset(),
            Controller::Arcball(ball) => ball.reset(),
        }
    }

    pub fn transform(&self) -> Mat4 {
        match self {
            Controller::None => Mat4::IDENTITY,
            Controller::PanZoom(pz) => pz.transform(),
            Controller::Axes(axes) => axes.transform(),
            Controller::Arcball(ball) => ball.transform(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut pz = PanZoom::default();
        pz.apply_pan(Vec2::new(0.2, -0.1));
        let anchor = Vec2::new(0.5, 0.25);
        let world = pz.screen_to_world(anchor);

        pz.apply_zoom(2.5, anchor).unwrap();
        assert!(close(pz.world_to_screen(world), anchor));
        assert!(close(pz.zoom, Vec2::splat(2.5)));

        pz.apply_zoom(0.1, anchor).unwrap();
        assert!(close(pz.world_to_screen(world), anchor));
    }

    #[test]
    fn test_zoom_clamped() {
        let mut pz = PanZoom::default();
        pz.apply_zoom(1e9, Vec2::ZERO).unwrap();
        assert_eq!(pz.zoom, Vec2::splat(ZOOM_MAX));
        pz.apply_zoom(1e-12, Vec2::ZERO).unwrap();
        assert_eq!(pz.zoom, Vec2::splat(ZOOM_MIN));
    }

    #[test]
    fn test_invalid_zoom_factor() {
        let mut controller = Controller::new(ControllerKind::Panzoom);
        for factor in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                controller.apply_zoom(factor, Vec2::ZERO),
                Err(VizError::Domain(_))
            ));
        }
        assert_eq!(controller, Controller::new(ControllerKind::Panzoom));
    }

    #[test]
    fn test_transform_matches_world_to_screen() {
        let mut pz = PanZoom::default();
        pz.apply_pan(Vec2::new(0.3, 0.1));
        pz.apply_zoom(2.0, Vec2::new(-0.5, 0.5)).unwrap();
        let p = Vec2::new(0.25, -0.75);
        let m = pz.transform().transform_point3(p.extend(0.0));
        assert!(close(m.truncate(), pz.world_to_screen(p)));
    }

    #[test]
    fn test_arcball_stays_normalized() {
        let mut ball = Arcball::default();
        for i in 0..500 {
            let t = i as f32 * 0.01;
            ball.apply_drag(t.sin() * 0.1, t.cos() * 0.07).unwrap();
        }
        assert!((ball.orientation.length() - 1.0).abs() < 1e-5);
        assert!(ball.apply_rotation(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0)).is_err());

        ball.reset();
        assert_eq!(ball.transform(), Mat4::IDENTITY);
    }

    #[test]
    fn test_none_is_identity() {
        let mut controller = Controller::new(ControllerKind::None);
        controller.apply_pan(Vec2::ONE);
        controller.apply_zoom(3.0, Vec2::ZERO).unwrap();
        assert_eq!(controller.transform(), Mat4::IDENTITY);
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("axes".parse::<ControllerKind>().unwrap(), ControllerKind::Axes);
        assert!(matches!(
            "orbit".parse::<ControllerKind>(),
            Err(VizError::UnknownName { what: "controller", .. })
        ));
    }
}
