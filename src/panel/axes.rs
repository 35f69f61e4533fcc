//! Axes controller: pan/zoom over data coordinates, with tick bookkeeping

use glam::{DVec2, Mat4, Vec2, Vec3};

use super::controller::PanZoom;
use crate::visual::Bounds;

/// Roughly this many ticks per axis.
const TICK_TARGET: usize = 5;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Axes {
    panzoom: PanZoom,
    bounds: Option<Bounds>,
    x_ticks: Vec<f64>,
    y_ticks: Vec<f64>,
}

impl Axes {
    pub fn panzoom(&self) -> &PanZoom {
        &self.panzoom
    }

    pub fn panzoom_mut(&mut self) -> &mut PanZoom {
        &mut self.panzoom
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Replace the data bounds and recompute the ticks.
    pub fn set_data_bounds(&mut self, bounds: Option<Bounds>) {
        self.bounds = bounds;
        match bounds {
            Some(b) => {
                self.x_ticks = nice_ticks(b.min.x, b.max.x, TICK_TARGET);
                self.y_ticks = nice_ticks(b.min.y, b.max.y, TICK_TARGET);
            }
            None => {
                self.x_ticks.clear();
                self.y_ticks.clear();
            }
        }
    }

    /// Tick positions in data units: `(x, y)`.
    pub fn ticks(&self) -> (&[f64], &[f64]) {
        (&self.x_ticks, &self.y_ticks)
    }

    /// Center and half extent of the data rectangle (extent never zero).
    fn frame(&self) -> (DVec2, DVec2) {
        match self.bounds {
            Some(b) => {
                let (min, max) = (b.min.truncate(), b.max.truncate());
                let half = (max - min) * 0.5;
                let half = DVec2::select(half.cmpgt(DVec2::splat(f64::EPSILON)), half, DVec2::ONE);
                ((min + max) * 0.5, half)
            }
            None => (DVec2::ZERO, DVec2::ONE),
        }
    }

    /// Maps the data rectangle onto `[-1, 1]²`.
    pub fn normalization(&self) -> Mat4 {
        let (center, half) = self.frame();
        let scale = Vec3::new((1.0 / half.x) as f32, (1.0 / half.y) as f32, 1.0);
        Mat4::from_scale(scale) * Mat4::from_translation(-center.as_vec2().extend(0.0))
    }

    pub fn transform(&self) -> Mat4 {
        self.panzoom.transform() * self.normalization()
    }

    /// Data rectangle currently visible through the viewport: `(min, max)`.
    pub fn visible_range(&self) -> (DVec2, DVec2) {
        let (center, half) = self.frame();
        let to_data = |ndc: Vec2| self.panzoom.screen_to_world(ndc).as_dvec2() * half + center;
        (to_data(Vec2::NEG_ONE), to_data(Vec2::ONE))
    }
}

/// Tick positions on a 1-2-5 grid covering `[lo, hi]`, about `target` of them.
pub fn nice_ticks(lo: f64, hi: f64, target: usize) -> Vec<f64> {
    if !lo.is_finite() || !hi.is_finite() || hi < lo || target == 0 {
        return Vec::new();
    }
    if hi == lo {
        return vec![lo];
    }

    // Spans too narrow or too wide for a decimal grid keep just the ends
    let raw = (hi - lo) / target as f64;
    if !raw.is_normal() {
        return vec![lo, hi];
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    // Slack absorbs rounding in raw / magnitude
    let step = match raw / magnitude - 1e-9 {
        n if n <= 1.0 => 1.0,
        n if n <= 2.0 => 2.0,
        n if n <= 5.0 => 5.0,
        _ => 10.0,
    } * magnitude;
    if !step.is_normal() {
        return vec![lo, hi];
    }

    let first = (lo / step - 1e-9).ceil() as i64;
    let last = (hi / step + 1e-9).floor() as i64;
    let max_ticks = 4 * target as i64;
    match last.checked_sub(first) {
        Some(n) if (0..max_ticks).contains(&n) => (first..=last).map(|k| k as f64 * step).collect(),
        _ => vec![lo, hi],
    }
}
