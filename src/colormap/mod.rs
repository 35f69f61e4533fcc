//! Scalar-to-color mapping
//!
//! Pure functions: no state, safe to call from anywhere, deterministic.

mod palette;

pub use palette::{Palette, PaletteKind, Rgb};

use std::borrow::Cow;

use crate::error::{Result, VizError};

/// RGBA bytes, one quadruple per mapped element.
pub type Rgba = [u8; 4];

/// Input values for [`colormap`].
#[derive(Clone, Copy, Debug)]
pub enum Values<'a> {
    Scalars(&'a [f64]),
    /// Row-major vectors of `dim` components; mapped through their norm.
    Vectors { dim: usize, data: &'a [f64] },
}

impl<'a> From<&'a [f64]> for Values<'a> {
    fn from(values: &'a [f64]) -> Self {
        Values::Scalars(values)
    }
}

impl<'a> From<&'a Vec<f64>> for Values<'a> {
    fn from(values: &'a Vec<f64>) -> Self {
        Values::Scalars(values)
    }
}

impl<'a, const N: usize> From<&'a [[f64; N]]> for Values<'a> {
    fn from(rows: &'a [[f64; N]]) -> Self {
        Values::Vectors {
            dim: N,
            data: rows.as_flattened(),
        }
    }
}

/// Alpha channel of the output.
#[derive(Clone, Copy, Debug, Default)]
pub enum Alpha<'a> {
    #[default]
    Opaque,
    /// Same alpha for every element, in `[0, 1]`.
    Uniform(f64),
    /// One alpha per element, in `[0, 1]`.
    PerElement(&'a [f64]),
}

/// Map `values` to RGBA through `palette`.
///
/// Missing `vmin`/`vmax` default to the observed range of the finite values.
/// Values are normalized linearly and clamped to `[vmin, vmax]`; NaN maps
/// to the low end.
pub fn colormap<'a>(
    values: impl Into<Values<'a>>,
    palette: Palette,
    vmin: Option<f64>,
    vmax: Option<f64>,
    alpha: Alpha<'_>,
) -> Result<Vec<Rgba>> {
    check_domain(vmin, vmax)?;

    let scalars = scalars(values.into())?;
    if let Alpha::PerElement(a) = alpha {
        if a.len() != scalars.len() {
            return Err(VizError::Shape(format!(
                "alpha has {} elements, values have {}",
                a.len(),
                scalars.len()
            )));
        }
    }

    let (observed_min, observed_max) = finite_range(&scalars).unwrap_or((0.0, 1.0));
    let lo = vmin.unwrap_or(observed_min);
    let hi = vmax.unwrap_or(observed_max);

    // With a collapsed range every value sits on the explicitly given side
    // (or on the low end when no bound was given).
    let degenerate_t = if vmax.is_some() && vmin.is_none() { 1.0 } else { 0.0 };

    let out = scalars
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            // Halved operands keep the span finite for bounds near f64::MAX
            let t = if hi > lo {
                (v / 2.0 - lo / 2.0) / (hi / 2.0 - lo / 2.0)
            } else {
                degenerate_t
            };
            let [r, g, b] = palette.sample(t);
            let a = match alpha {
                Alpha::Opaque => 255,
                Alpha::Uniform(a) => alpha_byte(a),
                Alpha::PerElement(a) => alpha_byte(a[i]),
            };
            [r, g, b, a]
        })
        .collect();

    Ok(out)
}

/// Color of integer category `index` (wraps around the palette table).
pub fn colormap_index(palette: Palette, index: usize, alpha: f64) -> Rgba {
    let [r, g, b] = palette.index(index);
    [r, g, b, alpha_byte(alpha)]
}

/// Color of an already-normalized value `t` in `[0, 1]`.
pub fn colormap_scalar(palette: Palette, t: f64) -> Rgba {
    let [r, g, b] = palette.sample(t);
    [r, g, b, 255]
}

fn check_domain(vmin: Option<f64>, vmax: Option<f64>) -> Result<()> {
    for bound in [vmin, vmax].into_iter().flatten() {
        if !bound.is_finite() {
            return Err(VizError::Domain(format!("color range bound {bound} is not finite")));
        }
    }
    if let (Some(lo), Some(hi)) = (vmin, vmax) {
        if lo >= hi {
            return Err(VizError::Domain(format!("vmin ({lo}) must be below vmax ({hi})")));
        }
    }
    Ok(())
}

fn scalars(values: Values<'_>) -> Result<Cow<'_, [f64]>> {
    match values {
        Values::Scalars(v) => Ok(Cow::Borrowed(v)),
        Values::Vectors { dim, data } => {
            if dim == 0 || data.len() % dim != 0 {
                return Err(VizError::Shape(format!(
                    "{} components can't be split into vectors of {dim}",
                    data.len()
                )));
            }
            Ok(Cow::Owned(
                data.chunks_exact(dim)
                    .map(|v| v.iter().map(|c| c * c).sum::<f64>().sqrt())
                    .collect(),
            ))
        }
    }
}

fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn alpha_byte(a: f64) -> u8 {
    (a.clamp(0.0, 1.0) * 255.0).round() as u8
}
