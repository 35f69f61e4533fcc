//! Named palettes
//!
//! Continuous palettes are piecewise-linear ramps through a handful of
//! control points. Categorical palettes are fixed color tables; `glasbey`
//! is generated once by stepping the hue by the golden ratio so that
//! neighbouring indices stay far apart.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use ::palette::{Hsv, IntoColor, Srgb};
use serde::{Deserialize, Serialize};

use crate::error::VizError;

pub type Rgb = [u8; 3];

// ============================================================================
// Control points
// ============================================================================

const VIRIDIS: &[Rgb] = &[
    [68, 1, 84],
    [71, 44, 122],
    [59, 81, 139],
    [44, 113, 142],
    [33, 144, 141],
    [39, 173, 129],
    [92, 200, 99],
    [170, 220, 50],
    [253, 231, 37],
];

const PLASMA: &[Rgb] = &[
    [13, 8, 135],
    [75, 3, 161],
    [125, 3, 168],
    [168, 34, 150],
    [203, 70, 121],
    [229, 107, 93],
    [248, 148, 65],
    [253, 195, 40],
    [240, 249, 33],
];

const INFERNO: &[Rgb] = &[
    [0, 0, 4],
    [31, 12, 72],
    [85, 15, 109],
    [136, 34, 106],
    [186, 54, 85],
    [227, 89, 51],
    [249, 140, 10],
    [249, 201, 50],
    [252, 255, 164],
];

const MAGMA: &[Rgb] = &[
    [0, 0, 4],
    [28, 16, 68],
    [79, 18, 123],
    [129, 37, 129],
    [181, 54, 122],
    [229, 80, 100],
    [251, 135, 97],
    [254, 194, 135],
    [252, 253, 191],
];

const CIVIDIS: &[Rgb] = &[
    [0, 34, 78],
    [35, 62, 108],
    [85, 91, 108],
    [124, 123, 120],
    [166, 157, 117],
    [210, 194, 98],
    [254, 232, 56],
];

const GRAY: &[Rgb] = &[[0, 0, 0], [255, 255, 255]];

const HOT: &[Rgb] = &[[11, 0, 0], [255, 0, 0], [255, 255, 0], [255, 255, 255]];

const COOL: &[Rgb] = &[[0, 255, 255], [255, 0, 255]];

const RDBU: &[Rgb] = &[
    [103, 0, 31],
    [178, 24, 43],
    [214, 96, 77],
    [244, 165, 130],
    [253, 219, 199],
    [247, 247, 247],
    [209, 229, 240],
    [146, 197, 222],
    [67, 147, 195],
    [33, 102, 172],
    [5, 48, 97],
];

// ============================================================================
// Categorical tables
// ============================================================================

const TAB10: &[Rgb] = &[
    [31, 119, 180],
    [255, 127, 14],
    [44, 160, 44],
    [214, 39, 40],
    [148, 103, 189],
    [140, 86, 75],
    [227, 119, 194],
    [127, 127, 127],
    [188, 189, 34],
    [23, 190, 207],
];

const SET1: &[Rgb] = &[
    [228, 26, 28],
    [55, 126, 184],
    [77, 175, 74],
    [152, 78, 163],
    [255, 127, 0],
    [255, 255, 51],
    [166, 86, 40],
    [247, 129, 191],
    [153, 153, 153],
];

const GLASBEY_LEN: usize = 256;

fn glasbey() -> &'static [Rgb] {
    static TABLE: OnceLock<Vec<Rgb>> = OnceLock::new();
    TABLE.get_or_init(|| {
        const GOLDEN: f32 = 0.618_034;
        const SATURATION: [f32; 3] = [0.95, 0.6, 0.8];
        const VALUE: [f32; 4] = [0.95, 0.7, 0.85, 0.55];

        (0..GLASBEY_LEN)
            .map(|i| {
                let hue = (i as f32 * GOLDEN).fract() * 360.0;
                let s = SATURATION[i % SATURATION.len()];
                let v = VALUE[(i / SATURATION.len()) % VALUE.len()];
                let rgb: Srgb<f32> = Hsv::new(hue, s, v).into_color();
                let rgb: Srgb<u8> = rgb.into_format();
                [rgb.red, rgb.green, rgb.blue]
            })
            .collect()
    })
}

// ============================================================================
// Palette
// ============================================================================

/// Palette family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaletteKind {
    /// Smooth gradient indexed by the normalized value.
    Continuous,
    /// Discrete, maximally distinguishable colors.
    Categorical,
}

/// Named color palette.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Palette {
    #[default]
    Viridis,
    Plasma,
    Inferno,
    Magma,
    Cividis,
    Gray,
    Hot,
    Cool,
    Rdbu,
    Glasbey,
    Tab10,
    Set1,
}

impl Palette {
    pub const ALL: &'static [Palette] = &[
        Palette::Viridis,
        Palette::Plasma,
        Palette::Inferno,
        Palette::Magma,
        Palette::Cividis,
        Palette::Gray,
        Palette::Hot,
        Palette::Cool,
        Palette::Rdbu,
        Palette::Glasbey,
        Palette::Tab10,
        Palette::Set1,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Palette::Viridis => "viridis",
            Palette::Plasma => "plasma",
            Palette::Inferno => "inferno",
            Palette::Magma => "magma",
            Palette::Cividis => "cividis",
            Palette::Gray => "gray",
            Palette::Hot => "hot",
            Palette::Cool => "cool",
            Palette::Rdbu => "rdbu",
            Palette::Glasbey => "glasbey",
            Palette::Tab10 => "tab10",
            Palette::Set1 => "set1",
        }
    }

    pub fn kind(self) -> PaletteKind {
        match self {
            Palette::Glasbey | Palette::Tab10 | Palette::Set1 => PaletteKind::Categorical,
            _ => PaletteKind::Continuous,
        }
    }

    /// Control points (continuous) or color table (categorical).
    pub fn colors(self) -> &'static [Rgb] {
        match self {
            Palette::Viridis => VIRIDIS,
            Palette::Plasma => PLASMA,
            Palette::Inferno => INFERNO,
            Palette::Magma => MAGMA,
            Palette::Cividis => CIVIDIS,
            Palette::Gray => GRAY,
            Palette::Hot => HOT,
            Palette::Cool => COOL,
            Palette::Rdbu => RDBU,
            Palette::Glasbey => glasbey(),
            Palette::Tab10 => TAB10,
            Palette::Set1 => SET1,
        }
    }

    /// Color for a normalized value `t` in `[0, 1]` (clamped).
    pub fn sample(self, t: f64) -> Rgb {
        let colors = self.colors();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let last = colors.len() - 1;

        match self.kind() {
            PaletteKind::Categorical => colors[(t * last as f64).round() as usize],
            PaletteKind::Continuous => {
                let x = t * last as f64;
                let i = x.floor() as usize;
                if i >= last {
                    return colors[last];
                }
                let f = x - i as f64;
                let [r0, g0, b0] = colors[i];
                let [r1, g1, b1] = colors[i + 1];
                let lerp = |a: u8, b: u8| (a as f64 + f * (b as f64 - a as f64)).round() as u8;
                [lerp(r0, r1), lerp(g0, g1), lerp(b0, b1)]
            }
        }
    }

    /// Color of integer category `index`, wrapping around the table.
    pub fn index(self, index: usize) -> Rgb {
        let colors = self.colors();
        colors[index % colors.len()]
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Palette {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Palette::ALL
            .iter()
            .copied()
            .find(|p| p.name() == needle)
            .ok_or_else(|| VizError::UnknownName {
                what: "palette",
                name: s.to_string(),
            })
    }
}
