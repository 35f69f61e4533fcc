//! Visual kinds and their prop tables

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::{DType, PropSpec};
use crate::error::VizError;

/// Primitive assembly used by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
}

/// Closed set of drawable primitives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualKind {
    Point,
    Marker,
    /// Independent segments, two vertices each
    Line,
    /// Connected polylines partitioned by the `length` prop
    LineStrip,
    Triangle,
}

const POS: PropSpec = PropSpec::vertex("pos", DType::F64, 3).required();
const COLOR: PropSpec = PropSpec::vertex("color", DType::U8, 4).broadcast();

static POINT: [PropSpec; 2] = [POS, COLOR];

static MARKER: [PropSpec; 5] = [
    POS,
    COLOR,
    PropSpec::vertex("ms", DType::F32, 1).broadcast(),
    PropSpec::vertex("marker", DType::U8, 1).broadcast(),
    PropSpec::vertex("angle", DType::F32, 1).broadcast(),
];

static LINE: [PropSpec; 2] = [POS, COLOR];

static LINE_STRIP: [PropSpec; 3] = [
    POS,
    COLOR,
    PropSpec::group("length", DType::U32, 1).required(),
];

static TRIANGLE: [PropSpec; 2] = [POS, COLOR];

impl VisualKind {
    pub const ALL: &'static [VisualKind] = &[
        VisualKind::Point,
        VisualKind::Marker,
        VisualKind::Line,
        VisualKind::LineStrip,
        VisualKind::Triangle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VisualKind::Point => "point",
            VisualKind::Marker => "marker",
            VisualKind::Line => "line",
            VisualKind::LineStrip => "line_strip",
            VisualKind::Triangle => "triangle",
        }
    }

    pub fn schema(self) -> &'static [PropSpec] {
        match self {
            VisualKind::Point => &POINT,
            VisualKind::Marker => &MARKER,
            VisualKind::Line => &LINE,
            VisualKind::LineStrip => &LINE_STRIP,
            VisualKind::Triangle => &TRIANGLE,
        }
    }

    pub fn topology(self) -> Topology {
        match self {
            VisualKind::Point | VisualKind::Marker => Topology::PointList,
            VisualKind::Line => Topology::LineList,
            VisualKind::LineStrip => Topology::LineStrip,
            VisualKind::Triangle => Topology::TriangleList,
        }
    }

    /// Vertex count must be a multiple of this.
    pub fn vertex_multiple(self) -> usize {
        match self {
            VisualKind::Line => 2,
            VisualKind::Triangle => 3,
            _ => 1,
        }
    }
}

impl fmt::Display for VisualKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VisualKind {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "point" | "points" => Ok(VisualKind::Point),
            "marker" | "markers" => Ok(VisualKind::Marker),
            "line" | "segment" => Ok(VisualKind::Line),
            "line_strip" | "line-strip" => Ok(VisualKind::LineStrip),
            "triangle" | "triangles" => Ok(VisualKind::Triangle),
            _ => Err(VizError::UnknownName {
                what: "visual kind",
                name: s.to_string(),
            }),
        }
    }
}
