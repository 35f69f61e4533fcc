//! Typed renderable primitives
//!
//! A [`Visual`] is a [`VisualKind`] plus one prop per entry of the kind's
//! table. Props are validated on upload; cross-prop consistency is only
//! checked when the visual is drawn.

mod kind;

pub use kind::{Topology, VisualKind};

use glam::{DVec3, Mat4};
use tracing::trace;

use crate::backend::{Backend, BackendError, DrawCall};
use crate::data::{Alignment, Array, BindOutcome, DataStore, Prop};
use crate::error::{Result, VizError};

/// Axis-aligned box around the finite positions of a visual.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: DVec3,
    pub max: DVec3,
}

impl Bounds {
    /// Bounds of interleaved xyz triples; non-finite points are ignored.
    pub fn from_xyz(data: &[f64]) -> Option<Self> {
        data.chunks_exact(3)
            .map(|p| DVec3::new(p[0], p[1], p[2]))
            .filter(|p| p.is_finite())
            .fold(None, |acc: Option<Bounds>, p| {
                Some(match acc {
                    None => Bounds { min: p, max: p },
                    Some(b) => Bounds {
                        min: b.min.min(p),
                        max: b.max.max(p),
                    },
                })
            })
    }

    pub fn union(self, other: Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Where and how a visual is drawn this frame.
#[derive(Clone, Copy, Debug)]
pub struct DrawTarget {
    pub panel: usize,
    pub visual: usize,
    pub transform: Mat4,
    /// Pixel viewport `[x, y, width, height]`
    pub viewport: [f32; 4],
}

#[derive(Debug)]
pub struct Visual {
    kind: VisualKind,
    store: DataStore,
    /// Host-side summary of the last full `pos` bind
    bounds: Option<Bounds>,
    /// Host copy of the per-group sizes
    groups: Vec<u32>,
    /// Bumped on every full `pos` bind
    pos_generation: u64,
}

impl Visual {
    pub fn new(kind: VisualKind) -> Self {
        Self {
            kind,
            store: DataStore::new(kind.name(), kind.schema()),
            bounds: None,
            groups: Vec::new(),
            pos_generation: 0,
        }
    }

    pub fn kind(&self) -> VisualKind {
        self.kind
    }

    /// Bind `array` to prop `name`: full upload, reallocating only when
    /// the element count changes.
    pub fn data(&mut self, name: &str, array: impl Into<Array>) -> Result<BindOutcome> {
        self.bind(name, &array.into())
    }

    pub fn bind(&mut self, name: &str, array: &Array) -> Result<BindOutcome> {
        let (idx, outcome) = self.store.bind(name, array)?;
        let spec = self.store.props()[idx].spec();

        if spec.name == "pos" {
            self.bounds = array.as_f64().and_then(Bounds::from_xyz);
            self.pos_generation += 1;
        } else if spec.alignment == Alignment::PerGroup {
            self.groups = array.as_u32().map(<[u32]>::to_vec).unwrap_or_default();
        }
        Ok(outcome)
    }

    /// Overwrite elements `offset..offset + array.len()` of prop `name`.
    pub fn update_range(
        &mut self,
        name: &str,
        array: impl Into<Array>,
        offset: usize,
    ) -> Result<()> {
        let array = array.into();
        let idx = self.store.update_range(name, &array, offset)?;

        if self.store.props()[idx].spec().alignment == Alignment::PerGroup {
            let dst = offset
                .checked_add(array.len())
                .and_then(|end| self.groups.get_mut(offset..end));
            if let (Some(dst), Some(values)) = (dst, array.as_u32()) {
                dst.copy_from_slice(values);
            }
        }
        Ok(())
    }

    pub fn prop(&self, name: &str) -> Option<&Prop> {
        self.store.get(name)
    }

    pub fn props(&self) -> &[Prop] {
        self.store.props()
    }

    /// Number of `pos` elements.
    pub fn vertex_count(&self) -> usize {
        self.store.get("pos").map_or(0, Prop::count)
    }

    /// Data bounds as of the last full `pos` bind.
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn groups(&self) -> &[u32] {
        &self.groups
    }

    pub fn pos_generation(&self) -> u64 {
        self.pos_generation
    }

    /// Cross-prop consistency: required props bound, per-vertex counts
    /// agree, topology and group constraints hold.
    pub fn check(&self) -> Result<()> {
        let n = self.vertex_count();
        let inconsistent = |reason: String| VizError::InconsistentProps {
            kind: self.kind.name(),
            reason,
        };

        for prop in self.store.props() {
            let spec = prop.spec();
            if !prop.is_bound() {
                if spec.required {
                    return Err(inconsistent(format!("required prop `{}` is not bound", spec.name)));
                }
                continue;
            }
            if spec.alignment == Alignment::PerVertex {
                let count = prop.count();
                let broadcast = spec.broadcast && count == 1;
                if count != n && !broadcast {
                    return Err(inconsistent(format!(
                        "`{}` has {count} elements, `pos` has {n}",
                        spec.name
                    )));
                }
            }
        }

        let multiple = self.kind.vertex_multiple();
        if n % multiple != 0 {
            return Err(inconsistent(format!(
                "{n} vertices is not a multiple of {multiple}"
            )));
        }

        if self.kind == VisualKind::LineStrip {
            let total: u64 = self.groups.iter().map(|&g| g as u64).sum();
            if total != n as u64 {
                return Err(inconsistent(format!(
                    "`length` sums to {total}, `pos` has {n} vertices"
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn flush(&mut self, backend: &mut dyn Backend) -> Result<(), BackendError> {
        self.store.flush(backend)
    }

    /// Issue this visual's draw call. Returns `false` when there is nothing
    /// to draw.
    pub fn draw(&self, target: &DrawTarget, backend: &mut dyn Backend) -> Result<bool> {
        self.check()?;

        let n = self.vertex_count();
        if n == 0 {
            return Ok(false);
        }

        let buffers: Vec<_> = self
            .store
            .props()
            .iter()
            .filter_map(Prop::bound_buffer)
            .collect();

        let call = DrawCall {
            panel: target.panel,
            visual: target.visual,
            kind: self.kind,
            topology: self.kind.topology(),
            vertex_count: n as u32,
            groups: &self.groups,
            buffers: &buffers,
            transform: target.transform,
            viewport: target.viewport,
        };
        backend.draw(&call)?;

        trace!(kind = self.kind.name(), vertices = n, "Visual drawn");
        Ok(true)
    }

    /// Destroy every prop buffer.
    pub fn release(&mut self, backend: &mut dyn Backend) {
        self.store.release(backend);
    }
}
