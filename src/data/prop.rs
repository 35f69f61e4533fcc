//! A single prop binding and its device buffer
//!
//! Uploads are validated at call time and staged; [`Prop::flush`] pushes
//! them to the backend right before the render step.

use tracing::{debug, trace};

use super::array::Array;
use super::schema::PropSpec;
use crate::backend::{Backend, BackendError, BoundBuffer, BufferId};
use crate::error::{Result, VizError};

/// What a full bind did to the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindOutcome {
    /// Element count changed (or first bind): buffer reallocated.
    Reallocated,
    /// Same element count: contents replaced in place.
    Replaced,
}

#[derive(Clone, Debug, PartialEq)]
enum Staged {
    /// Replace the buffer with a new one holding exactly these bytes.
    Allocate(Vec<u8>),
    /// Overwrite bytes starting at a byte offset.
    Write { offset: usize, bytes: Vec<u8> },
}

/// Named binding inside a visual. Owns at most one buffer.
#[derive(Debug)]
pub struct Prop {
    spec: &'static PropSpec,
    buffer: Option<BufferId>,
    /// Element count, including staged reallocations
    count: usize,
    bound: bool,
    pending: Vec<Staged>,
}

impl Prop {
    pub fn new(spec: &'static PropSpec) -> Self {
        Self {
            spec,
            buffer: None,
            count: 0,
            bound: false,
            pending: Vec::new(),
        }
    }

    pub fn spec(&self) -> &'static PropSpec {
        self.spec
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    /// Number of elements held by the buffer once staged uploads land.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Device buffer, if one has been flushed.
    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Full upload. Reallocates only when the element count changes.
    pub fn bind(&mut self, array: &Array) -> Result<BindOutcome> {
        self.spec.check(array)?;

        let bytes = array.as_bytes().to_vec();
        let outcome = if self.bound && array.len() == self.count {
            self.stage_write(0, bytes);
            BindOutcome::Replaced
        } else {
            // Earlier staged writes target a buffer that is about to go away
            self.pending.clear();
            self.pending.push(Staged::Allocate(bytes));
            self.count = array.len();
            BindOutcome::Reallocated
        };
        self.bound = true;

        debug!(prop = self.spec.name, count = self.count, ?outcome, "Prop bound");
        Ok(outcome)
    }

    /// Partial upload of `array` at element `offset`. Never grows the buffer.
    pub fn update_range(&mut self, array: &Array, offset: usize) -> Result<()> {
        self.spec.check(array)?;

        let end = offset.checked_add(array.len()).unwrap_or(usize::MAX);
        if end > self.count {
            return Err(VizError::Range {
                prop: self.spec.name,
                offset,
                end,
                count: self.count,
            });
        }
        if array.is_empty() {
            return Ok(());
        }

        let elem = self.spec.element_size();
        self.stage_write(offset * elem, array.as_bytes().to_vec());

        trace!(prop = self.spec.name, offset, len = array.len(), "Prop range staged");
        Ok(())
    }

    fn stage_write(&mut self, offset: usize, bytes: Vec<u8>) {
        // A pending reallocation is only ever alone in the queue; patch it
        // instead of queueing a write against the old buffer.
        if let Some(Staged::Allocate(pending)) = self.pending.first_mut() {
            pending[offset..offset + bytes.len()].copy_from_slice(&bytes);
            return;
        }
        self.pending.push(Staged::Write { offset, bytes });
    }

    /// Apply staged uploads in call order.
    pub fn flush(&mut self, backend: &mut dyn Backend, label: &str) -> Result<(), BackendError> {
        for staged in std::mem::take(&mut self.pending) {
            match staged {
                Staged::Allocate(bytes) => {
                    if let Some(old) = self.buffer.take() {
                        backend.destroy_buffer(old);
                    }
                    if bytes.is_empty() {
                        continue;
                    }
                    let id = backend.create_buffer(label, bytes.len() as u64)?;
                    self.buffer = Some(id);
                    backend.write_buffer(id, 0, &bytes)?;
                }
                Staged::Write { offset, bytes } => {
                    if let Some(id) = self.buffer {
                        backend.write_buffer(id, offset as u64, &bytes)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Buffer binding for a draw call, once data has been flushed.
    pub fn bound_buffer(&self) -> Option<BoundBuffer> {
        self.buffer.map(|buffer| BoundBuffer {
            prop: self.spec.name,
            buffer,
            count: self.count as u32,
            broadcast: self.spec.broadcast && self.count == 1,
        })
    }

    /// Drop staged uploads and destroy the buffer.
    pub fn release(&mut self, backend: &mut dyn Backend) {
        self.pending.clear();
        if let Some(id) = self.buffer.take() {
            backend.destroy_buffer(id);
        }
    }
}
