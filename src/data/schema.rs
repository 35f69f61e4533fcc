//! Compile-time prop tables

use super::array::{Array, DType};
use crate::error::{Result, VizError};

/// What a prop's element count is measured against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    /// One element per vertex.
    PerVertex,
    /// One element per group (e.g. one strip length per line).
    PerGroup,
}

/// Declared layout of one prop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropSpec {
    pub name: &'static str,
    pub dtype: DType,
    pub arity: usize,
    pub alignment: Alignment,
    /// Drawing fails until the prop is bound
    pub required: bool,
    /// A single element applies to every vertex
    pub broadcast: bool,
}

impl PropSpec {
    pub const fn vertex(name: &'static str, dtype: DType, arity: usize) -> Self {
        Self {
            name,
            dtype,
            arity,
            alignment: Alignment::PerVertex,
            required: false,
            broadcast: false,
        }
    }

    pub const fn group(name: &'static str, dtype: DType, arity: usize) -> Self {
        Self {
            alignment: Alignment::PerGroup,
            ..Self::vertex(name, dtype, arity)
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn broadcast(mut self) -> Self {
        self.broadcast = true;
        self
    }

    pub fn element_size(&self) -> usize {
        self.dtype.size() * self.arity
    }

    /// Layout description, e.g. `f64x3`.
    pub fn describe(&self) -> String {
        format!("{}x{}", self.dtype, self.arity)
    }

    /// Reject arrays whose element type or arity differ from the declaration.
    pub fn check(&self, array: &Array) -> Result<()> {
        if array.dtype() != self.dtype || array.arity() != self.arity {
            return Err(VizError::SchemaMismatch {
                prop: self.name,
                expected: self.describe(),
                found: array.describe(),
            });
        }
        Ok(())
    }
}

/// Look up `name` in a kind's table.
pub fn find<'a>(
    table: &'a [PropSpec],
    kind: &'static str,
    name: &str,
) -> Result<(usize, &'a PropSpec)> {
    table
        .iter()
        .enumerate()
        .find(|(_, spec)| spec.name == name)
        .ok_or_else(|| VizError::UnknownProp {
            kind,
            prop: name.to_string(),
        })
}
