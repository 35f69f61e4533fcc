//! Data binding layer
//!
//! - [`Array`]: typed host array
//! - [`PropSpec`]: declared layout of a prop, grouped in per-kind tables
//! - [`Prop`]: binding that owns a device buffer and stages uploads
//! - [`DataStore`]: all props of one visual, addressed by name

mod array;
mod prop;
mod schema;

pub use array::{Array, ArrayData, DType};
pub use prop::{BindOutcome, Prop};
pub use schema::{Alignment, PropSpec};

use crate::backend::{Backend, BackendError};
use crate::error::Result;

/// Props of one visual, in table order.
#[derive(Debug)]
pub struct DataStore {
    kind: &'static str,
    table: &'static [PropSpec],
    props: Vec<Prop>,
}

impl DataStore {
    pub fn new(kind: &'static str, table: &'static [PropSpec]) -> Self {
        Self {
            kind,
            table,
            props: table.iter().map(Prop::new).collect(),
        }
    }

    /// Full upload of `array` into prop `name`.
    pub fn bind(&mut self, name: &str, array: &Array) -> Result<(usize, BindOutcome)> {
        let idx = self.index(name)?;
        let outcome = self.props[idx].bind(array)?;
        Ok((idx, outcome))
    }

    /// Partial upload of `array` into prop `name` starting at element `offset`.
    pub fn update_range(&mut self, name: &str, array: &Array, offset: usize) -> Result<usize> {
        let idx = self.index(name)?;
        self.props[idx].update_range(array, offset)?;
        Ok(idx)
    }

    pub fn get(&self, name: &str) -> Option<&Prop> {
        self.props.iter().find(|p| p.name() == name)
    }

    pub fn props(&self) -> &[Prop] {
        &self.props
    }

    pub fn has_pending(&self) -> bool {
        self.props.iter().any(Prop::has_pending)
    }

    /// Push every staged upload to the backend.
    pub fn flush(&mut self, backend: &mut dyn Backend) -> Result<(), BackendError> {
        for prop in &mut self.props {
            if prop.has_pending() {
                let label = format!("{}.{}", self.kind, prop.name());
                prop.flush(backend, &label)?;
            }
        }
        Ok(())
    }

    /// Destroy every buffer, in table order.
    pub fn release(&mut self, backend: &mut dyn Backend) {
        for prop in &mut self.props {
            prop.release(backend);
        }
    }

    fn index(&self, name: &str) -> Result<usize> {
        schema::find(self.table, self.kind, name).map(|(idx, _)| idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use crate::error::VizError;

    static TABLE: &[PropSpec] = &[
        PropSpec::vertex("pos", DType::F64, 3).required(),
        PropSpec::vertex("color", DType::U8, 4).broadcast(),
    ];

    #[test]
    fn test_unknown_prop_rejected() {
        let mut store = DataStore::new("point", TABLE);
        let err = store.bind("size", &vec![1.0f32].into()).unwrap_err();
        assert_eq!(
            err,
            VizError::UnknownProp {
                kind: "point",
                prop: "size".into(),
            }
        );
        assert!(!store.has_pending());
    }

    #[test]
    fn test_flush_labels_and_release() {
        let mut backend = HeadlessBackend::new();
        let mut store = DataStore::new("point", TABLE);
        store.bind("pos", &vec![[0.0f64; 3]; 4].into()).unwrap();
        store.bind("color", &vec![[255u8; 4]].into()).unwrap();
        store.flush(&mut backend).unwrap();
        assert_eq!(backend.live_buffers(), 2);
        assert!(!store.has_pending());

        store.release(&mut backend);
        assert_eq!(backend.live_buffers(), 0);
        assert_eq!(backend.destroyed().len(), 2);
    }
}
