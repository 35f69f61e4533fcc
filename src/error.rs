//! Error taxonomy for the engine
//!
//! Validation errors are reported synchronously at the call that caused
//! them and leave engine state untouched. `Backend` is the only fatal
//! variant: once the device misbehaves, buffer contents can't be trusted.

use crate::backend::BackendError;

/// Every failure the engine reports.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VizError {
    /// Array element type or arity disagrees with the prop's declared schema.
    #[error("prop `{prop}` expects {expected}, got {found}")]
    SchemaMismatch {
        prop: &'static str,
        expected: String,
        found: String,
    },
    /// Prop name is not part of the visual kind's table.
    #[error("visual `{kind}` has no prop named `{prop}`")]
    UnknownProp { kind: &'static str, prop: String },
    /// Partial update would write past the end of the buffer.
    #[error("prop `{prop}`: range {offset}..{end} exceeds {count} elements")]
    Range {
        prop: &'static str,
        offset: usize,
        end: usize,
        count: usize,
    },
    /// Vertex-aligned props disagree at draw time.
    #[error("inconsistent props on `{kind}` visual: {reason}")]
    InconsistentProps { kind: &'static str, reason: String },
    /// Value outside of the accepted domain (color range, zoom factor, interval, ...).
    #[error("domain error: {0}")]
    Domain(String),
    /// Array length doesn't fit the requested shape.
    #[error("shape error: {0}")]
    Shape(String),
    /// A palette, visual kind, controller or event name that doesn't exist.
    #[error("unknown {what} `{name}`")]
    UnknownName { what: &'static str, name: String },
    /// Device failure; terminates the loop.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl VizError {
    /// Fatal errors abort `Canvas::run`; everything else is recoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, VizError::Backend(_))
    }
}

pub type Result<T, E = VizError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_backend_errors_are_fatal() {
        assert!(VizError::Backend(BackendError::OutOfMemory { requested: 16 }).is_fatal());
        assert!(!VizError::Domain("vmin >= vmax".into()).is_fatal());
        assert!(!VizError::Shape("alpha".into()).is_fatal());
    }

    #[test]
    fn test_display_mentions_prop() {
        let err = VizError::Range {
            prop: "pos",
            offset: 8,
            end: 12,
            count: 10,
        };
        assert_eq!(err.to_string(), "prop `pos`: range 8..12 exceeds 10 elements");
    }
}
