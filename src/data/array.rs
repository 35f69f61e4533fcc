//! Typed host arrays handed to the binding layer

use std::fmt;

use crate::error::{Result, VizError};

/// Element type of an array or prop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    U8,
    U32,
    I32,
    F32,
    F64,
}

impl DType {
    /// Size of one component in bytes.
    pub fn size(self) -> usize {
        match self {
            DType::U8 => 1,
            DType::U32 | DType::I32 | DType::F32 => 4,
            DType::F64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::U8 => "u8",
            DType::U32 => "u32",
            DType::I32 => "i32",
            DType::F32 => "f32",
            DType::F64 => "f64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Flat, typed component storage.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayData {
    U8(Vec<u8>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl ArrayData {
    pub fn dtype(&self) -> DType {
        match self {
            ArrayData::U8(_) => DType::U8,
            ArrayData::U32(_) => DType::U32,
            ArrayData::I32(_) => DType::I32,
            ArrayData::F32(_) => DType::F32,
            ArrayData::F64(_) => DType::F64,
        }
    }

    /// Number of components (not elements).
    pub fn len(&self) -> usize {
        match self {
            ArrayData::U8(v) => v.len(),
            ArrayData::U32(v) => v.len(),
            ArrayData::I32(v) => v.len(),
            ArrayData::F32(v) => v.len(),
            ArrayData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn as_bytes(&self) -> &[u8] {
        match self {
            ArrayData::U8(v) => v,
            ArrayData::U32(v) => bytemuck::cast_slice(v),
            ArrayData::I32(v) => bytemuck::cast_slice(v),
            ArrayData::F32(v) => bytemuck::cast_slice(v),
            ArrayData::F64(v) => bytemuck::cast_slice(v),
        }
    }
}

/// A host array: `len()` elements of `arity` components each.
#[derive(Clone, Debug, PartialEq)]
pub struct Array {
    data: ArrayData,
    arity: usize,
}

impl Array {
    /// Wrap flat component storage; fails if it doesn't split into whole elements.
    pub fn new(data: ArrayData, arity: usize) -> Result<Self> {
        if arity == 0 || data.len() % arity != 0 {
            return Err(VizError::Shape(format!(
                "{} {} components can't form elements of arity {arity}",
                data.len(),
                data.dtype()
            )));
        }
        Ok(Self { data, arity })
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Number of elements (rows).
    pub fn len(&self) -> usize {
        self.data.len() / self.arity
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of one element in bytes.
    pub fn element_size(&self) -> usize {
        self.dtype().size() * self.arity
    }

    /// Raw bytes as they are uploaded to the device.
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_bytes()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Layout description, e.g. `f64x3`.
    pub fn describe(&self) -> String {
        format!("{}x{}", self.dtype(), self.arity)
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match &self.data {
            ArrayData::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<&[u32]> {
        match &self.data {
            ArrayData::U32(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! impl_from_vec {
    ($ty:ty, $variant:ident) => {
        impl From<Vec<$ty>> for Array {
            fn from(values: Vec<$ty>) -> Self {
                Self {
                    data: ArrayData::$variant(values),
                    arity: 1,
                }
            }
        }

        impl<const N: usize> From<Vec<[$ty; N]>> for Array {
            fn from(rows: Vec<[$ty; N]>) -> Self {
                // N == 0 would make every length check divide by zero
                assert!(N > 0, "zero-arity rows");
                Self {
                    data: ArrayData::$variant(rows.into_flattened()),
                    arity: N,
                }
            }
        }

        impl From<&[$ty]> for Array {
            fn from(values: &[$ty]) -> Self {
                values.to_vec().into()
            }
        }

        impl<const N: usize> From<&[[$ty; N]]> for Array {
            fn from(rows: &[[$ty; N]]) -> Self {
                rows.to_vec().into()
            }
        }
    };
}

impl_from_vec!(u8, U8);
impl_from_vec!(u32, U32);
impl_from_vec!(i32, I32);
impl_from_vec!(f32, F32);
impl_from_vec!(f64, F64);
