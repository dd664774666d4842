pub mod shape;

use std::fmt;

use crate::error::ShapeError;

/// Tensor element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DType {
    F32 = 0,
    F64 = 1,
    F16 = 2,
    BF16 = 3,
    I32 = 4,
    I64 = 5,
    U8 = 6,
    U32 = 7,
}

impl DType {
    /// Size in bytes of one element of this dtype.
    pub const fn element_size(self) -> usize {
        match self {
            DType::U8 => 1,
            DType::F16 | DType::BF16 => 2,
            DType::F32 | DType::I32 | DType::U32 => 4,
            DType::F64 | DType::I64 => 8,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::F16 => "f16",
            DType::BF16 => "bf16",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U8 => "u8",
            DType::U32 => "u32",
        };
        f.write_str(name)
    }
}

/// Declared model input: element type plus a shape that may hold one dynamic
/// dimension (`<= 0`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSpec {
    pub name: String,
    pub dtype: DType,
    pub shape: Vec<i64>,
}

impl TensorSpec {
    pub fn new(name: impl Into<String>, dtype: DType, shape: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape,
        }
    }

    /// Concrete shape for an input buffer of `input_len` bytes.
    pub fn resolve(&self, input_len: usize) -> Result<Vec<usize>, ShapeError> {
        shape::resolve(&self.shape, input_len, self.dtype.element_size())
    }

    /// Borrow `data` as a tensor of this spec, resolving its shape.
    pub fn bind<'a>(
        &'a self,
        data: &'a [u8],
        resolved: &'a [usize],
    ) -> Result<TensorRef<'a>, ShapeError> {
        let tensor = TensorRef {
            name: &self.name,
            dtype: self.dtype,
            shape: resolved,
            data,
        };
        tensor.validate()?;
        Ok(tensor)
    }
}

/// A borrowed, fully concrete tensor handed to an engine for one call.
#[derive(Debug, Clone, Copy)]
pub struct TensorRef<'a> {
    pub name: &'a str,
    pub dtype: DType,
    pub shape: &'a [usize],
    pub data: &'a [u8],
}

impl<'a> TensorRef<'a> {
    /// Validate that the data length matches the shape and dtype.
    pub fn validate(&self) -> Result<(), ShapeError> {
        let expected = shape::element_count(self.shape)?
            .checked_mul(self.dtype.element_size())
            .ok_or(ShapeError::Overflow)?;
        if self.data.len() != expected {
            return Err(ShapeError::LengthMismatch {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    pub fn element_count(&self) -> usize {
        self.data.len() / self.dtype.element_size()
    }
}
