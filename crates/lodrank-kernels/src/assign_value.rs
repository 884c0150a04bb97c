//! Constant tensors from operator attributes

use lodrank_common::{
    DType, Device, Element, KernelError, LodRankError, LoDTensor, Lod, Result, RowBuffer,
};
use serde::{Deserialize, Serialize};

/// Attributes of an `assign_value` operator.
///
/// Only the value list matching `dtype` is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignValueAttrs {
    pub shape: Vec<usize>,
    pub dtype: DType,
    #[serde(default)]
    pub fp32_values: Vec<f32>,
    #[serde(default)]
    pub int32_values: Vec<i32>,
}

impl AssignValueAttrs {
    pub fn fp32(shape: Vec<usize>, values: Vec<f32>) -> Self {
        Self { shape, dtype: DType::Fp32, fp32_values: values, int32_values: Vec::new() }
    }

    pub fn int32(shape: Vec<usize>, values: Vec<i32>) -> Self {
        Self { shape, dtype: DType::Int32, fp32_values: Vec::new(), int32_values: values }
    }

    /// Rows and row width: the first dimension, then the product of the rest.
    /// `None` when the width overflows.
    pub fn rows_and_width(&self) -> Option<(usize, usize)> {
        match self.shape.split_first() {
            None => Some((1, 1)),
            Some((&rows, rest)) => {
                let width = rest.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))?;
                Some((rows, width))
            }
        }
    }
}

/// Build a flat tensor holding the attribute values on `device`.
pub fn assign_value<T: Element>(attrs: &AssignValueAttrs, device: Device) -> Result<LoDTensor<T>> {
    if attrs.dtype != T::DTYPE {
        return Err(KernelError::UnsupportedDtype { dtype: attrs.dtype }.into());
    }
    let bytes: &[u8] = match attrs.dtype {
        DType::Fp32 => bytemuck::cast_slice(&attrs.fp32_values),
        DType::Int32 => bytemuck::cast_slice(&attrs.int32_values),
    };
    let values: &[T] = bytemuck::try_cast_slice(bytes)
        .map_err(|e| LodRankError::Validation(format!("cannot view values as {}: {e}", T::DTYPE)))?;

    let (rows, width, expected) = attrs
        .rows_and_width()
        .and_then(|(rows, width)| Some((rows, width, rows.checked_mul(width)?)))
        .ok_or_else(|| {
            LodRankError::Validation(format!("shape {:?} overflows the element count", attrs.shape))
        })?;
    if values.len() != expected {
        return Err(LodRankError::Validation(format!(
            "shape {:?} needs {expected} values, got {}",
            attrs.shape,
            values.len()
        )));
    }
    if width == 0 {
        return Err(LodRankError::Validation(format!(
            "shape {:?} has a zero-width row",
            attrs.shape
        )));
    }
    tracing::trace!(rows, width, dtype = %attrs.dtype, %device, "assign_value");
    LoDTensor::from_buffer(RowBuffer::from_vec(values.to_vec(), device), width, Lod::empty())
}
