//! Nested-length tensors
//!
//! A [`LoDTensor`] is a flat buffer of fixed-width rows plus a [`Lod`]
//! hierarchy. A tensor without levels is flat: every row is an implicit
//! singleton sequence at level 0.

use crate::error::{LodError, LodRankError, Result};
use crate::lod::Lod;
use crate::storage::{RowBuffer, RowStorage};
use crate::types::{Device, Element};

/// Shape and metadata of a tensor, without its values.
///
/// The backward pass only needs the forward input's layout, so this is what
/// gets saved between the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorLayout {
    pub rows: usize,
    pub width: usize,
    pub lod: Lod,
    pub device: Device,
}

impl TensorLayout {
    pub fn is_flat(&self) -> bool {
        self.lod.is_empty()
    }

    pub fn num_sequences(&self, level: usize) -> std::result::Result<usize, LodError> {
        Sequences { lod: &self.lod, rows: self.rows }.count(level)
    }

    pub fn sequence_bounds(
        &self,
        level: usize,
        index: usize,
    ) -> std::result::Result<(usize, usize), LodError> {
        Sequences { lod: &self.lod, rows: self.rows }.bounds(level, index)
    }

    pub fn num_elements(&self) -> usize {
        self.rows * self.width
    }
}

/// Flat rows plus nested-length metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct LoDTensor<T: Element = f32> {
    buffer: RowBuffer<T>,
    width: usize,
    lod: Lod,
}

impl<T: Element> LoDTensor<T> {
    /// Host tensor with the given LoD.
    pub fn new(data: Vec<T>, width: usize, lod: Lod) -> Result<Self> {
        Self::from_buffer(RowBuffer::from_vec(data, Device::Cpu), width, lod)
    }

    /// Host tensor without levels.
    pub fn flat(data: Vec<T>, width: usize) -> Result<Self> {
        Self::new(data, width, Lod::empty())
    }

    /// Tensor placed on `device`.
    pub fn on_device(data: Vec<T>, width: usize, lod: Lod, device: Device) -> Result<Self> {
        Self::from_buffer(RowBuffer::from_vec(data, device), width, lod)
    }

    pub fn from_buffer(buffer: RowBuffer<T>, width: usize, lod: Lod) -> Result<Self> {
        if width == 0 {
            return Err(LodRankError::Validation("row width must be non-zero".to_string()));
        }
        if buffer.len() % width != 0 {
            return Err(LodRankError::Validation(format!(
                "buffer of {} elements is not a whole number of rows of width {width}",
                buffer.len()
            )));
        }
        lod.validate(buffer.len() / width)?;
        Ok(Self { buffer, width, lod })
    }

    /// Zero-filled tensor matching `layout`.
    pub fn zeros(layout: &TensorLayout) -> Result<Self> {
        Self::from_buffer(
            RowBuffer::zeros(layout.num_elements(), layout.device),
            layout.width,
            layout.lod.clone(),
        )
    }

    /// Replace the LoD, validating it against the current rows.
    pub fn set_lod(&mut self, lod: Lod) -> Result<()> {
        lod.validate(self.rows())?;
        self.lod = lod;
        Ok(())
    }

    pub fn with_lod(mut self, lod: Lod) -> Result<Self> {
        self.set_lod(lod)?;
        Ok(self)
    }

    /// Re-check the LoD against the row count.
    pub fn validate(&self) -> Result<()> {
        self.lod.validate(self.rows())?;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.buffer.len() / self.width
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn lod(&self) -> &Lod {
        &self.lod
    }

    pub fn device(&self) -> Device {
        self.buffer.device()
    }

    pub fn is_flat(&self) -> bool {
        self.lod.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        self.buffer.as_slice()
    }

    pub fn buffer(&self) -> &RowBuffer<T> {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut RowBuffer<T> {
        &mut self.buffer
    }

    pub fn row(&self, index: usize) -> Option<&[T]> {
        let start = index.checked_mul(self.width)?;
        self.as_slice().get(start..start.checked_add(self.width)?)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }

    pub fn into_parts(self) -> (RowBuffer<T>, usize, Lod) {
        (self.buffer, self.width, self.lod)
    }

    pub fn layout(&self) -> TensorLayout {
        TensorLayout {
            rows: self.rows(),
            width: self.width,
            lod: self.lod.clone(),
            device: self.device(),
        }
    }

    /// Sequences at `level`; a flat tensor has one per row at level 0.
    pub fn num_sequences(&self, level: usize) -> Result<usize> {
        Ok(self.sequences().count(level)?)
    }

    /// Row range of sequence `index` at `level`.
    pub fn sequence_bounds(&self, level: usize, index: usize) -> Result<(usize, usize)> {
        Ok(self.sequences().bounds(level, index)?)
    }

    /// Raw sub-lengths of every level deeper than `level` inside sequence
    /// `index`; empty for a flat tensor.
    pub fn local_sub_lengths(&self, level: usize, index: usize) -> Result<Vec<Vec<usize>>> {
        Ok(self.sequences().sub_lengths(level, index)?)
    }

    fn sequences(&self) -> Sequences<'_> {
        Sequences { lod: &self.lod, rows: self.rows() }
    }
}

/// Sequence queries that treat a flat LoD as one singleton per row.
struct Sequences<'a> {
    lod: &'a Lod,
    rows: usize,
}

impl Sequences<'_> {
    fn count(&self, level: usize) -> std::result::Result<usize, LodError> {
        if self.lod.is_empty() {
            self.check_flat_level(level)?;
            return Ok(self.rows);
        }
        self.lod.num_sequences(level)
    }

    fn bounds(&self, level: usize, index: usize) -> std::result::Result<(usize, usize), LodError> {
        if self.lod.is_empty() {
            self.check_flat_level(level)?;
            if index >= self.rows {
                return Err(LodError::IndexOutOfRange { index, count: self.rows });
            }
            return Ok((index, index + 1));
        }
        self.lod.sequence_bounds(level, index)
    }

    fn sub_lengths(
        &self,
        level: usize,
        index: usize,
    ) -> std::result::Result<Vec<Vec<usize>>, LodError> {
        if self.lod.is_empty() {
            self.bounds(level, index)?;
            return Ok(Vec::new());
        }
        self.lod.local_sub_lengths(level, index)
    }

    fn check_flat_level(&self, level: usize) -> std::result::Result<(), LodError> {
        if level != 0 {
            return Err(LodError::LevelOutOfRange { level, depth: 0 });
        }
        Ok(())
    }
}
