//! Row storage with explicit placement
//!
//! [`RowStorage`] is the capability every row buffer offers: it knows its
//! placement, exposes its elements (and their raw bytes for kernels), and can
//! allocate a zeroed sibling in the same memory space. [`HostRows`] and
//! [`DeviceRows`] implement it; [`RowBuffer`] dispatches between the two
//! without runtime type inspection.

use crate::types::{Device, Element};

/// Capability interface for a flat row buffer.
pub trait RowStorage<T: Element>: Send + Sync {
    fn device(&self) -> Device;

    fn as_slice(&self) -> &[T];

    fn as_mut_slice(&mut self) -> &mut [T];

    /// Zero-filled buffer of `len` elements in the same memory space.
    fn zeroed(&self, len: usize) -> Self
    where
        Self: Sized;

    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.as_slice())
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(self.as_mut_slice())
    }
}

/// Rows in host memory.
#[derive(Debug, Clone, PartialEq)]
pub struct HostRows<T: Element> {
    data: Vec<T>,
}

impl<T: Element> HostRows<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T: Element> RowStorage<T> for HostRows<T> {
    fn device(&self) -> Device {
        Device::Cpu
    }

    fn as_slice(&self) -> &[T] {
        &self.data
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    fn zeroed(&self, len: usize) -> Self {
        Self { data: vec![T::zeroed(); len] }
    }
}

/// Rows resident on an accelerator.
///
/// Without a compiled accelerator backend the allocation is a host-side
/// staging mirror tagged with the device ordinal; kernel dispatch keys off
/// the tag, so buffers on different ordinals never mix.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRows<T: Element> {
    ordinal: usize,
    staging: Vec<T>,
}

impl<T: Element> DeviceRows<T> {
    pub fn new(ordinal: usize, data: Vec<T>) -> Self {
        Self { ordinal, staging: data }
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn into_vec(self) -> Vec<T> {
        self.staging
    }
}

impl<T: Element> RowStorage<T> for DeviceRows<T> {
    fn device(&self) -> Device {
        Device::Cuda(self.ordinal)
    }

    fn as_slice(&self) -> &[T] {
        &self.staging
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.staging
    }

    fn zeroed(&self, len: usize) -> Self {
        Self { ordinal: self.ordinal, staging: vec![T::zeroed(); len] }
    }
}

/// Concrete row buffer that can be used instead of `dyn RowStorage`.
#[derive(Debug, Clone, PartialEq)]
pub enum RowBuffer<T: Element> {
    Host(HostRows<T>),
    Device(DeviceRows<T>),
}

impl<T: Element> RowBuffer<T> {
    /// Place `data` on `device`.
    pub fn from_vec(data: Vec<T>, device: Device) -> Self {
        match device {
            Device::Cpu => Self::Host(HostRows::new(data)),
            Device::Cuda(ordinal) => Self::Device(DeviceRows::new(ordinal, data)),
        }
    }

    pub fn zeros(len: usize, device: Device) -> Self {
        Self::from_vec(vec![T::zeroed(); len], device)
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Host(rows) => rows.into_vec(),
            Self::Device(rows) => rows.into_vec(),
        }
    }
}

impl<T: Element> RowStorage<T> for RowBuffer<T> {
    fn device(&self) -> Device {
        match self {
            Self::Host(rows) => rows.device(),
            Self::Device(rows) => rows.device(),
        }
    }

    fn as_slice(&self) -> &[T] {
        match self {
            Self::Host(rows) => rows.as_slice(),
            Self::Device(rows) => rows.as_slice(),
        }
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        match self {
            Self::Host(rows) => rows.as_mut_slice(),
            Self::Device(rows) => rows.as_mut_slice(),
        }
    }

    fn zeroed(&self, len: usize) -> Self {
        match self {
            Self::Host(rows) => Self::Host(rows.zeroed(len)),
            Self::Device(rows) => Self::Device(rows.zeroed(len)),
        }
    }
}
