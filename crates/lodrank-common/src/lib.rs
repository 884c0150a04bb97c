//! Common types for lodrank
//!
//! This crate provides the foundational types shared by the lodrank kernels:
//! error handling, configuration, device placement, the LoD offset hierarchy
//! and the nested-length tensor built on top of it.

pub mod config;
pub mod error;
pub mod lod;
pub mod storage;
pub mod tensor;
pub mod types;

pub use config::*;
pub use error::*;
pub use lod::{Lod, MAX_LOD_DEPTH};
pub use storage::{DeviceRows, HostRows, RowBuffer, RowStorage};
pub use tensor::{LoDTensor, TensorLayout};
pub use types::{DType, Device, Element};
