//! Error types for lodrank
//!
//! The hierarchy mirrors the layering of the workspace: [`LodError`] covers
//! nested-length metadata and rank-table failures, [`KernelError`] covers
//! provider selection, placement and argument checks, and [`LodRankError`]
//! wraps both alongside configuration and I/O failures.

use crate::types::{DType, Device};
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, LodRankError>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum LodRankError {
    #[error("LoD error: {0}")]
    Lod(#[from] LodError),

    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures in nested-length metadata and rank tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LodError {
    /// Offsets are not monotonic, do not start at zero, or a level's terminal
    /// offset disagrees with the unit count of the next level (or row count).
    #[error("LoD inconsistency at level {level}: {reason}")]
    Inconsistent { level: usize, reason: String },

    /// The input's top-level sequence count differs from the rank table size.
    #[error("Sequence count mismatch: rank table has {expected} entries, input has {actual} sequences")]
    SequenceCountMismatch { expected: usize, actual: usize },

    /// A rank-table index addresses a sequence the input does not have.
    #[error("Rank index {index} out of range for {count} sequences")]
    IndexOutOfRange { index: usize, count: usize },

    /// The reference tensor has no level at the requested rank level.
    #[error("Reference tensor has {available} LoD levels, cannot rank at level {requested}")]
    ReferenceMissingLevels { requested: usize, available: usize },

    #[error("LoD level {level} out of range for depth {depth}")]
    LevelOutOfRange { level: usize, depth: usize },

    /// A host-supplied rank table is not a permutation of its sequence indices.
    #[error("Invalid rank table: {reason}")]
    InvalidRankTable { reason: String },
}

/// Kernel-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("No available kernel provider")]
    NoProvider,

    #[error("Invalid kernel arguments: {reason}")]
    InvalidArguments { reason: String },

    #[error("GPU error: {reason}")]
    GpuError { reason: String },

    /// Input and output buffers must live in the same memory space.
    #[error("Placement mismatch: expected {expected}, found {actual}")]
    PlacementMismatch { expected: Device, actual: Device },

    #[error("Unsupported dtype: {dtype}")]
    UnsupportedDtype { dtype: DType },
}

impl LodError {
    /// Shorthand for [`LodError::Inconsistent`].
    pub fn inconsistent(level: usize, reason: impl Into<String>) -> Self {
        Self::Inconsistent { level, reason: reason.into() }
    }
}

impl KernelError {
    /// Shorthand for [`KernelError::InvalidArguments`].
    pub fn invalid_arguments(reason: impl Into<String>) -> Self {
        Self::InvalidArguments { reason: reason.into() }
    }
}
