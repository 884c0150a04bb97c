//! Error handling tests for lodrank-common

use lodrank_common::*;
use std::io;

#[test]
fn test_lodrank_error_variants() {
    let config_error = LodRankError::Config("bad level".to_string());
    assert_eq!(format!("{}", config_error), "Configuration error: bad level");

    let validation_error = LodRankError::Validation("ragged buffer".to_string());
    assert_eq!(format!("{}", validation_error), "Validation error: ragged buffer");

    let lod_error = LodRankError::Lod(LodError::IndexOutOfRange { index: 7, count: 3 });
    assert!(matches!(lod_error, LodRankError::Lod(_)));
    assert_eq!(
        format!("{}", lod_error),
        "LoD error: Rank index 7 out of range for 3 sequences"
    );

    let kernel_error = LodRankError::Kernel(KernelError::NoProvider);
    assert_eq!(format!("{}", kernel_error), "Kernel error: No available kernel provider");
}

#[test]
fn test_lod_error_variants() {
    let inconsistent = LodError::inconsistent(1, "level starts at 2 instead of 0");
    assert_eq!(
        format!("{}", inconsistent),
        "LoD inconsistency at level 1: level starts at 2 instead of 0"
    );

    let mismatch = LodError::SequenceCountMismatch { expected: 5, actual: 4 };
    assert_eq!(
        format!("{}", mismatch),
        "Sequence count mismatch: rank table has 5 entries, input has 4 sequences"
    );

    let missing = LodError::ReferenceMissingLevels { requested: 0, available: 0 };
    assert_eq!(
        format!("{}", missing),
        "Reference tensor has 0 LoD levels, cannot rank at level 0"
    );

    let invalid = LodError::InvalidRankTable { reason: "index 2 repeated".to_string() };
    assert!(format!("{}", invalid).contains("index 2 repeated"));
}

#[test]
fn test_kernel_error_variants() {
    let placement =
        KernelError::PlacementMismatch { expected: Device::Cpu, actual: Device::Cuda(1) };
    assert_eq!(format!("{}", placement), "Placement mismatch: expected cpu, found cuda:1");

    let dtype = KernelError::UnsupportedDtype { dtype: DType::Int32 };
    assert_eq!(format!("{}", dtype), "Unsupported dtype: int32");

    let gpu = KernelError::GpuError { reason: "device not found".to_string() };
    assert_eq!(format!("{}", gpu), "GPU error: device not found");

    let args = KernelError::invalid_arguments("row width 0");
    assert_eq!(format!("{}", args), "Invalid kernel arguments: row width 0");
}

#[test]
fn test_error_conversions() {
    fn lod_failure() -> Result<()> {
        Err(LodError::LevelOutOfRange { level: 2, depth: 1 })?
    }
    fn kernel_failure() -> Result<()> {
        Err(KernelError::NoProvider)?
    }
    fn io_failure() -> Result<()> {
        Err(io::Error::new(io::ErrorKind::NotFound, "missing"))?
    }

    assert!(matches!(lod_failure(), Err(LodRankError::Lod(LodError::LevelOutOfRange { .. }))));
    assert!(matches!(kernel_failure(), Err(LodRankError::Kernel(KernelError::NoProvider))));
    assert!(matches!(io_failure(), Err(LodRankError::Io(_))));
}

#[test]
fn test_error_traits() {
    fn assert_send_sync<T: Send + Sync + 'static>() {}
    assert_send_sync::<LodRankError>();
    assert_send_sync::<LodError>();
    assert_send_sync::<KernelError>();

    let err: Box<dyn std::error::Error> = Box::new(LodRankError::from(KernelError::NoProvider));
    assert!(err.to_string().starts_with("Kernel error"));
}
