//! Portable block-copy kernel
//!
//! Works on raw element bytes, so one implementation serves every element
//! type and every placement whose rows are host-addressable.

use crate::KernelProvider;
use crate::plan::CopyPlan;
use lodrank_common::{Device, KernelError, Result};

/// Fallback kernel that is always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackKernel;

impl KernelProvider for FallbackKernel {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn supports(&self, _device: Device) -> bool {
        true
    }

    fn copy_blocks(
        &self,
        src: &[u8],
        dst: &mut [u8],
        plan: &CopyPlan,
        row_bytes: usize,
    ) -> Result<()> {
        check_buffers(src, dst, plan, row_bytes)?;
        for block in plan.blocks() {
            if block.len == 0 {
                continue;
            }
            let bytes = block.len * row_bytes;
            let from = block.src_start * row_bytes;
            let to = block.dst_start * row_bytes;
            tracing::trace!(
                src_row = block.src_start,
                dst_row = block.dst_start,
                rows = block.len,
                "copy block"
            );
            dst[to..to + bytes].copy_from_slice(&src[from..from + bytes]);
        }
        Ok(())
    }
}

/// Shape checks shared by every provider; run before any byte is written.
pub(crate) fn check_buffers(
    src: &[u8],
    dst: &[u8],
    plan: &CopyPlan,
    row_bytes: usize,
) -> Result<()> {
    if row_bytes == 0 {
        return Err(KernelError::invalid_arguments("row size must be non-zero").into());
    }
    let expected = plan.rows().checked_mul(row_bytes).ok_or_else(|| {
        KernelError::invalid_arguments(format!(
            "{} rows of {row_bytes} bytes overflow the buffer size",
            plan.rows()
        ))
    })?;
    if src.len() != expected || dst.len() != expected {
        return Err(KernelError::invalid_arguments(format!(
            "plan covers {} rows of {row_bytes} bytes ({expected} bytes), \
             got src={} dst={}",
            plan.rows(),
            src.len(),
            dst.len()
        ))
        .into());
    }
    for block in plan.blocks() {
        let end = block.src_start.max(block.dst_start) + block.len;
        if end > plan.rows() {
            return Err(KernelError::invalid_arguments(format!(
                "block {block:?} exceeds {} rows",
                plan.rows()
            ))
            .into());
        }
    }
    Ok(())
}
