//! CUDA block-copy provider
//!
//! Launch scaffolding only: the block-copy PTX is not bundled with this
//! build, so [`CudaKernel::copy_blocks`] reports `KernelError::GpuError` and
//! the [`KernelManager`](crate::KernelManager) falls back to the CPU kernel.

use crate::KernelProvider;
use crate::cpu::fallback::check_buffers;
use crate::plan::CopyPlan;
use lodrank_common::{Device, KernelError, Result};

/// Threads per block for the row-copy launch.
const THREADS_PER_BLOCK: u32 = 256;

/// CUDA provider bound to one device ordinal.
#[derive(Debug, Clone)]
pub struct CudaKernel {
    ordinal: usize,
}

impl CudaKernel {
    pub fn new_with_device(ordinal: usize) -> Result<Self> {
        Ok(Self { ordinal })
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Grid dimensions for copying `n_bytes`, one thread per byte.
    pub fn grid_dim(&self, n_bytes: usize) -> Result<(u32, u32, u32)> {
        let blocks = u32::try_from(n_bytes.div_ceil(THREADS_PER_BLOCK as usize)).map_err(|_| {
            KernelError::GpuError { reason: format!("{n_bytes} bytes exceed the launch grid") }
        })?;
        Ok((blocks.max(1), 1, 1))
    }
}

impl KernelProvider for CudaKernel {
    fn name(&self) -> &'static str {
        "cuda"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn supports(&self, device: Device) -> bool {
        device == Device::Cuda(self.ordinal)
    }

    fn copy_blocks(
        &self,
        src: &[u8],
        dst: &mut [u8],
        plan: &CopyPlan,
        row_bytes: usize,
    ) -> Result<()> {
        check_buffers(src, dst, plan, row_bytes)?;
        let grid = self.grid_dim(src.len())?;
        tracing::debug!(
            ordinal = self.ordinal,
            blocks = plan.len(),
            ?grid,
            "cuda block-copy launch"
        );
        Err(KernelError::GpuError {
            reason: format!("block-copy kernel not compiled for cuda:{}", self.ordinal),
        }
        .into())
    }
}
