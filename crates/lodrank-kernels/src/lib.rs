//! Reorder-by-rank kernels for LoD tensors
//!
//! - [`rank_table`] ranks the sequences of a reference tensor by length.
//! - [`reorder`] permutes an input tensor into rank order and rebuilds its LoD.
//! - [`scatter`] routes gradients of the reordered tensor back to input rows.
//!
//! Row movement is planned once as a [`CopyPlan`] and executed by a
//! [`KernelProvider`] chosen by the [`KernelManager`].

use lodrank_common::{Device, Element, KernelConfig, KernelError, Result, RowBuffer, RowStorage};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

pub mod assign_value;
pub mod cpu;
pub mod engine;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod op;
pub mod plan;
pub mod rank_table;
pub mod reorder;
pub mod scatter;

pub use assign_value::{AssignValueAttrs, assign_value};
pub use engine::LodRankEngine;
pub use op::{OpKind, ReorderByRankOp, ReorderContext};
pub use plan::{CopyPlan, RowBlock};
pub use rank_table::{RankItem, RankTable};
pub use reorder::{ReorderPlan, plan_reorder, reorder_by_rank};
pub use scatter::scatter_by_rank;

/// Kernel provider trait
///
/// Providers move whole rows as raw bytes; they never interpret values.
pub trait KernelProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn is_available(&self) -> bool;
    /// Whether buffers placed on `device` are addressable by this provider.
    fn supports(&self, device: Device) -> bool;
    /// Execute every block of `plan`, copying `row_bytes`-sized rows from
    /// `src` into `dst`.
    fn copy_blocks(
        &self,
        src: &[u8],
        dst: &mut [u8],
        plan: &CopyPlan,
        row_bytes: usize,
    ) -> Result<()>;
}

/// No copy has run yet.
const NO_PROVIDER: usize = usize::MAX;

/// Kernel manager for selecting kernels with cached selection
///
/// Copies are dispatched to the cached selection first; providers after it
/// are the fallback chain. The provider that completed the last copy is
/// recorded separately.
pub struct KernelManager {
    providers: Vec<Box<dyn KernelProvider>>,
    selected: OnceLock<usize>,
    last_used: AtomicUsize,
}

impl KernelManager {
    /// CPU fallback only.
    pub fn new() -> Self {
        Self::with_providers(vec![Box::new(cpu::FallbackKernel)])
    }

    /// Providers for a kernel configuration, most preferred first. The CPU
    /// fallback is always last.
    pub fn for_config(config: &KernelConfig) -> Self {
        let mut providers: Vec<Box<dyn KernelProvider>> = Vec::new();

        #[cfg(feature = "gpu")]
        if config.prefer_gpu
            && let Device::Cuda(ordinal) = config.device
        {
            match gpu::CudaKernel::new_with_device(ordinal) {
                Ok(kernel) if kernel.is_available() => {
                    tracing::info!(ordinal, "CUDA kernel available, adding to providers");
                    providers.push(Box::new(kernel));
                }
                Ok(_) => tracing::warn!(ordinal, "CUDA device not available, using CPU kernels"),
                Err(e) => tracing::warn!(ordinal, error = %e, "failed to create CUDA kernel"),
            }
        }

        #[cfg(not(feature = "gpu"))]
        if config.prefer_gpu {
            tracing::warn!(device = %config.device, "GPU support not compiled, using CPU kernels");
        }

        providers.push(Box::new(cpu::FallbackKernel));
        Self::with_providers(providers)
    }

    fn with_providers(providers: Vec<Box<dyn KernelProvider>>) -> Self {
        Self { providers, selected: OnceLock::new(), last_used: AtomicUsize::new(NO_PROVIDER) }
    }

    /// Select the most preferred available provider, caching the choice.
    pub fn select_best(&self) -> Result<&dyn KernelProvider> {
        let index = self.selected_index();
        self.providers
            .get(index)
            .map(|p| p.as_ref())
            .ok_or_else(|| KernelError::NoProvider.into())
    }

    fn selected_index(&self) -> usize {
        *self.selected.get_or_init(|| {
            let index = self
                .providers
                .iter()
                .position(|p| p.is_available())
                .unwrap_or(self.providers.len());
            if let Some(provider) = self.providers.get(index) {
                tracing::debug!(provider = provider.name(), "selected kernel provider");
            }
            index
        })
    }

    pub fn selected_provider_name(&self) -> Option<&'static str> {
        self.selected.get().and_then(|&idx| self.providers.get(idx)).map(|p| p.name())
    }

    /// Name of the provider that completed the most recent copy.
    pub fn last_used_provider_name(&self) -> Option<&'static str> {
        self.providers.get(self.last_used.load(Ordering::Relaxed)).map(|p| p.name())
    }

    pub fn list_available_providers(&self) -> Vec<&'static str> {
        self.providers.iter().filter(|p| p.is_available()).map(|p| p.name()).collect()
    }

    /// Run `plan` on `device` buffers, starting from the selected provider
    /// and falling back along the remaining providers when one fails.
    pub fn execute(
        &self,
        device: Device,
        src: &[u8],
        dst: &mut [u8],
        plan: &CopyPlan,
        row_bytes: usize,
    ) -> Result<()> {
        let start = self.selected_index();
        let mut last_error = None;
        let candidates = self
            .providers
            .iter()
            .enumerate()
            .skip(start)
            .filter(|(_, p)| p.is_available() && p.supports(device));
        for (index, provider) in candidates {
            match provider.copy_blocks(src, dst, plan, row_bytes) {
                Ok(()) => {
                    self.last_used.store(index, Ordering::Relaxed);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        provider = provider.name(),
                        error = %e,
                        "kernel provider failed, trying next"
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| KernelError::NoProvider.into()))
    }

    /// Copy rows of `src` into `dst` according to `plan`. Both buffers must
    /// share a placement.
    pub fn copy_rows<T: Element>(
        &self,
        plan: &CopyPlan,
        src: &RowBuffer<T>,
        dst: &mut RowBuffer<T>,
        width: usize,
    ) -> Result<()> {
        let device = src.device();
        if dst.device() != device {
            return Err(KernelError::PlacementMismatch { expected: device, actual: dst.device() }
                .into());
        }
        let row_bytes = width.checked_mul(std::mem::size_of::<T>()).ok_or_else(|| {
            KernelError::invalid_arguments(format!("row width {width} overflows the row size"))
        })?;
        self.execute(device, src.as_bytes(), dst.as_bytes_mut(), plan, row_bytes)
    }

    /// Force reselection of kernel provider (for testing)
    #[cfg(test)]
    pub fn reset_selection(&mut self) {
        self.selected = OnceLock::new();
        self.last_used = AtomicUsize::new(NO_PROVIDER);
    }
}

impl Default for KernelManager {
    fn default() -> Self {
        Self::new()
    }
}
