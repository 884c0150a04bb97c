//! Configured entry point for the rank-table, reorder and scatter operations

use crate::KernelManager;
use crate::assign_value::{AssignValueAttrs, assign_value};
use crate::rank_table::RankTable;
use crate::reorder::reorder_by_rank;
use crate::scatter::scatter_by_rank;
use lodrank_common::{Element, LoDTensor, LodRankConfig, Result, TensorLayout};

/// Engine bundling a validated configuration with its kernel providers.
pub struct LodRankEngine {
    config: LodRankConfig,
    kernels: KernelManager,
}

impl LodRankEngine {
    pub fn new(config: LodRankConfig) -> Result<Self> {
        config.validate()?;
        let kernels = KernelManager::for_config(&config.kernel);
        tracing::debug!(
            device = %config.kernel.device,
            providers = ?kernels.list_available_providers(),
            "created lodrank engine"
        );
        Ok(Self { config, kernels })
    }

    pub fn config(&self) -> &LodRankConfig {
        &self.config
    }

    pub fn kernels(&self) -> &KernelManager {
        &self.kernels
    }

    /// Provider that ran the most recent copy, or the preferred one before
    /// any copy has run.
    pub fn provider_name(&self) -> Option<&'static str> {
        self.kernels
            .last_used_provider_name()
            .or_else(|| self.kernels.select_best().ok().map(|p| p.name()))
    }

    /// Rank `reference` at `level`, or at the configured level when `None`.
    pub fn build_rank_table<T: Element>(
        &self,
        reference: &LoDTensor<T>,
        level: Option<usize>,
    ) -> Result<RankTable> {
        self.check_consumed(reference)?;
        RankTable::build(reference, level.unwrap_or(self.config.rank.level))
    }

    pub fn reorder_by_rank<T: Element>(
        &self,
        input: &LoDTensor<T>,
        table: &RankTable,
    ) -> Result<LoDTensor<T>> {
        self.check_consumed(input)?;
        reorder_by_rank(input, table, &self.kernels)
    }

    pub fn scatter_by_rank<T: Element>(
        &self,
        grad: &LoDTensor<T>,
        table: &RankTable,
        input_layout: &TensorLayout,
    ) -> Result<LoDTensor<T>> {
        self.check_consumed(grad)?;
        if self.config.validation.revalidate_on_consume {
            input_layout.lod.validate(input_layout.rows)?;
        }
        scatter_by_rank(grad, table, input_layout, &self.kernels)
    }

    /// Constant tensor on the configured device.
    pub fn assign_value<T: Element>(&self, attrs: &AssignValueAttrs) -> Result<LoDTensor<T>> {
        assign_value(attrs, self.config.kernel.device)
    }

    fn check_consumed<T: Element>(&self, tensor: &LoDTensor<T>) -> Result<()> {
        if self.config.validation.revalidate_on_consume {
            tensor.validate()?;
        }
        Ok(())
    }
}

impl Default for LodRankEngine {
    fn default() -> Self {
        Self { config: LodRankConfig::default(), kernels: KernelManager::new() }
    }
}
