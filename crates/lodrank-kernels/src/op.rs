//! Graph-facing operators
//!
//! [`OpKind`] names the operators a host graph registers and links each one
//! to its gradient rule. [`ReorderByRankOp`] is the differentiable pairing of
//! the forward reorder with its scatter inverse.

use crate::engine::LodRankEngine;
use crate::rank_table::RankTable;
use lodrank_common::{Element, LoDTensor, Result, TensorLayout};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    LodRankTable,
    ReorderByRank,
    ScatterByRank,
    AssignValue,
}

impl OpKind {
    /// Registered operator name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LodRankTable => "lod_rank_table",
            Self::ReorderByRank => "reorder_lod_tensor_by_rank",
            Self::ScatterByRank => "reorder_lod_tensor_by_rank_grad",
            Self::AssignValue => "assign_value",
        }
    }

    /// Gradient rule registered for this operator, if any.
    pub fn gradient_op(&self) -> Option<OpKind> {
        match self {
            Self::ReorderByRank => Some(Self::ScatterByRank),
            Self::LodRankTable | Self::ScatterByRank | Self::AssignValue => None,
        }
    }

    pub fn is_differentiable(&self) -> bool {
        self.gradient_op().is_some()
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// State saved by the forward pass for the backward pass.
#[derive(Debug, Clone)]
pub struct ReorderContext {
    pub table: Arc<RankTable>,
    pub input_layout: TensorLayout,
}

/// Reorder with a registered scatter gradient.
#[derive(Clone)]
pub struct ReorderByRankOp {
    engine: Arc<LodRankEngine>,
}

impl ReorderByRankOp {
    pub const KIND: OpKind = OpKind::ReorderByRank;

    pub fn new(engine: Arc<LodRankEngine>) -> Self {
        Self { engine }
    }

    pub fn forward<T: Element>(
        &self,
        x: &LoDTensor<T>,
        table: Arc<RankTable>,
    ) -> Result<(LoDTensor<T>, ReorderContext)> {
        let output = self.engine.reorder_by_rank(x, &table)?;
        Ok((output, ReorderContext { table, input_layout: x.layout() }))
    }

    pub fn backward<T: Element>(
        &self,
        grad: &LoDTensor<T>,
        ctx: &ReorderContext,
    ) -> Result<LoDTensor<T>> {
        self.engine.scatter_by_rank(grad, &ctx.table, &ctx.input_layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodrank_common::Lod;

    #[test]
    fn test_gradient_registration() {
        assert_eq!(OpKind::ReorderByRank.gradient_op(), Some(OpKind::ScatterByRank));
        assert_eq!(OpKind::LodRankTable.gradient_op(), None);
        assert!(!OpKind::AssignValue.is_differentiable());
        assert!(ReorderByRankOp::KIND.is_differentiable());
    }

    #[test]
    fn test_names_and_serde() {
        assert_eq!(OpKind::ScatterByRank.to_string(), "reorder_lod_tensor_by_rank_grad");
        assert_eq!(serde_json::to_string(&OpKind::LodRankTable).unwrap(), "\"lod_rank_table\"");
        let parsed: OpKind = serde_json::from_str("\"reorder_by_rank\"").unwrap();
        assert_eq!(parsed, OpKind::ReorderByRank);
    }

    #[test]
    fn test_forward_saves_layout_not_values() {
        let op = ReorderByRankOp::new(Arc::new(LodRankEngine::default()));
        let lod = Lod::new(vec![vec![0, 1, 3, 4]]).unwrap();
        let x = LoDTensor::new(vec![10.0f32, 20.0, 21.0, 30.0], 1, lod.clone()).unwrap();
        let table = Arc::new(RankTable::from_lod(&lod, 0).unwrap());

        let (y, ctx) = op.forward(&x, Arc::clone(&table)).unwrap();
        assert_eq!(y.lod().levels(), &[vec![0, 2, 3, 4]]);
        assert_eq!(ctx.input_layout, x.layout());
        assert!(Arc::ptr_eq(&ctx.table, &table));

        let grad = LoDTensor::new(vec![1.0f32; 4], 1, y.lod().clone()).unwrap();
        let dx = op.backward(&grad, &ctx).unwrap();
        assert_eq!(dx.to_vec(), vec![1.0; 4]);
        assert_eq!(dx.lod(), x.lod());
    }
}
