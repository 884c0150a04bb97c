//! Backward scatter-by-rank
//!
//! Routes a gradient on the reordered tensor back to the forward input's row
//! positions. The forward plan is a bijection on rows, so its inverse is a
//! plain scatter: every input row receives exactly one gradient row and
//! nothing accumulates.

use crate::KernelManager;
use crate::rank_table::RankTable;
use crate::reorder::plan_reorder;
use lodrank_common::{
    Element, KernelError, LodError, LodRankError, LoDTensor, Result, RowBuffer, TensorLayout,
};

/// Scatter `grad` back into the layout of the forward input.
///
/// `table` must be the table used in the forward pass. The result carries
/// `input_layout`'s LoD unchanged.
pub fn scatter_by_rank<T: Element>(
    grad: &LoDTensor<T>,
    table: &RankTable,
    input_layout: &TensorLayout,
    manager: &KernelManager,
) -> Result<LoDTensor<T>> {
    if grad.device() != input_layout.device {
        return Err(KernelError::PlacementMismatch {
            expected: input_layout.device,
            actual: grad.device(),
        }
        .into());
    }
    if grad.width() != input_layout.width || grad.rows() != input_layout.rows {
        return Err(LodRankError::Validation(format!(
            "gradient is {}x{} but forward input was {}x{}",
            grad.rows(),
            grad.width(),
            input_layout.rows,
            input_layout.width
        )));
    }

    let plan = plan_reorder(&input_layout.lod, input_layout.rows, table)?;
    if !grad.is_flat() && *grad.lod() != plan.lod {
        return Err(LodError::inconsistent(
            0,
            "gradient LoD does not match the reordered layout",
        )
        .into());
    }

    let inverse = plan.copy.inverse();
    let mut d_input = RowBuffer::zeros(input_layout.num_elements(), input_layout.device);
    manager.copy_rows(&inverse, grad.buffer(), &mut d_input, input_layout.width)?;
    tracing::debug!(rows = input_layout.rows, blocks = inverse.len(), "scattered gradient");
    LoDTensor::from_buffer(d_input, input_layout.width, input_layout.lod.clone())
}
