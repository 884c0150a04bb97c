//! Forward reorder-by-rank
//!
//! Sequences of the input are emitted in rank-table order. Rows move as whole
//! blocks; the output LoD is rebuilt level by level from each sequence's local
//! sub-lengths, so inner structure is preserved while the outermost order
//! follows the table.

use crate::KernelManager;
use crate::plan::CopyPlan;
use crate::rank_table::RankTable;
use lodrank_common::{Element, Lod, LodError, LoDTensor, Result, RowStorage};

/// Row movement and output LoD for one reorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan {
    pub copy: CopyPlan,
    pub lod: Lod,
}

/// Plan the reorder of a tensor with `lod` over `rows` rows.
///
/// Every check runs here, so nothing is written when planning fails.
pub fn plan_reorder(lod: &Lod, rows: usize, table: &RankTable) -> Result<ReorderPlan> {
    let count = if lod.is_empty() { rows } else { lod.num_sequences(0)? };
    if count != table.len() {
        return Err(LodError::SequenceCountMismatch { expected: table.len(), actual: count }.into());
    }

    let mut copy = CopyPlan::with_capacity(rows, table.len());
    if lod.is_empty() {
        for item in table {
            if item.index >= count {
                return Err(LodError::IndexOutOfRange { index: item.index, count }.into());
            }
            copy.push(item.index, 1);
        }
        copy.validate()?;
        return Ok(ReorderPlan { copy, lod: Lod::empty() });
    }

    // One running offset vector per level.
    let mut levels: Vec<Vec<usize>> = (0..lod.num_levels()).map(|_| vec![0]).collect();
    for item in table {
        if item.index >= count {
            return Err(LodError::IndexOutOfRange { index: item.index, count }.into());
        }
        let (start, end) = lod.sequence_bounds(0, item.index)?;
        copy.push(start, end - start);

        let units = lod.sequence_units(0, item.index)?.len();
        append_lengths(&mut levels[0], std::iter::once(units));
        for (k, sub_lengths) in lod.local_sub_lengths(0, item.index)?.into_iter().enumerate() {
            append_lengths(&mut levels[k + 1], sub_lengths);
        }
    }
    copy.validate()?;

    tracing::debug!(
        rows,
        sequences = table.len(),
        blocks = copy.len(),
        levels = levels.len(),
        "planned reorder"
    );
    Ok(ReorderPlan { copy, lod: Lod::new(levels)? })
}

fn append_lengths(offsets: &mut Vec<usize>, lengths: impl IntoIterator<Item = usize>) {
    let mut last = offsets.last().copied().unwrap_or(0);
    for len in lengths {
        last += len;
        offsets.push(last);
    }
}

/// Reorder `input` so its level-0 sequences follow `table`.
///
/// The output stays on the input's device and keeps its width and row count.
pub fn reorder_by_rank<T: Element>(
    input: &LoDTensor<T>,
    table: &RankTable,
    manager: &KernelManager,
) -> Result<LoDTensor<T>> {
    let plan = plan_reorder(input.lod(), input.rows(), table)?;
    let mut output = input.buffer().zeroed(input.buffer().len());
    manager.copy_rows(&plan.copy, input.buffer(), &mut output, input.width())?;
    LoDTensor::from_buffer(output, input.width(), plan.lod)
}
