//! Row-block copy plans
//!
//! A [`CopyPlan`] is the row mapping of a reorder, materialized as an ordered
//! list of contiguous blocks. The forward pass appends blocks with a running
//! destination offset; the backward pass runs [`CopyPlan::inverse`], which
//! swaps source and destination of every block. Both directions therefore
//! share one bijection.

use lodrank_common::{KernelError, Result};

/// `len` rows copied from `src_start` to `dst_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBlock {
    pub src_start: usize,
    pub dst_start: usize,
    pub len: usize,
}

/// Ordered row-block copies over a buffer of `rows` rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPlan {
    blocks: Vec<RowBlock>,
    rows: usize,
    next_dst: usize,
}

impl CopyPlan {
    pub fn new(rows: usize) -> Self {
        Self { blocks: Vec::new(), rows, next_dst: 0 }
    }

    pub fn with_capacity(rows: usize, blocks: usize) -> Self {
        Self { blocks: Vec::with_capacity(blocks), rows, next_dst: 0 }
    }

    /// Append `len` rows starting at `src_start`, written to the next unused
    /// destination row.
    pub fn push(&mut self, src_start: usize, len: usize) -> RowBlock {
        let block = RowBlock { src_start, dst_start: self.next_dst, len };
        self.next_dst += len;
        self.blocks.push(block);
        block
    }

    pub fn blocks(&self) -> &[RowBlock] {
        &self.blocks
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Rows written so far.
    pub fn covered_rows(&self) -> usize {
        self.blocks.iter().map(|b| b.len).sum()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The plan that undoes this one.
    pub fn inverse(&self) -> Self {
        let blocks = self
            .blocks
            .iter()
            .map(|b| RowBlock { src_start: b.dst_start, dst_start: b.src_start, len: b.len })
            .collect();
        Self { blocks, rows: self.rows, next_dst: self.covered_rows() }
    }

    /// True when every block maps rows onto themselves.
    pub fn is_identity(&self) -> bool {
        self.blocks.iter().all(|b| b.len == 0 || b.src_start == b.dst_start)
    }

    /// Check that the blocks read and write every row exactly once.
    pub fn validate(&self) -> Result<()> {
        let mut read = vec![false; self.rows];
        let mut written = vec![false; self.rows];
        for block in &self.blocks {
            mark(&mut read, block.src_start, block.len, "source")?;
            mark(&mut written, block.dst_start, block.len, "destination")?;
        }
        if let Some(row) = read.iter().position(|&seen| !seen) {
            return Err(KernelError::invalid_arguments(format!(
                "copy plan never reads row {row} of {}",
                self.rows
            ))
            .into());
        }
        if let Some(row) = written.iter().position(|&seen| !seen) {
            return Err(KernelError::invalid_arguments(format!(
                "copy plan never writes row {row} of {}",
                self.rows
            ))
            .into());
        }
        Ok(())
    }
}

fn mark(seen: &mut [bool], start: usize, len: usize, side: &str) -> Result<()> {
    let rows = seen.len();
    let range = seen.get_mut(start..start + len).ok_or_else(|| {
        KernelError::invalid_arguments(format!(
            "{side} block {start}..{} exceeds {rows} rows",
            start + len
        ))
    })?;
    if let Some(offset) = range.iter().position(|&s| s) {
        return Err(KernelError::invalid_arguments(format!(
            "{side} row {} covered twice",
            start + offset
        ))
        .into());
    }
    range.fill(true);
    Ok(())
}
