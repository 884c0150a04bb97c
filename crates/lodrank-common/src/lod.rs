//! Level-of-detail (LoD) offset hierarchy
//!
//! A [`Lod`] describes variable-length nested sequences over a flat row
//! buffer. Level `k` is a non-decreasing offset vector starting at `0`;
//! `level[k].len() - 1` sequences live at that level and the last offset of
//! level `k` equals the number of units at level `k + 1`, or the row count
//! for the innermost level.
//!
//! ```text
//! level 0: [0, 2, 3]        2 sequences: units 0..2 and 2..3 of level 1
//! level 1: [0, 1, 3, 4]     3 sequences: rows 0..1, 1..3 and 3..4
//! ```

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::LodError;

/// Upper bound on nesting depth accepted from configuration.
pub const MAX_LOD_DEPTH: usize = 16;

type LodResult<T> = std::result::Result<T, LodError>;

/// Nested-length metadata, outermost level first.
///
/// Construction validates that levels are mutually consistent; the row count
/// is checked separately by [`Lod::validate`] because the metadata does not
/// own rows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<usize>>", into = "Vec<Vec<usize>>")]
pub struct Lod {
    levels: Vec<Vec<usize>>,
}

impl Lod {
    /// Build from cumulative offsets.
    pub fn new(levels: Vec<Vec<usize>>) -> LodResult<Self> {
        let lod = Self { levels };
        lod.check_structure()?;
        Ok(lod)
    }

    /// A flat (zero-level) LoD.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from per-level raw lengths, e.g. `[[2, 1], [1, 2, 1]]`.
    pub fn from_lengths(lengths: Vec<Vec<usize>>) -> LodResult<Self> {
        let levels = lengths
            .into_iter()
            .enumerate()
            .map(|(k, level)| {
                let mut offsets = Vec::with_capacity(level.len() + 1);
                offsets.push(0);
                let mut acc = 0usize;
                for len in level {
                    acc = acc.checked_add(len).ok_or_else(|| {
                        LodError::inconsistent(k, format!("offset overflow adding length {len}"))
                    })?;
                    offsets.push(acc);
                }
                Ok(offsets)
            })
            .collect::<LodResult<Vec<_>>>()?;
        Self::new(levels)
    }

    /// Per-level raw lengths; inverse of [`Lod::from_lengths`].
    pub fn to_lengths(&self) -> Vec<Vec<usize>> {
        self.levels.iter().map(|level| level.windows(2).map(|w| w[1] - w[0]).collect()).collect()
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> &[Vec<usize>] {
        &self.levels
    }

    pub fn level(&self, level: usize) -> Option<&[usize]> {
        self.levels.get(level).map(Vec::as_slice)
    }

    pub fn into_levels(self) -> Vec<Vec<usize>> {
        self.levels
    }

    /// Rows covered by the innermost level, `None` for a flat LoD.
    pub fn num_rows(&self) -> Option<usize> {
        self.levels.last().and_then(|level| level.last().copied())
    }

    /// Full consistency check against a row count.
    pub fn validate(&self, rows: usize) -> LodResult<()> {
        self.check_structure()?;
        if let Some(covered) = self.num_rows()
            && covered != rows
        {
            return Err(LodError::inconsistent(
                self.levels.len() - 1,
                format!("innermost level ends at {covered} but tensor has {rows} rows"),
            ));
        }
        Ok(())
    }

    /// Number of sequences at `level`.
    pub fn num_sequences(&self, level: usize) -> LodResult<usize> {
        Ok(self.offsets(level)?.len() - 1)
    }

    /// Indices of sequence `index`'s children at `level + 1` (rows when
    /// `level` is innermost).
    pub fn sequence_units(&self, level: usize, index: usize) -> LodResult<Range<usize>> {
        let offsets = self.offsets(level)?;
        let count = offsets.len() - 1;
        if index >= count {
            return Err(LodError::IndexOutOfRange { index, count });
        }
        Ok(offsets[index]..offsets[index + 1])
    }

    /// Row range `(start, end)` of sequence `index` at `level`.
    pub fn sequence_bounds(&self, level: usize, index: usize) -> LodResult<(usize, usize)> {
        let units = self.sequence_units(level, index)?;
        let (mut start, mut end) = (units.start, units.end);
        for inner in &self.levels[level + 1..] {
            start = inner[start];
            end = inner[end];
        }
        Ok((start, end))
    }

    /// Raw sub-segment lengths inside sequence `index`, one vector for each
    /// level strictly deeper than `level`, in original nested order.
    pub fn local_sub_lengths(&self, level: usize, index: usize) -> LodResult<Vec<Vec<usize>>> {
        let units = self.sequence_units(level, index)?;
        let (mut start, mut end) = (units.start, units.end);
        let mut sub_lengths = Vec::with_capacity(self.levels.len() - level - 1);
        for inner in &self.levels[level + 1..] {
            sub_lengths.push(inner[start..=end].windows(2).map(|w| w[1] - w[0]).collect());
            start = inner[start];
            end = inner[end];
        }
        Ok(sub_lengths)
    }

    fn offsets(&self, level: usize) -> LodResult<&[usize]> {
        self.levels
            .get(level)
            .map(Vec::as_slice)
            .ok_or(LodError::LevelOutOfRange { level, depth: self.levels.len() })
    }

    fn check_structure(&self) -> LodResult<()> {
        for (k, level) in self.levels.iter().enumerate() {
            match level.first() {
                None => return Err(LodError::inconsistent(k, "level has no offsets")),
                Some(&first) if first != 0 => {
                    return Err(LodError::inconsistent(
                        k,
                        format!("level starts at {first} instead of 0"),
                    ));
                }
                Some(_) => {}
            }
            if let Some(pos) = level.windows(2).position(|w| w[1] < w[0]) {
                return Err(LodError::inconsistent(
                    k,
                    format!(
                        "offsets decrease at position {}: {} -> {}",
                        pos + 1,
                        level[pos],
                        level[pos + 1]
                    ),
                ));
            }
            if let Some(child) = self.levels.get(k + 1) {
                let last = level[level.len() - 1];
                let child_units = child.len() - 1;
                if last != child_units {
                    return Err(LodError::inconsistent(
                        k,
                        format!(
                            "level ends at {last} but level {} has {child_units} sequences",
                            k + 1
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<Vec<usize>>> for Lod {
    type Error = LodError;

    fn try_from(levels: Vec<Vec<usize>>) -> LodResult<Self> {
        Self::new(levels)
    }
}

impl From<Lod> for Vec<Vec<usize>> {
    fn from(lod: Lod) -> Self {
        lod.levels
    }
}
