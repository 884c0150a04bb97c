//! Rank tables
//!
//! A [`RankTable`] orders the sequences of a reference tensor at one LoD
//! level by descending length. Ties keep ascending original index because
//! the sort is stable on the descending key; no comparator ever decides
//! between equal lengths.

use lodrank_common::{Element, Lod, LodError, LoDTensor, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// One ranked sequence: its index in the reference and its row extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RankItem {
    pub index: usize,
    pub length: usize,
}

/// Sequences of a reference tensor in rank order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRankTable")]
pub struct RankTable {
    items: Vec<RankItem>,
    level: usize,
    /// Reference levels above the ranked level.
    coarse_lod: Vec<Vec<usize>>,
}

#[derive(Deserialize)]
struct RawRankTable {
    items: Vec<RankItem>,
    #[serde(default)]
    level: usize,
    #[serde(default)]
    coarse_lod: Vec<Vec<usize>>,
}

impl TryFrom<RawRankTable> for RankTable {
    type Error = LodError;

    fn try_from(raw: RawRankTable) -> std::result::Result<Self, LodError> {
        check_permutation(&raw.items)?;
        if raw.coarse_lod.is_empty() {
            return Ok(Self { items: raw.items, level: raw.level, coarse_lod: Vec::new() });
        }

        let coarse = Lod::new(raw.coarse_lod)?;
        if coarse.num_levels() != raw.level {
            return Err(LodError::InvalidRankTable {
                reason: format!(
                    "{} coarse levels recorded for ranked level {}",
                    coarse.num_levels(),
                    raw.level
                ),
            });
        }
        if coarse.num_rows() != Some(raw.items.len()) {
            return Err(LodError::InvalidRankTable {
                reason: format!(
                    "coarse levels cover {:?} sequences, table has {}",
                    coarse.num_rows(),
                    raw.items.len()
                ),
            });
        }
        Ok(Self { items: raw.items, level: raw.level, coarse_lod: coarse.into_levels() })
    }
}

impl RankTable {
    /// Rank the sequences of `reference` at `level`.
    pub fn build<T: Element>(reference: &LoDTensor<T>, level: usize) -> Result<Self> {
        Self::from_lod(reference.lod(), level)
    }

    /// Rank the sequences described by `lod` at `level`.
    pub fn from_lod(lod: &Lod, level: usize) -> Result<Self> {
        if level >= lod.num_levels() {
            return Err(LodError::ReferenceMissingLevels {
                requested: level,
                available: lod.num_levels(),
            }
            .into());
        }

        let count = lod.num_sequences(level)?;
        let mut items = Vec::with_capacity(count);
        for index in 0..count {
            let (start, end) = lod.sequence_bounds(level, index)?;
            items.push(RankItem { index, length: end - start });
        }
        items.sort_by_key(|item| Reverse(item.length));

        let table = Self { items, level, coarse_lod: lod.levels()[..level].to_vec() };
        tracing::debug!(
            level,
            sequences = table.len(),
            max_len = table.max_sequence_len(),
            "built rank table"
        );
        Ok(table)
    }

    /// Adopt a host-supplied ordering. `items` must name every index in
    /// `0..items.len()` exactly once; the order is used as given.
    pub fn from_items(items: Vec<RankItem>, level: usize) -> Result<Self> {
        check_permutation(&items)?;
        Ok(Self { items, level, coarse_lod: Vec::new() })
    }

    pub fn items(&self) -> &[RankItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RankItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn coarse_lod(&self) -> &[Vec<usize>] {
        &self.coarse_lod
    }

    /// Length of the longest sequence, 0 for an empty table.
    pub fn max_sequence_len(&self) -> usize {
        self.items.first().map_or(0, |item| item.length)
    }

    /// Original indices in rank order.
    pub fn indices(&self) -> Vec<usize> {
        self.items.iter().map(|item| item.index).collect()
    }
}

impl<'a> IntoIterator for &'a RankTable {
    type Item = &'a RankItem;
    type IntoIter = std::slice::Iter<'a, RankItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn check_permutation(items: &[RankItem]) -> std::result::Result<(), LodError> {
    let mut seen = vec![false; items.len()];
    for item in items {
        match seen.get_mut(item.index) {
            None => {
                return Err(LodError::InvalidRankTable {
                    reason: format!(
                        "index {} out of range for {} entries",
                        item.index,
                        items.len()
                    ),
                });
            }
            Some(true) => {
                return Err(LodError::InvalidRankTable {
                    reason: format!("index {} repeated", item.index),
                });
            }
            Some(slot) => *slot = true,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodrank_common::LodRankError;

    fn item(index: usize, length: usize) -> RankItem {
        RankItem { index, length }
    }

    #[test]
    fn test_build_orders_by_descending_length() {
        let reference =
            LoDTensor::new(vec![0.0f32; 4], 1, Lod::new(vec![vec![0, 1, 3, 4]]).unwrap()).unwrap();
        let table = RankTable::build(&reference, 0).unwrap();
        assert_eq!(table.items(), &[item(1, 2), item(0, 1), item(2, 1)]);
        assert_eq!(table.max_sequence_len(), 2);
        assert_eq!(table.indices(), vec![1, 0, 2]);
    }

    #[test]
    fn test_ties_keep_ascending_index() {
        let lod = Lod::from_lengths(vec![vec![2, 3, 2, 3, 1, 2]]).unwrap();
        let table = RankTable::from_lod(&lod, 0).unwrap();
        assert_eq!(table.indices(), vec![1, 3, 0, 2, 5, 4]);
    }

    #[test]
    fn test_flat_reference_is_rejected() {
        let reference = LoDTensor::flat(vec![1.0f32; 3], 1).unwrap();
        let err = RankTable::build(&reference, 0).unwrap_err();
        assert!(matches!(
            err,
            LodRankError::Lod(LodError::ReferenceMissingLevels { requested: 0, available: 0 })
        ));
    }

    #[test]
    fn test_level_beyond_depth_is_rejected() {
        let lod = Lod::new(vec![vec![0, 2]]).unwrap();
        assert!(matches!(
            RankTable::from_lod(&lod, 1),
            Err(LodRankError::Lod(LodError::ReferenceMissingLevels { requested: 1, available: 1 }))
        ));
    }

    #[test]
    fn test_length_is_row_extent_at_outer_level() {
        // outer seq 0 holds 1 unit of 3 rows, outer seq 1 holds 2 units of 1 row
        let lod = Lod::from_lengths(vec![vec![1, 2], vec![3, 1, 1]]).unwrap();
        let table = RankTable::from_lod(&lod, 0).unwrap();
        assert_eq!(table.items(), &[item(0, 3), item(1, 2)]);
    }

    #[test]
    fn test_inner_level_ranks_all_inner_sequences() {
        let lod = Lod::from_lengths(vec![vec![1, 2], vec![3, 1, 4]]).unwrap();
        let table = RankTable::from_lod(&lod, 1).unwrap();
        assert_eq!(table.level(), 1);
        assert_eq!(table.items(), &[item(2, 4), item(0, 3), item(1, 1)]);
        assert_eq!(table.coarse_lod(), &[vec![0, 1, 3]]);
    }

    #[test]
    fn test_empty_reference_level() {
        let lod = Lod::new(vec![vec![0]]).unwrap();
        let table = RankTable::from_lod(&lod, 0).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.max_sequence_len(), 0);
    }

    #[test]
    fn test_from_items_requires_permutation() {
        assert!(RankTable::from_items(vec![item(1, 5), item(0, 2)], 0).is_ok());
        let dup = RankTable::from_items(vec![item(0, 1), item(0, 1)], 0).unwrap_err();
        assert!(dup.to_string().contains("repeated"));
        let oob = RankTable::from_items(vec![item(2, 1)], 0).unwrap_err();
        assert!(matches!(oob, LodRankError::Lod(LodError::InvalidRankTable { .. })));
    }

    #[test]
    fn test_serde_round_trip_and_validation() {
        let lod = Lod::from_lengths(vec![vec![1, 3, 2]]).unwrap();
        let table = RankTable::from_lod(&lod, 0).unwrap();
        let json = serde_json::to_string(&table).unwrap();
        let parsed: RankTable = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, table);

        let bad = r#"{"items":[{"index":0,"length":1},{"index":0,"length":1}]}"#;
        assert!(serde_json::from_str::<RankTable>(bad).is_err());
    }

    #[test]
    fn test_deserialize_validates_coarse_levels() {
        let lod = Lod::from_lengths(vec![vec![1, 2], vec![3, 1, 4]]).unwrap();
        let table = RankTable::from_lod(&lod, 1).unwrap();
        let json = serde_json::to_string(&table).unwrap();
        let parsed: RankTable = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.coarse_lod(), &[vec![0, 1, 3]]);

        let items = r#"[{"index":0,"length":1},{"index":1,"length":1}]"#;
        let decreasing = format!(r#"{{"items":{items},"level":1,"coarse_lod":[[0,2,1]]}}"#);
        let err = serde_json::from_str::<RankTable>(&decreasing).unwrap_err();
        assert!(err.to_string().contains("LoD inconsistency"), "{err}");

        let wrong_depth = format!(r#"{{"items":{items},"level":2,"coarse_lod":[[0,2]]}}"#);
        assert!(serde_json::from_str::<RankTable>(&wrong_depth).is_err());

        let wrong_count = format!(r#"{{"items":{items},"level":1,"coarse_lod":[[0,3]]}}"#);
        assert!(serde_json::from_str::<RankTable>(&wrong_count).is_err());

        let valid = format!(r#"{{"items":{items},"level":1,"coarse_lod":[[0,2]]}}"#);
        assert_eq!(serde_json::from_str::<RankTable>(&valid).unwrap().coarse_lod(), &[vec![0, 2]]);
    }
}
