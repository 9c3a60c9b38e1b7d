//! Partition addresses: a tile plus an optional time block.
//!
//! Addresses map onto the hive layout below the dataset root:
//! `tile=T`, `tile=T/year=Y` or `tile=T/year=Y/month=M` (month unpadded).

use std::fmt;

use gedi_common::{TileId, TimeBlock};
use serde::{Deserialize, Serialize};

/// Location of one partition of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionAddress {
    pub tile: TileId,
    pub time_block: Option<TimeBlock>,
}

impl PartitionAddress {
    pub fn new(tile: TileId, time_block: Option<TimeBlock>) -> Self {
        Self { tile, time_block }
    }

    /// Path below the dataset root.
    pub fn path_suffix(&self) -> String {
        match self.time_block {
            None => format!("tile={}", self.tile),
            Some(TimeBlock::Year(year)) => format!("tile={}/year={}", self.tile, year),
            Some(TimeBlock::Month(ym)) => {
                format!("tile={}/year={}/month={}", self.tile, ym.year, ym.month)
            }
        }
    }

    /// Flat identifier usable in file names.
    pub fn slug(&self) -> String {
        match self.time_block {
            None => self.tile.to_string(),
            Some(block) => format!("{}_{}", self.tile, block),
        }
    }
}

impl fmt::Display for PartitionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path_suffix())
    }
}

/// Expand tiles and time blocks into partition addresses.
///
/// Without time blocks there is one address per tile. Otherwise the order is
/// tile-major: every block of the first tile, then every block of the next.
pub fn resolve_addresses(tiles: &[TileId], blocks: Option<&[TimeBlock]>) -> Vec<PartitionAddress> {
    match blocks {
        None => tiles
            .iter()
            .map(|tile| PartitionAddress::new(tile.clone(), None))
            .collect(),
        Some(blocks) => tiles
            .iter()
            .flat_map(|tile| {
                blocks
                    .iter()
                    .map(move |block| PartitionAddress::new(tile.clone(), Some(*block)))
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gedi_common::YearMonth;

    fn tile(s: &str) -> TileId {
        s.parse().unwrap()
    }

    #[test]
    fn test_path_suffix() {
        let t = tile("013E_52N");
        assert_eq!(PartitionAddress::new(t.clone(), None).path_suffix(), "tile=013E_52N");
        assert_eq!(
            PartitionAddress::new(t.clone(), Some(TimeBlock::Year(2020))).path_suffix(),
            "tile=013E_52N/year=2020"
        );
        let march = TimeBlock::Month(YearMonth::new(2021, 3).unwrap());
        assert_eq!(
            PartitionAddress::new(t, Some(march)).path_suffix(),
            "tile=013E_52N/year=2021/month=3"
        );
    }

    #[test]
    fn test_slug() {
        let march = TimeBlock::Month(YearMonth::new(2021, 3).unwrap());
        let address = PartitionAddress::new(tile("001W_01S"), Some(march));
        assert_eq!(address.slug(), "001W_01S_2021-03");
    }

    #[test]
    fn test_resolve_without_blocks() {
        let tiles = vec![tile("000E_00N"), tile("001E_00N")];
        let addresses = resolve_addresses(&tiles, None);
        assert_eq!(addresses.len(), 2);
        assert!(addresses.iter().all(|a| a.time_block.is_none()));
    }

    #[test]
    fn test_resolve_is_tile_major() {
        let tiles = vec![tile("000E_00N"), tile("001E_00N")];
        let blocks = vec![
            TimeBlock::Year(2020),
            TimeBlock::Month(YearMonth::new(2021, 1).unwrap()),
        ];
        let suffixes: Vec<String> = resolve_addresses(&tiles, Some(&blocks))
            .iter()
            .map(|a| a.path_suffix())
            .collect();
        assert_eq!(
            suffixes,
            vec![
                "tile=000E_00N/year=2020",
                "tile=000E_00N/year=2021/month=1",
                "tile=001E_00N/year=2020",
                "tile=001E_00N/year=2021/month=1",
            ]
        );
    }

    #[test]
    fn test_resolve_with_empty_blocks() {
        let tiles = vec![tile("000E_00N")];
        assert!(resolve_addresses(&tiles, Some(&[])).is_empty());
    }
}
