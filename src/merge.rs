// src/merge.rs

use std::collections::HashMap;
use tracing::{debug, info};

use crate::{
    batch::RawBatchTable,
    error::{CensusError, Result},
    geography::{split_extras, GeographyExtraColumns},
    table::RegionTable,
};

/// Full outer join on `NAME`.
///
/// Every region of either side is kept. Left rows keep their order; regions
/// only on the right are appended in right-hand order. Cells a side did not
/// supply are null.
pub fn outer_join(mut left: RegionTable, right: RegionTable) -> Result<RegionTable> {
    if let Some(dup) = right.columns.iter().find(|c| left.has_column(c)) {
        return Err(CensusError::ColumnCollision(dup.clone()));
    }

    let left_width = left.columns.len();
    let right_width = right.columns.len();
    let mut index: HashMap<String, usize> = left
        .names
        .iter()
        .enumerate()
        .map(|(i, n)| (n.clone(), i))
        .collect();

    for row in &mut left.cells {
        row.resize(left_width + right_width, None);
    }
    left.columns.extend(right.columns);

    for (name, cells) in right.names.into_iter().zip(right.cells) {
        match index.get(&name) {
            Some(&r) => {
                for (j, v) in cells.into_iter().enumerate() {
                    left.cells[r][left_width + j] = v;
                }
            }
            None => {
                let mut row = vec![None; left_width];
                row.extend(cells);
                index.insert(name.clone(), left.names.len());
                left.names.push(name);
                left.cells.push(row);
            }
        }
    }
    Ok(left)
}

/// The folded result of every batch, geography columns already reattached
/// directly after `NAME`.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTable {
    pub table: RegionTable,
    /// Names of the reattached geography columns, in position order.
    pub extra_columns: Vec<String>,
}

/// Folds batch tables, in batch order, into one wide table.
///
/// Geography columns are captured from batch 0 only and stripped from every
/// batch before joining. Later batches' values are compared against batch 0
/// when `verify_geography` is set, and dropped either way.
#[derive(Debug)]
pub struct MergeEngine {
    acc: Option<RegionTable>,
    extras: Option<GeographyExtraColumns>,
    next_index: usize,
    verify_geography: bool,
}

impl MergeEngine {
    pub fn new(verify_geography: bool) -> Self {
        Self {
            acc: None,
            extras: None,
            next_index: 0,
            verify_geography,
        }
    }

    pub fn batches_seen(&self) -> usize {
        self.next_index
    }

    pub fn push(&mut self, raw: RawBatchTable) -> Result<()> {
        if raw.index != self.next_index {
            return Err(CensusError::BatchOutOfOrder {
                expected: self.next_index,
                got: raw.index,
            });
        }
        let RawBatchTable { index, mut table } = raw;
        table.ensure_unique_names(index)?;

        let found = split_extras(&mut table);
        match (index, found) {
            (0, found) => self.extras = found,
            (_, Some(later)) if self.verify_geography => {
                if let Some(first) = &self.extras {
                    first.verify(index, &later.table)?;
                }
            }
            _ => {}
        }

        self.acc = Some(match self.acc.take() {
            None => table,
            Some(acc) => outer_join(acc, table)?,
        });
        self.next_index += 1;
        debug!(batch_index = index, "merged batch");
        Ok(())
    }

    /// Reattach geography columns and hand back the merged table.
    pub fn finish(self) -> Result<MergedTable> {
        let merged = self
            .acc
            .ok_or(CensusError::EmptyRequest("no batches were merged"))?;

        let Some(extras) = self.extras else {
            info!(rows = merged.height(), columns = merged.columns.len(), "merge complete");
            return Ok(MergedTable {
                table: merged,
                extra_columns: Vec::new(),
            });
        };

        let extra_columns = extras.table.columns.clone();
        let mut table = outer_join(merged, extras.table)?;
        for (pos, c) in extra_columns.iter().enumerate() {
            table.move_column(c, pos);
        }
        info!(
            rows = table.height(),
            columns = table.columns.len(),
            extras = ?extra_columns,
            "merge complete"
        );
        Ok(MergedTable {
            table,
            extra_columns,
        })
    }
}
