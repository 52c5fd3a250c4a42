use log::debug;

use crate::record::{Field, WorkingTable};

/// Removes records where every listed field is null. An empty field list
/// removes nothing. Attached ranks and source rows follow the kept records.
pub fn prune_rows(table: &mut WorkingTable, fields: &[Field]) -> usize {
    if fields.is_empty() {
        return 0;
    }
    table.retain(|record, _| !fields.iter().all(|field| record.is_null(*field)))
}

/// Drops the transient rank column. Returns whether one was attached.
pub fn prune_rank_column(table: &mut WorkingTable) -> bool {
    let dropped = table.ranks.take().is_some();
    if dropped {
        debug!("Dropped rank column from {} row(s)", table.len());
    }
    dropped
}
