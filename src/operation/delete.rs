use crate::client::SheetQuery;
use crate::error::ResultMessage;
use crate::error::SheetQueryError;
use crate::operation::filter_rows;
use crate::operation::reader::BatchReader;
use crate::operation::Predicate;
use crate::store::TabularStore;
use serde::Serialize;

/// Outcome of a delete.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeleteResult {
    pub deleted_rows: usize,
    /// Removed sheet rows, highest first, as sent to the store
    pub positions: Vec<usize>,
}

/// Removes the rows a filter matches in one batched call.
pub struct DeleteSelector<'a, S> {
    client: &'a SheetQuery<S>,
    table: &'a str,
}

impl<'a, S: TabularStore> DeleteSelector<'a, S> {
    pub fn new(client: &'a SheetQuery<S>, table: &'a str) -> Self {
        DeleteSelector { client, table }
    }

    /// Deletes matching rows, highest position first so earlier removals don't shift later ones.
    /// Without a filter, or with no matches, the store is not written.
    pub fn run(&self, filter: Option<&Predicate>) -> Result<DeleteResult, SheetQueryError> {
        let snapshot = BatchReader::new(self.client).fetch(self.table)?;
        if filter.is_none() || snapshot.is_empty() {
            return Ok(DeleteResult::default());
        }
        let mut positions: Vec<usize> = filter_rows(self.table, filter, snapshot.rows)
            .iter()
            .map(|row| row.position())
            .collect();
        if positions.is_empty() {
            return Ok(DeleteResult::default());
        }
        positions.sort_unstable_by(|a, b| b.cmp(a));

        self.client
            .gate()
            .execute("delete_rows", || {
                self.client
                    .store()
                    .delete_rows(self.client.document_id(), self.table, &positions)
            })
            .with_prefix(&format!("Failed to delete rows {:?} from table \"{}\"", positions, self.table))?;
        tracing::info!(table = self.table, rows = positions.len(), "deleted rows");
        Ok(DeleteResult {
            deleted_rows: positions.len(),
            positions,
        })
    }
}
