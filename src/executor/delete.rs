use tracing::debug;

use crate::{
    executor::engine::{ExecutionEngine, QueryResult},
    planner::logical_plan::DeletePlan,
    storage::bplus_tree::BTreeIndex,
    types::{RowId, error::Result},
};

impl ExecutionEngine<'_> {
    /// Select the matching row ids first, then delete them one by one.
    pub(crate) fn execute_delete(&mut self, plan: DeletePlan) -> Result<QueryResult> {
        let schema = self.catalog.lookup_table(&plan.table_name)?.clone();
        let row_ids: Vec<RowId> = self
            .select_rows(&schema, plan.predicate.as_ref())?
            .into_iter()
            .filter_map(|row| row.row_id)
            .collect();

        let mut index = BTreeIndex::open(self.store, schema.root_page_id);
        let mut deleted = 0;
        for row_id in row_ids {
            if index.delete(row_id)?.is_some() {
                deleted += 1;
            }
        }

        debug!(table = %schema.table_name, rows = deleted, "deleted rows");
        Ok(QueryResult::RowsAffected(deleted))
    }
}
