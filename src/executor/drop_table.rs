use crate::{
    executor::engine::{ExecutionEngine, QueryResult},
    planner::logical_plan::DropTablePlan,
    types::error::Result,
};

impl ExecutionEngine<'_> {
    pub(crate) fn execute_drop_table(&mut self, plan: DropTablePlan) -> Result<QueryResult> {
        if plan.if_exists && !self.catalog.contains(&plan.table_name) {
            return Ok(QueryResult::RowsAffected(0));
        }
        self.catalog.drop_table(self.store, &plan.table_name)?;
        Ok(QueryResult::RowsAffected(0))
    }
}
