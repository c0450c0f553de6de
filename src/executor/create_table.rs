use crate::{
    executor::engine::{ExecutionEngine, QueryResult},
    planner::logical_plan::CreateTablePlan,
    types::error::{DatabaseError, Result},
};

impl ExecutionEngine<'_> {
    pub(crate) fn execute_create_table(&mut self, plan: CreateTablePlan) -> Result<QueryResult> {
        if plan.if_not_exists && self.catalog.contains(&plan.table_name) {
            return Ok(QueryResult::RowsAffected(0));
        }
        validate_columns(&plan)?;

        self.catalog
            .create_table(self.store, &plan.table_name, plan.columns)?;
        Ok(QueryResult::RowsAffected(0))
    }
}

fn validate_columns(plan: &CreateTablePlan) -> Result<()> {
    if plan.columns.is_empty() {
        return Err(DatabaseError::ConstraintViolation {
            details: format!("table '{}' has no columns", plan.table_name),
        });
    }
    for column in &plan.columns {
        if column.name.is_empty() {
            return Err(DatabaseError::ConstraintViolation {
                details: format!("table '{}' has an unnamed column", plan.table_name),
            });
        }
    }
    Ok(())
}
