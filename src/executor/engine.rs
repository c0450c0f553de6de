use serde::{Deserialize, Serialize};

use crate::{
    executor::predicate::{BoundPredicate, Predicate},
    planner::logical_plan::LogicalPlan,
    storage::{
        bplus_tree::BTreeIndex, catalog::Catalog, page_store::PageStore, schema::TableSchema,
    },
    types::{error::Result, row::Row, value::Value},
};

/// Column names and the rows of a SELECT, in row id order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryResult {
    /// CREATE, DROP, INSERT and DELETE.
    RowsAffected(u64),
    Rows(ResultSet),
}

impl QueryResult {
    pub fn rows_affected(&self) -> Option<u64> {
        match self {
            QueryResult::RowsAffected(count) => Some(*count),
            QueryResult::Rows(_) => None,
        }
    }

    pub fn into_rows(self) -> Option<ResultSet> {
        match self {
            QueryResult::Rows(result_set) => Some(result_set),
            QueryResult::RowsAffected(_) => None,
        }
    }
}

/// Runs planned statements against the catalog and table B-trees. Each
/// operator lives in its own module as an `impl ExecutionEngine` block.
pub struct ExecutionEngine<'a> {
    pub(crate) store: &'a mut PageStore,
    pub(crate) catalog: &'a mut Catalog,
}

impl<'a> ExecutionEngine<'a> {
    pub fn new(store: &'a mut PageStore, catalog: &'a mut Catalog) -> Self {
        Self { store, catalog }
    }

    pub fn execute(&mut self, plan: LogicalPlan) -> Result<QueryResult> {
        match plan {
            LogicalPlan::CreateTable(plan) => self.execute_create_table(plan),
            LogicalPlan::DropTable(plan) => self.execute_drop_table(plan),
            LogicalPlan::Insert(plan) => self.execute_insert(plan),
            LogicalPlan::Select(plan) => self.execute_select(plan),
            LogicalPlan::Delete(plan) => self.execute_delete(plan),
        }
    }

    /// Rows of `schema` matching `predicate`: a point lookup when it pins
    /// the row id, a filtered full scan otherwise.
    pub(crate) fn select_rows(
        &mut self,
        schema: &TableSchema,
        predicate: Option<&Predicate>,
    ) -> Result<Vec<Row>> {
        let bound = predicate.map(|p| p.bind(schema)).transpose()?;
        let index = BTreeIndex::open(self.store, schema.root_page_id);

        match bound {
            Some(BoundPredicate::RowId(None)) => Ok(Vec::new()),
            Some(BoundPredicate::RowId(Some(row_id))) => match index.lookup(row_id)? {
                Some(bytes) => Ok(vec![Row::from_bytes(row_id, &bytes)?]),
                None => Ok(Vec::new()),
            },
            filter => {
                let mut rows = Vec::new();
                for entry in index.scan_all() {
                    let (row_id, bytes) = entry?;
                    let row = Row::from_bytes(row_id, &bytes)?;
                    if filter.as_ref().is_none_or(|f| f.evaluate(&row)) {
                        rows.push(row);
                    }
                }
                Ok(rows)
            }
        }
    }
}
