use crate::{
    executor::engine::{ExecutionEngine, QueryResult, ResultSet},
    planner::logical_plan::{Projection, SelectPlan},
    storage::schema::{TableSchema, is_row_id_name},
    types::{
        error::{DatabaseError, Result},
        row::Row,
        value::Value,
    },
};

/// One output column of a SELECT.
#[derive(Debug, Clone, Copy)]
enum Projected {
    Column(usize),
    RowId,
}

impl Projected {
    fn extract(self, row: &Row) -> Value {
        match self {
            Projected::Column(index) => row.get_value(index).cloned().unwrap_or(Value::Null),
            Projected::RowId => row.row_id.map_or(Value::Null, Value::Integer),
        }
    }
}

impl ExecutionEngine<'_> {
    pub(crate) fn execute_select(&mut self, plan: SelectPlan) -> Result<QueryResult> {
        let schema = self.catalog.lookup_table(&plan.table_name)?.clone();
        let (columns, projected) = resolve_projection(&schema, &plan.projection)?;

        let rows = self
            .select_rows(&schema, plan.predicate.as_ref())?
            .iter()
            .map(|row| projected.iter().map(|p| p.extract(row)).collect())
            .collect();

        Ok(QueryResult::Rows(ResultSet { columns, rows }))
    }
}

fn resolve_projection(
    schema: &TableSchema,
    projection: &Projection,
) -> Result<(Vec<String>, Vec<Projected>)> {
    match projection {
        Projection::All => Ok((
            schema.column_names(),
            (0..schema.columns.len()).map(Projected::Column).collect(),
        )),
        Projection::Columns(names) => {
            let mut columns = Vec::with_capacity(names.len());
            let mut projected = Vec::with_capacity(names.len());
            for name in names {
                match schema.get_column_index(name) {
                    Some(index) => {
                        columns.push(schema.columns[index].name.clone());
                        projected.push(Projected::Column(index));
                    }
                    None if is_row_id_name(name) => {
                        columns.push(name.clone());
                        projected.push(Projected::RowId);
                    }
                    None => {
                        return Err(DatabaseError::UnknownColumn {
                            name: name.clone(),
                            table: schema.table_name.clone(),
                        });
                    }
                }
            }
            Ok((columns, projected))
        }
    }
}
