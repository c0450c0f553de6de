use crate::{
    executor::engine::{ExecutionEngine, QueryResult},
    planner::logical_plan::InsertPlan,
    storage::{
        bplus_tree::BTreeIndex,
        schema::{TableSchema, is_row_id_name},
    },
    types::{
        RowId,
        error::{DatabaseError, Result},
        row::Row,
        value::{DataType, Value},
    },
};

/// Where one supplied value goes.
#[derive(Debug, Clone, Copy, PartialEq)]
enum InsertTarget {
    Column(usize),
    RowId,
}

impl ExecutionEngine<'_> {
    /// Insert every VALUES tuple. The caller's transaction makes the whole
    /// statement atomic.
    pub(crate) fn execute_insert(&mut self, plan: InsertPlan) -> Result<QueryResult> {
        let schema = self.catalog.lookup_table(&plan.table_name)?.clone();
        let targets = resolve_targets(&schema, plan.columns.as_deref())?;
        let mut index = BTreeIndex::open(self.store, schema.root_page_id);

        let mut inserted = 0;
        for supplied in plan.rows {
            if supplied.len() != targets.len() {
                return Err(DatabaseError::ColumnCountMismatch {
                    table: schema.table_name.clone(),
                    expected: targets.len(),
                    actual: supplied.len(),
                });
            }

            let (explicit_row_id, values) = build_row(&schema, &targets, supplied)?;
            let row_id = match explicit_row_id {
                Some(row_id) => {
                    if index.lookup(row_id)?.is_some() {
                        return Err(DatabaseError::ConstraintViolation {
                            details: format!(
                                "UNIQUE constraint failed: {} row id {}",
                                schema.table_name, row_id
                            ),
                        });
                    }
                    row_id
                }
                None => next_row_id(&index)?,
            };

            let mut row = Row::with_row_id(row_id, values);
            if let Some(alias) = schema.row_id_alias() {
                row.values[alias] = Value::Integer(row_id);
            }
            index.insert(row_id, row.to_bytes())?;
            inserted += 1;
        }

        Ok(QueryResult::RowsAffected(inserted))
    }
}

fn resolve_targets(schema: &TableSchema, columns: Option<&[String]>) -> Result<Vec<InsertTarget>> {
    let Some(columns) = columns else {
        return Ok((0..schema.columns.len()).map(InsertTarget::Column).collect());
    };

    let mut targets = Vec::with_capacity(columns.len());
    for name in columns {
        let target = match schema.get_column_index(name) {
            Some(index) => InsertTarget::Column(index),
            None if is_row_id_name(name) => InsertTarget::RowId,
            None => {
                return Err(DatabaseError::UnknownColumn {
                    name: name.clone(),
                    table: schema.table_name.clone(),
                });
            }
        };
        if targets.contains(&target) {
            return Err(DatabaseError::ConstraintViolation {
                details: format!("column '{}' is listed more than once", name),
            });
        }
        targets.push(target);
    }
    Ok(targets)
}

/// Lay the supplied values out in table order, enforcing declared types
/// and NOT NULL. Returns the explicit row id, if one was given.
fn build_row(
    schema: &TableSchema,
    targets: &[InsertTarget],
    supplied: Vec<Value>,
) -> Result<(Option<RowId>, Vec<Value>)> {
    let alias = schema.row_id_alias();
    let mut values = vec![Value::Null; schema.columns.len()];
    let mut row_id_value = Value::Null;

    for (target, value) in targets.iter().zip(supplied) {
        match *target {
            InsertTarget::Column(index) if Some(index) == alias => row_id_value = value,
            InsertTarget::Column(index) => values[index] = value,
            InsertTarget::RowId => row_id_value = value,
        }
    }

    let explicit_row_id = match &row_id_value {
        Value::Null => None,
        value => Some(value.as_row_id().ok_or_else(|| DatabaseError::TypeMismatch {
            column: alias
                .map(|index| schema.columns[index].name.clone())
                .unwrap_or_else(|| "rowid".to_string()),
            expected: DataType::Integer.to_string(),
            actual: value.type_name().to_string(),
        })?),
    };

    for (index, column) in schema.columns.iter().enumerate() {
        if Some(index) == alias {
            continue;
        }
        let value = std::mem::replace(&mut values[index], Value::Null);
        if value.is_null() && !column.nullable {
            return Err(DatabaseError::ConstraintViolation {
                details: format!(
                    "NOT NULL constraint failed: {}.{}",
                    schema.table_name, column.name
                ),
            });
        }
        values[index] = value
            .coerce_to(column.data_type)
            .map_err(|rejected| DatabaseError::TypeMismatch {
                column: column.name.clone(),
                expected: column.data_type.to_string(),
                actual: rejected.type_name().to_string(),
            })?;
    }

    Ok((explicit_row_id, values))
}

/// One past the largest row id in use, or 1 for an empty table.
fn next_row_id(index: &BTreeIndex<'_>) -> Result<RowId> {
    match index.last_key()? {
        None => Ok(1),
        Some(last) => last.checked_add(1).ok_or_else(|| DatabaseError::ConstraintViolation {
            details: "row id space exhausted".to_string(),
        }),
    }
}
