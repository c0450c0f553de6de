use crate::{
    storage::schema::TableSchema,
    types::{
        RowId,
        error::{DatabaseError, Result},
        row::Row,
        value::Value,
    },
};

/// A WHERE clause. Only single-column equality is supported.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals { column: String, value: Value },
}

/// A predicate resolved against a table's schema.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundPredicate {
    /// Equality on the row id: a point lookup. `None` when the literal can
    /// never equal an integer key.
    RowId(Option<RowId>),
    /// Equality on an ordinary column: a filtered full scan.
    Column { index: usize, value: Value },
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Self::Equals {
            column: column.into(),
            value,
        }
    }

    pub fn bind(&self, schema: &TableSchema) -> Result<BoundPredicate> {
        let Predicate::Equals { column, value } = self;

        if schema.is_row_id_column(column) {
            return Ok(BoundPredicate::RowId(value.as_row_id()));
        }

        let index = schema
            .get_column_index(column)
            .ok_or_else(|| DatabaseError::UnknownColumn {
                name: column.clone(),
                table: schema.table_name.clone(),
            })?;
        Ok(BoundPredicate::Column {
            index,
            value: value.clone(),
        })
    }
}

impl BoundPredicate {
    pub fn evaluate(&self, row: &Row) -> bool {
        match self {
            BoundPredicate::RowId(expected) => expected.is_some() && row.row_id == *expected,
            BoundPredicate::Column { index, value } => row
                .get_value(*index)
                .is_some_and(|actual| actual.sql_eq(value)),
        }
    }
}
