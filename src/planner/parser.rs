use sqlparser::{
    ast::{
        BinaryOperator, ColumnOption, CreateTable, Delete, Expr, FromTable, Insert, ObjectName,
        ObjectType, Query, SelectItem, SetExpr, Statement, TableConstraint, TableFactor,
        TableWithJoins, UnaryOperator, Value as SqlValue,
    },
    dialect::SQLiteDialect,
    parser::Parser,
};

use crate::{
    executor::predicate::Predicate,
    planner::{
        error::PlannerError,
        logical_plan::{
            CreateTablePlan, DeletePlan, DropTablePlan, InsertPlan, LogicalPlan, Projection,
            SelectPlan,
        },
    },
    storage::schema::ColumnSchema,
    types::{
        error::{DatabaseError, Position},
        value::Value,
    },
};

pub struct SqlParser;

impl SqlParser {
    pub fn new() -> Self {
        Self
    }

    /// Plan every statement of a `;`-separated script.
    pub fn parse_script(&self, sql: &str) -> Result<Vec<LogicalPlan>, DatabaseError> {
        let dialect = SQLiteDialect {};
        let statements = Parser::parse_sql(&dialect, sql)
            .map_err(|e| PlannerError::from(e).into_database_error(sql))?;

        statements
            .iter()
            .map(|statement| self.to_plan(statement))
            .collect::<Result<Vec<_>, PlannerError>>()
            .map_err(|e| e.into_database_error(sql))
    }

    /// Plan exactly one statement.
    pub fn parse_sql(&self, sql: &str) -> Result<LogicalPlan, DatabaseError> {
        let mut plans = self.parse_script(sql)?;
        if plans.len() != 1 {
            return Err(DatabaseError::Syntax {
                position: Position::new(1, 1),
                message: format!("Expected exactly one statement, found {}", plans.len()),
            });
        }
        Ok(plans.remove(0))
    }

    fn to_plan(&self, statement: &Statement) -> Result<LogicalPlan, PlannerError> {
        match statement {
            Statement::CreateTable(create) => self.plan_create_table(create),
            Statement::Drop {
                object_type: ObjectType::Table,
                if_exists,
                names,
                ..
            } => {
                let [name] = names.as_slice() else {
                    return Err(PlannerError::InvalidQuery(
                        "DROP TABLE takes exactly one table".to_string(),
                    ));
                };
                Ok(LogicalPlan::DropTable(DropTablePlan {
                    table_name: object_name(name)?,
                    if_exists: *if_exists,
                }))
            }
            Statement::Insert(insert) => self.plan_insert(insert),
            Statement::Query(query) => self.plan_select(query),
            Statement::Delete(delete) => self.plan_delete(delete),
            other => {
                let text = other.to_string();
                let keyword = text.split_whitespace().next().unwrap_or_default();
                Err(PlannerError::UnsupportedStatement(keyword.to_string()))
            }
        }
    }

    fn plan_create_table(&self, create: &CreateTable) -> Result<LogicalPlan, PlannerError> {
        if create.query.is_some() {
            return Err(PlannerError::UnsupportedExpression("AS".to_string()));
        }
        if create.columns.is_empty() {
            return Err(PlannerError::InvalidQuery(
                "a table needs at least one column".to_string(),
            ));
        }

        let mut table_primary_key = Vec::new();
        for constraint in &create.constraints {
            match constraint {
                TableConstraint::PrimaryKey { columns, .. } => {
                    table_primary_key.extend(columns.iter().map(|ident| ident.value.clone()));
                }
                _ => return Err(PlannerError::UnsupportedExpression("CONSTRAINT".to_string())),
            }
        }

        let mut columns: Vec<ColumnSchema> = Vec::with_capacity(create.columns.len());
        for (position, def) in create.columns.iter().enumerate() {
            if columns
                .iter()
                .any(|existing| existing.name.eq_ignore_ascii_case(&def.name.value))
            {
                return Err(PlannerError::InvalidQuery(format!(
                    "duplicate column name: {}",
                    def.name.value
                )));
            }

            let mut column = ColumnSchema::new(def.name.value.clone(), def.data_type.to_string(), position);
            for option in &def.options {
                match &option.option {
                    ColumnOption::NotNull => column = column.not_null(),
                    ColumnOption::Null => {}
                    ColumnOption::Unique {
                        is_primary: true, ..
                    } => column = column.primary_key(),
                    _ => {
                        return Err(PlannerError::UnsupportedExpression(
                            option.option.to_string(),
                        ));
                    }
                }
            }
            if table_primary_key.len() == 1
                && table_primary_key[0].eq_ignore_ascii_case(&column.name)
            {
                column = column.primary_key();
            }
            columns.push(column);
        }

        if columns.iter().filter(|column| column.primary_key).count() > 1
            || table_primary_key.len() > 1
        {
            return Err(PlannerError::InvalidQuery(
                "only a single-column primary key is supported".to_string(),
            ));
        }

        Ok(LogicalPlan::CreateTable(CreateTablePlan {
            table_name: object_name(&create.name)?,
            columns,
            if_not_exists: create.if_not_exists,
        }))
    }

    fn plan_insert(&self, insert: &Insert) -> Result<LogicalPlan, PlannerError> {
        if insert.or.is_some() || insert.on.is_some() || insert.returning.is_some() {
            return Err(PlannerError::InvalidQuery(
                "only plain INSERT INTO ... VALUES is supported".to_string(),
            ));
        }
        let Some(source) = &insert.source else {
            return Err(PlannerError::UnsupportedExpression("DEFAULT VALUES".to_string()));
        };
        let SetExpr::Values(values) = source.body.as_ref() else {
            return Err(PlannerError::UnsupportedExpression("SELECT".to_string()));
        };

        let rows = values
            .rows
            .iter()
            .map(|row| row.iter().map(literal).collect::<Result<Vec<_>, _>>())
            .collect::<Result<Vec<_>, _>>()?;

        let columns = (!insert.columns.is_empty())
            .then(|| insert.columns.iter().map(|ident| ident.value.clone()).collect());

        Ok(LogicalPlan::Insert(InsertPlan {
            table_name: object_name(&insert.table_name)?,
            columns,
            rows,
        }))
    }

    fn plan_select(&self, query: &Query) -> Result<LogicalPlan, PlannerError> {
        if query.with.is_some() {
            return Err(PlannerError::UnsupportedExpression("WITH".to_string()));
        }
        if query.order_by.is_some() {
            return Err(PlannerError::UnsupportedExpression("ORDER BY".to_string()));
        }
        if query.limit.is_some() || query.offset.is_some() {
            return Err(PlannerError::UnsupportedExpression("LIMIT".to_string()));
        }

        let SetExpr::Select(select) = query.body.as_ref() else {
            return Err(PlannerError::InvalidQuery(
                "only a single SELECT over one table is supported".to_string(),
            ));
        };
        if select.distinct.is_some() {
            return Err(PlannerError::UnsupportedExpression("DISTINCT".to_string()));
        }
        if select.having.is_some() {
            return Err(PlannerError::UnsupportedExpression("HAVING".to_string()));
        }

        let table_name = single_table(&select.from)?;

        let projection = match select.projection.as_slice() {
            [SelectItem::Wildcard(_)] => Projection::All,
            items => Projection::Columns(
                items
                    .iter()
                    .map(|item| match item {
                        SelectItem::UnnamedExpr(expr) => column_name(expr),
                        other => Err(PlannerError::UnsupportedExpression(other.to_string())),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        let predicate = select.selection.as_ref().map(predicate).transpose()?;

        Ok(LogicalPlan::Select(SelectPlan {
            table_name,
            projection,
            predicate,
        }))
    }

    fn plan_delete(&self, delete: &Delete) -> Result<LogicalPlan, PlannerError> {
        if delete.using.is_some() || delete.returning.is_some() || delete.limit.is_some() {
            return Err(PlannerError::InvalidQuery(
                "only DELETE FROM <table> [WHERE ...] is supported".to_string(),
            ));
        }
        let from = match &delete.from {
            FromTable::WithFromKeyword(from) | FromTable::WithoutKeyword(from) => from,
        };
        let table_name = single_table(from)?;
        let predicate = delete.selection.as_ref().map(predicate).transpose()?;

        Ok(LogicalPlan::Delete(DeletePlan {
            table_name,
            predicate,
        }))
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}

fn object_name(name: &ObjectName) -> Result<String, PlannerError> {
    match name.0.as_slice() {
        [ident] => Ok(ident.value.clone()),
        // schema-qualified "main.t"
        [schema, ident] if schema.value.eq_ignore_ascii_case("main") => Ok(ident.value.clone()),
        _ => Err(PlannerError::InvalidQuery(format!(
            "unsupported table name: {}",
            name
        ))),
    }
}

fn single_table(from: &[TableWithJoins]) -> Result<String, PlannerError> {
    let [table] = from else {
        return Err(PlannerError::InvalidQuery(
            "exactly one table is required".to_string(),
        ));
    };
    if !table.joins.is_empty() {
        return Err(PlannerError::UnsupportedExpression("JOIN".to_string()));
    }
    match &table.relation {
        TableFactor::Table { name, .. } => object_name(name),
        other => Err(PlannerError::UnsupportedExpression(other.to_string())),
    }
}

fn column_name(expr: &Expr) -> Result<String, PlannerError> {
    match expr {
        Expr::Identifier(ident) => Ok(ident.value.clone()),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|ident| ident.value.clone())
            .ok_or_else(|| PlannerError::UnsupportedExpression(expr.to_string())),
        Expr::Nested(inner) => column_name(inner),
        other => Err(PlannerError::UnsupportedExpression(other.to_string())),
    }
}

/// `column = literal`, in either order.
fn predicate(expr: &Expr) -> Result<Predicate, PlannerError> {
    match expr {
        Expr::Nested(inner) => predicate(inner),
        Expr::BinaryOp {
            left,
            op: BinaryOperator::Eq,
            right,
        } => match (column_name(left), column_name(right)) {
            (Ok(column), Err(_)) => Ok(Predicate::eq(column, literal(right)?)),
            (Err(_), Ok(column)) => Ok(Predicate::eq(column, literal(left)?)),
            _ => Err(PlannerError::UnsupportedExpression(expr.to_string())),
        },
        other => Err(PlannerError::UnsupportedExpression(other.to_string())),
    }
}

/// Bind a literal expression to a value.
fn literal(expr: &Expr) -> Result<Value, PlannerError> {
    match expr {
        Expr::Nested(inner) => literal(inner),
        Expr::Value(value) => sql_value(value, false),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr: inner,
        } => match inner.as_ref() {
            Expr::Value(value) => sql_value(value, true),
            other => match literal(other)? {
                Value::Integer(i) => i
                    .checked_neg()
                    .map(Value::Integer)
                    .ok_or_else(|| PlannerError::InvalidLiteral(expr.to_string())),
                Value::Real(r) => Ok(Value::Real(-r)),
                _ => Err(PlannerError::InvalidLiteral(expr.to_string())),
            },
        },
        Expr::UnaryOp {
            op: UnaryOperator::Plus,
            expr: inner,
        } => match literal(inner)? {
            value @ (Value::Integer(_) | Value::Real(_)) => Ok(value),
            _ => Err(PlannerError::InvalidLiteral(expr.to_string())),
        },
        other => Err(PlannerError::UnsupportedExpression(other.to_string())),
    }
}

fn sql_value(value: &SqlValue, negate: bool) -> Result<Value, PlannerError> {
    match value {
        SqlValue::Number(text, _) => {
            let signed = if negate {
                format!("-{}", text)
            } else {
                text.clone()
            };
            if let Ok(integer) = signed.parse::<i64>() {
                Ok(Value::Integer(integer))
            } else if let Ok(real) = signed.parse::<f64>() {
                Ok(Value::Real(real))
            } else {
                Err(PlannerError::InvalidLiteral(text.clone()))
            }
        }
        _ if negate => Err(PlannerError::InvalidLiteral(value.to_string())),
        SqlValue::SingleQuotedString(text) | SqlValue::DoubleQuotedString(text) => {
            Ok(Value::Text(text.clone()))
        }
        SqlValue::HexStringLiteral(digits) => hex::decode(digits)
            .map(Value::Blob)
            .map_err(|_| PlannerError::InvalidLiteral(digits.clone())),
        SqlValue::Boolean(flag) => Ok(Value::Integer(i64::from(*flag))),
        SqlValue::Null => Ok(Value::Null),
        other => Err(PlannerError::UnsupportedExpression(other.to_string())),
    }
}
