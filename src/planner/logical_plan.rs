use crate::{executor::predicate::Predicate, storage::schema::ColumnSchema, types::value::Value};

#[derive(Debug, Clone, PartialEq)]
pub enum LogicalPlan {
    CreateTable(CreateTablePlan),
    DropTable(DropTablePlan),
    Insert(InsertPlan),
    Select(SelectPlan),
    Delete(DeletePlan),
}

impl LogicalPlan {
    pub fn table_name(&self) -> &str {
        match self {
            LogicalPlan::CreateTable(plan) => &plan.table_name,
            LogicalPlan::DropTable(plan) => &plan.table_name,
            LogicalPlan::Insert(plan) => &plan.table_name,
            LogicalPlan::Select(plan) => &plan.table_name,
            LogicalPlan::Delete(plan) => &plan.table_name,
        }
    }

    /// Whether executing the plan can change the database.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, LogicalPlan::Select(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTablePlan {
    pub table_name: String,
    pub columns: Vec<ColumnSchema>,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTablePlan {
    pub table_name: String,
    pub if_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertPlan {
    pub table_name: String,
    /// Explicit column list; `None` means every column in table order.
    pub columns: Option<Vec<String>>,
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    Columns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectPlan {
    pub table_name: String,
    pub projection: Projection,
    pub predicate: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeletePlan {
    pub table_name: String,
    pub predicate: Option<Predicate>,
}
