pub mod create_table;
pub mod delete;
pub mod drop_table;
pub mod engine;
pub mod insert;
pub mod predicate;
pub mod scan;

pub use engine::{ExecutionEngine, QueryResult, ResultSet};
