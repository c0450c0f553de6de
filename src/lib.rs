pub mod bridge;
pub mod config;
pub mod connection;
pub mod executor;
pub mod planner;
pub mod storage;
pub mod types;
pub mod utils;

pub use config::ConnectionConfig;
pub use connection::{Connection, DestroyOutcome, destroy_database};
pub use executor::engine::{QueryResult, ResultSet};
pub use types::{
    error::{DatabaseError, ErrorKind, Result},
    value::Value,
};
