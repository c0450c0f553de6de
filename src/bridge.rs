use serde::{Deserialize, Serialize};

use crate::{
    config::ConnectionConfig,
    connection::{Connection, DestroyOutcome},
    executor::engine::{QueryResult, ResultSet},
    planner::{logical_plan::LogicalPlan, parser::SqlParser},
    types::error::{DatabaseError, ErrorKind, Position, Result},
};

/// The operations a host application can invoke, tagged by the host-side
/// command name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "args")]
pub enum Command {
    #[serde(rename = "openDatabase")]
    OpenDatabase { path: String },
    #[serde(rename = "closeDB")]
    CloseDb,
    #[serde(rename = "executeSQLStatement")]
    ExecuteSqlStatement { sql: String },
    /// Like `executeSQLStatement`, restricted to INSERT.
    #[serde(rename = "insertIntoTable")]
    InsertIntoTable { sql: String },
    #[serde(rename = "destroyDatabase")]
    DestroyDatabase { path: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    Opened { path: String },
    Closed,
    RowsAffected { count: u64 },
    Rows(ResultSet),
    Destroyed { path: String, outcome: DestroyOutcome },
}

impl From<QueryResult> for Response {
    fn from(result: QueryResult) -> Self {
        match result {
            QueryResult::RowsAffected(count) => Response::RowsAffected { count },
            QueryResult::Rows(result_set) => Response::Rows(result_set),
        }
    }
}

/// Success-or-failure envelope sent back across the host boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Reply {
    Ok { response: Response },
    Error { kind: ErrorKind, message: String },
}

impl From<Result<Response>> for Reply {
    fn from(result: Result<Response>) -> Self {
        match result {
            Ok(response) => Reply::Ok { response },
            Err(error) => Reply::Error {
                kind: error.kind(),
                message: error.to_string(),
            },
        }
    }
}

/// Owns the single connection behind the host commands.
pub struct Bridge {
    connection: Connection,
    parser: SqlParser,
}

impl Bridge {
    pub fn new() -> Self {
        Self::with_config(ConnectionConfig::default())
    }

    pub fn with_config(config: ConnectionConfig) -> Self {
        Self {
            connection: Connection::with_config(config),
            parser: SqlParser::new(),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Response> {
        match command {
            Command::OpenDatabase { path } => {
                self.connection.open(&path)?;
                Ok(Response::Opened { path })
            }
            Command::CloseDb => {
                self.connection.close();
                Ok(Response::Closed)
            }
            Command::ExecuteSqlStatement { sql } => {
                Ok(self.connection.execute(&sql)?.into())
            }
            Command::InsertIntoTable { sql } => {
                if !self.connection.is_open() {
                    return Err(DatabaseError::NotOpen);
                }
                let plan = self.parser.parse_sql(&sql)?;
                if !matches!(plan, LogicalPlan::Insert(_)) {
                    return Err(DatabaseError::Syntax {
                        position: Position::new(1, 1),
                        message: "insertIntoTable only accepts INSERT statements".to_string(),
                    });
                }
                Ok(self.connection.execute_plan(plan)?.into())
            }
            Command::DestroyDatabase { path } => {
                let outcome = self.connection.destroy(&path)?;
                Ok(Response::Destroyed { path, outcome })
            }
        }
    }

    /// [`Bridge::dispatch`] with the outcome folded into a [`Reply`].
    pub fn handle(&mut self, command: Command) -> Reply {
        self.dispatch(command).into()
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}
