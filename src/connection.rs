use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    config::ConnectionConfig,
    executor::engine::{ExecutionEngine, QueryResult},
    planner::{logical_plan::LogicalPlan, parser::SqlParser},
    storage::{
        catalog::Catalog,
        page_store::PageStore,
        wal::{Wal, wal_path},
    },
    types::error::{DatabaseError, Result},
};

/// What [`destroy_database`] found at the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestroyOutcome {
    Removed,
    NotFound,
}

/// Everything a mounted database owns.
struct OpenDatabase {
    path: PathBuf,
    store: PageStore,
    wal: Wal,
    catalog: Catalog,
}

enum ConnectionState {
    Closed,
    Open(Box<OpenDatabase>),
}

/// Handle to one database file. Every statement runs as its own
/// transaction; dropping the handle closes it.
pub struct Connection {
    config: ConnectionConfig,
    parser: SqlParser,
    state: ConnectionState,
}

impl Connection {
    pub fn new() -> Self {
        Self::with_config(ConnectionConfig::default())
    }

    pub fn with_config(config: ConnectionConfig) -> Self {
        Self {
            config,
            parser: SqlParser::new(),
            state: ConnectionState::Closed,
        }
    }

    /// Open `path` with the default configuration.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut connection = Self::new();
        connection.open(path)?;
        Ok(connection)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, ConnectionState::Open(_))
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.state {
            ConnectionState::Open(db) => Some(&db.path),
            ConnectionState::Closed => None,
        }
    }

    /// Mount the file, creating it if needed, and recover from its log.
    /// An already open database is closed first.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.close();
        let path = path.as_ref();

        let database = OpenDatabase::mount(path).map_err(|error| match error {
            DatabaseError::Io(e) => DatabaseError::Open {
                reason: format!("{}: {}", path.display(), e),
            },
            other => other,
        })?;

        info!(path = %path.display(), "opened database");
        self.state = ConnectionState::Open(Box::new(database));
        Ok(())
    }

    /// Checkpoint (unless disabled) and release the file. Never fails;
    /// calling it on a closed connection does nothing.
    pub fn close(&mut self) {
        let ConnectionState::Open(mut db) = std::mem::replace(&mut self.state, ConnectionState::Closed)
        else {
            return;
        };

        if self.config.checkpoint_on_close {
            if let Err(error) = db.wal.checkpoint(&mut db.store) {
                warn!(path = %db.path.display(), %error, "checkpoint on close failed");
            }
        }
        info!(path = %db.path.display(), "closed database");
    }

    fn database(&self) -> Result<&OpenDatabase> {
        match &self.state {
            ConnectionState::Open(db) => Ok(&**db),
            ConnectionState::Closed => Err(DatabaseError::NotOpen),
        }
    }

    fn database_mut(&mut self) -> Result<&mut OpenDatabase> {
        match &mut self.state {
            ConnectionState::Open(db) => Ok(&mut **db),
            ConnectionState::Closed => Err(DatabaseError::NotOpen),
        }
    }

    /// Run one statement atomically.
    pub fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        self.database()?;
        let plan = self.parser.parse_sql(sql)?;
        self.execute_plan(plan)
    }

    /// Run an already planned statement atomically.
    pub fn execute_plan(&mut self, plan: LogicalPlan) -> Result<QueryResult> {
        let config = self.config.clone();
        self.database_mut()?.run(plan, &config)
    }

    /// Run a `;`-separated script, one transaction per statement, stopping
    /// at the first failure. Statements before it stay committed.
    pub fn execute_batch(&mut self, sql: &str) -> Result<Vec<QueryResult>> {
        self.database()?;
        let plans = self.parser.parse_script(sql)?;
        let config = self.config.clone();
        let db = self.database_mut()?;

        let mut results = Vec::with_capacity(plans.len());
        for plan in plans {
            results.push(db.run(plan, &config)?);
        }
        Ok(results)
    }

    /// Replay the log into the database file now. Returns the number of
    /// frames written back.
    pub fn checkpoint(&mut self) -> Result<usize> {
        let db = self.database_mut()?;
        db.wal.checkpoint(&mut db.store)
    }

    pub fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.database()?.catalog.table_names())
    }

    /// Delete a database file and its log. Destroying the file this
    /// connection holds closes it first.
    pub fn destroy<P: AsRef<Path>>(&mut self, path: P) -> Result<DestroyOutcome> {
        let path = path.as_ref();
        if self.path().is_some_and(|open| same_file(open, path)) {
            self.close();
        }
        destroy_database(path)
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl OpenDatabase {
    fn mount(path: &Path) -> Result<Self> {
        let mut store = PageStore::open(path)?;
        let mut wal = Wal::open(wal_path(path), store.header().checkpoint_seq)?;
        let report = wal.recover(&mut store)?;
        let catalog = Catalog::load(&mut store)?;

        debug!(
            frames_replayed = report.frames_replayed,
            frames_discarded = report.frames_discarded,
            tables = catalog.table_names().len(),
            "mounted database"
        );

        Ok(Self {
            path: path.to_path_buf(),
            store,
            wal,
            catalog,
        })
    }

    fn run(&mut self, plan: LogicalPlan, config: &ConnectionConfig) -> Result<QueryResult> {
        debug!(table = plan.table_name(), mutation = plan.is_mutation(), "running statement");
        if !plan.is_mutation() {
            return ExecutionEngine::new(&mut self.store, &mut self.catalog).execute(plan);
        }

        self.store.begin();
        let result = match ExecutionEngine::new(&mut self.store, &mut self.catalog).execute(plan) {
            Ok(result) => result,
            Err(error) => {
                self.abort();
                return Err(error);
            }
        };
        if let Err(error) = self.commit(config) {
            self.abort();
            return Err(error);
        }

        if config.wal_autocheckpoint > 0
            && self.wal.frames_since_checkpoint() >= config.wal_autocheckpoint
        {
            // The statement is already durable in the log.
            if let Err(error) = self.wal.checkpoint(&mut self.store) {
                warn!(%error, "automatic checkpoint failed");
            }
        }
        Ok(result)
    }

    /// Log the transaction's page images and seal them with a commit frame.
    fn commit(&mut self, config: &ConnectionConfig) -> Result<()> {
        let changes = self.store.pending_changes()?;
        if !changes.is_empty() {
            for change in &changes {
                self.wal.append(change.page_id, &change.before, &change.after)?;
            }
            self.wal.commit(config.sync_on_commit)?;
        }
        self.store.end_transaction();
        Ok(())
    }

    /// Undo a failed statement: unlogged frames, page images and the
    /// cached catalog.
    fn abort(&mut self) {
        if let Err(error) = self.wal.discard_pending() {
            warn!(%error, "could not truncate uncommitted log frames");
        }
        if let Err(error) = self.store.rollback() {
            warn!(%error, "rollback failed");
        }
        match Catalog::load(&mut self.store) {
            Ok(catalog) => self.catalog = catalog,
            Err(error) => warn!(%error, "could not reload catalog after rollback"),
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Remove a database file and its log. A missing file is not an error.
pub fn destroy_database<P: AsRef<Path>>(path: P) -> Result<DestroyOutcome> {
    let path = path.as_ref();

    match fs::remove_file(wal_path(path)) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(DatabaseError::Io(e)),
    }

    match fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "destroyed database");
            Ok(DestroyOutcome::Removed)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "nothing to destroy");
            Ok(DestroyOutcome::NotFound)
        }
        Err(e) => Err(DatabaseError::Io(e)),
    }
}
