use std::{
    io,
    path::{Path, PathBuf},
};

use tempfile::{Builder, TempDir};

use crate::{
    config::ConnectionConfig,
    connection::Connection,
    storage::{page_store::PageStore, wal::wal_path},
    types::error::Result,
};

/// A database path inside a private temporary directory. The directory,
/// database file and log are removed on drop.
pub struct TempDatabase {
    dir: TempDir,
    pub path: PathBuf,
}

impl TempDatabase {
    pub fn new() -> io::Result<Self> {
        Self::with_prefix("lembar_test")
    }

    pub fn with_prefix(prefix: &str) -> io::Result<Self> {
        let dir = Builder::new().prefix(prefix).tempdir()?;
        let path = dir.path().join(format!("{}.db", prefix));
        Ok(Self { dir, path })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn wal_path(&self) -> PathBuf {
        wal_path(&self.path)
    }

    pub fn connect(&self) -> Result<Connection> {
        self.connect_with(ConnectionConfig::default())
    }

    pub fn connect_with(&self, config: ConnectionConfig) -> Result<Connection> {
        let mut connection = Connection::with_config(config);
        connection.open(&self.path)?;
        Ok(connection)
    }

    /// The raw page store, without log recovery.
    pub fn open_store(&self) -> Result<PageStore> {
        PageStore::open(&self.path)
    }
}
