use serde::{Deserialize, Serialize};

pub const DEFAULT_WAL_AUTOCHECKPOINT: usize = 1000;

/// Tunables for a [`crate::connection::Connection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Committed page frames after which a statement ends with a
    /// checkpoint. 0 turns automatic checkpoints off.
    pub wal_autocheckpoint: usize,
    /// fsync the log after every commit frame.
    pub sync_on_commit: bool,
    /// Checkpoint when the connection closes. When off, committed work
    /// stays in the log until the next open recovers it.
    pub checkpoint_on_close: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            wal_autocheckpoint: DEFAULT_WAL_AUTOCHECKPOINT,
            sync_on_commit: true,
            checkpoint_on_close: true,
        }
    }
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wal_autocheckpoint(mut self, frames: usize) -> Self {
        self.wal_autocheckpoint = frames;
        self
    }

    pub fn sync_on_commit(mut self, sync: bool) -> Self {
        self.sync_on_commit = sync;
        self
    }

    pub fn checkpoint_on_close(mut self, checkpoint: bool) -> Self {
        self.checkpoint_on_close = checkpoint;
        self
    }
}
