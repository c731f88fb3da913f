#![forbid(unsafe_code)]

use std::fmt;

use gstate_contracts::wire::SeekRequest;
use gstate_contracts::ContractViolation;
use gstate_storage::{GlobalStateRepo, LocalStore, SeekResult, StorageError};
use thiserror::Error;
use tracing::info;

use crate::config::GlobalStateConfig;
use crate::remote::{RemoteClient, RemoteError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalStateOp {
    Put,
    Get,
    BatchGet,
    Delete,
    Seek,
}

impl GlobalStateOp {
    pub fn as_str(self) -> &'static str {
        match self {
            GlobalStateOp::Put => "GlobalStatePut",
            GlobalStateOp::Get => "GlobalStateGet",
            GlobalStateOp::BatchGet => "GlobalStateBatchGet",
            GlobalStateOp::Delete => "GlobalStateDelete",
            GlobalStateOp::Seek => "GlobalStateSeek",
        }
    }
}

impl fmt::Display for GlobalStateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum GlobalStateError {
    #[error("{op}: {source}")]
    Local {
        op: GlobalStateOp,
        source: StorageError,
    },
    #[error("{op}: {source}")]
    Remote {
        op: GlobalStateOp,
        source: RemoteError,
    },
    #[error("open local store: {0}")]
    Open(#[source] StorageError),
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ContractViolation),
    #[error("{kind} payload: {source}")]
    Payload {
        kind: &'static str,
        source: serde_json::Error,
    },
}

impl GlobalStateError {
    /// True for failures caused by the caller's arguments rather than by storage or the
    /// network. Arguments are checked before dispatch, so the answer does not depend on
    /// whether this instance owns the data.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, GlobalStateError::InvalidInput(_))
    }
}

enum Owner {
    Local(LocalStore),
    Remote(RemoteClient),
}

/// Entry point for every global-state primitive on this instance. Callers never learn
/// whether the data lives here or on the remote owner.
pub struct GlobalState {
    owner: Owner,
}

impl fmt::Debug for GlobalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Owner::Local(store) => f.debug_tuple("GlobalState::Local").field(store).finish(),
            Owner::Remote(client) => f.debug_tuple("GlobalState::Remote").field(client).finish(),
        }
    }
}

impl GlobalState {
    pub fn local(store: LocalStore) -> Self {
        Self {
            owner: Owner::Local(store),
        }
    }

    pub fn remote(client: RemoteClient) -> Self {
        Self {
            owner: Owner::Remote(client),
        }
    }

    pub fn from_config(config: &GlobalStateConfig) -> Result<Self, GlobalStateError> {
        match &config.remote {
            Some(remote) => {
                info!(remote_node = %remote.base_url, "global state forwards to remote owner");
                Ok(Self::remote(RemoteClient::new(remote)))
            }
            None => {
                info!(db_path = %config.db_path.display(), "global state owned locally");
                let store = LocalStore::open(&config.db_path).map_err(GlobalStateError::Open)?;
                Ok(Self::local(store))
            }
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.owner, Owner::Remote(_))
    }

    pub fn mode(&self) -> &'static str {
        if self.is_remote() {
            "remote"
        } else {
            "local"
        }
    }

    /// The only place that chooses between the local store and the remote owner.
    fn dispatch<T>(
        &self,
        op: GlobalStateOp,
        local: impl FnOnce(&LocalStore) -> Result<T, StorageError>,
        remote: impl FnOnce(&RemoteClient) -> Result<T, RemoteError>,
    ) -> Result<T, GlobalStateError> {
        match &self.owner {
            Owner::Remote(client) => {
                remote(client).map_err(|source| GlobalStateError::Remote { op, source })
            }
            Owner::Local(store) => {
                local(store).map_err(|source| GlobalStateError::Local { op, source })
            }
        }
    }
}

impl GlobalStateRepo for GlobalState {
    type Error = GlobalStateError;

    fn get(&self, key: &[u8]) -> Result<Vec<u8>, GlobalStateError> {
        self.dispatch(GlobalStateOp::Get, |s| s.get(key), |c| c.get(key))
    }

    fn batch_get(&self, keys: &[Vec<u8>]) -> Result<Vec<Vec<u8>>, GlobalStateError> {
        self.dispatch(
            GlobalStateOp::BatchGet,
            |s| s.batch_get(keys),
            |c| c.batch_get(keys),
        )
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), GlobalStateError> {
        self.dispatch(
            GlobalStateOp::Put,
            |s| s.put(key, value),
            |c| c.put(key, value),
        )
    }

    fn delete(&self, key: &[u8]) -> Result<(), GlobalStateError> {
        self.dispatch(GlobalStateOp::Delete, |s| s.delete(key), |c| c.delete(key))
    }

    fn seek(&self, request: &SeekRequest) -> Result<SeekResult, GlobalStateError> {
        self.dispatch(
            GlobalStateOp::Seek,
            |s| s.seek(request),
            |c| c.seek(request),
        )
    }
}
