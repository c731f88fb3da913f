#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod records;
pub mod remote;

pub use config::{GlobalStateConfig, RemoteOwnerConfig};
pub use dispatch::{GlobalState, GlobalStateError, GlobalStateOp};
pub use gstate_storage::{GlobalStateRepo, SeekResult};
pub use records::{FeedKind, ModerationList};
pub use remote::{RemoteClient, RemoteError};
