#![forbid(unsafe_code)]

pub mod repo;
pub mod store;

pub use repo::{GlobalStateRepo, SeekResult};
pub use store::{LocalStore, StorageError};
