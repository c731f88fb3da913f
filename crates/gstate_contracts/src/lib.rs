#![forbid(unsafe_code)]

pub mod common;
pub mod keys;
pub mod payload;
pub mod wire;

pub use common::{ContractViolation, Validate};
pub use keys::{ContentHash, PublicKey, RecordKind};
pub use payload::Presence;
