#![forbid(unsafe_code)]

use gstate_contracts::wire::SeekRequest;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeekResult {
    pub keys: Vec<Vec<u8>>,
    /// Empty unless the seek asked for values; otherwise aligned with `keys`.
    pub values: Vec<Vec<u8>>,
}

/// The five global-state primitives. Implemented by the local store, the remote proxy
/// client and the dispatcher, which must all answer the same arguments with the same bytes.
///
/// A missing key is never an error: `get` and `batch_get` return an empty value for it.
pub trait GlobalStateRepo {
    type Error;

    fn get(&self, key: &[u8]) -> Result<Vec<u8>, Self::Error>;

    /// Output is positionally aligned with `keys`.
    fn batch_get(&self, keys: &[Vec<u8>]) -> Result<Vec<Vec<u8>>, Self::Error>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), Self::Error>;

    fn delete(&self, key: &[u8]) -> Result<(), Self::Error>;

    fn seek(&self, request: &SeekRequest) -> Result<SeekResult, Self::Error>;
}
