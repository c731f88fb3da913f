#![forbid(unsafe_code)]

//! JSON envelopes exchanged between a forwarding instance and the owner.
//!
//! Field names are PascalCase and byte fields travel as standard padded base64. A missing
//! or `null` field decodes to its empty value, so peers that emit `null` for empty lists
//! interoperate.

use serde::{Deserialize, Serialize};

use crate::{ContractViolation, Validate};

pub const SHARED_SECRET_PARAM: &str = "shared_secret";

pub const ROUTE_PUT: &str = "/api/v1/global-state/put";
pub const ROUTE_GET: &str = "/api/v1/global-state/get";
pub const ROUTE_BATCH_GET: &str = "/api/v1/global-state/batch-get";
pub const ROUTE_DELETE: &str = "/api/v1/global-state/delete";
pub const ROUTE_SEEK: &str = "/api/v1/global-state/seek";

pub mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => STANDARD.decode(s).map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }

    pub mod list {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine as _;
        use serde::ser::SerializeSeq;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            items: &[Vec<u8>],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(items.len()))?;
            for item in items {
                seq.serialize_element(&STANDARD.encode(item))?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Vec<u8>>, D::Error> {
            let Some(items) = Option::<Vec<Option<String>>>::deserialize(deserializer)? else {
                return Ok(Vec::new());
            };
            items
                .into_iter()
                .map(|item| match item {
                    Some(s) => STANDARD.decode(s).map_err(serde::de::Error::custom),
                    None => Ok(Vec::new()),
                })
                .collect()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutRequest {
    #[serde(default, with = "b64")]
    pub key: Vec<u8>,
    #[serde(default, with = "b64")]
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PutResponse {}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetRequest {
    #[serde(default, with = "b64")]
    pub key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetResponse {
    #[serde(default, with = "b64")]
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchGetRequest {
    #[serde(default, with = "b64::list")]
    pub key_list: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchGetResponse {
    #[serde(default, with = "b64::list")]
    pub value_list: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteRequest {
    #[serde(default, with = "b64")]
    pub key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteResponse {}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SeekRequest {
    #[serde(default, with = "b64")]
    pub start_prefix: Vec<u8>,
    #[serde(default, with = "b64")]
    pub valid_for_prefix: Vec<u8>,
    #[serde(default)]
    pub max_key_len: u32,
    #[serde(default)]
    pub num_to_fetch: u32,
    #[serde(default)]
    pub reverse: bool,
    #[serde(default)]
    pub fetch_values: bool,
}

impl SeekRequest {
    /// Builds a request that can admit at least one key. The store accepts any request and
    /// answers an unsatisfiable one with an empty result.
    pub fn v1(
        start_prefix: Vec<u8>,
        valid_for_prefix: Vec<u8>,
        max_key_len: u32,
        num_to_fetch: u32,
        reverse: bool,
        fetch_values: bool,
    ) -> Result<Self, ContractViolation> {
        let req = Self {
            start_prefix,
            valid_for_prefix,
            max_key_len,
            num_to_fetch,
            reverse,
            fetch_values,
        };
        req.validate()?;
        Ok(req)
    }

    /// True when `key` belongs to the scanned range. Only the first `max_key_len` bytes of
    /// the key take part in the comparison.
    pub fn admits(&self, key: &[u8]) -> bool {
        let bound = key.len().min(self.max_key_len as usize);
        key[..bound].starts_with(&self.valid_for_prefix)
    }
}

impl Validate for SeekRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if !self.start_prefix.starts_with(&self.valid_for_prefix) {
            return Err(ContractViolation::InvalidValue {
                field: "seek.start_prefix",
                reason: "must begin with valid_for_prefix",
            });
        }
        if (self.max_key_len as usize) < self.valid_for_prefix.len() {
            return Err(ContractViolation::InvalidValue {
                field: "seek.max_key_len",
                reason: "must be >= valid_for_prefix length",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SeekResponse {
    #[serde(default, with = "b64::list")]
    pub keys_found: Vec<Vec<u8>>,
    #[serde(default, with = "b64::list")]
    pub vals_found: Vec<Vec<u8>>,
}

/// Body of every 4xx/5xx answer from a handler or the secret middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
