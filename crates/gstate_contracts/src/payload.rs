#![forbid(unsafe_code)]

//! Value shapes stored under the record kinds. The storage core treats all of these as
//! opaque bytes; they live here so every instance encodes them the same way.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::wire::b64;
use crate::ContractViolation;

/// Value written under feed, pinned feed, graylist and blacklist keys. The engine has no
/// way to store a key without a value, and an empty value reads back the same as absent.
pub const PRESENCE_MARKER: &[u8] = &[1];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Absent,
    Present,
    Other(Vec<u8>),
}

impl Presence {
    pub fn from_value(value: &[u8]) -> Self {
        if value.is_empty() {
            Presence::Absent
        } else if value == PRESENCE_MARKER {
            Presence::Present
        } else {
            Presence::Other(value.to_vec())
        }
    }

    /// Any non-empty value counts, so records written with a different marker byte still read
    /// as flagged.
    pub fn is_present(&self) -> bool {
        !matches!(self, Presence::Absent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserMetadata {
    #[serde(default, with = "b64")]
    pub public_key: Vec<u8>,
    pub remove_everywhere: bool,
    pub remove_from_leaderboard: bool,
    pub email: String,
    pub phone_number: String,
    pub phone_number_country_code: String,
    pub message_read_state_by_contact: BTreeMap<String, u64>,
    pub notification_last_seen_index: i64,
    pub satoshis_burned_so_far: u64,
    pub has_burned_enough_satoshis_to_create_profile: bool,
    pub blocked_public_keys: BTreeSet<String>,
    pub whitelist_posts: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhoneNumberMetadata {
    #[serde(default, with = "b64")]
    pub public_key: Vec<u8>,
    pub phone_number: String,
    pub phone_number_country_code: String,
    pub should_comp_profile_creation: bool,
}

/// Lowercase username to the owner's public key bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifiedUsernameMap {
    pub entries: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationAction {
    Granted,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationAuditEntry {
    pub action: VerificationAction,
    pub verifier: String,
    pub tstamp_nanos: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationAuditLog {
    pub entries: Vec<VerificationAuditEntry>,
}

pub fn encode_tstamp(tstamp_nanos: u64) -> Vec<u8> {
    tstamp_nanos.to_be_bytes().to_vec()
}

pub fn decode_tstamp(value: &[u8]) -> Result<u64, ContractViolation> {
    let arr: [u8; 8] = value
        .try_into()
        .map_err(|_| ContractViolation::InvalidLength {
            field: "tstamp_nanos",
            expected: 8,
            got: value.len(),
        })?;
    Ok(u64::from_be_bytes(arr))
}
