#![forbid(unsafe_code)]

//! Key layout for the global-state keyspace.
//!
//! Every key is one kind byte, then zero or more fixed-width fields, then at most one
//! variable-length trailing field. Numeric fields that take part in range scans are
//! big-endian so byte order matches numeric order.

use sha2::{Digest, Sha256};

use crate::ContractViolation;

pub const PUBLIC_KEY_LEN: usize = 33;
pub const CONTENT_HASH_LEN: usize = 32;
pub const TSTAMP_LEN: usize = 8;

/// Length of a feed or pinned feed key: kind byte, timestamp, content hash.
pub const FEED_KEY_LEN: usize = 1 + TSTAMP_LEN + CONTENT_HASH_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    UserMetadata,
    FeedEntry,
    PhoneMetadata,
    VerifiedUsernameMap,
    PinnedFeedEntry,
    VerificationAuditLog,
    Graylist,
    Blacklist,
    ReadCursor,
}

impl RecordKind {
    pub const ALL: [RecordKind; 9] = [
        RecordKind::UserMetadata,
        RecordKind::FeedEntry,
        RecordKind::PhoneMetadata,
        RecordKind::VerifiedUsernameMap,
        RecordKind::PinnedFeedEntry,
        RecordKind::VerificationAuditLog,
        RecordKind::Graylist,
        RecordKind::Blacklist,
        RecordKind::ReadCursor,
    ];

    /// Kind bytes are persisted. Never renumber or reuse one.
    pub const fn prefix(self) -> u8 {
        match self {
            RecordKind::UserMetadata => 0,
            RecordKind::FeedEntry => 1,
            RecordKind::PhoneMetadata => 2,
            RecordKind::VerifiedUsernameMap => 3,
            RecordKind::PinnedFeedEntry => 4,
            RecordKind::VerificationAuditLog => 5,
            RecordKind::Graylist => 6,
            RecordKind::Blacklist => 7,
            RecordKind::ReadCursor => 8,
        }
    }

    pub fn from_prefix(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.prefix() == byte)
    }

    pub fn prefix_key(self) -> Vec<u8> {
        vec![self.prefix()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::UserMetadata => "user_metadata",
            RecordKind::FeedEntry => "feed_entry",
            RecordKind::PhoneMetadata => "phone_metadata",
            RecordKind::VerifiedUsernameMap => "verified_username_map",
            RecordKind::PinnedFeedEntry => "pinned_feed_entry",
            RecordKind::VerificationAuditLog => "verification_audit_log",
            RecordKind::Graylist => "graylist",
            RecordKind::Blacklist => "blacklist",
            RecordKind::ReadCursor => "read_cursor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    pub fn new(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ContractViolation> {
        let arr: [u8; PUBLIC_KEY_LEN] =
            bytes
                .try_into()
                .map_err(|_| ContractViolation::InvalidLength {
                    field: "public_key",
                    expected: PUBLIC_KEY_LEN,
                    got: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; CONTENT_HASH_LEN]);

impl ContentHash {
    pub fn new(bytes: [u8; CONTENT_HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// SHA-256 of the content.
    pub fn digest(content: &[u8]) -> Self {
        Self(Sha256::digest(content).into())
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ContractViolation> {
        let arr: [u8; CONTENT_HASH_LEN] =
            bytes
                .try_into()
                .map_err(|_| ContractViolation::InvalidLength {
                    field: "content_hash",
                    expected: CONTENT_HASH_LEN,
                    got: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; CONTENT_HASH_LEN] {
        &self.0
    }
}

fn key_with_capacity(kind: RecordKind, capacity: usize) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + capacity);
    key.push(kind.prefix());
    key
}

pub fn user_metadata_key(public_key: &PublicKey) -> Vec<u8> {
    let mut key = key_with_capacity(RecordKind::UserMetadata, PUBLIC_KEY_LEN);
    key.extend_from_slice(public_key.as_bytes());
    key
}

fn tstamp_hash_key(kind: RecordKind, tstamp_nanos: u64, hash: &ContentHash) -> Vec<u8> {
    let mut key = key_with_capacity(kind, TSTAMP_LEN + CONTENT_HASH_LEN);
    key.extend_from_slice(&tstamp_nanos.to_be_bytes());
    key.extend_from_slice(hash.as_bytes());
    key
}

pub fn feed_entry_key(tstamp_nanos: u64, hash: &ContentHash) -> Vec<u8> {
    tstamp_hash_key(RecordKind::FeedEntry, tstamp_nanos, hash)
}

pub fn pinned_feed_entry_key(tstamp_nanos: u64, hash: &ContentHash) -> Vec<u8> {
    tstamp_hash_key(RecordKind::PinnedFeedEntry, tstamp_nanos, hash)
}

/// Seek start for a feed scan at `tstamp_nanos`: kind byte and timestamp, no hash.
pub fn feed_seek_key(kind: RecordKind, tstamp_nanos: u64) -> Vec<u8> {
    let mut key = key_with_capacity(kind, TSTAMP_LEN);
    key.extend_from_slice(&tstamp_nanos.to_be_bytes());
    key
}

/// Splits a feed or pinned feed key back into its timestamp and content hash.
pub fn decode_feed_key(key: &[u8]) -> Result<(RecordKind, u64, ContentHash), ContractViolation> {
    if key.len() != FEED_KEY_LEN {
        return Err(ContractViolation::InvalidLength {
            field: "feed_key",
            expected: FEED_KEY_LEN,
            got: key.len(),
        });
    }
    let kind = match RecordKind::from_prefix(key[0]) {
        Some(k @ (RecordKind::FeedEntry | RecordKind::PinnedFeedEntry)) => k,
        _ => {
            return Err(ContractViolation::InvalidValue {
                field: "feed_key",
                reason: "kind byte is not a feed kind",
            })
        }
    };
    let mut tstamp = [0u8; TSTAMP_LEN];
    tstamp.copy_from_slice(&key[1..1 + TSTAMP_LEN]);
    let hash = ContentHash::from_slice(&key[1 + TSTAMP_LEN..])?;
    Ok((kind, u64::from_be_bytes(tstamp), hash))
}

/// Parses any human formatting of an international number down to E.164.
/// Numbers without a leading `+` country code are rejected since no default region applies.
pub fn normalize_phone_number(phone_number: &str) -> Result<String, ContractViolation> {
    if phone_number.trim().is_empty() {
        return Err(ContractViolation::InvalidValue {
            field: "phone_number",
            reason: "must not be empty",
        });
    }
    let parsed = phonenumber::parse(None, phone_number).map_err(|_| {
        ContractViolation::InvalidValue {
            field: "phone_number",
            reason: "must parse as an international number",
        }
    })?;
    Ok(parsed.format().mode(phonenumber::Mode::E164).to_string())
}

pub fn phone_metadata_key(phone_number: &str) -> Result<Vec<u8>, ContractViolation> {
    let e164 = normalize_phone_number(phone_number)?;
    Ok(phone_metadata_key_from_e164(e164.as_bytes()))
}

fn phone_metadata_key_from_e164(e164: &[u8]) -> Vec<u8> {
    let mut key = key_with_capacity(RecordKind::PhoneMetadata, e164.len());
    key.extend_from_slice(e164);
    key
}

pub fn verified_username_map_key() -> Vec<u8> {
    RecordKind::VerifiedUsernameMap.prefix_key()
}

/// Lower-cases only. Surrounding whitespace is part of the username.
pub fn normalize_username(username: &str) -> Result<String, ContractViolation> {
    if username.is_empty() {
        return Err(ContractViolation::InvalidValue {
            field: "username",
            reason: "must not be empty",
        });
    }
    Ok(username.to_lowercase())
}

pub fn verification_audit_log_key(username: &str) -> Result<Vec<u8>, ContractViolation> {
    let lowered = normalize_username(username)?;
    let mut key = key_with_capacity(RecordKind::VerificationAuditLog, lowered.len());
    key.extend_from_slice(lowered.as_bytes());
    Ok(key)
}

pub fn graylist_key(public_key: &PublicKey) -> Vec<u8> {
    let mut key = key_with_capacity(RecordKind::Graylist, PUBLIC_KEY_LEN);
    key.extend_from_slice(public_key.as_bytes());
    key
}

pub fn blacklist_key(public_key: &PublicKey) -> Vec<u8> {
    let mut key = key_with_capacity(RecordKind::Blacklist, PUBLIC_KEY_LEN);
    key.extend_from_slice(public_key.as_bytes());
    key
}

/// User first, contact second. Swapping them addresses a different record.
pub fn read_cursor_key(user: &PublicKey, contact: &PublicKey) -> Vec<u8> {
    let mut key = key_with_capacity(RecordKind::ReadCursor, 2 * PUBLIC_KEY_LEN);
    key.extend_from_slice(user.as_bytes());
    key.extend_from_slice(contact.as_bytes());
    key
}
