#![forbid(unsafe_code)]

//! Typed access to the record kinds. Every key is built by the codec in
//! `gstate_contracts::keys`, so normalization cannot be skipped from here.

use gstate_contracts::keys::{
    blacklist_key, decode_feed_key, feed_entry_key, feed_seek_key, graylist_key,
    phone_metadata_key, pinned_feed_entry_key, read_cursor_key, user_metadata_key,
    verification_audit_log_key, verified_username_map_key, FEED_KEY_LEN,
};
use gstate_contracts::payload::{
    decode_tstamp, encode_tstamp, PhoneNumberMetadata, Presence, UserMetadata,
    VerificationAuditEntry, VerificationAuditLog, VerifiedUsernameMap, PRESENCE_MARKER,
};
use gstate_contracts::wire::SeekRequest;
use gstate_contracts::{ContentHash, PublicKey, RecordKind};
use gstate_storage::GlobalStateRepo;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::dispatch::{GlobalState, GlobalStateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Global,
    Pinned,
}

impl FeedKind {
    fn record_kind(self) -> RecordKind {
        match self {
            FeedKind::Global => RecordKind::FeedEntry,
            FeedKind::Pinned => RecordKind::PinnedFeedEntry,
        }
    }

    fn key(self, tstamp_nanos: u64, hash: &ContentHash) -> Vec<u8> {
        match self {
            FeedKind::Global => feed_entry_key(tstamp_nanos, hash),
            FeedKind::Pinned => pinned_feed_entry_key(tstamp_nanos, hash),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationList {
    Graylist,
    Blacklist,
}

impl ModerationList {
    fn key(self, public_key: &PublicKey) -> Vec<u8> {
        match self {
            ModerationList::Graylist => graylist_key(public_key),
            ModerationList::Blacklist => blacklist_key(public_key),
        }
    }
}

fn encode_payload<T: Serialize>(
    kind: RecordKind,
    payload: &T,
) -> Result<Vec<u8>, GlobalStateError> {
    serde_json::to_vec(payload).map_err(|source| GlobalStateError::Payload {
        kind: kind.as_str(),
        source,
    })
}

fn decode_payload<T: DeserializeOwned>(
    kind: RecordKind,
    value: &[u8],
) -> Result<Option<T>, GlobalStateError> {
    if value.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(value)
        .map(Some)
        .map_err(|source| GlobalStateError::Payload {
            kind: kind.as_str(),
            source,
        })
}

impl GlobalState {
    pub fn user_metadata(
        &self,
        public_key: &PublicKey,
    ) -> Result<Option<UserMetadata>, GlobalStateError> {
        let value = self.get(&user_metadata_key(public_key))?;
        decode_payload(RecordKind::UserMetadata, &value)
    }

    pub fn put_user_metadata(
        &self,
        public_key: &PublicKey,
        metadata: &UserMetadata,
    ) -> Result<(), GlobalStateError> {
        let value = encode_payload(RecordKind::UserMetadata, metadata)?;
        self.put(&user_metadata_key(public_key), &value)
    }

    /// `phone_number` may carry any formatting; it is normalized to E.164 first and an
    /// unparsable number is an error, never a lookup under a raw key.
    pub fn phone_metadata(
        &self,
        phone_number: &str,
    ) -> Result<Option<PhoneNumberMetadata>, GlobalStateError> {
        let value = self.get(&phone_metadata_key(phone_number)?)?;
        decode_payload(RecordKind::PhoneMetadata, &value)
    }

    pub fn put_phone_metadata(
        &self,
        phone_number: &str,
        metadata: &PhoneNumberMetadata,
    ) -> Result<(), GlobalStateError> {
        let key = phone_metadata_key(phone_number)?;
        let value = encode_payload(RecordKind::PhoneMetadata, metadata)?;
        self.put(&key, &value)
    }

    pub fn verified_username_map(&self) -> Result<VerifiedUsernameMap, GlobalStateError> {
        let value = self.get(&verified_username_map_key())?;
        Ok(decode_payload(RecordKind::VerifiedUsernameMap, &value)?.unwrap_or_default())
    }

    pub fn put_verified_username_map(
        &self,
        map: &VerifiedUsernameMap,
    ) -> Result<(), GlobalStateError> {
        let value = encode_payload(RecordKind::VerifiedUsernameMap, map)?;
        self.put(&verified_username_map_key(), &value)
    }

    pub fn verification_audit_log(
        &self,
        username: &str,
    ) -> Result<VerificationAuditLog, GlobalStateError> {
        let value = self.get(&verification_audit_log_key(username)?)?;
        Ok(decode_payload(RecordKind::VerificationAuditLog, &value)?.unwrap_or_default())
    }

    /// Read-modify-write across two calls; concurrent appends for one username can race.
    pub fn append_verification_audit_entry(
        &self,
        username: &str,
        entry: VerificationAuditEntry,
    ) -> Result<(), GlobalStateError> {
        let key = verification_audit_log_key(username)?;
        let mut log: VerificationAuditLog =
            decode_payload(RecordKind::VerificationAuditLog, &self.get(&key)?)?.unwrap_or_default();
        log.entries.push(entry);
        let value = encode_payload(RecordKind::VerificationAuditLog, &log)?;
        self.put(&key, &value)
    }

    pub fn insert_feed_entry(
        &self,
        feed: FeedKind,
        tstamp_nanos: u64,
        hash: &ContentHash,
    ) -> Result<(), GlobalStateError> {
        self.put(&feed.key(tstamp_nanos, hash), PRESENCE_MARKER)
    }

    pub fn remove_feed_entry(
        &self,
        feed: FeedKind,
        tstamp_nanos: u64,
        hash: &ContentHash,
    ) -> Result<(), GlobalStateError> {
        self.delete(&feed.key(tstamp_nanos, hash))
    }

    pub fn feed_contains(
        &self,
        feed: FeedKind,
        tstamp_nanos: u64,
        hash: &ContentHash,
    ) -> Result<bool, GlobalStateError> {
        let value = self.get(&feed.key(tstamp_nanos, hash))?;
        Ok(Presence::from_value(&value).is_present())
    }

    /// One page of a feed. With `start_tstamp` set the page begins at that timestamp
    /// (inclusive) and walks forward, or backward when `newest_first`.
    pub fn feed_page(
        &self,
        feed: FeedKind,
        start_tstamp: Option<u64>,
        limit: u32,
        newest_first: bool,
    ) -> Result<Vec<(u64, ContentHash)>, GlobalStateError> {
        let kind = feed.record_kind();
        let prefix = kind.prefix_key();
        let start = match start_tstamp {
            Some(t) => feed_seek_key(kind, t),
            None => prefix.clone(),
        };
        let request = SeekRequest::v1(
            start,
            prefix,
            FEED_KEY_LEN as u32,
            limit,
            newest_first,
            false,
        )?;
        let found = self.seek(&request)?;
        found
            .keys
            .iter()
            .map(|key| -> Result<(u64, ContentHash), GlobalStateError> {
                let (_, tstamp, hash) = decode_feed_key(key)?;
                Ok((tstamp, hash))
            })
            .collect()
    }

    pub fn set_flagged(
        &self,
        list: ModerationList,
        public_key: &PublicKey,
        flagged: bool,
    ) -> Result<(), GlobalStateError> {
        let key = list.key(public_key);
        if flagged {
            self.put(&key, PRESENCE_MARKER)
        } else {
            self.delete(&key)
        }
    }

    pub fn is_flagged(
        &self,
        list: ModerationList,
        public_key: &PublicKey,
    ) -> Result<bool, GlobalStateError> {
        let value = self.get(&list.key(public_key))?;
        Ok(Presence::from_value(&value).is_present())
    }

    /// Most recent time `user` read messages from `contact`, if ever.
    pub fn read_cursor(
        &self,
        user: &PublicKey,
        contact: &PublicKey,
    ) -> Result<Option<u64>, GlobalStateError> {
        let value = self.get(&read_cursor_key(user, contact))?;
        if value.is_empty() {
            return Ok(None);
        }
        Ok(Some(decode_tstamp(&value)?))
    }

    pub fn set_read_cursor(
        &self,
        user: &PublicKey,
        contact: &PublicKey,
        tstamp_nanos: u64,
    ) -> Result<(), GlobalStateError> {
        self.put(&read_cursor_key(user, contact), &encode_tstamp(tstamp_nanos))
    }
}
