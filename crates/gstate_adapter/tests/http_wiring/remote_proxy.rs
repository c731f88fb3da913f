#![forbid(unsafe_code)]

mod support;

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use gstate_adapter::router;
use gstate_contracts::keys::{feed_entry_key, pinned_feed_entry_key, user_metadata_key};
use gstate_contracts::payload::{UserMetadata, PRESENCE_MARKER};
use gstate_contracts::wire::{SeekRequest, ROUTE_GET};
use gstate_contracts::{ContentHash, PublicKey, RecordKind};
use gstate_dispatch::{
    FeedKind, GlobalState, GlobalStateError, GlobalStateOp, GlobalStateRepo, ModerationList,
    RemoteError,
};

use support::{adapter_config, forwarding_to, local_global_state, serve_owner, TestServer};

const SECRET: &str = "fleet-secret";

fn seek(
    start: &[u8],
    valid: &[u8],
    max_key_len: u32,
    n: u32,
    reverse: bool,
    fetch_values: bool,
) -> SeekRequest {
    SeekRequest::v1(
        start.to_vec(),
        valid.to_vec(),
        max_key_len,
        n,
        reverse,
        fetch_values,
    )
    .unwrap()
}

fn seed(owner: &GlobalState) {
    for t in [100u64, 200, 300, 400] {
        let hash = ContentHash::digest(format!("post {t}").as_bytes());
        owner.put(&feed_entry_key(t, &hash), PRESENCE_MARKER).unwrap();
    }
    owner
        .put(
            &pinned_feed_entry_key(250, &ContentHash::digest(b"pinned")),
            PRESENCE_MARKER,
        )
        .unwrap();
    owner
        .put(&user_metadata_key(&PublicKey::new([0x02; 33])), b"{}")
        .unwrap();
}

#[test]
fn at_gs_http_remote_01_forwarded_calls_match_direct_calls() {
    let owner = local_global_state();
    seed(&owner);
    let server = serve_owner(owner.clone(), SECRET);
    let forwarder = forwarding_to(&server, SECRET);
    assert!(forwarder.is_remote());

    let feed = RecordKind::FeedEntry.prefix_key();
    let pinned = RecordKind::PinnedFeedEntry.prefix_key();
    let requests = vec![
        seek(&feed, &feed, 1, 10, false, false),
        seek(&feed, &feed, 1, 10, true, true),
        seek(&feed, &feed, 1, 2, false, true),
        seek(&feed, &feed, 1, 0, false, false),
        seek(&pinned, &pinned, 1, 10, true, false),
        seek(&[], &[], 0, 100, false, true),
    ];
    for request in &requests {
        assert_eq!(
            forwarder.seek(request).unwrap(),
            owner.seek(request).unwrap(),
            "seek {request:?}"
        );
    }

    let keys = vec![
        user_metadata_key(&PublicKey::new([0x02; 33])),
        vec![9, 9, 9],
        Vec::new(),
    ];
    assert_eq!(
        forwarder.batch_get(&keys).unwrap(),
        owner.batch_get(&keys).unwrap()
    );
    for key in &keys {
        assert_eq!(forwarder.get(key).unwrap(), owner.get(key).unwrap());
    }
}

#[test]
fn at_gs_http_remote_02_basic_scenario_through_remote_owner() {
    let owner = local_global_state();
    let server = serve_owner(owner.clone(), SECRET);
    let gs = forwarding_to(&server, SECRET);

    gs.put(&[0, 1, 2], b"x").unwrap();
    assert_eq!(gs.get(&[0, 1, 2]).unwrap(), b"x".to_vec());
    assert_eq!(owner.get(&[0, 1, 2]).unwrap(), b"x".to_vec());
    assert_eq!(
        gs.batch_get(&[vec![0, 1, 2], vec![9, 9, 9]]).unwrap(),
        vec![b"x".to_vec(), Vec::new()]
    );

    gs.delete(&[0, 1, 2]).unwrap();
    assert!(gs.get(&[0, 1, 2]).unwrap().is_empty());
    gs.delete(&[0, 1, 2]).unwrap();

    let empty = gs.batch_get(&[]).unwrap();
    assert!(empty.is_empty());
}

#[test]
fn at_gs_http_remote_03_feed_scan_scenario_through_remote_owner() {
    let owner = local_global_state();
    let server = serve_owner(owner, SECRET);
    let gs = forwarding_to(&server, SECRET);

    let hash_a = ContentHash::digest(b"a");
    let hash_b = ContentHash::digest(b"b");
    gs.insert_feed_entry(FeedKind::Global, 100, &hash_a).unwrap();
    gs.insert_feed_entry(FeedKind::Global, 200, &hash_b).unwrap();

    let kind = RecordKind::FeedEntry.prefix_key();
    let found = gs.seek(&seek(&kind, &kind, 1, 10, false, false)).unwrap();
    assert_eq!(
        found.keys,
        vec![feed_entry_key(100, &hash_a), feed_entry_key(200, &hash_b)]
    );
    assert!(found.values.is_empty());

    assert_eq!(
        gs.feed_page(FeedKind::Global, None, 10, true).unwrap(),
        vec![(200, hash_b), (100, hash_a)]
    );
    assert!(gs.feed_contains(FeedKind::Global, 100, &hash_a).unwrap());
    assert!(!gs.feed_contains(FeedKind::Pinned, 100, &hash_a).unwrap());
}

#[test]
fn at_gs_http_remote_04_forwarding_chains_to_the_owner() {
    let owner = local_global_state();
    let owner_server = serve_owner(owner.clone(), SECRET);
    let middle = Arc::new(forwarding_to(&owner_server, SECRET));
    let middle_server = serve_owner(middle, "middle-secret");
    let edge = forwarding_to(&middle_server, "middle-secret");

    let user = PublicKey::new([0x03; 33]);
    let meta = UserMetadata {
        email: "user@example.com".to_string(),
        ..UserMetadata::default()
    };
    edge.put_user_metadata(&user, &meta).unwrap();
    edge.set_flagged(ModerationList::Graylist, &user, true)
        .unwrap();

    assert_eq!(owner.user_metadata(&user).unwrap(), Some(meta.clone()));
    assert!(owner.is_flagged(ModerationList::Graylist, &user).unwrap());
    assert!(!owner.is_flagged(ModerationList::Blacklist, &user).unwrap());
    assert_eq!(edge.user_metadata(&user).unwrap(), Some(meta));
}

#[test]
fn at_gs_http_remote_05_wrong_secret_is_rejected_by_owner() {
    let owner = local_global_state();
    let server = serve_owner(owner.clone(), SECRET);
    let gs = forwarding_to(&server, "not-the-secret");

    match gs.put(b"k", b"v") {
        Err(GlobalStateError::Remote {
            op: GlobalStateOp::Put,
            source: RemoteError::Status { status: 403, .. },
        }) => {}
        other => panic!("expected 403 from owner, got {other:?}"),
    }
    assert!(owner.get(b"k").unwrap().is_empty());
}

#[test]
fn at_gs_http_remote_06_failures_classify_the_same_on_both_paths() {
    let owner = local_global_state();
    seed(&owner);
    let server = serve_owner(owner.clone(), SECRET);
    let forwarder = forwarding_to(&server, SECRET);

    let feed = RecordKind::FeedEntry.prefix_key();
    let out_of_prefix = [
        SeekRequest {
            start_prefix: vec![4],
            valid_for_prefix: feed.clone(),
            max_key_len: 41,
            num_to_fetch: 10,
            reverse: false,
            fetch_values: true,
        },
        SeekRequest {
            start_prefix: vec![0],
            valid_for_prefix: feed.clone(),
            max_key_len: 41,
            num_to_fetch: 10,
            reverse: true,
            fetch_values: false,
        },
        SeekRequest {
            start_prefix: feed.clone(),
            valid_for_prefix: feed,
            max_key_len: 0,
            num_to_fetch: 10,
            reverse: false,
            fetch_values: false,
        },
    ];
    for request in &out_of_prefix {
        let direct = owner.seek(request).unwrap();
        assert!(direct.keys.is_empty(), "seek {request:?}");
        assert_eq!(forwarder.seek(request).unwrap(), direct, "seek {request:?}");
    }

    let direct = owner.phone_metadata("415 555 2671").unwrap_err();
    let forwarded = forwarder.phone_metadata("415 555 2671").unwrap_err();
    assert!(direct.is_invalid_input());
    assert!(forwarded.is_invalid_input());
}

#[test]
fn at_gs_http_remote_07_undecodable_reply_is_surfaced() {
    let stub = Router::new().route(ROUTE_GET, post(|| async { "not json" }));
    let server = TestServer::serve(stub);
    let gs = forwarding_to(&server, SECRET);

    match gs.get(b"k") {
        Err(GlobalStateError::Remote {
            op: GlobalStateOp::Get,
            source: RemoteError::Decode(_),
        }) => {}
        other => panic!("expected decode failure, got {other:?}"),
    }
}

#[test]
fn at_gs_http_remote_08_open_owner_accepts_any_secret() {
    let owner = local_global_state();
    let server = TestServer::serve(router(owner.clone(), &adapter_config(None)));
    let gs = forwarding_to(&server, "anything");

    gs.set_read_cursor(&PublicKey::new([1; 33]), &PublicKey::new([2; 33]), 42)
        .unwrap();
    assert_eq!(
        owner
            .read_cursor(&PublicKey::new([1; 33]), &PublicKey::new([2; 33]))
            .unwrap(),
        Some(42)
    );
}
