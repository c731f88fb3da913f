#![forbid(unsafe_code)]

mod support;

use gstate_adapter::{router, AdapterConfig, HealthResponse};
use gstate_contracts::payload::PRESENCE_MARKER;
use gstate_contracts::wire::{
    ErrorResponse, GetResponse, SeekResponse, ROUTE_GET, ROUTE_PUT, ROUTE_SEEK,
    SHARED_SECRET_PARAM,
};
use gstate_dispatch::GlobalStateRepo;

use support::{adapter_config, forwarding_to, local_global_state, serve_owner, TestServer};

const SECRET: &str = "fleet-secret";

fn post_json(server: &TestServer, route: &str, secret: Option<&str>, body: &str) -> (u16, String) {
    let mut request = ureq::post(&server.url(route)).set("content-type", "application/json");
    if let Some(secret) = secret {
        request = request.query(SHARED_SECRET_PARAM, secret);
    }
    match request.send_string(body) {
        Ok(resp) => (resp.status(), resp.into_string().unwrap()),
        Err(ureq::Error::Status(status, resp)) => (status, resp.into_string().unwrap()),
        Err(err) => panic!("transport failure: {err}"),
    }
}

#[test]
fn at_gs_http_01_put_and_get_speak_pascal_case_base64() {
    let owner = local_global_state();
    let server = serve_owner(owner.clone(), SECRET);

    let (status, body) = post_json(
        &server,
        ROUTE_PUT,
        Some(SECRET),
        r#"{"Key":"AAEC","Value":"eA=="}"#,
    );
    assert_eq!(status, 200, "{body}");
    assert_eq!(owner.get(&[0, 1, 2]).unwrap(), b"x".to_vec());

    let (status, body) = post_json(&server, ROUTE_GET, Some(SECRET), r#"{"Key":"AAEC"}"#);
    assert_eq!(status, 200, "{body}");
    let resp: GetResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(resp.value, b"x".to_vec());
}

#[test]
fn at_gs_http_02_malformed_body_is_bad_request() {
    let server = serve_owner(local_global_state(), SECRET);

    let (status, body) = post_json(&server, ROUTE_PUT, Some(SECRET), "{not json");
    assert_eq!(status, 400);
    let err: ErrorResponse = serde_json::from_str(&body).unwrap();
    assert!(
        err.error
            .starts_with("GlobalStatePutRemote: Problem parsing request body"),
        "{}",
        err.error
    );

    let (status, body) = post_json(&server, ROUTE_GET, Some(SECRET), r#"{"Key":"***"}"#);
    assert_eq!(status, 400);
    assert!(body.contains("GlobalStateGetRemote"), "{body}");
}

#[test]
fn at_gs_http_03_seek_outside_valid_prefix_answers_empty() {
    let owner = local_global_state();
    owner.put(&[1, 0, 0], PRESENCE_MARKER).unwrap();
    let server = serve_owner(owner, SECRET);

    let (status, body) = post_json(
        &server,
        ROUTE_SEEK,
        Some(SECRET),
        r#"{"StartPrefix":"BA==","ValidForPrefix":"AQ==","MaxKeyLen":41,"NumToFetch":10,"FetchValues":true}"#,
    );
    assert_eq!(status, 200, "{body}");
    let resp: SeekResponse = serde_json::from_str(&body).unwrap();
    assert!(resp.keys_found.is_empty());
    assert!(resp.vals_found.is_empty());
}

#[test]
fn at_gs_http_04_missing_or_wrong_secret_is_forbidden() {
    let owner = local_global_state();
    let server = serve_owner(owner.clone(), SECRET);
    let body = r#"{"Key":"AAEC","Value":"eA=="}"#;

    let (status, _) = post_json(&server, ROUTE_PUT, None, body);
    assert_eq!(status, 403);
    let (status, resp) = post_json(&server, ROUTE_PUT, Some("wrong"), body);
    assert_eq!(status, 403);
    let err: ErrorResponse = serde_json::from_str(&resp).unwrap();
    assert!(!err.error.is_empty());
    assert!(owner.get(&[0, 1, 2]).unwrap().is_empty());
}

#[test]
fn at_gs_http_05_oversized_body_is_rejected() {
    let config = AdapterConfig {
        max_request_body_bytes: 1024,
        ..adapter_config(None)
    };
    let server = TestServer::serve(router(local_global_state(), &config));

    let value = "A".repeat(4096);
    let body = format!(r#"{{"Key":"AAEC","Value":"{value}"}}"#);
    let (status, _) = post_json(&server, ROUTE_PUT, None, &body);
    assert_eq!(status, 413);

    let (status, _) = post_json(&server, ROUTE_PUT, None, r#"{"Key":"AAEC","Value":"eA=="}"#);
    assert_eq!(status, 200);
}

#[test]
fn at_gs_http_06_healthz_reports_mode_without_secret() {
    let owner_server = serve_owner(local_global_state(), SECRET);
    let resp: HealthResponse = ureq::get(&owner_server.url("/healthz"))
        .call()
        .unwrap()
        .into_json()
        .unwrap();
    assert_eq!(resp.status, "ok");
    assert_eq!(resp.mode, "local");

    let forwarder = std::sync::Arc::new(forwarding_to(&owner_server, SECRET));
    let edge_server = serve_owner(forwarder, "edge-secret");
    let resp: HealthResponse = ureq::get(&edge_server.url("/healthz"))
        .call()
        .unwrap()
        .into_json()
        .unwrap();
    assert_eq!(resp.mode, "remote");
}

#[test]
fn at_gs_http_07_null_fields_decode_as_empty() {
    let owner = local_global_state();
    let server = serve_owner(owner.clone(), SECRET);

    let (status, body) = post_json(&server, ROUTE_GET, Some(SECRET), r#"{"Key":null}"#);
    assert_eq!(status, 200, "{body}");
    let resp: GetResponse = serde_json::from_str(&body).unwrap();
    assert!(resp.value.is_empty());

    let (status, body) = post_json(
        &server,
        ROUTE_SEEK,
        Some(SECRET),
        r#"{"StartPrefix":null,"NumToFetch":5}"#,
    );
    assert_eq!(status, 200, "{body}");
}
