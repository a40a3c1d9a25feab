//! In-process scenario tests for zc-daemon HTTP endpoints.
//!
//! These tests spin up the Axum router **without** binding a TCP socket.
//! Each test calls `routes::build_router` over memory stores and drives it via
//! `tower::ServiceExt::oneshot`; no network I/O required.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use zc_daemon::{routes, state::AppState};
use zc_store::StoreError;
use zc_testkit::{checker, marker_record, memory_zones, version_record, MemoryStore};
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Zones = Vec<(String, Arc<MemoryStore>)>;

fn make_router(zones: &Zones, bucket: Option<&str>) -> axum::Router {
    let st = Arc::new(AppState::new(checker(zones, bucket)));
    routes::build_router(st)
}

/// Drive the router with a single request and return (status, body_bytes).
async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

fn delete_req(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

/// Parse body bytes as a `serde_json::Value`.
fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

/// zone1 and zone3 hold the newest copy of `a.txt`, zone2 an older one.
fn seeded() -> Zones {
    let zones = memory_zones(&["zone1", "zone2", "zone3"]);
    for (name, store) in &zones {
        store.put_version("data", version_record("a.txt", "v1", "old", "2024-05-01T10:00:00Z"));
        if name != "zone2" {
            store.put_version("data", version_record("a.txt", "v2", "new", "2024-05-02T10:00:00Z"));
        }
    }
    zones
}

// ---------------------------------------------------------------------------
// GET /v1/health, GET /zones
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let (status, body) = call(make_router(&seeded(), Some("data")), get("/v1/health")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "zc-daemon");
}

#[tokio::test]
async fn zones_lists_registry_in_order_with_default_bucket() {
    let (status, body) = call(make_router(&seeded(), Some("data")), get("/zones")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["bucket"], "data");
    let names: Vec<&str> = json["zones"]
        .as_array()
        .unwrap()
        .iter()
        .map(|z| z["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["zone1", "zone2", "zone3"]);
    assert_eq!(json["zones"][0]["endpoint"], "memory://zone1");
}

#[tokio::test]
async fn zones_without_default_bucket_reports_null() {
    let (_, body) = call(make_router(&seeded(), None), get("/zones")).await;
    assert!(parse_json(body)["bucket"].is_null());
}

// ---------------------------------------------------------------------------
// GET /consistency/check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn check_reports_outdated_zone_and_recommendation() {
    let router = make_router(&seeded(), Some("data"));
    let (status, body) = call(router, get("/consistency/check?key=a.txt&currentZone=zone2")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["consistent"], false);
    assert_eq!(json["recommended_download_zone"], "zone1");
    assert_eq!(json["current_zone_latest_is_delete_marker"], false);

    let per_zone = json["per_zone"].as_array().unwrap();
    assert_eq!(per_zone.len(), 3);
    assert_eq!(per_zone[0]["zone"], "zone1");
    assert_eq!(per_zone[0]["state"], "Latest");
    assert_eq!(per_zone[1]["state"], "Outdated");
    assert_eq!(per_zone[2]["state"], "Latest");

    let latest = &per_zone[0]["latest"];
    assert_eq!(latest["type"], "Version");
    assert_eq!(latest["version_id"], "v2");
    assert_eq!(latest["etag"], "new");
    assert_eq!(latest["last_modified"], "2024-05-02T10:00:00+00:00");
    assert_eq!(latest["size"], 3);
    assert!(per_zone[0].get("error").is_none());
}

#[tokio::test]
async fn check_flags_delete_marker_in_current_zone() {
    let zones = seeded();
    zones[0]
        .1
        .put_delete_marker("data", marker_record("a.txt", "m1", "2024-05-03T10:00:00Z"));

    let (status, body) = call(
        make_router(&zones, Some("data")),
        get("/consistency/check?key=a.txt&currentZone=zone1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["current_zone_latest_is_delete_marker"], true);
    assert_eq!(json["per_zone"][0]["latest"]["type"], "DeleteMarker");
    assert!(json["per_zone"][0]["latest"]["etag"].is_null());
    // zone3 still serves content.
    assert_eq!(json["recommended_download_zone"], "zone3");
}

#[tokio::test]
async fn check_failing_zone_is_unknown_with_error_text() {
    let zones = seeded();
    zones[1].1.fail_with(StoreError::Transport("connection refused".into()));

    let (status, body) = call(
        make_router(&zones, Some("data")),
        get("/consistency/check?key=a.txt&currentZone=zone1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["per_zone"][1]["state"], "Unknown");
    assert_eq!(json["per_zone"][1]["error"], "transport error: connection refused");
    assert!(json["per_zone"][1]["latest"].is_null());
    assert_eq!(json["consistent"], false);
}

#[tokio::test]
async fn check_without_bucket_is_400_before_any_zone_call() {
    let zones = seeded();
    let (status, body) = call(
        make_router(&zones, None),
        get("/consistency/check?key=a.txt&currentZone=zone1"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        parse_json(body)["detail"],
        "Missing 'bucket' and no BUCKET default set."
    );
    assert!(zones.iter().all(|(_, s)| s.version_list_calls() == 0));
}

#[tokio::test]
async fn check_unknown_current_zone_is_404() {
    let zones = seeded();
    let (status, body) = call(
        make_router(&zones, Some("data")),
        get("/consistency/check?key=a.txt&currentZone=zone9"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(parse_json(body)["detail"], "Zone 'zone9' not found");
    assert!(zones.iter().all(|(_, s)| s.version_list_calls() == 0));
}

#[tokio::test]
async fn check_missing_key_or_current_zone_is_400() {
    let zones = seeded();
    let (status, _) = call(
        make_router(&zones, Some("data")),
        get("/consistency/check?currentZone=zone1"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        make_router(&zones, Some("data")),
        get("/consistency/check?key=a.txt"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse_json(body)["detail"], "Missing 'currentZone'");
}

#[tokio::test]
async fn check_explicit_bucket_overrides_default() {
    let zones = memory_zones(&["zone1"]);
    zones[0]
        .1
        .put_version("other", version_record("a.txt", "v1", "e", "2024-05-01T10:00:00Z"));

    let (status, body) = call(
        make_router(&zones, Some("data")),
        get("/consistency/check?key=a.txt&currentZone=zone1&bucket=other"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["consistent"], true);
    assert_eq!(json["per_zone"][0]["state"], "Latest");
}

// ---------------------------------------------------------------------------
// GET /list
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_returns_folders_and_items_relative_to_prefix() {
    let zones = memory_zones(&["zone1"]);
    let store = &zones[0].1;
    store.put_version("data", version_record("docs/a.txt", "v1", "aa", "2024-05-01T10:00:00Z"));
    store.put_version("data", version_record("docs/sub/b.txt", "v1", "b", "2024-05-01T10:00:00Z"));

    let (status, body) = call(
        make_router(&zones, Some("data")),
        get("/list?zone=zone1&prefix=docs"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["prefix"], "docs/");
    assert_eq!(json["folders"], serde_json::json!(["sub/"]));
    assert_eq!(json["items"][0]["key"], "docs/a.txt");
    assert_eq!(json["items"][0]["size"], 2);
    assert_eq!(json["items"][0]["last_modified"], "2024-05-01T10:00:00+00:00");
}

#[tokio::test]
async fn list_store_failure_is_502_with_store_message() {
    let zones = memory_zones(&["zone1"]);
    zones[0].1.fail_with(StoreError::Service {
        code: Some("AccessDenied".into()),
        message: "Access Denied".into(),
    });

    let (status, body) = call(make_router(&zones, Some("data")), get("/list?zone=zone1")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(parse_json(body)["detail"], "Access Denied");
}

#[tokio::test]
async fn list_requires_known_zone() {
    let zones = memory_zones(&["zone1"]);
    let (status, _) = call(make_router(&zones, Some("data")), get("/list")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(make_router(&zones, Some("data")), get("/list?zone=nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// POST /presign/*
// ---------------------------------------------------------------------------

#[tokio::test]
async fn presign_download_passes_version_and_ttl() {
    let router = make_router(&seeded(), Some("data"));
    let req = post_json(
        "/presign/download",
        serde_json::json!({"zone": "zone2", "key": "a.txt", "version_id": "v1"}),
    );

    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        parse_json(body)["url"],
        "memory://zone2/data/a.txt?op=get&expires=600&versionId=v1"
    );
}

#[tokio::test]
async fn presign_upload_defaults_content_type() {
    let router = make_router(&seeded(), Some("data"));
    let req = post_json(
        "/presign/upload?bucket=inbox",
        serde_json::json!({"zone": "zone1", "key": "big.bin"}),
    );

    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        parse_json(body)["url"],
        "memory://zone1/inbox/big.bin?op=put&content-type=application/octet-stream&expires=10800"
    );
}

#[tokio::test]
async fn presign_missing_zone_or_key_is_400() {
    let router = make_router(&seeded(), Some("data"));
    let req = post_json("/presign/download", serde_json::json!({"zone": "zone1"}));

    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse_json(body)["detail"], "Missing 'zone' or 'key'");
}

#[tokio::test]
async fn presign_store_failure_is_502() {
    let zones = seeded();
    zones[0].1.fail_with(StoreError::Presign("clock skew".into()));
    let req = post_json(
        "/presign/upload",
        serde_json::json!({"zone": "zone1", "key": "k", "content_type": "text/plain"}),
    );

    let (status, body) = call(make_router(&zones, Some("data")), req).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(parse_json(body)["detail"], "presign error: clock skew");
}

// ---------------------------------------------------------------------------
// DELETE /objects/{zone}/{key}
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_leaves_marker_seen_by_next_check() {
    let zones = seeded();
    let router = make_router(&zones, Some("data"));

    let (status, body) = call(router.clone(), delete_req("/objects/zone1/a.txt")).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["message"], "Object 'a.txt' deleted from zone 'zone1'.");
    assert_eq!(zones[0].1.deletes(), 1);
    assert_eq!(zones[2].1.deletes(), 0);

    let (status, body) = call(router, get("/consistency/check?key=a.txt&currentZone=zone1")).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["current_zone_latest_is_delete_marker"], true);
    assert_eq!(json["per_zone"][0]["latest"]["type"], "DeleteMarker");
    assert_eq!(json["consistent"], false);
    assert_eq!(json["recommended_download_zone"], "zone3");
}

#[tokio::test]
async fn delete_takes_nested_key_from_path_tail() {
    let zones = seeded();
    zones[1]
        .1
        .put_version("data", version_record("docs/x.txt", "v1", "x", "2024-05-01T10:00:00Z"));

    let (status, body) = call(
        make_router(&zones, Some("data")),
        delete_req("/objects/zone2/docs/x.txt"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        parse_json(body)["message"],
        "Object 'docs/x.txt' deleted from zone 'zone2'."
    );

    let (_, body) = call(
        make_router(&zones, Some("data")),
        get("/list?zone=zone2&prefix=docs/"),
    )
    .await;
    assert!(parse_json(body)["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn delete_in_unknown_zone_is_404() {
    let (status, body) = call(
        make_router(&seeded(), Some("data")),
        delete_req("/objects/zone9/a.txt"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(parse_json(body)["detail"], "Zone 'zone9' not found");
}

#[tokio::test]
async fn delete_without_bucket_is_400() {
    let zones = seeded();
    let (status, body) = call(make_router(&zones, None), delete_req("/objects/zone1/a.txt")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        parse_json(body)["detail"],
        "Missing 'bucket' and no BUCKET default set."
    );
    assert_eq!(zones[0].1.deletes(), 0);
}

#[tokio::test]
async fn delete_store_failure_is_502() {
    let zones = seeded();
    zones[0].1.fail_with(StoreError::Transport("connection reset".into()));

    let (status, body) = call(
        make_router(&zones, Some("data")),
        delete_req("/objects/zone1/a.txt?bucket=data"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(parse_json(body)["detail"], "transport error: connection reset");
    assert_eq!(zones[0].1.deletes(), 0);
}
