//! In-process stub of the catalog API for integration tests.
//!
//! The stub follows the documented sentinel-id contract. A [`Behaviour`]
//! selects one deliberate deviation so tests can check that the validators
//! notice it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use catalog_loadtest::loadtest::client::CatalogClient;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behaviour {
    /// Every endpoint honours the contract.
    Conforming,
    /// Search reports this many checked items instead of 100.
    CheckedDrift(u64),
    /// Search returns a `count` larger than the requested limit.
    OversizedCount,
    /// Search omits `hits`.
    MissingHits,
    /// Search answers 200 with an HTML body.
    HtmlSearch,
    /// Search sleeps this long before answering.
    SlowSearch(Duration),
    /// The fault ids answer as if the product were healthy.
    FaultsSucceed,
    /// `/health` reports a non-ok status.
    Unhealthy,
}

const EXISTING: i64 = 12345;
const READ_FAULT: i64 = 50000;
const WRITE_FAULT: i64 = 99999;

/// Start the stub on an ephemeral port and return its base URL.
pub async fn start_stub(behaviour: Behaviour) -> (String, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/health", get(health))
        .route("/v1/products/search", get(search))
        .route("/v1/products/{id}", get(get_product))
        .route("/v1/products/{id}/details", post(post_details))
        .with_state(Arc::new(behaviour));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (format!("http://{addr}"), handle)
}

pub fn client(base_url: &str, timeout: Duration) -> CatalogClient {
    CatalogClient::new(base_url, timeout).expect("http client")
}

type Shared = State<Arc<Behaviour>>;

async fn health(State(b): Shared) -> Json<Value> {
    if *b == Behaviour::Unhealthy {
        Json(json!({"status": "degraded", "message": "database unreachable"}))
    } else {
        Json(json!({"status": "ok", "message": "service healthy"}))
    }
}

fn product(id: i64) -> Value {
    json!({
        "product_id": id,
        "sku": "ABC-123-XYZ",
        "manufacturer": "Alpha Inc",
        "category_id": 123,
        "weight": 500,
        "some_other_id": 11
    })
}

async fn get_product(State(b): Shared, Path(id): Path<i64>) -> Response {
    match id {
        EXISTING => Json(product(id)).into_response(),
        READ_FAULT if *b == Behaviour::FaultsSucceed => Json(product(id)).into_response(),
        READ_FAULT => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn post_details(State(b): Shared, Path(id): Path<i64>, Json(body): Json<Value>) -> StatusCode {
    if id == WRITE_FAULT {
        return if *b == Behaviour::FaultsSucceed {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
    }
    if id != EXISTING {
        return StatusCode::NOT_FOUND;
    }
    let sku_ok = body
        .get("sku")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty());
    if !sku_ok {
        return StatusCode::BAD_REQUEST;
    }
    if let Some(pid) = body.get("product_id") {
        if pid.as_i64() != Some(id) {
            return StatusCode::BAD_REQUEST;
        }
    }
    StatusCode::NO_CONTENT
}

async fn search(State(b): Shared, Query(params): Query<HashMap<String, String>>) -> Response {
    let q = match params.get("q") {
        Some(q) if !q.is_empty() => q.clone(),
        _ => return StatusCode::BAD_REQUEST.into_response(),
    };
    let limit = match params.get("limit").and_then(|l| l.parse::<u64>().ok()) {
        Some(l) if (1..=20).contains(&l) => l,
        _ => return StatusCode::BAD_REQUEST.into_response(),
    };

    let n = limit.min(3);
    let hits: Vec<Value> = (0..n)
        .map(|i| json!({"id": i, "name": format!("{q} {i}")}))
        .collect();
    let mut body = json!({
        "hits": hits,
        "count": n,
        "checked": 100,
        "total_checked": 100,
        "took_ms": 0,
        "window_start": 0,
        "window_size": 100
    });

    match *b {
        Behaviour::CheckedDrift(checked) => body["checked"] = json!(checked),
        Behaviour::OversizedCount => body["count"] = json!(limit + 5),
        Behaviour::MissingHits => {
            if let Some(obj) = body.as_object_mut() {
                obj.remove("hits");
            }
        },
        Behaviour::HtmlSearch => {
            return (StatusCode::OK, "<html>maintenance</html>").into_response();
        },
        Behaviour::SlowSearch(delay) => tokio::time::sleep(delay).await,
        _ => {},
    }
    Json(body).into_response()
}
