//! Request catalog: immutable request-case descriptors for each scenario.
//!
//! A [`Scenario`] is a list of [`RequestCase`] values built once at startup
//! from the resolved config and shared by every simulated user. Each case
//! pairs a [`RequestTarget`] (what to send) with an [`Expectation`] (how to
//! judge the response). The executor treats all cases uniformly.

use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::loadtest::config::{LoadTestConfig, ProductFixtures, ScenarioKind, SearchConfig};
use crate::loadtest::error::RequestFailure;
use crate::loadtest::validate::{expect_status, validate_health, validate_search, ResponseRecord};

/// HTTP method of a request case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// Body of `POST /v1/products/{id}/details`.
///
/// Integer fields are 32-bit on the server side. `product_id` is optional;
/// when present it must match the path id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i32>,
    pub sku: String,
    pub manufacturer: String,
    pub category_id: i32,
    pub weight: i32,
    pub some_other_id: i32,
}

impl ProductDetails {
    /// A well-formed body without `product_id`.
    pub fn valid() -> Self {
        Self {
            product_id: None,
            sku: "DEF-456-QWE".to_string(),
            manufacturer: "Beta Corp".to_string(),
            category_id: 456,
            weight: 800,
            some_other_id: 22,
        }
    }

    /// A body whose required `sku` is empty.
    pub fn missing_sku() -> Self {
        Self {
            product_id: None,
            sku: String::new(),
            manufacturer: "X".to_string(),
            category_id: 1,
            weight: 100,
            some_other_id: 1,
        }
    }

    /// A body carrying a `product_id` that does not match any sentinel path id.
    pub fn mismatched_id() -> Self {
        Self {
            product_id: Some(999),
            sku: "OK".to_string(),
            manufacturer: "OK".to_string(),
            category_id: 1,
            weight: 100,
            some_other_id: 1,
        }
    }
}

/// What a request case sends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestTarget {
    /// `GET /v1/products/{id}`
    GetProduct { id: i64 },
    /// `POST /v1/products/{id}/details` with a JSON body.
    PostDetails { id: i64, body: ProductDetails },
    /// `GET /v1/products/search?q=<random term>&limit=<limit>`
    Search { queries: Vec<String>, limit: u32 },
    /// `GET /health`
    Health,
}

/// A request rendered for one execution.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRequest<'a> {
    pub method: Method,
    /// Path and query, relative to the target host.
    pub path: String,
    /// JSON body, sent with `Content-Type: application/json`.
    pub json: Option<&'a ProductDetails>,
}

impl RequestTarget {
    pub fn method(&self) -> Method {
        match self {
            Self::PostDetails { .. } => Method::Post,
            Self::GetProduct { .. } | Self::Search { .. } | Self::Health => Method::Get,
        }
    }

    /// Render the concrete request. Only `Search` consumes randomness.
    pub fn render(&self, rng: &mut StdRng) -> RenderedRequest<'_> {
        let (path, json) = match self {
            Self::GetProduct { id } => (format!("/v1/products/{id}"), None),
            Self::PostDetails { id, body } => (format!("/v1/products/{id}/details"), Some(body)),
            Self::Search { queries, limit } => {
                let term = queries.choose(rng).map(String::as_str).unwrap_or_default();
                (
                    format!(
                        "/v1/products/search?q={}&limit={limit}",
                        urlencoding::encode(term)
                    ),
                    None,
                )
            },
            Self::Health => ("/health".to_string(), None),
        };
        RenderedRequest {
            method: self.method(),
            path,
            json,
        }
    }
}

/// How a response is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expectation {
    /// Pass only on this exact status code. The body is not inspected.
    Status { status: u16 },
    /// The fixed-cost search contract.
    Search { limit: u32, checked: u64 },
    /// `200` with `{"status": "ok"}`.
    Health,
}

impl Expectation {
    pub fn validate(&self, response: &ResponseRecord) -> Result<(), RequestFailure> {
        match *self {
            Self::Status { status } => expect_status(status, response),
            Self::Search { limit, checked } => validate_search(response, limit, checked),
            Self::Health => validate_health(response),
        }
    }
}

/// One request template plus its validation rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestCase {
    /// Label used for per-task metrics, e.g. `GET /v1/products/:id [404]`.
    pub name: String,
    pub target: RequestTarget,
    pub expect: Expectation,
    /// Relative selection weight within the scenario.
    pub weight: u32,
}

impl RequestCase {
    fn new(name: impl Into<String>, target: RequestTarget, expect: Expectation) -> Self {
        Self {
            name: name.into(),
            target,
            expect,
            weight: 1,
        }
    }

    fn get_product(label: &str, id: i64, status: u16) -> Self {
        Self::new(
            format!("GET /v1/products/:id [{label}]"),
            RequestTarget::GetProduct { id },
            Expectation::Status { status },
        )
    }

    fn post_details(label: &str, id: i64, body: ProductDetails, status: u16) -> Self {
        Self::new(
            format!("POST /v1/products/:id/details [{label}]"),
            RequestTarget::PostDetails { id, body },
            Expectation::Status { status },
        )
    }

    /// The service health check used as a preflight before a run.
    pub fn health() -> Self {
        Self::new("GET /health", RequestTarget::Health, Expectation::Health)
    }
}

/// An immutable set of request cases for one test definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub cases: Vec<RequestCase>,
}

impl Scenario {
    /// Build the scenario selected by `config.scenario`.
    pub fn from_config(config: &LoadTestConfig) -> Self {
        match config.scenario {
            ScenarioKind::Search => Self::search(&config.search),
            ScenarioKind::Catalog => Self::catalog(&config.catalog.ids),
        }
    }

    /// A single randomized search query per iteration.
    pub fn search(search: &SearchConfig) -> Self {
        let case = RequestCase::new(
            "/v1/products/search",
            RequestTarget::Search {
                queries: search.queries.clone(),
                limit: search.limit,
            },
            Expectation::Search {
                limit: search.limit,
                checked: search.expected_checked,
            },
        );
        Self {
            kind: ScenarioKind::Search,
            cases: vec![case],
        }
    }

    /// Every documented read/write status against the sentinel ids.
    pub fn catalog(ids: &ProductFixtures) -> Self {
        let cases = vec![
            RequestCase::get_product("200", ids.existing, 200),
            RequestCase::get_product("404", ids.missing, 404),
            RequestCase::get_product("500", ids.read_fault, 500),
            RequestCase::post_details("204", ids.existing, ProductDetails::valid(), 204),
            RequestCase::post_details(
                "400-missing/invalid",
                ids.existing,
                ProductDetails::missing_sku(),
                400,
            ),
            RequestCase::post_details(
                "400-mismatch-id",
                ids.existing,
                ProductDetails::mismatched_id(),
                400,
            ),
            RequestCase::post_details("404", ids.missing, ProductDetails::valid(), 404),
            RequestCase::post_details("500", ids.write_fault, ProductDetails::valid(), 500),
        ];
        Self {
            kind: ScenarioKind::Catalog,
            cases,
        }
    }

    pub fn case(&self, name: &str) -> Option<&RequestCase> {
        self.cases.iter().find(|c| c.name == name)
    }
}
