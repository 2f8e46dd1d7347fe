//! Response validators.
//!
//! Pure functions from an observed response to pass/fail. Checks run in a
//! fixed order and the first failing check determines the reason.

use serde_json::Value;
use std::time::Duration;

use crate::loadtest::error::{Field, RequestFailure};

/// What the client observed for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRecord {
    pub status: u16,
    pub body: Vec<u8>,
    pub elapsed: Duration,
}

impl ResponseRecord {
    fn json(&self) -> Result<Value, RequestFailure> {
        serde_json::from_slice(&self.body).map_err(|e| RequestFailure::InvalidJson {
            message: e.to_string(),
        })
    }
}

/// Pass only on an exact status match. The body is ignored.
pub fn expect_status(expected: u16, response: &ResponseRecord) -> Result<(), RequestFailure> {
    if response.status == expected {
        Ok(())
    } else {
        Err(RequestFailure::UnexpectedStatus {
            expected,
            actual: response.status,
        })
    }
}

/// Validate a search response against the fixed-cost contract.
///
/// Order: status is 200, body is JSON, `checked` equals `expected_checked`,
/// `count` (absent means 0) is at most `limit`, `hits` is present and is an
/// array.
pub fn validate_search(
    response: &ResponseRecord,
    limit: u32,
    expected_checked: u64,
) -> Result<(), RequestFailure> {
    expect_status(200, response)?;
    let data = response.json()?;

    let checked = lookup_u64(&data, "checked");
    if checked != Field::Present(expected_checked) {
        return Err(RequestFailure::CheckedMismatch {
            expected: expected_checked,
            actual: checked,
        });
    }

    let count = lookup_u64(&data, "count");
    match count.clone().or_default_if_absent(0) {
        None => {
            return Err(RequestFailure::BadPayload {
                detail: format!("count is not a non-negative integer: {count}"),
            });
        },
        Some(n) if n > u64::from(limit) => {
            return Err(RequestFailure::BadPayload {
                detail: format!("count {n} exceeds limit {limit}"),
            });
        },
        Some(_) => {},
    }

    match data.get("hits") {
        Some(Value::Array(_)) => Ok(()),
        Some(other) => Err(RequestFailure::BadPayload {
            detail: format!("hits is not an array: {other}"),
        }),
        None => Err(RequestFailure::BadPayload {
            detail: "hits missing".to_string(),
        }),
    }
}

/// Validate the `/health` response: 200 with `"status": "ok"`.
pub fn validate_health(response: &ResponseRecord) -> Result<(), RequestFailure> {
    expect_status(200, response)?;
    let data = response.json()?;
    match data.get("status") {
        Some(Value::String(s)) if s == "ok" => Ok(()),
        Some(other) => Err(RequestFailure::Unhealthy {
            detail: format!("status is {other}"),
        }),
        None => Err(RequestFailure::Unhealthy {
            detail: "status missing".to_string(),
        }),
    }
}

/// Typed lookup of an unsigned integer field.
///
/// Integral floats such as `100.0` count as integers. Fractional or negative
/// numbers, strings and `null` are reported as [`Field::WrongType`]; a
/// missing key or a non-object body as [`Field::Absent`].
pub fn lookup_u64(data: &Value, key: &str) -> Field<u64> {
    match data.get(key) {
        None => Field::Absent,
        Some(v) => match v.as_u64().or_else(|| integral_f64(v)) {
            Some(n) => Field::Present(n),
            None => Field::WrongType(v.clone()),
        },
    }
}

fn integral_f64(v: &Value) -> Option<u64> {
    v.as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
        .map(|f| f as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: Value) -> ResponseRecord {
        ResponseRecord {
            status,
            body: serde_json::to_vec(&body).unwrap(),
            elapsed: Duration::from_millis(3),
        }
    }

    fn search(body: Value) -> Result<(), RequestFailure> {
        validate_search(&response(200, body), 20, 100)
    }

    #[test]
    fn test_search_passes_conforming_payload() {
        let body = json!({
            "hits": [{"id": 1}, {"id": 2}],
            "count": 2,
            "checked": 100,
            "total_checked": 100,
            "took_ms": 1,
            "window_start": 0,
            "window_size": 100
        });
        assert_eq!(search(body), Ok(()));
    }

    #[test]
    fn test_search_empty_hits_and_absent_count_pass() {
        assert_eq!(search(json!({"hits": [], "checked": 100})), Ok(()));
    }

    #[test]
    fn test_search_status_checked_first() {
        let resp = ResponseRecord {
            status: 503,
            body: b"not json".to_vec(),
            elapsed: Duration::ZERO,
        };
        let err = validate_search(&resp, 20, 100).unwrap_err();
        assert_eq!(err.to_string(), "HTTP 503 (expected 200)");
    }

    #[test]
    fn test_search_invalid_json() {
        let resp = ResponseRecord {
            status: 200,
            body: b"<html>".to_vec(),
            elapsed: Duration::ZERO,
        };
        let err = validate_search(&resp, 20, 100).unwrap_err();
        assert_eq!(err.to_string(), "Invalid JSON");
        assert_eq!(err.error_category(), "parse");
    }

    #[test]
    fn test_search_checked_mismatch_wins_over_bad_count() {
        let err = search(json!({"hits": [], "count": 99, "checked": 42})).unwrap_err();
        assert_eq!(err.to_string(), "checked != 100 (got 42)");
    }

    #[test]
    fn test_search_checked_absent_or_wrong_type() {
        let err = search(json!({"hits": []})).unwrap_err();
        assert_eq!(err.to_string(), "checked != 100 (got absent)");

        let err = search(json!({"hits": [], "checked": "100"})).unwrap_err();
        assert!(matches!(
            err,
            RequestFailure::CheckedMismatch {
                actual: Field::WrongType(_),
                ..
            }
        ));

        let err = search(json!({"hits": [], "checked": 99.5})).unwrap_err();
        assert!(matches!(
            err,
            RequestFailure::CheckedMismatch {
                actual: Field::WrongType(_),
                ..
            }
        ));
    }

    #[test]
    fn test_search_accepts_integral_float_fields() {
        assert_eq!(search(json!({"hits": [], "count": 2.0, "checked": 100.0})), Ok(()));

        let err = search(json!({"hits": [], "count": 21.0, "checked": 100})).unwrap_err();
        assert_eq!(err.to_string(), "bad payload: count 21 exceeds limit 20");
    }

    #[test]
    fn test_search_count_over_limit() {
        let err = search(json!({"hits": [], "count": 21, "checked": 100})).unwrap_err();
        assert!(err.to_string().starts_with("bad payload"));
        assert_eq!(search(json!({"hits": [], "count": 20, "checked": 100})), Ok(()));
    }

    #[test]
    fn test_search_count_wrong_type() {
        let err = search(json!({"hits": [], "count": "3", "checked": 100})).unwrap_err();
        assert!(matches!(err, RequestFailure::BadPayload { .. }));
    }

    #[test]
    fn test_search_hits_missing_or_not_array() {
        let err = search(json!({"count": 0, "checked": 100})).unwrap_err();
        assert_eq!(err.to_string(), "bad payload: hits missing");

        let err = search(json!({"hits": {}, "checked": 100})).unwrap_err();
        assert!(matches!(err, RequestFailure::BadPayload { .. }));
    }

    #[test]
    fn test_search_non_object_body() {
        let err = search(json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.to_string(), "checked != 100 (got absent)");
    }

    #[test]
    fn test_expect_status_ignores_body() {
        let resp = ResponseRecord {
            status: 500,
            body: b"\x00garbage".to_vec(),
            elapsed: Duration::ZERO,
        };
        assert_eq!(expect_status(500, &resp), Ok(()));
        assert_eq!(
            expect_status(204, &resp),
            Err(RequestFailure::UnexpectedStatus {
                expected: 204,
                actual: 500
            })
        );
    }

    #[test]
    fn test_health() {
        let ok = json!({"status": "ok", "message": "service healthy"});
        assert_eq!(validate_health(&response(200, ok)), Ok(()));

        let degraded = validate_health(&response(200, json!({"status": "degraded"})));
        assert!(matches!(degraded, Err(RequestFailure::Unhealthy { .. })));

        let down = validate_health(&response(503, json!({"status": "ok"})));
        assert!(matches!(down, Err(RequestFailure::UnexpectedStatus { .. })));
    }

    #[test]
    fn test_lookup_u64() {
        let data = json!({"a": 1, "b": -1, "c": null});
        assert_eq!(lookup_u64(&data, "a"), Field::Present(1));
        assert_eq!(lookup_u64(&data, "b"), Field::WrongType(json!(-1)));
        assert_eq!(lookup_u64(&data, "c"), Field::WrongType(Value::Null));
        assert_eq!(lookup_u64(&data, "d"), Field::Absent);
        assert_eq!(lookup_u64(&json!({"f": 7.0}), "f"), Field::Present(7));
        assert_eq!(lookup_u64(&json!({"f": -7.0}), "f"), Field::WrongType(json!(-7.0)));
        assert_eq!(lookup_u64(&json!("str"), "a"), Field::Absent);
    }
}
