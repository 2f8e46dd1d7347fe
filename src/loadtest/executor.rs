//! Single request executor shared by the load run and the probe command.

use rand::rngs::StdRng;
use std::time::{Duration, Instant};

use crate::loadtest::catalog::{Method, RequestCase, Scenario};
use crate::loadtest::client::CatalogClient;
use crate::loadtest::error::RequestFailure;

/// Result of executing one [`RequestCase`].
#[derive(Debug, Clone, PartialEq)]
pub struct CaseOutcome {
    pub method: Method,
    pub duration: Duration,
    pub result: Result<(), RequestFailure>,
}

/// Render, send and validate one request case.
///
/// Transport failures and validation failures are both folded into
/// `result`; this never returns early.
pub async fn execute_case(client: &CatalogClient, case: &RequestCase, rng: &mut StdRng) -> CaseOutcome {
    let request = case.target.render(rng);
    let start = Instant::now();
    let (duration, result) = match client.send(&request).await {
        Ok(response) => (response.elapsed, case.expect.validate(&response)),
        Err(failure) => (start.elapsed(), Err(failure)),
    };
    match result {
        Err(ref failure) if failure.is_transport() => {
            tracing::debug!(case = %case.name, %failure, "request got no response");
        },
        Err(ref failure) => {
            tracing::debug!(case = %case.name, %failure, "request failed validation");
        },
        Ok(()) => {},
    }
    CaseOutcome {
        method: request.method,
        duration,
        result,
    }
}

/// Every outcome observed for one case during a probe.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseProbe {
    pub name: String,
    pub method: Method,
    pub outcomes: Vec<Result<(), RequestFailure>>,
}

impl CaseProbe {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|r| r.is_ok()).count()
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(Result::is_ok)
    }

    /// Whether repeated executions were classified identically.
    pub fn is_consistent(&self) -> bool {
        self.outcomes.windows(2).all(|w| w[0] == w[1])
    }
}

/// Execute every case of `scenario` sequentially, `repeat` times each.
pub async fn probe_scenario(
    client: &CatalogClient,
    scenario: &Scenario,
    repeat: u32,
    rng: &mut StdRng,
) -> Vec<CaseProbe> {
    let mut probes = Vec::with_capacity(scenario.cases.len());
    for case in &scenario.cases {
        let mut outcomes = Vec::with_capacity(repeat as usize);
        for _ in 0..repeat {
            outcomes.push(execute_case(client, case, rng).await.result);
        }
        probes.push(CaseProbe {
            name: case.name.clone(),
            method: case.target.method(),
            outcomes,
        });
    }
    probes
}

/// Check `/health` before generating load.
pub async fn preflight(client: &CatalogClient, rng: &mut StdRng) -> Result<(), RequestFailure> {
    execute_case(client, &RequestCase::health(), rng).await.result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(outcomes: Vec<Result<(), RequestFailure>>) -> CaseProbe {
        CaseProbe {
            name: "GET /v1/products/:id [200]".to_string(),
            method: Method::Get,
            outcomes,
        }
    }

    #[test]
    fn test_case_probe_counts() {
        let fail = Err(RequestFailure::UnexpectedStatus {
            expected: 200,
            actual: 500,
        });
        let p = probe(vec![Ok(()), fail.clone(), Ok(())]);
        assert_eq!(p.passed(), 2);
        assert!(!p.all_passed());
        assert!(!p.is_consistent());

        let p = probe(vec![fail.clone(), fail]);
        assert!(p.is_consistent());
        assert_eq!(p.passed(), 0);
    }

    #[tokio::test]
    async fn test_execute_case_folds_transport_failure_into_result() {
        use rand::SeedableRng;

        let client = CatalogClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let outcome = execute_case(&client, &RequestCase::health(), &mut rng).await;
        assert_eq!(outcome.method, Method::Get);
        assert!(outcome.result.unwrap_err().is_transport());
    }

    #[test]
    fn test_empty_probe_is_trivially_consistent() {
        let p = probe(Vec::new());
        assert!(p.all_passed());
        assert!(p.is_consistent());
    }
}
