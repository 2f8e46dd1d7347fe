//! TOML-based load test configuration.
//!
//! Each scenario (`search`, `catalog`) has a built-in preset matching the
//! traffic profile it was written for. A config file only needs to name the
//! values it changes; every section and field is optional and is layered on
//! top of the preset.
//!
//! # Example TOML
//!
//! ```toml
//! [settings]
//! virtual_users = 20
//! duration_secs = 180
//! timeout_ms = 2000
//!
//! [wait]
//! type = "constant"
//! secs = 0.0
//!
//! [search]
//! queries = ["alpha", "books"]
//! limit = 20
//! expected_checked = 100
//!
//! [catalog.ids]
//! existing = 12345
//! missing = 54321
//! read_fault = 50000
//! write_fault = 99999
//! ```
//!
//! Note: The target host is NOT part of the config file. It is provided via
//! the `--host` CLI flag or the `LOCUST_HOST` environment variable.

use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::loadtest::error::LoadTestError;

/// Largest result-count limit the search endpoint honours.
pub const MAX_SEARCH_LIMIT: u32 = 20;

/// Default search terms: brand names, categories, and a general keyword.
pub const DEFAULT_QUERIES: &[&str] = &[
    "alpha",
    "beta",
    "gamma",
    "delta",
    "omega",
    "electronics",
    "books",
    "home",
    "toys",
    "fashion",
    "product",
];

/// Which test definition to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    /// Randomized product-search queries against the fixed-cost endpoint.
    Search,
    /// Product reads and detail writes against sentinel ids.
    Catalog,
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search => f.write_str("search"),
            Self::Catalog => f.write_str("catalog"),
        }
    }
}

/// Delay a simulated user waits between two consecutive requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WaitTime {
    /// Always wait exactly `secs` seconds (0 for back-to-back requests).
    Constant { secs: f64 },
    /// Wait a uniformly random time in `[min_secs, max_secs]`.
    Between { min_secs: f64, max_secs: f64 },
}

impl WaitTime {
    /// Draw the next wait duration.
    pub fn sample(&self, rng: &mut StdRng) -> Duration {
        let secs = match *self {
            Self::Constant { secs } => secs,
            Self::Between { min_secs, max_secs } => {
                if max_secs <= min_secs {
                    min_secs
                } else {
                    rng.random_range(min_secs..=max_secs)
                }
            },
        };
        Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Waits must be non-negative and no longer than the run itself.
    fn validate(&self, duration_secs: u64) -> Result<(), LoadTestError> {
        let limit = duration_secs as f64;
        match *self {
            Self::Constant { secs } if !(secs >= 0.0 && secs <= limit) => {
                Err(LoadTestError::ConfigValidation {
                    message: format!("wait.secs must be in 0..={duration_secs}, got {secs}"),
                })
            },
            Self::Between { min_secs, max_secs }
                if !(min_secs >= 0.0 && min_secs <= max_secs && max_secs <= limit) =>
            {
                Err(LoadTestError::ConfigValidation {
                    message: format!(
                        "wait must satisfy 0 <= min_secs <= max_secs <= {duration_secs}, \
                         got {min_secs}..{max_secs}"
                    ),
                })
            },
            _ => Ok(()),
        }
    }
}

/// Sentinel product ids, each mapped to a documented server behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFixtures {
    /// Exists: GET 200, POST 204.
    pub existing: i64,
    /// Does not exist: GET/POST 404.
    pub missing: i64,
    /// Stored value is not a product: GET 500.
    pub read_fault: i64,
    /// The details handler faults on this id: POST 500.
    pub write_fault: i64,
}

impl Default for ProductFixtures {
    fn default() -> Self {
        Self {
            existing: 12345,
            missing: 54321,
            read_fault: 50000,
            write_fault: 99999,
        }
    }
}

/// General load test settings controlling execution parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    /// Number of concurrent simulated users.
    pub virtual_users: u32,
    /// Total test duration in seconds.
    pub duration_secs: u64,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Expected interval between consecutive requests from a single user (ms).
    ///
    /// Used for coordinated omission correction via HdrHistogram's
    /// `record_correct()`.
    pub expected_interval_ms: u64,
}

/// Search scenario parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchConfig {
    /// Query term set; any member is a valid pick.
    pub queries: Vec<String>,
    /// Result-count limit sent with every query.
    pub limit: u32,
    /// Number of items the backend must scan per query.
    pub expected_checked: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            queries: DEFAULT_QUERIES.iter().map(|q| (*q).to_string()).collect(),
            limit: MAX_SEARCH_LIMIT,
            expected_checked: 100,
        }
    }
}

/// Catalog scenario parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogConfig {
    /// Sentinel ids the server has pre-arranged states for.
    pub ids: ProductFixtures,
}

/// Fully resolved load test configuration.
///
/// Built from [`LoadTestConfig::preset`] and optionally overlaid with a
/// TOML file. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadTestConfig {
    /// Scenario this config drives.
    pub scenario: ScenarioKind,
    /// General load test settings.
    pub settings: Settings,
    /// Inter-request wait distribution.
    pub wait: WaitTime,
    /// Search scenario parameters.
    pub search: SearchConfig,
    /// Catalog scenario parameters.
    pub catalog: CatalogConfig,
}

// Partial on-disk representation; every field may be omitted.

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    wait: Option<WaitTime>,
    #[serde(default)]
    search: SearchOverlay,
    #[serde(default)]
    catalog: CatalogOverlay,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsOverlay {
    virtual_users: Option<u32>,
    duration_secs: Option<u64>,
    timeout_ms: Option<u64>,
    expected_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchOverlay {
    queries: Option<Vec<String>>,
    limit: Option<u32>,
    expected_checked: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogOverlay {
    #[serde(default)]
    ids: IdsOverlay,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct IdsOverlay {
    existing: Option<i64>,
    missing: Option<i64>,
    read_fault: Option<i64>,
    write_fault: Option<i64>,
}

impl LoadTestConfig {
    /// Built-in preset for a scenario.
    ///
    /// - `search`: 5 users, 120s, 2s timeout, no wait between requests.
    /// - `catalog`: 10 users, 60s, 5s timeout, 50-200ms random wait.
    pub fn preset(scenario: ScenarioKind) -> Self {
        let (settings, wait) = match scenario {
            ScenarioKind::Search => (
                Settings {
                    virtual_users: 5,
                    duration_secs: 120,
                    timeout_ms: 2000,
                    expected_interval_ms: 100,
                },
                WaitTime::Constant { secs: 0.0 },
            ),
            ScenarioKind::Catalog => (
                Settings {
                    virtual_users: 10,
                    duration_secs: 60,
                    timeout_ms: 5000,
                    expected_interval_ms: 100,
                },
                WaitTime::Between {
                    min_secs: 0.05,
                    max_secs: 0.2,
                },
            ),
        };
        Self {
            scenario,
            settings,
            wait,
            search: SearchConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }

    /// Parse a TOML string over the scenario preset and validate the result.
    pub fn from_toml(scenario: ScenarioKind, content: &str) -> Result<Self, LoadTestError> {
        let overlay: ConfigOverlay = toml::from_str(content)?;
        let mut config = Self::preset(scenario);
        config.apply(overlay);
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a [`LoadTestConfig`] from a file path.
    ///
    /// Returns [`LoadTestError::ConfigIo`] if the file cannot be read,
    /// [`LoadTestError::ConfigParse`] if the TOML is malformed, or
    /// [`LoadTestError::ConfigValidation`] if validation fails.
    pub fn load(scenario: ScenarioKind, path: &Path) -> Result<Self, LoadTestError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadTestError::ConfigIo {
            source,
            path: path.display().to_string(),
        })?;
        Self::from_toml(scenario, &content)
    }

    fn apply(&mut self, overlay: ConfigOverlay) {
        let s = overlay.settings;
        if let Some(v) = s.virtual_users {
            self.settings.virtual_users = v;
        }
        if let Some(v) = s.duration_secs {
            self.settings.duration_secs = v;
        }
        if let Some(v) = s.timeout_ms {
            self.settings.timeout_ms = v;
        }
        if let Some(v) = s.expected_interval_ms {
            self.settings.expected_interval_ms = v;
        }
        if let Some(wait) = overlay.wait {
            self.wait = wait;
        }
        let q = overlay.search;
        if let Some(v) = q.queries {
            self.search.queries = v;
        }
        if let Some(v) = q.limit {
            self.search.limit = v;
        }
        if let Some(v) = q.expected_checked {
            self.search.expected_checked = v;
        }
        let ids = overlay.catalog.ids;
        let fixtures = &mut self.catalog.ids;
        if let Some(v) = ids.existing {
            fixtures.existing = v;
        }
        if let Some(v) = ids.missing {
            fixtures.missing = v;
        }
        if let Some(v) = ids.read_fault {
            fixtures.read_fault = v;
        }
        if let Some(v) = ids.write_fault {
            fixtures.write_fault = v;
        }
    }

    /// Validate that the config is semantically correct.
    ///
    /// Only the section belonging to the selected scenario is checked, so a
    /// search run never fails on catalog ids and vice versa.
    pub fn validate(&self) -> Result<(), LoadTestError> {
        let invalid = |message: String| Err(LoadTestError::ConfigValidation { message });

        if self.settings.virtual_users == 0 {
            return invalid("settings.virtual_users must be greater than 0".to_string());
        }
        if self.settings.duration_secs == 0 {
            return invalid("settings.duration_secs must be greater than 0".to_string());
        }
        if self.settings.timeout_ms == 0 {
            return invalid("settings.timeout_ms must be greater than 0".to_string());
        }
        self.wait.validate(self.settings.duration_secs)?;

        match self.scenario {
            ScenarioKind::Search => {
                if self.search.queries.is_empty() {
                    return invalid("search.queries must contain at least one term".to_string());
                }
                if let Some(i) = self.search.queries.iter().position(|q| q.trim().is_empty()) {
                    return invalid(format!("search.queries[{i}] is empty"));
                }
                if self.search.limit == 0 || self.search.limit > MAX_SEARCH_LIMIT {
                    return invalid(format!(
                        "search.limit must be in 1..={MAX_SEARCH_LIMIT}, got {}",
                        self.search.limit
                    ));
                }
            },
            ScenarioKind::Catalog => {
                let ids = &self.catalog.ids;
                if ids.missing == ids.existing {
                    return invalid(format!(
                        "catalog.ids.missing must differ from catalog.ids.existing ({})",
                        ids.existing
                    ));
                }
            },
        }
        Ok(())
    }
}

impl Settings {
    /// Convert the `timeout_ms` field to a [`Duration`].
    pub fn timeout_as_duration(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
