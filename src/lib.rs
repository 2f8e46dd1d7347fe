//! catalog-loadtest: load and contract testing for the product-catalog API.
//!
//! Two scenarios are built in:
//!
//! - `search`: randomized queries against the fixed-cost search endpoint,
//!   checking that every response scans exactly the expected number of items
//!   and never returns more hits than requested.
//! - `catalog`: product reads and detail writes against sentinel ids, each
//!   of which must produce one documented status code.
//!
//! The [`loadtest`] module is usable as a library; the `catalog-loadtest`
//! binary wraps it in a CLI.

pub mod loadtest;
