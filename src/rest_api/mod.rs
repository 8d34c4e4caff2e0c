//! HTTP surface of the exporter
//!
//! Serves the Prometheus scrape endpoint, a small landing page and a
//! liveness probe.

mod server;

pub use server::{router, run_server};
