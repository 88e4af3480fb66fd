// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the svcdns controller.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Kubernetes Constants
// ============================================================================

/// Annotation on a `Service` that declares the DNS name it should be published under
pub const DOMAIN_NAME_ANNOTATION: &str = "domainName";

/// Server-side watch timeout. Must stay below the client read timeout (295s).
pub const WATCH_TIMEOUT_SECS: u32 = 290;

/// HTTP status returned in a watch `ERROR` event when the cursor is too old
pub const WATCH_GONE_STATUS_CODE: u16 = 410;

/// First delay before reopening a watch the server ended
pub const WATCH_REOPEN_INITIAL_DELAY_MILLIS: u64 = 1000;

/// Longest delay between reopens of a watch that keeps ending without events
pub const WATCH_REOPEN_MAX_DELAY_SECS: u64 = 30;

/// Page size for the bootstrap service list
pub const LIST_PAGE_SIZE: u32 = 500;

// ============================================================================
// DNS Protocol Constants
// ============================================================================

/// Standard DNS port for queries and dynamic updates
pub const DNS_PORT: u16 = 53;

/// Default TTL for published records (5 minutes)
pub const DEFAULT_DNS_RECORD_TTL_SECS: u32 = 300;

/// TSIG fudge time in seconds (allows for clock skew)
pub const TSIG_FUDGE_TIME_SECS: u64 = 300;

/// Timeout for a single dynamic update round trip
pub const DNS_UPDATE_TIMEOUT_SECS: u64 = 5;

/// Path of the zone catalogue on the zone HTTP API
pub const ZONE_API_LIST_PATH: &str = "/api/v1/zones";

/// Timeout applied to each zone API request
pub const ZONE_API_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Reconciler Retry Constants
// ============================================================================

/// Default number of attempts for a single DNS provider call
pub const DEFAULT_PROVIDER_MAX_ATTEMPTS: u32 = 3;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 2;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness endpoint
pub const HEALTH_SERVER_PATH: &str = "/healthz";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
