// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for svcdns.
//!
//! The taxonomy follows how far an error is allowed to travel:
//!
//! - [`ConfigError`] - the controller cannot be constructed; fatal at startup
//! - [`StreamError`] - the notification stream misbehaved; a single bad
//!   notification is skipped, an unusable stream ends the watch loop
//! - [`ProviderError`] - a DNS provider call failed; carries whether the failure
//!   is transient so the reconciler can decide to retry
//! - [`ReconcileError`] - the outcome of reconciling one notification; always
//!   logged and dropped by the watch loop, never propagated
//!
//! Every error exposes a `reason()` with a stable CamelCase identifier that is
//! used as the `reason` label on the error metrics.

use thiserror::Error;

/// Errors raised while building the controller from its configuration.
///
/// These are the only errors that terminate the process: a bad configuration
/// will not fix itself, so there is no retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The explicit kubeconfig file could not be read or parsed
    #[error("Failed to load kubeconfig '{path}': {reason}")]
    KubeconfigLoad {
        /// Path passed with `--kubeconfig`
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// The Kubernetes client could not be created from the resolved configuration
    #[error("Failed to create Kubernetes client: {reason}")]
    ClientCreation {
        /// Underlying failure
        reason: String,
    },

    /// The DNS server address is not a valid `IP:port`
    #[error("Invalid DNS server address '{address}': {reason}")]
    InvalidDnsServer {
        /// Address as given on the command line
        address: String,
        /// Parse failure
        reason: String,
    },

    /// The TSIG key file is missing or malformed
    #[error("Invalid TSIG key file '{path}': {reason}")]
    InvalidTsigKey {
        /// Path passed with `--tsig-key-file`
        path: String,
        /// What is wrong with it
        reason: String,
    },

    /// Neither `--zone-api-url` nor `--zone` was given
    #[error("No zone catalogue configured: pass --zone-api-url or at least one --zone")]
    MissingZoneSource,

    /// Both `--zone-api-url` and `--zone` were given
    #[error("--zone-api-url and --zone are mutually exclusive")]
    ConflictingZoneSources,

    /// Any other out-of-range or malformed setting
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Name of the offending flag
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Errors raised by the orchestration API notification stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The bootstrap list call failed
    #[error("Failed to list services: {reason}")]
    ListFailed {
        /// Underlying failure
        reason: String,
    },

    /// The watch could not be opened (or reopened) from the given cursor
    #[error("Failed to open watch from resource version '{cursor}': {reason}")]
    WatchFailed {
        /// Resource version the watch was started from
        cursor: String,
        /// Underlying failure
        reason: String,
    },

    /// A single notification could not be decoded; the stream itself is still usable
    #[error("Failed to decode watch notification: {reason}")]
    Decode {
        /// Decoder failure
        reason: String,
    },

    /// The API server reported that the cursor is too old to resume from
    #[error("Resource version expired (HTTP 410): {message}")]
    CursorExpired {
        /// Message from the API server
        message: String,
    },

    /// The stream ended and cannot be resumed
    #[error("Watch stream closed unexpectedly")]
    Closed,
}

impl StreamError {
    /// Whether the stream is still usable after this error.
    ///
    /// Only decode failures are recoverable; everything else ends the watch loop.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Stable reason identifier for metrics and logs.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ListFailed { .. } => "ListFailed",
            Self::WatchFailed { .. } => "WatchFailed",
            Self::Decode { .. } => "DecodeFailed",
            Self::CursorExpired { .. } => "CursorExpired",
            Self::Closed => "StreamClosed",
        }
    }
}

/// Errors returned by a [`crate::provider::DnsProvider`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The hosted zone catalogue could not be fetched
    #[error("Failed to list hosted zones from {endpoint}: {reason}")]
    ZoneListFailed {
        /// Catalogue endpoint
        endpoint: String,
        /// Underlying failure
        reason: String,
        /// Whether a later attempt may succeed
        retryable: bool,
    },

    /// The DNS server answered the update with a non-success response code
    #[error("Update of '{domain}' in zone '{zone}' rejected by {server}: {rcode}")]
    UpdateRejected {
        /// Record name
        domain: String,
        /// Zone the update was sent for
        zone: String,
        /// Server that rejected it
        server: String,
        /// DNS response code
        rcode: String,
        /// Whether a later attempt may succeed (e.g. `SERVFAIL`)
        retryable: bool,
    },

    /// The update could not be delivered (network error, timeout, TSIG signing)
    #[error("Update of '{domain}' could not be sent to {server}: {reason}")]
    Transport {
        /// Record name
        domain: String,
        /// Target server
        server: String,
        /// Underlying failure
        reason: String,
    },

    /// The record data is not valid DNS (bad name, bad target)
    #[error("Invalid record data for '{domain}': {reason}")]
    InvalidRecord {
        /// Record name
        domain: String,
        /// What is wrong with it
        reason: String,
    },
}

impl ProviderError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ZoneListFailed { retryable, .. } | Self::UpdateRejected { retryable, .. } => {
                *retryable
            }
            Self::Transport { .. } => true,
            Self::InvalidRecord { .. } => false,
        }
    }

    /// Stable reason identifier for metrics and logs.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ZoneListFailed { .. } => "ZoneListFailed",
            Self::UpdateRejected { .. } => "UpdateRejected",
            Self::Transport { .. } => "TransportFailed",
            Self::InvalidRecord { .. } => "InvalidRecord",
        }
    }
}

/// Outcome of a failed reconciliation.
///
/// Never fatal: the watch loop logs it and moves on to the next notification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// No hosted zone is a suffix of the domain
    #[error("No hosted zone governs domain '{domain}'")]
    NoMatchingZone {
        /// Domain from the annotation
        domain: String,
    },

    /// A DNS provider call (zone listing or mutation) failed
    #[error("DNS provider call failed for '{domain}' after {attempts} attempt(s): {source}")]
    ProviderCallFailed {
        /// Domain from the annotation
        domain: String,
        /// Number of attempts made
        attempts: u32,
        /// Last provider error
        #[source]
        source: ProviderError,
    },
}

impl ReconcileError {
    /// Stable reason identifier for metrics and logs.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoMatchingZone { .. } => "NoMatchingZone",
            Self::ProviderCallFailed { .. } => "ProviderCallFailed",
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
