// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hosted zone model and longest-suffix zone resolution.
//!
//! A domain is governed by the most specific hosted zone whose name is a
//! label-aligned suffix of it. Given the catalogue
//! `["com.", "example.com.", "sub.example.com."]`, the domain
//! `a.sub.example.com` resolves to `sub.example.com.`.
//!
//! The resolver keeps the best match seen so far and scans the whole
//! catalogue, so it does not depend on the order in which the provider
//! returns zones.
//!
//! # Example
//!
//! ```rust
//! use svcdns::zones::{resolve, HostedZone};
//!
//! let zones = vec![
//!     HostedZone::new("Z1", "example.com"),
//!     HostedZone::new("Z2", "sub.example.com."),
//! ];
//!
//! let zone = resolve("a.sub.example.com", &zones).unwrap();
//! assert_eq!(zone.name, "sub.example.com.");
//! assert!(resolve("example.org", &zones).is_none());
//! ```

use serde::{Deserialize, Serialize};

/// A DNS provider's container for all records under a domain suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostedZone {
    /// Provider-specific identifier, passed back on mutation calls
    pub id: String,
    /// Zone suffix, always fully-qualified (trailing dot)
    pub name: String,
}

impl HostedZone {
    /// Create a zone, normalizing its name to fully-qualified form.
    pub fn new(id: impl Into<String>, name: &str) -> Self {
        Self {
            id: id.into(),
            name: normalize_fqdn(name),
        }
    }
}

/// Normalize a DNS name to lower-case fully-qualified form.
///
/// Surrounding whitespace is trimmed and a trailing dot is appended when absent.
/// The empty name normalizes to the root (`.`).
#[must_use]
pub fn normalize_fqdn(name: &str) -> String {
    let trimmed = name.trim().to_ascii_lowercase();
    if trimmed.ends_with('.') {
        trimmed
    } else {
        format!("{trimmed}.")
    }
}

/// Whether `zone_fqdn` is the same name as, or a parent of, `domain_fqdn`.
///
/// Both arguments must already be normalized. Matching is label-aligned:
/// `example.com.` governs `www.example.com.` but not `myexample.com.`.
#[must_use]
pub fn is_suffix_zone(domain_fqdn: &str, zone_fqdn: &str) -> bool {
    if zone_fqdn == "." {
        return true;
    }

    match domain_fqdn.strip_suffix(zone_fqdn) {
        Some("") => true,
        Some(prefix) => prefix.ends_with('.'),
        None => false,
    }
}

/// Find the most specific hosted zone that governs `domain_name`.
///
/// Returns `None` when no zone qualifies; callers treat that as a
/// skip-and-log condition, never as fatal. When two catalogue entries share
/// the same name, the first one wins.
#[must_use]
pub fn resolve<'a>(domain_name: &str, zones: &'a [HostedZone]) -> Option<&'a HostedZone> {
    let domain = normalize_fqdn(domain_name);

    let mut best: Option<&HostedZone> = None;
    for zone in zones {
        let zone_name = normalize_fqdn(&zone.name);
        if !is_suffix_zone(&domain, &zone_name) {
            continue;
        }

        let more_specific = best.is_none_or(|current| {
            zone_name.len() > normalize_fqdn(&current.name).len()
        });
        if more_specific {
            best = Some(zone);
        }
    }

    best
}

#[cfg(test)]
#[path = "zones_tests.rs"]
mod zones_tests;
