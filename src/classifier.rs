// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Classification of service change notifications into DNS actions.
//!
//! [`classify`] is a pure function of a [`ServiceSnapshot`]: it reads the
//! operator's declared intent (the domain annotation) and the address assigned
//! by the load-balancer integration, and decides whether the record must be
//! upserted, deleted, or left alone.
//!
//! | Change kind          | Domain | Address   | Action   |
//! |----------------------|--------|-----------|----------|
//! | `Deleted`            | yes    | any       | `Delete` |
//! | `Added` / `Modified` | yes    | non-empty | `Upsert` |
//! | anything else        |        |           | `Skip`   |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of change carried by a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl ChangeKind {
    /// Lower-case label used in logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parts of a service notification the controller cares about.
///
/// A `Deleted` snapshot only needs identity; its `address` is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    /// Service name, for logging
    pub name: String,
    /// Service namespace, for logging
    pub namespace: Option<String>,
    /// Value of the domain annotation; `None` means the service is not managed
    pub domain_name: Option<String>,
    /// Load-balancer hostname; `None` means not yet provisioned (or IP-only)
    pub address: Option<String>,
    /// What happened to the service
    pub change_kind: ChangeKind,
}

impl ServiceSnapshot {
    /// `namespace/name`, or just `name` for snapshots without a namespace.
    #[must_use]
    pub fn key(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}/{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Required DNS change for one notification.
///
/// Created per notification and consumed immediately by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileAction {
    /// Create or replace the record `domain_name -> target_address`
    Upsert {
        domain_name: String,
        target_address: String,
    },
    /// Remove the record for `domain_name`
    Delete { domain_name: String },
    /// Nothing to do
    Skip,
}

impl ReconcileAction {
    /// Lower-case label used in logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Upsert { .. } => "upsert",
            Self::Delete { .. } => "delete",
            Self::Skip => "skip",
        }
    }

    /// Domain the action applies to, if any.
    #[must_use]
    pub fn domain_name(&self) -> Option<&str> {
        match self {
            Self::Upsert { domain_name, .. } | Self::Delete { domain_name } => Some(domain_name),
            Self::Skip => None,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Decide which DNS change a notification requires.
#[must_use]
pub fn classify(snapshot: &ServiceSnapshot) -> ReconcileAction {
    let Some(domain_name) = non_empty(snapshot.domain_name.as_deref()) else {
        return ReconcileAction::Skip;
    };

    match snapshot.change_kind {
        ChangeKind::Deleted => ReconcileAction::Delete {
            domain_name: domain_name.to_string(),
        },
        ChangeKind::Added | ChangeKind::Modified => {
            match non_empty(snapshot.address.as_deref()) {
                Some(address) => ReconcileAction::Upsert {
                    domain_name: domain_name.to_string(),
                    target_address: address.to_string(),
                },
                None => ReconcileAction::Skip,
            }
        }
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod classifier_tests;
