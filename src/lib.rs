// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # svcdns - Service DNS controller for Kubernetes
//!
//! svcdns watches Kubernetes `Service` objects and keeps one DNS CNAME record
//! per annotated LoadBalancer service in sync with the hostname the cloud
//! load balancer was given.
//!
//! ## Overview
//!
//! A service opts in with the `domainName` annotation:
//!
//! ```yaml
//! metadata:
//!   annotations:
//!     domainName: api.example.com
//! ```
//!
//! Every change notification flows through the same pipeline:
//!
//! 1. [`watch`] - bootstrap list, then a continuous watch from its cursor
//! 2. [`classifier`] - decide between upsert, delete, and skip
//! 3. [`zones`] - find the most specific hosted zone for the domain
//! 4. [`reconciler`] - issue one provider call, with bounded retry
//!
//! Failures in steps 2-4 are logged and the next notification is processed;
//! only a bad configuration or an unusable watch stream stops the controller.
//!
//! ## Modules
//!
//! - [`classifier`] - Notification to action mapping
//! - [`zones`] - Hosted zone model and longest-suffix resolution
//! - [`reconciler`] - Applies actions through a [`provider::DnsProvider`]
//! - [`watch`] - The watch loop and the [`watch::ServiceSource`] capability
//! - [`kube_source`] - Kubernetes implementation of the service source
//! - [`provider`] - DNS provider capability and the RFC 2136 backend
//! - [`shutdown`] - SIGINT/SIGTERM handling
//! - [`config`] - Command-line configuration
//! - [`metrics`] - Prometheus metrics and the `/metrics` endpoint
//!
//! ## Example
//!
//! ```rust
//! use svcdns::classifier::{classify, ChangeKind, ReconcileAction, ServiceSnapshot};
//!
//! let snapshot = ServiceSnapshot {
//!     name: "web".to_string(),
//!     namespace: Some("shop".to_string()),
//!     domain_name: Some("web.example.com".to_string()),
//!     address: Some("lb-1.elb.amazonaws.com".to_string()),
//!     change_kind: ChangeKind::Added,
//! };
//!
//! assert_eq!(
//!     classify(&snapshot),
//!     ReconcileAction::Upsert {
//!         domain_name: "web.example.com".to_string(),
//!         target_address: "lb-1.elb.amazonaws.com".to_string(),
//!     }
//! );
//! ```

pub mod classifier;
pub mod config;
pub mod constants;
pub mod errors;
pub mod kube_source;
pub mod metrics;
pub mod provider;
pub mod reconciler;
pub mod retry;
pub mod shutdown;
pub mod watch;
pub mod zones;
