// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `zones.rs`

#[cfg(test)]
mod tests {
    use super::super::{is_suffix_zone, normalize_fqdn, resolve, HostedZone};

    fn catalogue(names: &[&str]) -> Vec<HostedZone> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| HostedZone::new(format!("Z{i}"), name))
            .collect()
    }

    #[test]
    fn test_normalize_fqdn_appends_trailing_dot() {
        assert_eq!(normalize_fqdn("example.com"), "example.com.");
        assert_eq!(normalize_fqdn("example.com."), "example.com.");
        assert_eq!(normalize_fqdn("  Example.COM "), "example.com.");
        assert_eq!(normalize_fqdn(""), ".");
    }

    #[test]
    fn test_hosted_zone_new_normalizes_name() {
        let zone = HostedZone::new("Z1", "Example.com");
        assert_eq!(zone.id, "Z1");
        assert_eq!(zone.name, "example.com.");
    }

    #[test]
    fn test_is_suffix_zone_is_label_aligned() {
        assert!(is_suffix_zone("www.example.com.", "example.com."));
        assert!(is_suffix_zone("example.com.", "example.com."));
        assert!(!is_suffix_zone("myexample.com.", "example.com."));
        assert!(!is_suffix_zone("example.com.", "www.example.com."));
        assert!(is_suffix_zone("anything.example.", "."));
    }

    #[test]
    fn test_resolve_prefers_longest_suffix() {
        let zones = catalogue(&["com.", "example.com.", "sub.example.com."]);

        let zone = resolve("a.sub.example.com.", &zones).expect("zone should resolve");
        assert_eq!(zone.name, "sub.example.com.");
    }

    #[test]
    fn test_resolve_longest_suffix_regardless_of_order() {
        let zones = catalogue(&["sub.example.com.", "com.", "example.com."]);
        let zone = resolve("a.sub.example.com", &zones).expect("zone should resolve");
        assert_eq!(zone.name, "sub.example.com.");

        let zones = catalogue(&["example.com.", "sub.example.com.", "com."]);
        let zone = resolve("a.sub.example.com", &zones).expect("zone should resolve");
        assert_eq!(zone.name, "sub.example.com.");
    }

    #[test]
    fn test_resolve_with_unrelated_zones_interleaved() {
        // Sorted by name, unrelated zones sit between the matching ones; a
        // binary search over the suffix predicate would land on the wrong one.
        let zones = catalogue(&[
            "a.org.",
            "example.com.",
            "foo.net.",
            "other.example.com.",
            "zzz.io.",
        ]);

        let zone = resolve("svc.example.com", &zones).expect("zone should resolve");
        assert_eq!(zone.name, "example.com.");
    }

    #[test]
    fn test_resolve_no_match() {
        let zones = catalogue(&["other.org."]);
        assert!(resolve("example.com.", &zones).is_none());
    }

    #[test]
    fn test_resolve_empty_catalogue() {
        assert!(resolve("example.com", &[]).is_none());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let zones = catalogue(&["com.", "example.com.", "sub.example.com."]);

        let first = resolve("a.sub.example.com", &zones);
        let second = resolve("a.sub.example.com", &zones);
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_apex_domain() {
        let zones = catalogue(&["example.com."]);
        let zone = resolve("example.com", &zones).expect("apex should resolve");
        assert_eq!(zone.id, "Z0");
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let zones = catalogue(&["Example.COM"]);
        let zone = resolve("SVC.example.com", &zones).expect("zone should resolve");
        assert_eq!(zone.name, "example.com.");
    }

    #[test]
    fn test_resolve_does_not_match_partial_label() {
        let zones = catalogue(&["example.com."]);
        assert!(resolve("myexample.com", &zones).is_none());
    }

    #[test]
    fn test_resolve_duplicate_names_first_wins() {
        let zones = vec![
            HostedZone::new("PUBLIC", "example.com."),
            HostedZone::new("PRIVATE", "example.com."),
        ];
        let zone = resolve("svc.example.com", &zones).expect("zone should resolve");
        assert_eq!(zone.id, "PUBLIC");
    }
}
