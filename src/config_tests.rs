// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use super::super::{build_kube_client, Args};
    use crate::errors::ConfigError;
    use crate::provider::rfc2136::ZoneCatalogue;
    use clap::Parser;
    use std::io::Write;
    use std::net::SocketAddr;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["svcdns", "--dns-server", "10.0.0.53"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--zone", "example.com"]);

        assert_eq!(args.annotation_key, "domainName");
        assert_eq!(args.record_ttl, 300);
        assert_eq!(args.max_attempts, 3);
        assert!(!args.initial_sync);
        assert_eq!(args.namespace, None);
        assert_eq!(
            args.metrics_addr().unwrap(),
            "0.0.0.0:8080".parse::<SocketAddr>().unwrap()
        );
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_dns_server_is_required() {
        assert!(Args::try_parse_from(["svcdns", "--zone", "example.com"]).is_err());
    }

    #[test]
    fn test_dns_server_default_port() {
        let args = parse(&["--zone", "example.com"]);
        assert_eq!(
            args.dns_server_addr().unwrap(),
            "10.0.0.53:53".parse::<SocketAddr>().unwrap()
        );

        let args = Args::try_parse_from([
            "svcdns",
            "--dns-server",
            "[fd00::53]:5353",
            "--zone",
            "example.com",
        ])
        .unwrap();
        assert_eq!(args.dns_server_addr().unwrap().port(), 5353);
    }

    #[test]
    fn test_invalid_dns_server() {
        let args = Args::try_parse_from([
            "svcdns",
            "--dns-server",
            "ns1.example.com",
            "--zone",
            "example.com",
        ])
        .unwrap();

        assert!(matches!(
            args.validate(),
            Err(ConfigError::InvalidDnsServer { .. })
        ));
    }

    #[test]
    fn test_zone_source_is_required() {
        assert_eq!(parse(&[]).validate(), Err(ConfigError::MissingZoneSource));
    }

    #[test]
    fn test_zone_sources_are_exclusive() {
        let args = parse(&["--zone", "example.com", "--zone-api-url", "zone-api:8080"]);
        assert_eq!(args.validate(), Err(ConfigError::ConflictingZoneSources));
    }

    #[test]
    fn test_token_file_requires_zone_api() {
        let args = parse(&["--zone", "example.com", "--zone-api-token-file", "/tmp/token"]);
        assert!(matches!(
            args.validate(),
            Err(ConfigError::InvalidValue {
                field: "--zone-api-token-file",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_values_are_rejected() {
        let args = parse(&["--zone", "example.com", "--record-ttl", "0"]);
        assert!(matches!(
            args.validate(),
            Err(ConfigError::InvalidValue {
                field: "--record-ttl",
                ..
            })
        ));

        let args = parse(&["--zone", "example.com", "--max-attempts", "0"]);
        assert!(matches!(
            args.validate(),
            Err(ConfigError::InvalidValue {
                field: "--max-attempts",
                ..
            })
        ));
    }

    #[test]
    fn test_retry_policy_uses_max_attempts() {
        let args = parse(&["--zone", "example.com", "--max-attempts", "1"]);
        assert_eq!(args.retry_policy().max_attempts, 1);
    }

    #[test]
    fn test_static_zone_catalogue() {
        let args = parse(&["--zone", "example.com", "--zone", "sub.example.com."]);

        match args.zone_catalogue().unwrap() {
            ZoneCatalogue::Static(zones) => {
                let names: Vec<_> = zones.iter().map(|z| z.name.as_str()).collect();
                assert_eq!(names, vec!["example.com.", "sub.example.com."]);
            }
            ZoneCatalogue::Api(_) => panic!("expected a static catalogue"),
        }
    }

    #[test]
    fn test_zone_api_catalogue_reads_token() {
        let mut token = tempfile::NamedTempFile::new().unwrap();
        writeln!(token, "  s3cret  ").unwrap();
        let token_path = token.path().to_str().unwrap().to_string();

        let args = parse(&[
            "--zone-api-url",
            "zone-api:8080",
            "--zone-api-token-file",
            &token_path,
        ]);

        assert!(args.validate().is_ok());
        match args.zone_catalogue().unwrap() {
            ZoneCatalogue::Api(client) => {
                assert_eq!(client.list_url(), "http://zone-api:8080/api/v1/zones");
            }
            ZoneCatalogue::Static(_) => panic!("expected an API catalogue"),
        }
    }

    #[test]
    fn test_empty_token_file_is_rejected() {
        let token = tempfile::NamedTempFile::new().unwrap();
        let token_path = token.path().to_str().unwrap().to_string();

        let args = parse(&[
            "--zone-api-url",
            "zone-api:8080",
            "--zone-api-token-file",
            &token_path,
        ]);

        assert!(args.zone_catalogue().is_err());
    }

    #[test]
    fn test_build_provider_with_missing_key_file() {
        let args = parse(&[
            "--zone",
            "example.com",
            "--tsig-key-file",
            "/nonexistent/svcdns.key",
        ]);

        assert!(matches!(
            args.build_provider(),
            Err(ConfigError::InvalidTsigKey { .. })
        ));
    }

    #[test]
    fn test_build_provider() {
        let args = parse(&["--zone", "example.com"]);
        let provider = args.build_provider().unwrap();

        assert_eq!(
            provider.server(),
            "10.0.0.53:53".parse::<SocketAddr>().unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_kubeconfig_is_config_error() {
        let result = build_kube_client(Some(std::path::Path::new("/nonexistent/kubeconfig"))).await;

        assert!(matches!(result, Err(ConfigError::KubeconfigLoad { .. })));
    }

    #[tokio::test]
    async fn test_build_kube_client_from_kubeconfig() {
        let mut kubeconfig = tempfile::NamedTempFile::new().unwrap();
        write!(
            kubeconfig,
            r"apiVersion: v1
kind: Config
current-context: test
clusters:
- name: test
  cluster:
    server: https://127.0.0.1:6443
    insecure-skip-tls-verify: true
contexts:
- name: test
  context:
    cluster: test
    user: test
users:
- name: test
  user:
    token: s3cret
"
        )
        .unwrap();

        let result = build_kube_client(Some(kubeconfig.path())).await;

        assert!(result.is_ok(), "client construction should succeed");

        // A second client reuses the installed crypto provider
        assert!(build_kube_client(Some(kubeconfig.path())).await.is_ok());
    }
}
