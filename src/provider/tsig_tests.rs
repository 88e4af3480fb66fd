// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tests for TSIG key parsing.

#[cfg(test)]
mod tests {
    use crate::errors::ConfigError;
    use crate::provider::tsig::{
        create_tsig_signer, load_key_file, parse_key_file, TsigAlgorithm, TsigKeyData,
    };
    use std::io::Write;

    const KEY_FILE: &str = r#"key "svcdns-update" {
    algorithm hmac-sha256;
    secret "dGVzdHNlY3JldA==";
};
"#;

    #[test]
    fn test_parse_key_file() {
        let key = parse_key_file(KEY_FILE).unwrap();

        assert_eq!(key.name, "svcdns-update");
        assert_eq!(key.algorithm, TsigAlgorithm::HmacSha256);
        assert_eq!(key.secret, "dGVzdHNlY3JldA==");
    }

    #[test]
    fn test_parse_key_file_all_algorithms() {
        for algorithm in [
            "hmac-md5",
            "hmac-sha1",
            "hmac-sha224",
            "hmac-sha256",
            "hmac-sha384",
            "hmac-sha512",
        ] {
            let content = KEY_FILE.replace("hmac-sha256", algorithm);
            let key = parse_key_file(&content).unwrap();
            assert_eq!(key.algorithm.as_str(), algorithm);
        }
    }

    #[test]
    fn test_parse_key_file_unsupported_algorithm() {
        let content = KEY_FILE.replace("hmac-sha256", "gss-tsig");
        let err = parse_key_file(&content).unwrap_err();
        assert!(err.to_string().contains("Unsupported TSIG algorithm"));
    }

    #[test]
    fn test_parse_key_file_missing_secret() {
        let content = r#"key "svcdns-update" {
    algorithm hmac-sha256;
};"#;
        let err = parse_key_file(content).unwrap_err();
        assert!(err.to_string().contains("secret"));
    }

    #[test]
    fn test_parse_key_file_rejects_non_base64_secret() {
        let content = KEY_FILE.replace("dGVzdHNlY3JldA==", "not base64!!");
        assert!(parse_key_file(&content).is_err());
    }

    #[test]
    fn test_load_key_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KEY_FILE.as_bytes()).unwrap();

        let key = load_key_file(file.path()).unwrap();
        assert_eq!(key.name, "svcdns-update");
    }

    #[test]
    fn test_load_key_file_missing_is_config_error() {
        let err = load_key_file(std::path::Path::new("/nonexistent/svcdns.key")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTsigKey { .. }));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let key = parse_key_file(KEY_FILE).unwrap();
        let debug = format!("{key:?}");

        assert!(debug.contains("svcdns-update"));
        assert!(!debug.contains("dGVzdHNlY3JldA=="));
    }

    #[test]
    fn test_create_tsig_signer() {
        let key = TsigKeyData {
            name: "svcdns-update".to_string(),
            algorithm: TsigAlgorithm::HmacSha256,
            secret: "dGVzdHNlY3JldA==".to_string(),
        };

        assert!(create_tsig_signer(&key).is_ok());
    }

    #[test]
    fn test_create_tsig_signer_invalid_secret() {
        let key = TsigKeyData {
            name: "svcdns-update".to_string(),
            algorithm: TsigAlgorithm::HmacSha256,
            secret: "***".to_string(),
        };

        assert!(create_tsig_signer(&key).is_err());
    }
}
