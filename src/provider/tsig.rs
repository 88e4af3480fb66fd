// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! TSIG key loading and signer construction for dynamic updates.
//!
//! Keys are read from a BIND9 key file:
//!
//! ```text
//! key "svcdns" {
//!     algorithm hmac-sha256;
//!     secret "base64secret==";
//! };
//! ```

use crate::errors::ConfigError;
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hickory_client::rr::rdata::tsig::TsigAlgorithm as HickoryTsigAlgorithm;
use hickory_client::rr::Name;
use hickory_proto::rr::dnssec::tsig::TSigner;
use std::path::Path;
use std::str::FromStr;

use crate::constants::TSIG_FUDGE_TIME_SECS;

/// HMAC algorithms accepted for TSIG keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsigAlgorithm {
    HmacMd5,
    HmacSha1,
    HmacSha224,
    HmacSha256,
    HmacSha384,
    HmacSha512,
}

impl TsigAlgorithm {
    /// BIND9 spelling of the algorithm.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HmacMd5 => "hmac-md5",
            Self::HmacSha1 => "hmac-sha1",
            Self::HmacSha224 => "hmac-sha224",
            Self::HmacSha256 => "hmac-sha256",
            Self::HmacSha384 => "hmac-sha384",
            Self::HmacSha512 => "hmac-sha512",
        }
    }
}

impl FromStr for TsigAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hmac-md5" | "hmac-md5.sig-alg.reg.int" => Ok(Self::HmacMd5),
            "hmac-sha1" => Ok(Self::HmacSha1),
            "hmac-sha224" => Ok(Self::HmacSha224),
            "hmac-sha256" => Ok(Self::HmacSha256),
            "hmac-sha384" => Ok(Self::HmacSha384),
            "hmac-sha512" => Ok(Self::HmacSha512),
            other => anyhow::bail!(
                "Unsupported TSIG algorithm '{other}'. Supported algorithms: hmac-md5, \
                 hmac-sha1, hmac-sha224, hmac-sha256, hmac-sha384, hmac-sha512"
            ),
        }
    }
}

/// TSIG key material.
#[derive(Clone, PartialEq, Eq)]
pub struct TsigKeyData {
    /// Key name as configured on the server
    pub name: String,
    /// HMAC algorithm
    pub algorithm: TsigAlgorithm,
    /// Base64-encoded secret
    pub secret: String,
}

// The secret stays out of logs.
impl std::fmt::Debug for TsigKeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsigKeyData")
            .field("name", &self.name)
            .field("algorithm", &self.algorithm)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Parse a BIND9 key file to extract the key name, algorithm, and secret.
///
/// # Errors
///
/// Returns an error if the file format is invalid or required fields are missing.
pub fn parse_key_file(content: &str) -> Result<TsigKeyData> {
    let name = content
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("key"))
        .and_then(|line| line.split('"').nth(1))
        .filter(|name| !name.is_empty())
        .context("Failed to parse key name from key file")?
        .to_string();

    let algorithm = content
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("algorithm"))
        .and_then(|line| {
            line.split_whitespace()
                .nth(1)
                .map(|s| s.trim_end_matches(';'))
        })
        .context("Failed to parse algorithm from key file")?
        .parse::<TsigAlgorithm>()?;

    let secret = content
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("secret"))
        .and_then(|line| line.split('"').nth(1))
        .context("Failed to parse secret from key file")?
        .to_string();

    BASE64
        .decode(&secret)
        .context("Key file secret is not valid base64")?;

    Ok(TsigKeyData {
        name,
        algorithm,
        secret,
    })
}

/// Read and parse a key file from disk.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidTsigKey`] if the file cannot be read or parsed.
pub fn load_key_file(path: &Path) -> Result<TsigKeyData, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidTsigKey {
        path: path.display().to_string(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    parse_key_file(&content).map_err(|e| invalid(format!("{e:#}")))
}

/// Create a TSIG signer from key data.
///
/// # Errors
///
/// Returns an error if the key name or secret is invalid.
pub fn create_tsig_signer(key_data: &TsigKeyData) -> Result<TSigner> {
    let algorithm = match key_data.algorithm {
        TsigAlgorithm::HmacMd5 => HickoryTsigAlgorithm::HmacMd5,
        TsigAlgorithm::HmacSha1 => HickoryTsigAlgorithm::HmacSha1,
        TsigAlgorithm::HmacSha224 => HickoryTsigAlgorithm::HmacSha224,
        TsigAlgorithm::HmacSha256 => HickoryTsigAlgorithm::HmacSha256,
        TsigAlgorithm::HmacSha384 => HickoryTsigAlgorithm::HmacSha384,
        TsigAlgorithm::HmacSha512 => HickoryTsigAlgorithm::HmacSha512,
    };

    let key_bytes = BASE64
        .decode(&key_data.secret)
        .context("Failed to decode TSIG key")?;

    let signer = TSigner::new(
        key_bytes,
        algorithm,
        Name::from_str(&key_data.name).context("Invalid TSIG key name")?,
        u16::try_from(TSIG_FUDGE_TIME_SECS).unwrap_or(300),
    )
    .context("Failed to create TSIG signer")?;

    Ok(signer)
}

#[cfg(test)]
#[path = "tsig_tests.rs"]
mod tsig_tests;
