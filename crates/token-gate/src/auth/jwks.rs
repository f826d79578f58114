//! JWKS client for fetching and caching the identity provider's signing keys.
//!
//! Keys are fetched from the issuer's `/.well-known/jwks.json` document and
//! cached per key ID. A lookup that misses the cache triggers a fresh fetch;
//! every usable key in the fetched document is inserted, and the requested
//! one is returned if present.
//!
//! # Concurrency
//!
//! The cache is a `moka` future cache: warm lookups do not take a lock, and
//! entries for unrelated key IDs never contend. Two concurrent misses for the
//! same key ID may both fetch; the later insert wins and entries are always
//! inserted whole.
//!
//! # Security
//!
//! - Only keys marked for signature use (or unmarked) are accepted
//! - Each key is bound to exactly one algorithm at conversion time
//! - The HTTP client carries a timeout so a hung fetch cannot wedge callers

use crate::observability::metrics;
use async_trait::async_trait;
use common::jwt::decode_ed25519_public_key_jwk;
use jsonwebtoken::{Algorithm, DecodingKey};
use moka::future::Cache;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::instrument;

/// Default cache TTL (10 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Default maximum number of cached keys.
pub const DEFAULT_CACHE_CAPACITY: u64 = 64;

/// Default timeout for a single JWKS fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors resolving a key ID to a signing key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyResolutionError {
    /// The JWKS endpoint could not be reached.
    #[error("JWKS fetch failed: {0}")]
    Fetch(String),

    /// The JWKS endpoint answered with a non-success status.
    #[error("JWKS endpoint returned status {0}")]
    Status(u16),

    /// The response was not a JWKS document.
    #[error("Malformed JWKS document: {0}")]
    MalformedKeySet(String),

    /// The fetched key set has no usable key with this ID.
    #[error("No signing key for kid '{0}'")]
    UnknownKid(String),
}

/// Resolves a key ID to a verification key.
///
/// The token verifier depends on this trait rather than on [`JwksClient`],
/// so the key source can be replaced in tests.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Resolve `kid` to a signing key, fetching on cache miss.
    async fn resolve_key(&self, kid: &str) -> Result<Arc<SigningKey>, KeyResolutionError>;
}

/// JSON Web Key from the JWKS endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA", "OKP" or "EC").
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// Algorithm the key is intended for.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use ("sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Curve name for OKP/EC keys.
    #[serde(default)]
    pub crv: Option<String>,

    /// OKP public key, or EC x coordinate (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(default)]
    pub y: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// A verification key bound to the single algorithm it accepts.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    algorithm: Algorithm,
    decoding_key: DecodingKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Build a signing key from already-decoded material.
    pub fn new(kid: impl Into<String>, algorithm: Algorithm, decoding_key: DecodingKey) -> Self {
        Self {
            kid: kid.into(),
            algorithm,
            decoding_key,
        }
    }

    /// Key ID.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// The only algorithm this key verifies.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Key material for `jsonwebtoken`.
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

/// Why a JWK could not be turned into a signing key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JwkConversionError {
    #[error("missing kid")]
    MissingKid,

    #[error("unsupported key use '{0}'")]
    UnsupportedUse(String),

    #[error("unknown algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("algorithm {alg:?} does not fit a {kty} key")]
    AlgorithmMismatch { kty: &'static str, alg: Algorithm },

    #[error("unsupported curve {0:?}")]
    UnsupportedCurve(Option<String>),

    #[error("key missing component '{0}'")]
    MissingComponent(&'static str),

    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("unsupported key type '{0}'")]
    UnsupportedKeyType(String),
}

impl TryFrom<&Jwk> for SigningKey {
    type Error = JwkConversionError;

    fn try_from(jwk: &Jwk) -> Result<Self, Self::Error> {
        let kid = jwk
            .kid
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(JwkConversionError::MissingKid)?;

        if let Some(key_use) = &jwk.key_use {
            if key_use != "sig" {
                return Err(JwkConversionError::UnsupportedUse(key_use.clone()));
            }
        }

        let declared_alg = jwk
            .alg
            .as_deref()
            .map(|a| {
                Algorithm::from_str(a).map_err(|_| JwkConversionError::UnknownAlgorithm(a.to_string()))
            })
            .transpose()?;

        let (algorithm, decoding_key) = match jwk.kty.as_str() {
            "RSA" => {
                let algorithm = declared_alg.unwrap_or(Algorithm::RS256);
                if !matches!(
                    algorithm,
                    Algorithm::RS256
                        | Algorithm::RS384
                        | Algorithm::RS512
                        | Algorithm::PS256
                        | Algorithm::PS384
                        | Algorithm::PS512
                ) {
                    return Err(JwkConversionError::AlgorithmMismatch {
                        kty: "RSA",
                        alg: algorithm,
                    });
                }
                let n = required_component(jwk.n.as_deref(), "n")?;
                let e = required_component(jwk.e.as_deref(), "e")?;
                let key = DecodingKey::from_rsa_components(n, e)
                    .map_err(|err| JwkConversionError::InvalidKeyMaterial(err.to_string()))?;
                (algorithm, key)
            }
            "OKP" => {
                if jwk.crv.as_deref() != Some("Ed25519") {
                    return Err(JwkConversionError::UnsupportedCurve(jwk.crv.clone()));
                }
                if let Some(alg) = declared_alg.filter(|a| *a != Algorithm::EdDSA) {
                    return Err(JwkConversionError::AlgorithmMismatch { kty: "OKP", alg });
                }
                let x = required_component(jwk.x.as_deref(), "x")?;
                let bytes = decode_ed25519_public_key_jwk(x)
                    .map_err(|e| JwkConversionError::InvalidKeyMaterial(e.to_string()))?;
                (Algorithm::EdDSA, DecodingKey::from_ed_der(&bytes))
            }
            "EC" => {
                let algorithm = match jwk.crv.as_deref() {
                    Some("P-256") => Algorithm::ES256,
                    Some("P-384") => Algorithm::ES384,
                    _ => return Err(JwkConversionError::UnsupportedCurve(jwk.crv.clone())),
                };
                if let Some(alg) = declared_alg.filter(|a| *a != algorithm) {
                    return Err(JwkConversionError::AlgorithmMismatch { kty: "EC", alg });
                }
                let x = required_component(jwk.x.as_deref(), "x")?;
                let y = required_component(jwk.y.as_deref(), "y")?;
                let key = DecodingKey::from_ec_components(x, y)
                    .map_err(|err| JwkConversionError::InvalidKeyMaterial(err.to_string()))?;
                (algorithm, key)
            }
            other => return Err(JwkConversionError::UnsupportedKeyType(other.to_string())),
        };

        Ok(SigningKey::new(kid, algorithm, decoding_key))
    }
}

fn required_component<'a>(
    value: Option<&'a str>,
    name: &'static str,
) -> Result<&'a str, JwkConversionError> {
    value.ok_or(JwkConversionError::MissingComponent(name))
}

/// JWKS client for fetching and caching signing keys.
///
/// Created once at startup and shared behind an `Arc`.
pub struct JwksClient {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Cached keys by kid.
    cache: Cache<String, Arc<SigningKey>>,
}

impl JwksClient {
    /// Create a new JWKS client with default TTL, capacity and timeout.
    pub fn new(jwks_url: String) -> Self {
        Self::with_settings(
            jwks_url,
            DEFAULT_CACHE_TTL,
            DEFAULT_CACHE_CAPACITY,
            DEFAULT_FETCH_TIMEOUT,
        )
    }

    /// Create a new JWKS client with explicit cache and fetch settings.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL of the issuer's JWKS document
    /// * `cache_ttl` - How long a fetched key stays cached
    /// * `max_keys` - Maximum number of cached keys
    /// * `fetch_timeout` - Timeout for one JWKS request
    pub fn with_settings(
        jwks_url: String,
        cache_ttl: Duration,
        max_keys: u64,
        fetch_timeout: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "gate.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        let cache = Cache::builder()
            .max_capacity(max_keys)
            .time_to_live(cache_ttl)
            .build();

        Self {
            jwks_url,
            http_client,
            cache,
        }
    }

    /// URL of the JWKS document this client reads.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Fetch the JWKS document and insert every usable key into the cache.
    ///
    /// Returns the number of keys inserted.
    #[instrument(skip(self))]
    async fn refresh_cache(&self) -> Result<usize, KeyResolutionError> {
        let started = Instant::now();
        let result = self.fetch_keys().await;
        metrics::record_jwks_fetch(result.is_ok(), started.elapsed());

        let keys = result?;
        let count = keys.len();
        for key in keys {
            self.cache.insert(key.kid.clone(), Arc::new(key)).await;
        }

        tracing::info!(target: "gate.auth.jwks", key_count = count, "JWKS cache refreshed");
        Ok(count)
    }

    async fn fetch_keys(&self) -> Result<Vec<SigningKey>, KeyResolutionError> {
        tracing::debug!(target: "gate.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "gate.auth.jwks", error = %e, "Failed to fetch JWKS");
                KeyResolutionError::Fetch(e.to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "gate.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(KeyResolutionError::Status(response.status().as_u16()));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "gate.auth.jwks", error = %e, "Failed to parse JWKS response");
            KeyResolutionError::MalformedKeySet(e.to_string())
        })?;

        Ok(usable_keys(&jwks))
    }
}

/// Convert a JWKS document into signing keys, skipping unusable entries.
pub fn usable_keys(jwks: &JwksResponse) -> Vec<SigningKey> {
    jwks.keys
        .iter()
        .filter_map(|jwk| match SigningKey::try_from(jwk) {
            Ok(key) => Some(key),
            Err(reason) => {
                tracing::warn!(
                    target: "gate.auth.jwks",
                    kid = ?jwk.kid,
                    kty = %jwk.kty,
                    reason = %reason,
                    "Skipping unusable JWK"
                );
                None
            }
        })
        .collect()
}

#[async_trait]
impl KeyResolver for JwksClient {
    #[instrument(skip(self), fields(kid = %kid))]
    async fn resolve_key(&self, kid: &str) -> Result<Arc<SigningKey>, KeyResolutionError> {
        if let Some(key) = self.cache.get(kid).await {
            tracing::debug!(target: "gate.auth.jwks", "JWKS cache hit");
            metrics::record_key_cache_lookup(true);
            return Ok(key);
        }
        metrics::record_key_cache_lookup(false);

        self.refresh_cache().await?;

        if let Some(key) = self.cache.get(kid).await {
            return Ok(key);
        }

        tracing::warn!(target: "gate.auth.jwks", "Key not found in JWKS after refresh");
        Err(KeyResolutionError::UnknownKid(kid.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    // 2048-bit modulus/exponent (structure only; never used to verify)
    const RSA_N: &str = "wwswVXqfxOkOM1h9osfsETZbgKXK7xQ5XoOozfIXPGGGq9D1Gj9kia7T-B1CZ4yx1vsgRWqPtNn-I0htkrfcASZLcJW63wQpTnOYveIHLFF2m8DlCi9UeZ7D6A0yV3yhxusQNVp_pMnuEzhdgqfM8RY7YIWqz_QZPmOIrdL3HEFmi7DV-h9EaY6z2P0iR2yRttsAJUpvlLneAyhNcpe84QYrUHWav-QJLlN4ncLnDDFWe6DF6g80WX6jyO0SN1yBpsvwFTpfhKnO8xg9Yoes0fYbQGWKr9T5HkNojbLX_CFGa5C12v8kSW6TuN0CJ0xxlrvgBSpPdJm-4wgtUnecwQ";
    const RSA_E: &str = "AQAB";

    fn rsa_jwk(kid: &str) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: Some(kid.to_string()),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
            n: Some(RSA_N.to_string()),
            e: Some(RSA_E.to_string()),
            crv: None,
            x: None,
            y: None,
        }
    }

    fn okp_jwk(kid: &str, x: &str) -> Jwk {
        Jwk {
            kty: "OKP".to_string(),
            kid: Some(kid.to_string()),
            alg: Some("EdDSA".to_string()),
            key_use: Some("sig".to_string()),
            n: None,
            e: None,
            crv: Some("Ed25519".to_string()),
            x: Some(x.to_string()),
            y: None,
        }
    }

    // 32 bytes of 0x07, base64url
    const ED25519_X: &str = "BwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwc";

    #[test]
    fn test_jwk_deserialization_rsa() {
        let json = r#"{
            "kty": "RSA",
            "kid": "rsa-key-01",
            "use": "sig",
            "alg": "RS256",
            "n": "abc",
            "e": "AQAB",
            "x5c": ["ignored"]
        }"#;

        let jwk: Jwk = serde_json::from_str(json).unwrap();

        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.kid.as_deref(), Some("rsa-key-01"));
        assert_eq!(jwk.key_use.as_deref(), Some("sig"));
        assert_eq!(jwk.n.as_deref(), Some("abc"));
        assert_eq!(jwk.e.as_deref(), Some("AQAB"));
        assert!(jwk.crv.is_none());
    }

    #[test]
    fn test_jwks_response_deserialization() {
        let json = r#"{
            "keys": [
                {"kty": "RSA", "kid": "key-1"},
                {"kty": "OKP", "kid": "key-2"}
            ]
        }"#;

        let jwks: JwksResponse = serde_json::from_str(json).unwrap();

        assert_eq!(jwks.keys.len(), 2);
        assert_eq!(jwks.keys.first().unwrap().kid.as_deref(), Some("key-1"));
    }

    #[test]
    fn test_rsa_jwk_converts_with_declared_algorithm() {
        let mut jwk = rsa_jwk("rsa-1");
        jwk.alg = Some("RS384".to_string());

        let key = SigningKey::try_from(&jwk).unwrap();
        assert_eq!(key.kid(), "rsa-1");
        assert_eq!(key.algorithm(), Algorithm::RS384);
    }

    #[test]
    fn test_rsa_jwk_defaults_to_rs256() {
        let mut jwk = rsa_jwk("rsa-1");
        jwk.alg = None;

        let key = SigningKey::try_from(&jwk).unwrap();
        assert_eq!(key.algorithm(), Algorithm::RS256);
    }

    #[test]
    fn test_rsa_jwk_rejects_mismatched_algorithm() {
        let mut jwk = rsa_jwk("rsa-1");
        jwk.alg = Some("ES256".to_string());

        assert_eq!(
            SigningKey::try_from(&jwk).unwrap_err(),
            JwkConversionError::AlgorithmMismatch {
                kty: "RSA",
                alg: Algorithm::ES256
            }
        );
    }

    #[test]
    fn test_okp_jwk_converts_to_eddsa() {
        let key = SigningKey::try_from(&okp_jwk("ed-1", ED25519_X)).unwrap();
        assert_eq!(key.algorithm(), Algorithm::EdDSA);
    }

    #[test]
    fn test_okp_jwk_rejects_bad_key_material() {
        assert!(SigningKey::try_from(&okp_jwk("ed-1", "!!!invalid!!!")).is_err());
        assert!(matches!(
            SigningKey::try_from(&okp_jwk("ed-1", "dGVzdA")).unwrap_err(),
            JwkConversionError::InvalidKeyMaterial(_)
        ));
    }

    #[test]
    fn test_jwk_without_kid_is_rejected() {
        let mut jwk = rsa_jwk("x");
        jwk.kid = None;
        assert_eq!(
            SigningKey::try_from(&jwk).unwrap_err(),
            JwkConversionError::MissingKid
        );

        jwk.kid = Some(String::new());
        assert!(SigningKey::try_from(&jwk).is_err());
    }

    #[test]
    fn test_encryption_key_is_rejected() {
        let mut jwk = rsa_jwk("enc-1");
        jwk.key_use = Some("enc".to_string());

        assert_eq!(
            SigningKey::try_from(&jwk).unwrap_err(),
            JwkConversionError::UnsupportedUse("enc".to_string())
        );
    }

    #[test]
    fn test_unsupported_key_type_is_rejected() {
        let mut jwk = rsa_jwk("oct-1");
        jwk.kty = "oct".to_string();

        assert_eq!(
            SigningKey::try_from(&jwk).unwrap_err(),
            JwkConversionError::UnsupportedKeyType("oct".to_string())
        );
    }

    #[test]
    fn test_usable_keys_skips_bad_entries() {
        let mut bad = rsa_jwk("bad");
        bad.n = None;
        let jwks = JwksResponse {
            keys: vec![rsa_jwk("good-rsa"), bad, okp_jwk("good-ed", ED25519_X)],
        };

        let keys = usable_keys(&jwks);
        let kids: Vec<&str> = keys.iter().map(SigningKey::kid).collect();
        assert_eq!(kids, vec!["good-rsa", "good-ed"]);
    }

    #[test]
    fn test_signing_key_debug_omits_material() {
        let key = SigningKey::try_from(&rsa_jwk("rsa-1")).unwrap();
        let debug = format!("{:?}", key);

        assert!(debug.contains("rsa-1"));
        assert!(!debug.contains(RSA_N));
    }

    #[test]
    fn test_jwks_client_creation() {
        let client = JwksClient::new("http://localhost:8082/.well-known/jwks.json".to_string());
        assert_eq!(
            client.jwks_url(),
            "http://localhost:8082/.well-known/jwks.json"
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_fetch_error() {
        // Port 9 (discard) on localhost is not serving HTTP
        let client = JwksClient::with_settings(
            "http://127.0.0.1:9/.well-known/jwks.json".to_string(),
            DEFAULT_CACHE_TTL,
            DEFAULT_CACHE_CAPACITY,
            Duration::from_secs(2),
        );

        let err = client.resolve_key("any").await.unwrap_err();
        assert!(matches!(err, KeyResolutionError::Fetch(_)));
    }
}
