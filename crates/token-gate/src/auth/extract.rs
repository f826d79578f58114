//! Bearer credential extraction.

/// Required prefix of an authorization header carrying a bearer token.
const BEARER_PREFIX: &str = "Bearer ";

/// Extract the raw bearer token from an authorization header value.
///
/// Returns `None` when the header is absent or does not start with exactly
/// `"Bearer "`. Whatever follows the prefix is returned as-is, including an
/// empty string; the verifier rejects it as malformed.
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
    header?.strip_prefix(BEARER_PREFIX)
}
