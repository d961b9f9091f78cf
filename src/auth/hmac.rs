//! HMAC verification of signed query strings.
//!
//! Shopify signs OAuth callbacks with an `hmac` query parameter and app
//! proxy requests with a `signature` parameter. Both are an HMAC-SHA256 of
//! a canonical form of the remaining parameters, keyed with the app's API
//! secret; they differ only in how that canonical form is built (see
//! [`SignatureMode`]).
//!
//! # Flow
//!
//! 1. The signature parameter and the `shop` parameter are read and the shop
//!    is validated as a [`ShopDomain`]. Failures return
//!    [`VerificationError::InvalidArgument`] before any secret is resolved.
//! 2. The shop's credentials are resolved through the environment's
//!    [`SecretProvider`](crate::auth::SecretProvider).
//! 3. The canonical message is signed with the primary secret, then with the
//!    old secret if one is configured, and compared in constant time.
//!
//! # Example
//!
//! ```rust
//! use shopify_runtime::auth::hmac::{canonicalize, QueryParams, SignatureMode};
//!
//! let params = QueryParams::parse("shop=test.myshopify.com&extra[]=1&extra[]=2");
//! assert_eq!(
//!     canonicalize(&params, SignatureMode::Hmac),
//!     r#"extra=["1", "2"]&shop=test.myshopify.com"#
//! );
//! assert_eq!(
//!     canonicalize(&params, SignatureMode::Signature),
//!     "extra=1,2shop=test.myshopify.com"
//! );
//! ```

use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::auth::secrets::SecretError;
use crate::config::{ApiSecretKey, ShopDomain};
use crate::env::HasSecretProvider;

type HmacSha256 = Hmac<Sha256>;

/// Errors returned by HMAC and webhook verification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// The request is missing a required value or carries a malformed one.
    #[error("Invalid verification input: {0}")]
    InvalidArgument(String),

    /// The signature does not match any of the shop's secrets.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The shop's secret could not be resolved.
    #[error(transparent)]
    Secret(#[from] SecretError),
}

/// Query parameters in their original order, duplicates preserved.
///
/// Parsing follows `application/x-www-form-urlencoded`: `+` is a space and
/// percent escapes are decoded, with invalid UTF-8 replaced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parses a query string, with or without its leading `?`.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (form_decode(key), form_decode(value))
            })
            .collect();
        Self { pairs }
    }

    /// Returns the first value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value of `key` in order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns each distinct key once, in order of first appearance.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for (key, _) in &self.pairs {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
        keys
    }

    /// Appends a pair.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    /// Returns all pairs in order.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn form_decode(input: &str) -> String {
    let spaced = input.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

/// How the canonical message is built from query parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignatureMode {
    /// OAuth callbacks: `hmac` parameter, percent-encoded pairs joined by `&`,
    /// arrays rendered as `["a", "b"]`.
    Hmac,
    /// App proxies: `signature` parameter, raw pairs concatenated, arrays
    /// rendered as `a,b`.
    Signature,
}

impl SignatureMode {
    /// Returns the query parameter carrying the signature.
    #[must_use]
    pub const fn param(self) -> &'static str {
        match self {
            Self::Hmac => "hmac",
            Self::Signature => "signature",
        }
    }

    const fn separator(self) -> &'static str {
        match self {
            Self::Hmac => "&",
            Self::Signature => "",
        }
    }

    fn encode(self, component: &str) -> Cow<'_, str> {
        match self {
            Self::Hmac => Cow::Owned(encode_uri_component(component)),
            Self::Signature => Cow::Borrowed(component),
        }
    }

    fn join_array(self, values: &[Cow<'_, str>]) -> String {
        match self {
            Self::Hmac => format!("[\"{}\"]", values.join("\", \"")),
            Self::Signature => values.join(","),
        }
    }
}

/// Percent-encodes everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
fn encode_uri_component(component: &str) -> String {
    urlencoding::encode(component)
        .replace("%21", "!")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
        .replace("%2A", "*")
}

/// Builds the canonical message for `mode`.
///
/// Every parameter except the signature itself contributes one `key=value`
/// pair. A key ending in `[]` or appearing more than once is an array; the
/// `[]` suffix is dropped from the key. When two raw keys collapse to the
/// same pair key, the later one wins. Pairs are sorted before joining.
#[must_use]
pub fn canonicalize(params: &QueryParams, mode: SignatureMode) -> String {
    let mut entries: Vec<(String, String)> = Vec::new();

    for key in params.keys() {
        if key == mode.param() {
            continue;
        }

        let values: Vec<Cow<'_, str>> = params.get_all(key).map(|v| mode.encode(v)).collect();
        let is_array = key.ends_with("[]") || values.len() > 1;
        let bare_key = key.strip_suffix("[]").unwrap_or(key);
        let encoded_key = mode.encode(bare_key).into_owned();

        let value = if is_array {
            mode.join_array(&values)
        } else {
            values.first().map(|v| v.to_string()).unwrap_or_default()
        };

        match entries.iter_mut().find(|(k, _)| *k == encoded_key) {
            Some(entry) => entry.1 = value,
            None => entries.push((encoded_key, value)),
        }
    }

    let mut pairs: Vec<String> = entries
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    pairs.sort();
    pairs.join(mode.separator())
}

/// Computes an HMAC-SHA256 of `message`.
#[must_use]
#[allow(clippy::missing_panics_doc)] // HMAC accepts any key size, so this never panics
pub fn compute_signature_bytes(message: &[u8], secret: &str) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Computes a lowercase hex HMAC-SHA256 signature, as used by query strings.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::auth::hmac::compute_signature;
///
/// let sig = compute_signature("shop=test.myshopify.com", "secret");
/// assert_eq!(sig.len(), 64);
/// ```
#[must_use]
pub fn compute_signature(message: &str, secret: &str) -> String {
    hex::encode(compute_signature_bytes(message.as_bytes(), secret))
}

/// Computes a base64 HMAC-SHA256 signature, as used by webhook headers.
#[must_use]
pub fn compute_signature_base64(message: &[u8], secret: &str) -> String {
    STANDARD.encode(compute_signature_bytes(message, secret))
}

/// Compares two byte strings in constant time.
///
/// Inputs of different lengths compare unequal.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Returns `true` if `expected` is the signature of `message` under any of
/// `secrets`.
pub(crate) fn matches_any<'a>(
    message: &[u8],
    expected: &[u8],
    secrets: impl IntoIterator<Item = &'a ApiSecretKey>,
) -> bool {
    secrets.into_iter().any(|secret| {
        constant_time_eq(&compute_signature_bytes(message, secret.as_ref()), expected)
    })
}

/// Verifies an OAuth callback query string signed with `hmac`.
///
/// Returns the verified shop.
///
/// # Errors
///
/// - [`VerificationError::InvalidArgument`] if `hmac` or `shop` is missing or
///   the shop is not a valid shop domain
/// - [`VerificationError::Secret`] if the shop's secret cannot be resolved
/// - [`VerificationError::InvalidSignature`] if the signature does not match
pub async fn verify_hmac<E>(env: &E, params: &QueryParams) -> Result<ShopDomain, VerificationError>
where
    E: HasSecretProvider + ?Sized,
{
    verify_query(env, params, SignatureMode::Hmac).await
}

/// Verifies an app proxy query string signed with `signature`.
///
/// # Errors
///
/// Same as [`verify_hmac`].
pub async fn verify_signature<E>(
    env: &E,
    params: &QueryParams,
) -> Result<ShopDomain, VerificationError>
where
    E: HasSecretProvider + ?Sized,
{
    verify_query(env, params, SignatureMode::Signature).await
}

/// Verifies a signed query string in the given mode.
///
/// # Errors
///
/// Same as [`verify_hmac`].
pub async fn verify_query<E>(
    env: &E,
    params: &QueryParams,
    mode: SignatureMode,
) -> Result<ShopDomain, VerificationError>
where
    E: HasSecretProvider + ?Sized,
{
    let signature = params
        .get(mode.param())
        .filter(|signature| !signature.is_empty())
        .ok_or_else(|| {
            VerificationError::InvalidArgument(format!("Missing '{}' parameter", mode.param()))
        })?;

    let shop = params
        .get("shop")
        .ok_or_else(|| VerificationError::InvalidArgument("Missing 'shop' parameter".into()))?;
    let shop = ShopDomain::new(shop)
        .map_err(|_| VerificationError::InvalidArgument(format!("Invalid shop '{shop}'")))?;

    let credentials = env.secret_provider().credentials(&shop).await?;
    let message = canonicalize(params, mode);

    let verified = hex::decode(signature)
        .is_some_and(|expected| matches_any(message.as_bytes(), &expected, credentials.secrets()));

    if verified {
        Ok(shop)
    } else {
        tracing::warn!(shop = %shop, param = mode.param(), "Query signature verification failed");
        Err(VerificationError::InvalidSignature)
    }
}

mod hex {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        let bytes = bytes.as_ref();
        let mut result = String::with_capacity(bytes.len() * 2);
        for &byte in bytes {
            result.push(HEX_CHARS[(byte >> 4) as usize] as char);
            result.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
        }
        result
    }

    /// Decodes hex of either case; `None` on odd length or a non-hex digit.
    pub fn decode(input: &str) -> Option<Vec<u8>> {
        let input = input.as_bytes();
        if input.len() % 2 != 0 {
            return None;
        }
        input
            .chunks(2)
            .map(|pair| Some((nibble(pair[0])? << 4) | nibble(pair[1])?))
            .collect()
    }

    const fn nibble(c: u8) -> Option<u8> {
        match c {
            b'0'..=b'9' => Some(c - b'0'),
            b'a'..=b'f' => Some(c - b'a' + 10),
            b'A'..=b'F' => Some(c - b'A' + 10),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::auth::secrets::{SecretProvider, StaticSecretProvider};
    use crate::config::{ApiCredentials, ApiKey};

    const SECRET: &str = "my-secret";

    fn provider() -> StaticSecretProvider {
        StaticSecretProvider::new(ApiCredentials::new(
            ApiKey::new("key").unwrap(),
            ApiSecretKey::new(SECRET).unwrap(),
        ))
    }

    #[derive(Default)]
    struct CountingProvider {
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl SecretProvider for CountingProvider {
        async fn credentials(&self, _shop: &ShopDomain) -> Result<ApiCredentials, SecretError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(provider().credentials_ref().clone())
        }
    }

    impl HasSecretProvider for CountingProvider {
        fn secret_provider(&self) -> &dyn SecretProvider {
            self
        }
    }

    fn signed(query: &str, canonical: &str, mode: SignatureMode) -> QueryParams {
        QueryParams::parse(query).with(mode.param(), compute_signature(canonical, SECRET))
    }

    #[test]
    fn test_parse_decodes_form_encoding() {
        let params = QueryParams::parse("?a=1+2&b=%26%3D&c&a=3");
        assert_eq!(params.get("a"), Some("1 2"));
        assert_eq!(params.get("b"), Some("&="));
        assert_eq!(params.get("c"), Some(""));
        assert_eq!(params.get_all("a").collect::<Vec<_>>(), vec!["1 2", "3"]);
        assert_eq!(params.keys(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_canonicalize_hmac_mode_encodes_components() {
        let params = QueryParams::parse("shop=test.myshopify.com&%25%26%3D=%25%26%2F");
        assert_eq!(
            canonicalize(&params, SignatureMode::Hmac),
            "%25%26%3D=%25%26%2F&shop=test.myshopify.com"
        );
    }

    #[test]
    fn test_canonicalize_signature_mode_keeps_raw_values() {
        let params = QueryParams::parse("shop=test.myshopify.com&%25%26%3D=%25%26%2F");
        assert_eq!(
            canonicalize(&params, SignatureMode::Signature),
            "%&==%&/shop=test.myshopify.com"
        );
    }

    #[test]
    fn test_canonicalize_drops_only_own_signature_param() {
        let params = QueryParams::parse("shop=test.myshopify.com&hmac=abc&signature=def");
        assert_eq!(
            canonicalize(&params, SignatureMode::Signature),
            "hmac=abcshop=test.myshopify.com"
        );
        assert_eq!(
            canonicalize(&params, SignatureMode::Hmac),
            "shop=test.myshopify.com&signature=def"
        );
    }

    #[test]
    fn test_repeated_and_bracketed_keys_canonicalize_identically() {
        let repeated = QueryParams::parse("extra=1&extra=2&shop=test.myshopify.com");
        let bracketed = QueryParams::parse("extra[]=1&extra[]=2&shop=test.myshopify.com");

        for mode in [SignatureMode::Hmac, SignatureMode::Signature] {
            assert_eq!(canonicalize(&repeated, mode), canonicalize(&bracketed, mode));
        }
        assert_eq!(
            canonicalize(&repeated, SignatureMode::Hmac),
            r#"extra=["1", "2"]&shop=test.myshopify.com"#
        );
    }

    #[test]
    fn test_encode_uri_component_reserved_marks() {
        assert_eq!(encode_uri_component("a b!'()*~"), "a%20b!'()*~");
    }

    #[test]
    fn test_hex_decode_rejects_malformed_input() {
        assert_eq!(hex::decode("0aFf"), Some(vec![0x0a, 0xff]));
        assert_eq!(hex::decode("abc"), None);
        assert_eq!(hex::decode("zz"), None);
    }

    #[tokio::test]
    async fn test_verify_hmac_returns_shop() {
        let params = signed(
            "shop=test.myshopify.com",
            "shop=test.myshopify.com",
            SignatureMode::Hmac,
        );

        let shop = verify_hmac(&provider(), &params).await.unwrap();
        assert_eq!(shop.as_ref(), "test.myshopify.com");
    }

    #[tokio::test]
    async fn test_verify_hmac_with_extra_param() {
        let params = signed(
            "extra=1&shop=test.myshopify.com",
            "extra=1&shop=test.myshopify.com",
            SignatureMode::Hmac,
        );
        assert!(verify_hmac(&provider(), &params).await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_signature_mode() {
        let params = signed(
            "extra=1&extra=2&shop=test.myshopify.com",
            "extra=1,2shop=test.myshopify.com",
            SignatureMode::Signature,
        );
        assert!(verify_signature(&provider(), &params).await.is_ok());
    }

    #[tokio::test]
    async fn test_tampered_parameter_is_invalid_signature() {
        let signature = compute_signature("extra=1&shop=test.myshopify.com", SECRET);
        let params = QueryParams::parse("extra=2&shop=test.myshopify.com").with("hmac", signature);

        assert_eq!(
            verify_hmac(&provider(), &params).await,
            Err(VerificationError::InvalidSignature)
        );
    }

    #[tokio::test]
    async fn test_malformed_signature_is_invalid_signature() {
        let params = QueryParams::parse("shop=test.myshopify.com&hmac=xxx");
        assert_eq!(
            verify_hmac(&provider(), &params).await,
            Err(VerificationError::InvalidSignature)
        );
    }

    #[tokio::test]
    async fn test_invalid_input_skips_secret_lookup() {
        let env = CountingProvider::default();

        for query in [
            "shop=test.myshopify.com",
            "hmac=abcd",
            "shop=not-a-shop.com&hmac=abcd",
            "shop=test.myshopify.com&hmac=",
        ] {
            let result = verify_hmac(&env, &QueryParams::parse(query)).await;
            assert!(
                matches!(result, Err(VerificationError::InvalidArgument(_))),
                "{query}"
            );
        }
        assert_eq!(env.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_old_secret_is_accepted() {
        let env = StaticSecretProvider::new(
            ApiCredentials::new(
                ApiKey::new("key").unwrap(),
                ApiSecretKey::new("rotated").unwrap(),
            )
            .with_old_secret(ApiSecretKey::new(SECRET).unwrap()),
        );
        let params = signed(
            "shop=test.myshopify.com",
            "shop=test.myshopify.com",
            SignatureMode::Hmac,
        );

        assert!(verify_hmac(&env, &params).await.is_ok());
    }
}
