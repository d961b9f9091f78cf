//! Credentials and identities, checked when they are built.

use crate::error::ConfigError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The app's API key; also the audience of its session tokens.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApiKey(String);

impl ApiKey {
    /// # Errors
    ///
    /// [`ConfigError::EmptyApiKey`] for an empty key.
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(key))
    }
}

impl AsRef<str> for ApiKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A signing secret. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiSecretKey(String);

impl ApiSecretKey {
    /// # Errors
    ///
    /// [`ConfigError::EmptyApiSecretKey`] for an empty secret.
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ConfigError::EmptyApiSecretKey);
        }
        Ok(Self(key))
    }
}

impl AsRef<str> for ApiSecretKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiSecretKey").field(&"*****").finish()
    }
}

/// An app's API key paired with its signing secret.
///
/// During key rotation an `old_secret` may be attached; verifiers try the
/// primary secret first and then fall back to the old one.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::{ApiCredentials, ApiKey, ApiSecretKey};
///
/// let credentials = ApiCredentials::new(
///     ApiKey::new("key").unwrap(),
///     ApiSecretKey::new("new-secret").unwrap(),
/// )
/// .with_old_secret(ApiSecretKey::new("old-secret").unwrap());
///
/// assert_eq!(credentials.secrets().count(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiCredentials {
    /// The app's API key (the session token audience).
    pub key: ApiKey,
    /// The current API secret.
    pub secret: ApiSecretKey,
    /// The previous API secret, accepted while a rotation is in flight.
    pub old_secret: Option<ApiSecretKey>,
}

impl ApiCredentials {
    /// Creates credentials without a rotation secret.
    #[must_use]
    pub const fn new(key: ApiKey, secret: ApiSecretKey) -> Self {
        Self {
            key,
            secret,
            old_secret: None,
        }
    }

    /// Attaches the previous secret for key rotation.
    #[must_use]
    pub fn with_old_secret(mut self, old_secret: ApiSecretKey) -> Self {
        self.old_secret = Some(old_secret);
        self
    }

    /// Iterates the secrets to try, primary first.
    pub fn secrets(&self) -> impl Iterator<Item = &ApiSecretKey> {
        std::iter::once(&self.secret).chain(self.old_secret.as_ref())
    }
}

/// A validated Shopify shop domain (the shop identity).
///
/// A shop domain is a single alphanumeric-leading label followed by
/// `.myshopify.com` or `.myshopify.io`. Anything else, including bare shop
/// names and custom domains, is rejected by [`ShopDomain::new`]; use
/// [`ShopDomain::from_shop_name`] to build a domain from a bare name.
///
/// Serializes as the full domain string.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::ShopDomain;
///
/// let domain = ShopDomain::new("my-store.myshopify.com").unwrap();
/// assert_eq!(domain.shop_name(), "my-store");
///
/// assert!(ShopDomain::new("not-a-shop.com").is_err());
/// assert!(ShopDomain::new("my-store").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShopDomain {
    full_domain: String,
    shop_name_end: usize,
}

impl ShopDomain {
    const INFIX: &'static str = ".myshopify.";
    const TLDS: [&'static str; 2] = ["com", "io"];

    /// Lowercases and checks `domain`; nothing else is normalized.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidShopDomain`] if the domain does not have
    /// the platform hostname shape.
    pub fn new(domain: impl Into<String>) -> Result<Self, ConfigError> {
        let domain = domain.into();

        let Some((shop_name, tld)) = domain.rsplit_once(Self::INFIX) else {
            return Err(ConfigError::InvalidShopDomain { domain });
        };

        if !Self::TLDS.contains(&tld) || !Self::is_valid_shop_name(shop_name) {
            return Err(ConfigError::InvalidShopDomain { domain });
        }

        Ok(Self {
            shop_name_end: shop_name.len(),
            full_domain: domain.to_lowercase(),
        })
    }

    /// Creates a `{name}.myshopify.com` domain from a bare shop name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidShopDomain`] if the name is not a valid
    /// shop label.
    pub fn from_shop_name(name: &str) -> Result<Self, ConfigError> {
        Self::new(format!("{name}{}com", Self::INFIX))
    }

    /// The label before `.myshopify.`.
    #[must_use]
    pub fn shop_name(&self) -> &str {
        &self.full_domain[..self.shop_name_end]
    }

    /// Returns `true` if `domain` has the platform hostname shape.
    #[must_use]
    pub fn is_valid(domain: &str) -> bool {
        Self::new(domain).is_ok()
    }

    fn is_valid_shop_name(name: &str) -> bool {
        let mut chars = name.chars();
        chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.full_domain
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_domain)
    }
}

impl Serialize for ShopDomain {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.full_domain)
    }
}

impl<'de> Deserialize<'de> for ShopDomain {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let domain = String::deserialize(deserializer)?;
        Self::new(domain).map_err(de::Error::custom)
    }
}

/// An absolute URL whose host can be read without a URL parser.
///
/// Session tokens carry the shop as a URL in their `dest` claim, and the app
/// host is configured the same way.
///
/// ```rust
/// use shopify_runtime::HostUrl;
///
/// let dest = HostUrl::new("https://test.myshopify.com/admin").unwrap();
/// assert_eq!(dest.host_name(), Some("test.myshopify.com"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostUrl {
    url: String,
    host: std::ops::Range<usize>,
}

impl HostUrl {
    /// Parses `url`, which needs an alphabetic scheme followed by `://` and
    /// a non-empty host.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHostUrl`] otherwise.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into().trim().to_string();
        let invalid = |url: &str| ConfigError::InvalidHostUrl {
            url: url.to_string(),
        };

        let Some((scheme, rest)) = url.split_once("://") else {
            return Err(invalid(&url));
        };
        if scheme.is_empty() || !scheme.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(invalid(&url));
        }

        let start = scheme.len() + 3;
        let len = rest.find([':', '/', '?', '#']).unwrap_or(rest.len());
        if len == 0 {
            return Err(invalid(&url));
        }

        Ok(Self {
            host: start..start + len,
            url,
        })
    }

    /// The host, without port or path.
    #[must_use]
    pub fn host_name(&self) -> Option<&str> {
        self.url.get(self.host.clone()).filter(|host| !host.is_empty())
    }
}

impl AsRef<str> for HostUrl {
    fn as_ref(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_masks_secrets() {
        let credentials = ApiCredentials::new(
            ApiKey::new("key").unwrap(),
            ApiSecretKey::new("hunter2").unwrap(),
        )
        .with_old_secret(ApiSecretKey::new("hunter1").unwrap());

        let printed = format!("{credentials:?}");
        assert!(!printed.contains("hunter"));
        assert!(printed.contains("*****"));
        assert!(matches!(ApiSecretKey::new(""), Err(ConfigError::EmptyApiSecretKey)));
    }

    #[test]
    fn test_credentials_secrets_primary_first() {
        let credentials = ApiCredentials::new(
            ApiKey::new("key").unwrap(),
            ApiSecretKey::new("primary").unwrap(),
        )
        .with_old_secret(ApiSecretKey::new("old").unwrap());

        let secrets: Vec<&str> = credentials.secrets().map(AsRef::as_ref).collect();
        assert_eq!(secrets, vec!["primary", "old"]);
    }

    #[test]
    fn test_shop_domain_accepts_platform_hostnames() {
        let domain = ShopDomain::new("my-store.myshopify.com").unwrap();
        assert_eq!(domain.as_ref(), "my-store.myshopify.com");
        assert_eq!(domain.shop_name(), "my-store");

        assert!(ShopDomain::new("test.myshopify.io").is_ok());
        assert!(ShopDomain::new("9shop.myshopify.com").is_ok());
        assert_eq!(
            ShopDomain::new("MY-Store.myshopify.com").unwrap().as_ref(),
            "my-store.myshopify.com"
        );
    }

    #[test]
    fn test_shop_domain_rejects_invalid_domains() {
        assert!(ShopDomain::new("").is_err());
        assert!(ShopDomain::new("xxx").is_err());
        assert!(ShopDomain::new("not-a-shop.com").is_err());
        assert!(ShopDomain::new("-shop.myshopify.com").is_err());
        assert!(ShopDomain::new("my_store.myshopify.com").is_err());
        assert!(ShopDomain::new("a.b.myshopify.com").is_err());
        assert!(ShopDomain::new("shop.myshopify.net").is_err());
        assert!(ShopDomain::new(".myshopify.com").is_err());
        assert!(ShopDomain::new(" shop.myshopify.com").is_err());
        assert!(ShopDomain::new("user@shop.myshopify.com").is_err());
    }

    #[test]
    fn test_shop_domain_from_shop_name() {
        let domain = ShopDomain::from_shop_name("my-store").unwrap();
        assert_eq!(domain.as_ref(), "my-store.myshopify.com");
        assert!(ShopDomain::from_shop_name("my store").is_err());
    }

    #[test]
    fn test_host_url_reads_host_of_token_dest() {
        let cases = [
            ("https://test.myshopify.com", Some("test.myshopify.com")),
            ("https://test.myshopify.com:443/admin", Some("test.myshopify.com")),
            ("http://localhost?x=1", Some("localhost")),
        ];
        for (url, host) in cases {
            assert_eq!(HostUrl::new(url).unwrap().host_name(), host, "{url}");
        }

        for url in ["test.myshopify.com", "https://", "://test.com", "h2://x", "https:///admin"] {
            assert!(HostUrl::new(url).is_err(), "{url}");
        }
    }

    #[test]
    fn test_shop_domain_serde_round_trip() {
        let json = r#""test-shop.myshopify.com""#;
        let domain: ShopDomain = serde_json::from_str(json).unwrap();
        assert_eq!(domain.shop_name(), "test-shop");
        assert_eq!(serde_json::to_string(&domain).unwrap(), json);

        let invalid: Result<ShopDomain, _> = serde_json::from_str(r#""example.com""#);
        assert!(invalid.is_err());
    }
}
