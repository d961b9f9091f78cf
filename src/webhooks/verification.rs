//! Webhook signature verification.
//!
//! Shopify signs each webhook delivery with an HMAC-SHA256 of the exact raw
//! request body, base64-encoded in the `X-Shopify-Hmac-SHA256` header. The
//! shop is identified by `X-Shopify-Shop-Domain`, which is validated before
//! the shop's secret is resolved.
//!
//! # Example
//!
//! ```rust
//! use shopify_runtime::auth::hmac::compute_signature_base64;
//! use shopify_runtime::auth::StaticSecretProvider;
//! use shopify_runtime::webhooks::{
//!     verify_webhook, WebhookRequest, HEADER_HMAC, HEADER_SHOP_DOMAIN,
//! };
//! use shopify_runtime::{ApiCredentials, ApiKey, ApiSecretKey};
//!
//! # tokio_test::block_on(async {
//! let env = StaticSecretProvider::new(ApiCredentials::new(
//!     ApiKey::new("key").unwrap(),
//!     ApiSecretKey::new("secret").unwrap(),
//! ));
//!
//! let body = br#"{"id":1}"#;
//! let request = WebhookRequest::new(body.to_vec())
//!     .header(HEADER_SHOP_DOMAIN, "example.myshopify.com")
//!     .header(HEADER_HMAC, compute_signature_base64(body, "secret"))
//!     .header("X-Shopify-Topic", "themes/update");
//!
//! let context = verify_webhook(&env, &request).await.unwrap();
//! assert_eq!(context.shop().as_ref(), "example.myshopify.com");
//! assert_eq!(context.topic(), Some("themes/update"));
//! # });
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::auth::hmac::{matches_any, VerificationError};
use crate::config::ShopDomain;
use crate::env::HasSecretProvider;

/// HTTP header carrying the base64 HMAC-SHA256 of the body.
pub const HEADER_HMAC: &str = "X-Shopify-Hmac-SHA256";

/// HTTP header carrying the webhook topic (e.g. `themes/update`).
pub const HEADER_TOPIC: &str = "X-Shopify-Topic";

/// HTTP header carrying the shop domain.
pub const HEADER_SHOP_DOMAIN: &str = "X-Shopify-Shop-Domain";

/// HTTP header carrying the API version of the payload.
pub const HEADER_API_VERSION: &str = "X-Shopify-API-Version";

/// HTTP header carrying the delivery ID.
pub const HEADER_WEBHOOK_ID: &str = "X-Shopify-Webhook-Id";

/// An incoming webhook delivery.
///
/// The body is kept as raw bytes so the signature is computed over exactly
/// what was received. Header lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    body: Vec<u8>,
    headers: Vec<(String, String)>,
}

impl WebhookRequest {
    /// Creates a request with `body` and no headers.
    #[must_use]
    pub const fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            headers: Vec::new(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the raw request body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the first value of header `name`, ignoring case.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Metadata of a verified webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookContext {
    shop: ShopDomain,
    topic: Option<String>,
    api_version: Option<String>,
    webhook_id: Option<String>,
}

impl WebhookContext {
    /// Returns the verified shop.
    #[must_use]
    pub const fn shop(&self) -> &ShopDomain {
        &self.shop
    }

    /// Returns the topic header, if present.
    #[must_use]
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Returns the API version header, if present.
    #[must_use]
    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    /// Returns the delivery ID header, if present.
    #[must_use]
    pub fn webhook_id(&self) -> Option<&str> {
        self.webhook_id.as_deref()
    }
}

/// Verifies a webhook delivery and returns its context.
///
/// The primary secret is tried first, then the old secret during a key
/// rotation.
///
/// # Errors
///
/// - [`VerificationError::InvalidArgument`] if the shop header is missing or
///   invalid, or the HMAC header is missing
/// - [`VerificationError::Secret`] if the shop's secret cannot be resolved
/// - [`VerificationError::InvalidSignature`] if the HMAC header is not valid
///   base64 or does not match the body
pub async fn verify_webhook<E>(
    env: &E,
    request: &WebhookRequest,
) -> Result<WebhookContext, VerificationError>
where
    E: HasSecretProvider + ?Sized,
{
    let shop = request.header_value(HEADER_SHOP_DOMAIN).ok_or_else(|| {
        VerificationError::InvalidArgument(format!("Missing '{HEADER_SHOP_DOMAIN}' header"))
    })?;
    let shop = ShopDomain::new(shop)
        .map_err(|_| VerificationError::InvalidArgument(format!("Invalid shop '{shop}'")))?;

    let signature = request.header_value(HEADER_HMAC).ok_or_else(|| {
        VerificationError::InvalidArgument(format!("Missing '{HEADER_HMAC}' header"))
    })?;

    let credentials = env.secret_provider().credentials(&shop).await?;

    let verified = STANDARD
        .decode(signature.trim())
        .is_ok_and(|expected| matches_any(request.body(), &expected, credentials.secrets()));

    if !verified {
        tracing::warn!(shop = %shop, "Webhook signature verification failed");
        return Err(VerificationError::InvalidSignature);
    }

    Ok(WebhookContext {
        shop,
        topic: request.header_value(HEADER_TOPIC).map(str::to_string),
        api_version: request.header_value(HEADER_API_VERSION).map(str::to_string),
        webhook_id: request.header_value(HEADER_WEBHOOK_ID).map(str::to_string),
    })
}
