//! Session tokens for embedded apps.
//!
//! The admin signs a short-lived HS256 JWT with the app's API secret and
//! sends it as `Authorization: Bearer <token>`. Its `aud` claim is the app's
//! API key and its `dest` claim is `https://{shop}`.
//!
//! Because the secret is per-shop, [`verify_auth_header`] decodes the token
//! without verification first, validates `aud` and `dest`, resolves the
//! shop's credentials and only then verifies the signature.
//!
//! # Example
//!
//! ```rust
//! use shopify_runtime::auth::jwt::{sign, verify_auth_header, SignOptions};
//! use shopify_runtime::auth::StaticSecretProvider;
//! use shopify_runtime::{ApiCredentials, ApiKey, ApiSecretKey, ShopDomain};
//!
//! # tokio_test::block_on(async {
//! let credentials = ApiCredentials::new(
//!     ApiKey::new("key").unwrap(),
//!     ApiSecretKey::new("secret").unwrap(),
//! );
//! let shop = ShopDomain::new("test.myshopify.com").unwrap();
//!
//! let token = sign(&credentials, &shop, serde_json::Map::new(), &SignOptions::default()).unwrap();
//!
//! let env = StaticSecretProvider::new(credentials);
//! let decoded = verify_auth_header(&env, Some(&format!("Bearer {token}"))).await.unwrap();
//! assert_eq!(decoded.shop, shop);
//! assert_eq!(decoded.payload.dest, "https://test.myshopify.com");
//! # });
//! ```

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::auth::secrets::SecretError;
use crate::config::{ApiCredentials, HostUrl, ShopDomain};
use crate::env::HasSecretProvider;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Errors returned by session token signing and verification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionTokenError {
    /// No `Authorization` header was supplied.
    #[error("Missing Authorization header")]
    MissingHeader,

    /// The header is not `Bearer <token>`.
    #[error("Invalid Authorization header: {0}")]
    InvalidHeader(String),

    /// The token is not a decodable JWT.
    #[error("Session token could not be decoded: {0}")]
    Malformed(String),

    /// A required claim is missing or not a string.
    #[error("Invalid '{claim}' claim in session token")]
    InvalidClaim {
        /// The offending claim.
        claim: &'static str,
    },

    /// The `dest` claim is not a shop URL.
    #[error("Invalid shop in 'dest' claim: {0}")]
    InvalidDest(String),

    /// The token's `exp` is in the past.
    #[error("Session token has expired")]
    Expired,

    /// The token's `nbf` is in the future.
    #[error("Session token is not yet valid")]
    NotYetValid,

    /// The signature does not match the shop's secret.
    #[error("Session token signature is invalid")]
    InvalidSignature,

    /// The token is not signed with HS256.
    #[error("Session token algorithm is not HS256")]
    InvalidAlgorithm,

    /// The token's audience is not the app's API key.
    #[error("Session token audience does not match the API key")]
    InvalidAudience,

    /// The token could not be signed.
    #[error("Session token could not be signed: {0}")]
    Signing(String),

    /// The shop's secret could not be resolved.
    #[error(transparent)]
    Secret(#[from] SecretError),
}

impl From<jsonwebtoken::errors::Error> for SessionTokenError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        match error.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAlgorithm => Self::InvalidAlgorithm,
            ErrorKind::InvalidAudience => Self::InvalidAudience,
            _ => Self::Malformed(error.to_string()),
        }
    }
}

/// Registered claims added by [`sign`].
///
/// Relative times are offsets from the token's `iat` (or from now when the
/// payload carries no `iat`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignOptions {
    /// Sets `exp` to `iat + expires_in`.
    pub expires_in: Option<Duration>,
    /// Sets `nbf` to `iat + not_before`.
    pub not_before: Option<Duration>,
    /// Sets `iss`.
    pub issuer: Option<String>,
    /// Sets `sub`.
    pub subject: Option<String>,
    /// Sets `jti`.
    pub jwt_id: Option<String>,
    /// Omits `iat`.
    pub no_timestamp: bool,
}

/// Signs a session token for `shop`.
///
/// `payload` is extended with `dest = https://{shop}` and `aud = credentials.key`,
/// which overwrite any values the payload carries for those claims.
///
/// # Errors
///
/// Returns [`SessionTokenError::Signing`] if encoding fails.
pub fn sign(
    credentials: &ApiCredentials,
    shop: &ShopDomain,
    payload: Map<String, Value>,
    options: &SignOptions,
) -> Result<String, SessionTokenError> {
    let mut claims = payload;

    let timestamp = claims
        .get("iat")
        .and_then(Value::as_i64)
        .unwrap_or_else(|| Utc::now().timestamp());

    if options.no_timestamp {
        claims.remove("iat");
    } else {
        claims.insert("iat".into(), timestamp.into());
    }
    if let Some(expires_in) = options.expires_in {
        claims.insert("exp".into(), (timestamp + expires_in.num_seconds()).into());
    }
    if let Some(not_before) = options.not_before {
        claims.insert("nbf".into(), (timestamp + not_before.num_seconds()).into());
    }
    for (claim, value) in [
        ("iss", &options.issuer),
        ("sub", &options.subject),
        ("jti", &options.jwt_id),
    ] {
        if let Some(value) = value {
            claims.insert(claim.into(), value.clone().into());
        }
    }

    claims.insert("dest".into(), format!("https://{shop}").into());
    claims.insert("aud".into(), credentials.key.as_ref().into());

    jsonwebtoken::encode(
        &Header::new(ALGORITHM),
        &claims,
        &EncodingKey::from_secret(credentials.secret.as_ref().as_bytes()),
    )
    .map_err(|e| SessionTokenError::Signing(e.to_string()))
}

/// Verifies a token's signature, algorithm, audience and time claims.
///
/// The primary secret is tried first, then the old secret during a key
/// rotation. Returns every claim of the token.
///
/// # Errors
///
/// Returns the [`SessionTokenError`] variant matching the failed check.
pub fn verify(
    credentials: &ApiCredentials,
    token: &str,
) -> Result<Map<String, Value>, SessionTokenError> {
    let mut validation = Validation::new(ALGORITHM);
    validation.leeway = 0;
    validation.validate_nbf = true;
    validation.required_spec_claims.clear();
    validation.set_audience(&[credentials.key.as_ref()]);

    let mut last_error = SessionTokenError::InvalidSignature;
    for secret in credentials.secrets() {
        let key = DecodingKey::from_secret(secret.as_ref().as_bytes());
        match jsonwebtoken::decode::<Map<String, Value>>(token, &key, &validation) {
            Ok(data) if data.claims.contains_key("aud") => return Ok(data.claims),
            Ok(_) => return Err(SessionTokenError::InvalidAudience),
            // Claims are only checked once the signature matched.
            Err(error) => match SessionTokenError::from(error) {
                SessionTokenError::InvalidSignature => {
                    last_error = SessionTokenError::InvalidSignature;
                }
                other => return Err(other),
            },
        }
    }
    Err(last_error)
}

/// Decodes a token's payload without verifying it.
///
/// Returns `None` unless the token has three segments and its payload is a
/// base64url-encoded JSON object.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::auth::jwt::decode;
///
/// let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9\
///     .eyJzdWIiOiIxMjM0NTY3ODkwIiwibmFtZSI6IkpvaG4gRG9lIiwiaWF0IjoxNTE2MjM5MDIyfQ\
///     .SflKxwRJSMeKKF2QT4fwpMeJf36POk6yJV_adQssw5c";
///
/// let payload = decode(token).unwrap();
/// assert_eq!(payload["name"], "John Doe");
/// assert!(decode("").is_none());
/// ```
#[must_use]
pub fn decode(token: &str) -> Option<Map<String, Value>> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return None;
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// The claims of a session token, with `aud` and `dest` checked to be strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionTokenPayload {
    /// The app's API key.
    pub aud: String,
    /// The shop URL, `https://{shop}`.
    pub dest: String,
    /// Every claim of the token, `aud` and `dest` included.
    pub claims: Map<String, Value>,
}

impl SessionTokenPayload {
    /// Reads `aud` and `dest` from decoded claims.
    ///
    /// # Errors
    ///
    /// Returns [`SessionTokenError::InvalidClaim`] if either is missing or
    /// not a string.
    pub fn from_claims(claims: Map<String, Value>) -> Result<Self, SessionTokenError> {
        let string_claim = |claim: &'static str| {
            claims
                .get(claim)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(SessionTokenError::InvalidClaim { claim })
        };

        Ok(Self {
            aud: string_claim("aud")?,
            dest: string_claim("dest")?,
            claims,
        })
    }

    /// Returns the `sub` claim (the staff member's user ID), if present.
    #[must_use]
    pub fn sub(&self) -> Option<&str> {
        self.claims.get("sub").and_then(Value::as_str)
    }

    /// Returns the `exp` claim, if present.
    #[must_use]
    pub fn exp(&self) -> Option<i64> {
        self.claims.get("exp").and_then(Value::as_i64)
    }
}

/// A verified session token and the shop it was issued for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedToken {
    /// The token's claims.
    pub payload: SessionTokenPayload,
    /// The shop parsed from `dest`.
    pub shop: ShopDomain,
}

/// Verifies the session token of an `Authorization: Bearer <token>` header.
///
/// # Errors
///
/// - [`SessionTokenError::MissingHeader`] / [`SessionTokenError::InvalidHeader`]
///   for an absent or non-bearer header
/// - [`SessionTokenError::Malformed`] if the token cannot be decoded
/// - [`SessionTokenError::InvalidClaim`] / [`SessionTokenError::InvalidDest`]
///   for unusable `aud` or `dest` claims; no secret is resolved in that case
/// - [`SessionTokenError::Secret`] if the shop's secret cannot be resolved
/// - any [`verify`] error
pub async fn verify_auth_header<E>(
    env: &E,
    header: Option<&str>,
) -> Result<DecodedToken, SessionTokenError>
where
    E: HasSecretProvider + ?Sized,
{
    let token = parse_bearer(header)?;
    let claims = decode(token)
        .ok_or_else(|| SessionTokenError::Malformed("not a JSON web token".to_string()))?;

    let payload = SessionTokenPayload::from_claims(claims)?;
    let shop = parse_dest(&payload.dest)?;

    let credentials = env.secret_provider().credentials(&shop).await?;
    verify(&credentials, token).map_err(|error| {
        tracing::warn!(shop = %shop, %error, "Session token verification failed");
        error
    })?;

    Ok(DecodedToken { payload, shop })
}

fn parse_bearer(header: Option<&str>) -> Result<&str, SessionTokenError> {
    let header = header
        .filter(|header| !header.is_empty())
        .ok_or(SessionTokenError::MissingHeader)?;

    let token = header
        .get(..7)
        .filter(|scheme| scheme.eq_ignore_ascii_case("bearer "))
        .and_then(|_| header.get(7..))
        .and_then(|rest| rest.lines().next())
        .filter(|token| !token.is_empty());

    token.ok_or_else(|| SessionTokenError::InvalidHeader(header.to_string()))
}

fn parse_dest(dest: &str) -> Result<ShopDomain, SessionTokenError> {
    HostUrl::new(dest)
        .ok()
        .and_then(|url| url.host_name().and_then(|host| ShopDomain::new(host).ok()))
        .ok_or_else(|| SessionTokenError::InvalidDest(dest.to_string()))
}
