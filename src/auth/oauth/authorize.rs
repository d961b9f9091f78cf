//! Authorization URL and state generation.

use rand::RngCore;

use crate::config::ShopDomain;

/// Whether the requested token is tied to the installing staff member.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Per-user token that expires with the staff member's session.
    Online,
    /// App-level token that never expires.
    #[default]
    Offline,
}

/// Parameters of the authorization redirect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUrlInput<'a> {
    /// The shop to install on.
    pub shop: &'a ShopDomain,
    /// The app's API key.
    pub api_key: &'a str,
    /// Where the platform redirects back with `code`.
    pub redirect_uri: &'a str,
    /// Access scopes to request.
    pub scopes: &'a [String],
    /// Anti-CSRF nonce, see [`gen_auth_state`].
    pub state: &'a str,
    /// Online or offline token.
    pub access_mode: AccessMode,
}

/// Builds the URL to redirect a merchant to for app installation.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::auth::oauth::{create_auth_url, AccessMode, AuthUrlInput};
/// use shopify_runtime::ShopDomain;
///
/// let shop = ShopDomain::new("test.myshopify.com").unwrap();
/// let scopes = vec!["scopeA".to_string(), "scopeB".to_string()];
///
/// let url = create_auth_url(&AuthUrlInput {
///     shop: &shop,
///     api_key: "test-api-key",
///     redirect_uri: "https://test.com/callback",
///     scopes: &scopes,
///     state: "test-state",
///     access_mode: AccessMode::Offline,
/// });
///
/// assert_eq!(
///     url,
///     "https://test.myshopify.com/admin/oauth/authorize?client_id=test-api-key\
///      &redirect_uri=https%3A%2F%2Ftest.com%2Fcallback&scope=scopeA%2CscopeB&state=test-state"
/// );
/// ```
#[must_use]
pub fn create_auth_url(input: &AuthUrlInput<'_>) -> String {
    let scope = input.scopes.join(",");
    let mut params = vec![
        ("client_id", input.api_key),
        ("redirect_uri", input.redirect_uri),
        ("scope", scope.as_str()),
        ("state", input.state),
    ];

    if input.access_mode == AccessMode::Online {
        params.push(("grant_options[]", "per-user"));
    }

    let query_string = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("https://{}/admin/oauth/authorize?{query_string}", input.shop)
}

/// Generates a random OAuth state: 16 bytes as 32 lowercase hex characters.
#[must_use]
pub fn gen_auth_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_online_mode_adds_grant_options() {
        let shop = ShopDomain::new("test.myshopify.com").unwrap();
        let scopes = vec!["scopeA".to_string()];
        let url = create_auth_url(&AuthUrlInput {
            shop: &shop,
            api_key: "key",
            redirect_uri: "https://test.com/callback",
            scopes: &scopes,
            state: "s",
            access_mode: AccessMode::Online,
        });

        assert!(url.ends_with("&grant_options%5B%5D=per-user"));
        assert!(url.starts_with("https://test.myshopify.com/admin/oauth/authorize?client_id=key&"));
    }

    #[test]
    fn test_gen_auth_state_is_random_hex() {
        let state = gen_auth_state();
        assert_eq!(state.len(), 32);
        assert!(state.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(state, gen_auth_state());
    }
}
