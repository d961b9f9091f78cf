//! Authorization code exchange.

use serde::{Deserialize, Serialize};

use crate::auth::oauth::OAuthError;
use crate::auth::Session;
use crate::clients::{Fetch, FetchRequest, HttpError, HttpMethod, HttpResponseError};
use crate::config::{ApiCredentials, ShopDomain};

/// Input of [`get_access_token`].
#[derive(Clone, Debug)]
pub struct AccessTokenInput<'a> {
    /// The app's credentials.
    pub credentials: &'a ApiCredentials,
    /// The shop the code was issued for.
    pub shop: &'a ShopDomain,
    /// The `code` query parameter of the verified callback.
    pub code: &'a str,
}

/// A granted access token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// The token for the `X-Shopify-Access-Token` header.
    pub access_token: String,
    /// The granted scopes.
    pub scopes: Vec<String>,
}

impl AccessToken {
    /// Turns the token into a [`Session`] for `shop`.
    #[must_use]
    pub fn into_session(self, shop: ShopDomain) -> Session {
        Session::new(shop, self.access_token).with_scopes(self.scopes)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"*****")
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    scope: String,
}

/// Exchanges an authorization code for an access token.
///
/// POSTs `{client_id, client_secret, code}` as JSON to
/// `https://{shop}/admin/oauth/access_token`. The call is not retried.
///
/// # Errors
///
/// - [`OAuthError::Http`] for network failures and non-2xx statuses
/// - [`OAuthError::InvalidResponse`] if the body lacks `access_token` or `scope`
pub async fn get_access_token<F>(
    fetch: &F,
    input: &AccessTokenInput<'_>,
) -> Result<AccessToken, OAuthError>
where
    F: Fetch + ?Sized,
{
    let url = format!("https://{}/admin/oauth/access_token", input.shop);
    let body = serde_json::json!({
        "client_id": input.credentials.key.as_ref(),
        "client_secret": input.credentials.secret.as_ref(),
        "code": input.code,
    });

    let request = FetchRequest::new(HttpMethod::Post, &url)
        .header("Accept", "application/json")
        .json_body(&body);
    let response = fetch.fetch(request).await?;

    if !response.is_ok() {
        return Err(HttpError::Response(HttpResponseError::from_response(url, response)).into());
    }

    let data: AccessTokenResponse =
        serde_json::from_value(response.body).map_err(|e| OAuthError::InvalidResponse {
            reason: e.to_string(),
        })?;

    tracing::debug!(shop = %input.shop, "Exchanged authorization code for access token");

    Ok(AccessToken {
        access_token: data.access_token,
        scopes: data.scope.split(',').map(str::to_string).collect(),
    })
}
