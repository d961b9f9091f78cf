//! Themes.
//!
//! Single-theme reads go through a [`BatchLoader`] keyed by theme GID, so
//! concurrent [`get`]s in one scheduler turn share one batch and each theme
//! is fetched once per environment. [`list`] is loaded once as well and
//! primes the per-theme loader with every theme it returns.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::cache::Namespace;
use crate::clients::RestClient;
use crate::env::{HasHttpClient, HasLoaderStore, Operation};
use crate::error::Error;
use crate::gid::Gid;
use crate::loader::BatchLoader;

/// The role of a theme in its shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeRole {
    /// The published theme.
    Main,
    /// An unpublished theme.
    Unpublished,
    /// A theme store demo; its assets cannot be read.
    Demo,
    /// A development theme.
    Development,
}

/// A theme as returned by the REST API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    /// The numeric ID.
    pub id: u64,
    /// The global ID, used as the loader key.
    pub admin_graphql_api_id: Gid,
    /// The display name.
    pub name: String,
    /// The role.
    pub role: ThemeRole,
    /// Whether the theme can be previewed.
    #[serde(default)]
    pub previewable: bool,
    /// Whether the theme is still being processed.
    #[serde(default)]
    pub processing: bool,
    /// The theme store ID, for themes installed from the store.
    #[serde(default)]
    pub theme_store_id: Option<u64>,
    /// When the theme was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// When the theme was last updated.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct ThemeEnvelope {
    theme: Theme,
}

#[derive(Deserialize)]
struct ThemeListEnvelope {
    themes: Vec<Theme>,
}

fn theme_loader<E>(env: &E) -> BatchLoader<Gid, Theme>
where
    E: HasHttpClient + HasLoaderStore + ?Sized,
{
    env.loader_store().get_or_create(Namespace::Theme, || {
        let client = env.rest_client().clone();
        BatchLoader::new(move |ids: Vec<Gid>| fetch_themes(client.clone(), ids))
    })
}

// The REST API has no multi-ID read; a batch fetches its themes concurrently.
async fn fetch_themes(client: RestClient, ids: Vec<Gid>) -> HashMap<Gid, Result<Theme, Error>> {
    let client = &client;
    let fetches = ids.into_iter().map(|id| async move {
        let outcome = client
            .get::<ThemeEnvelope>(&format!("themes/{}", id.id()), &[])
            .await
            .map(|envelope| envelope.theme)
            .map_err(Error::from);
        (id, outcome)
    });
    join_all(fetches).await.into_iter().collect()
}

/// Reads one theme by GID.
///
/// # Errors
///
/// Any transport failure of the theme's batch, including 404.
#[derive(Clone, Copy, Debug, Default)]
pub struct Get;

#[async_trait]
impl<E> Operation<E> for Get
where
    E: HasHttpClient + HasLoaderStore + ?Sized + Sync,
{
    type Input = Gid;
    type Output = Result<Theme, Error>;

    async fn call(&self, env: &E, id: Gid) -> Result<Theme, Error> {
        theme_loader(env).load(id).await
    }
}

/// Reads one theme by GID, with `None` for a missing theme.
#[derive(Clone, Copy, Debug, Default)]
pub struct Find;

#[async_trait]
impl<E> Operation<E> for Find
where
    E: HasHttpClient + HasLoaderStore + ?Sized + Sync,
{
    type Input = Gid;
    type Output = Result<Option<Theme>, Error>;

    async fn call(&self, env: &E, id: Gid) -> Result<Option<Theme>, Error> {
        super::absent_on(404, Get.call(env, id).await)
    }
}

/// Lists the themes of the shop.
#[derive(Clone, Copy, Debug, Default)]
pub struct List;

#[async_trait]
impl<E> Operation<E> for List
where
    E: HasHttpClient + HasLoaderStore + ?Sized + Sync,
{
    type Input = ();
    type Output = Result<Vec<Theme>, Error>;

    async fn call(&self, env: &E, (): ()) -> Result<Vec<Theme>, Error> {
        let themes = theme_loader(env);
        let loader = env.loader_store().get_or_create(Namespace::ThemeList, || {
            let client = env.rest_client().clone();
            BatchLoader::new(move |keys: Vec<()>| {
                let client = client.clone();
                let themes = themes.clone();
                async move {
                    let outcome = client
                        .get::<ThemeListEnvelope>("themes", &[])
                        .await
                        .map_err(Error::from)
                        .map(|envelope| {
                            for theme in &envelope.themes {
                                themes.prime(&theme.admin_graphql_api_id, Ok(theme.clone()));
                            }
                            envelope.themes
                        });
                    keys.into_iter()
                        .map(|key| (key, outcome.clone()))
                        .collect::<HashMap<_, _>>()
                }
            })
        });

        loader.load(()).await
    }
}

/// Reads one theme, see [`Get`].
///
/// # Errors
///
/// See [`Get`].
pub async fn get<E>(env: &E, id: Gid) -> Result<Theme, Error>
where
    E: HasHttpClient + HasLoaderStore + ?Sized + Sync,
{
    Get.call(env, id).await
}

/// Reads one theme if it exists, see [`Find`].
///
/// # Errors
///
/// Transport failures other than 404.
pub async fn find<E>(env: &E, id: Gid) -> Result<Option<Theme>, Error>
where
    E: HasHttpClient + HasLoaderStore + ?Sized + Sync,
{
    Find.call(env, id).await
}

/// Lists the themes of the shop, see [`List`].
///
/// # Errors
///
/// Transport failures of the list request.
pub async fn list<E>(env: &E) -> Result<Vec<Theme>, Error>
where
    E: HasHttpClient + HasLoaderStore + ?Sized + Sync,
{
    List.call(env, ()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_deserializes_rest_payload() {
        let theme: Theme = serde_json::from_value(serde_json::json!({
            "id": 828155753,
            "admin_graphql_api_id": "gid://shopify/OnlineStoreTheme/828155753",
            "name": "Comfort",
            "role": "main",
            "previewable": true,
            "processing": false,
            "theme_store_id": null,
            "created_at": "2024-01-02T09:28:43-05:00",
            "updated_at": "2024-01-02T09:28:43-05:00"
        }))
        .unwrap();

        assert_eq!(theme.role, ThemeRole::Main);
        assert_eq!(theme.admin_graphql_api_id.id(), "828155753");
        assert!(theme.created_at.is_some());
    }
}
