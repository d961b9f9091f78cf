//! Theme assets.
//!
//! Reads are cached in the environment's [`CacheStore`]: asset metadata
//! lists per theme in [`Namespace::AssetMeta`], single assets per theme and
//! key in [`Namespace::Asset`]. [`set`] and [`remove`] delete both entries
//! for the asset they change before returning.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{
    normalize, with_cache, with_cache_effect, Cache, CacheStore, CachedOutcome, MemoryCache,
    Namespace, Normalized,
};
use crate::compose_capabilities;
use crate::env::{HasCacheStore, HasHttpClient, Operation};
use crate::error::Error;
use crate::gid::Gid;

/// Identifies an asset: a theme and a key such as `layout/theme.liquid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey {
    /// The theme holding the asset.
    pub theme_id: Gid,
    /// The asset path within the theme.
    pub key: String,
}

impl AssetKey {
    /// Creates an asset key.
    #[must_use]
    pub fn new(theme_id: Gid, key: impl Into<String>) -> Self {
        Self {
            theme_id,
            key: key.into(),
        }
    }

    /// Returns the cache key, `{theme id}_{key}`.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.theme_id.id(), self.key)
    }

    fn assets_path(&self) -> String {
        assets_path(&self.theme_id)
    }
}

fn assets_path(theme_id: &Gid) -> String {
    format!("themes/{}/assets", theme_id.id())
}

/// Asset metadata, as listed and as returned by writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMeta {
    /// The asset path within the theme.
    pub key: String,
    /// MD5 of the contents.
    #[serde(default)]
    pub checksum: Option<String>,
    /// MIME type.
    #[serde(default)]
    pub content_type: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// The numeric theme ID.
    #[serde(default)]
    pub theme_id: u64,
    /// Public CDN URL, for public assets.
    #[serde(default)]
    pub public_url: Option<String>,
    /// When the asset was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// When the asset was last updated.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// An asset with its contents.
///
/// Text assets carry `value`, binary assets a base64 `attachment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// The metadata.
    #[serde(flatten)]
    pub meta: AssetMeta,
    /// Text contents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Base64 contents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

impl Asset {
    /// Returns the contents as a source that writes them back unchanged.
    ///
    /// An asset without contents reads as an empty text value.
    #[must_use]
    pub fn source(&self) -> AssetSource {
        match (&self.value, &self.attachment) {
            (Some(value), _) => AssetSource::Value(value.clone()),
            (None, Some(attachment)) => AssetSource::Attachment(attachment.clone()),
            (None, None) => AssetSource::Value(String::new()),
        }
    }
}

/// Where the contents of a written asset come from. Exactly one is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Text contents.
    Value(String),
    /// Base64 contents.
    Attachment(String),
    /// A URL the platform downloads the contents from.
    Src(String),
    /// Another asset key of the same theme to copy.
    SourceKey(String),
}

impl AssetSource {
    fn field(&self) -> (&'static str, &str) {
        match self {
            Self::Value(v) => ("value", v),
            Self::Attachment(v) => ("attachment", v),
            Self::Src(v) => ("src", v),
            Self::SourceKey(v) => ("source_key", v),
        }
    }

    fn contents(&self) -> &str {
        self.field().1
    }

    fn with_contents(&self, contents: String) -> Self {
        match self {
            Self::Value(_) => Self::Value(contents),
            Self::Attachment(_) => Self::Attachment(contents),
            Self::Src(_) => Self::Src(contents),
            Self::SourceKey(_) => Self::SourceKey(contents),
        }
    }
}

/// Input of [`Set`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetInput {
    /// The asset to write.
    pub asset: AssetKey,
    /// The new contents.
    pub source: AssetSource,
}

/// Rewrites the contents of an asset.
pub type ModifyFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Input of [`Modify`].
#[derive(Clone)]
pub struct ModifyInput {
    /// The asset to rewrite.
    pub asset: AssetKey,
    /// Maps the current contents to the new contents.
    pub modify: ModifyFn,
}

impl ModifyInput {
    /// Creates a modify input.
    pub fn new<F>(asset: AssetKey, modify: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            asset,
            modify: Arc::new(modify),
        }
    }
}

impl fmt::Debug for ModifyInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifyInput")
            .field("asset", &self.asset)
            .finish_non_exhaustive()
    }
}

/// The single-asset cache, addressed by [`AssetKey`].
pub type AssetCache = Normalized<
    MemoryCache<String, CachedOutcome<Result<Asset, Error>>>,
    fn(&AssetKey) -> String,
    String,
>;

/// The metadata list cache, addressed by theme.
pub type AssetMetaCache = MemoryCache<Gid, CachedOutcome<Result<Vec<AssetMeta>, Error>>>;

/// Returns the single-asset cache of `store`.
#[must_use]
pub fn asset_cache(store: &CacheStore) -> AssetCache {
    normalize(
        store.get_cache(Namespace::Asset),
        AssetKey::cache_key as fn(&AssetKey) -> String,
    )
}

/// Returns the metadata list cache of `store`.
#[must_use]
pub fn asset_meta_cache(store: &CacheStore) -> AssetMetaCache {
    store.get_cache(Namespace::AssetMeta)
}

fn invalidate(store: &CacheStore, asset: &AssetKey) {
    asset_cache(store).delete(asset);
    asset_meta_cache(store).delete(&asset.theme_id);
    tracing::debug!(asset = %asset.cache_key(), "Invalidated cached asset");
}

#[derive(Deserialize)]
struct AssetListEnvelope {
    assets: Vec<AssetMeta>,
}

#[derive(Deserialize)]
struct AssetEnvelope {
    asset: Asset,
}

#[derive(Deserialize)]
struct AssetMetaEnvelope {
    asset: AssetMeta,
}

struct FetchList;

#[async_trait]
impl<E: HasHttpClient + ?Sized + Sync> Operation<E> for FetchList {
    type Input = Gid;
    type Output = Result<Vec<AssetMeta>, Error>;

    async fn call(&self, env: &E, theme_id: Gid) -> Self::Output {
        let envelope: AssetListEnvelope = env
            .rest_client()
            .get(&assets_path(&theme_id), &[])
            .await?;
        Ok(envelope.assets)
    }
}

struct FetchAsset;

#[async_trait]
impl<E: HasHttpClient + ?Sized + Sync> Operation<E> for FetchAsset {
    type Input = AssetKey;
    type Output = Result<Asset, Error>;

    async fn call(&self, env: &E, asset: AssetKey) -> Self::Output {
        let envelope: AssetEnvelope = env
            .rest_client()
            .get(&asset.assets_path(), &[("asset[key]", &asset.key)])
            .await?;
        Ok(envelope.asset)
    }
}

struct PutAsset;

#[async_trait]
impl<E: HasHttpClient + ?Sized + Sync> Operation<E> for PutAsset {
    type Input = SetInput;
    type Output = Result<AssetMeta, Error>;

    async fn call(&self, env: &E, input: SetInput) -> Self::Output {
        let (field, contents) = input.source.field();
        let mut asset = serde_json::Map::new();
        asset.insert("key".to_string(), input.asset.key.clone().into());
        asset.insert(field.to_string(), contents.into());

        let envelope: AssetMetaEnvelope = env
            .rest_client()
            .put(
                &input.asset.assets_path(),
                serde_json::json!({ "asset": asset }),
            )
            .await?;
        Ok(envelope.asset)
    }
}

struct DeleteAsset;

#[async_trait]
impl<E: HasHttpClient + ?Sized + Sync> Operation<E> for DeleteAsset {
    type Input = AssetKey;
    type Output = Result<(), Error>;

    async fn call(&self, env: &E, asset: AssetKey) -> Self::Output {
        env.rest_client()
            .delete(&asset.assets_path(), &[("asset[key]", &asset.key)])
            .await?;
        Ok(())
    }
}

/// Lists the asset metadata of a theme, cached per theme.
#[derive(Clone, Copy, Debug, Default)]
pub struct List;

#[async_trait]
impl<E> Operation<E> for List
where
    E: HasHttpClient + HasCacheStore + Clone + Send + Sync + 'static,
{
    type Input = Gid;
    type Output = Result<Vec<AssetMeta>, Error>;

    async fn call(&self, env: &E, theme_id: Gid) -> Self::Output {
        with_cache(asset_meta_cache, FetchList)
            .call(env, theme_id)
            .await
    }
}

/// Reads an asset with its contents, cached per theme and key.
#[derive(Clone, Copy, Debug, Default)]
pub struct Get;

#[async_trait]
impl<E> Operation<E> for Get
where
    E: HasHttpClient + HasCacheStore + Clone + Send + Sync + 'static,
{
    type Input = AssetKey;
    type Output = Result<Asset, Error>;

    async fn call(&self, env: &E, asset: AssetKey) -> Self::Output {
        with_cache(asset_cache, FetchAsset).call(env, asset).await
    }
}

compose_capabilities! {
    struct FindOps {
        get: Get,
    }
}

/// Reads an asset, with `None` when the theme has no such key.
#[derive(Clone, Copy, Debug, Default)]
pub struct Find;

#[async_trait]
impl<E> Operation<E> for Find
where
    E: HasHttpClient + HasCacheStore + Clone + Send + Sync + 'static,
{
    type Input = AssetKey;
    type Output = Result<Option<Asset>, Error>;

    async fn call(&self, env: &E, asset: AssetKey) -> Self::Output {
        let ops = FindOps::new(env);
        super::absent_on(404, ops.get.call(asset).await)
    }
}

compose_capabilities! {
    struct ExistsOps {
        find: Find,
    }
}

/// Checks whether an asset exists.
///
/// Demo themes answer 401 to asset reads; their assets count as absent.
#[derive(Clone, Copy, Debug, Default)]
pub struct Exists;

#[async_trait]
impl<E> Operation<E> for Exists
where
    E: HasHttpClient + HasCacheStore + Clone + Send + Sync + 'static,
{
    type Input = AssetKey;
    type Output = Result<bool, Error>;

    async fn call(&self, env: &E, asset: AssetKey) -> Self::Output {
        let ops = ExistsOps::new(env);
        match ops.find.call(asset).await {
            Ok(found) => Ok(found.is_some()),
            Err(error) if error.is_status(401) => Ok(false),
            Err(error) => Err(error),
        }
    }
}

fn invalidate_set(store: &CacheStore, input: &SetInput, _: &AssetMeta) {
    invalidate(store, &input.asset);
}

fn invalidate_remove(store: &CacheStore, asset: &AssetKey, _: &()) {
    invalidate(store, asset);
}

/// Writes an asset and invalidates its cached reads.
#[derive(Clone, Copy, Debug, Default)]
pub struct Set;

#[async_trait]
impl<E> Operation<E> for Set
where
    E: HasHttpClient + HasCacheStore + ?Sized + Sync,
{
    type Input = SetInput;
    type Output = Result<AssetMeta, Error>;

    async fn call(&self, env: &E, input: SetInput) -> Self::Output {
        with_cache_effect(PutAsset, invalidate_set)
            .call(env, input)
            .await
    }
}

/// Deletes an asset and invalidates its cached reads.
#[derive(Clone, Copy, Debug, Default)]
pub struct Remove;

#[async_trait]
impl<E> Operation<E> for Remove
where
    E: HasHttpClient + HasCacheStore + ?Sized + Sync,
{
    type Input = AssetKey;
    type Output = Result<(), Error>;

    async fn call(&self, env: &E, asset: AssetKey) -> Self::Output {
        with_cache_effect(DeleteAsset, invalidate_remove)
            .call(env, asset)
            .await
    }
}

compose_capabilities! {
    struct ModifyOps {
        get: Get,
        set: Set,
    }
}

/// Rewrites the contents of an asset through a function.
///
/// Unchanged contents are not written back; the current metadata is
/// returned instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct Modify;

#[async_trait]
impl<E> Operation<E> for Modify
where
    E: HasHttpClient + HasCacheStore + Clone + Send + Sync + 'static,
{
    type Input = ModifyInput;
    type Output = Result<AssetMeta, Error>;

    async fn call(&self, env: &E, input: ModifyInput) -> Self::Output {
        let ops = ModifyOps::new(env);
        let asset = ops.get.call(input.asset.clone()).await?;

        let source = asset.source();
        let modified = (input.modify)(source.contents());
        if modified == source.contents() {
            tracing::debug!(asset = %input.asset.cache_key(), "Asset unchanged, skipping write");
            return Ok(asset.meta);
        }

        ops.set
            .call(SetInput {
                asset: input.asset,
                source: source.with_contents(modified),
            })
            .await
    }
}

/// Lists asset metadata, see [`List`].
///
/// # Errors
///
/// Transport failures of the list request.
pub async fn list<E>(env: &E, theme_id: Gid) -> Result<Vec<AssetMeta>, Error>
where
    E: HasHttpClient + HasCacheStore + Clone + Send + Sync + 'static,
{
    List.call(env, theme_id).await
}

/// Reads an asset, see [`Get`].
///
/// # Errors
///
/// Transport failures, including 404 for a missing key.
pub async fn get<E>(env: &E, asset: AssetKey) -> Result<Asset, Error>
where
    E: HasHttpClient + HasCacheStore + Clone + Send + Sync + 'static,
{
    Get.call(env, asset).await
}

/// Reads an asset if it exists, see [`Find`].
///
/// # Errors
///
/// Transport failures other than 404.
pub async fn find<E>(env: &E, asset: AssetKey) -> Result<Option<Asset>, Error>
where
    E: HasHttpClient + HasCacheStore + Clone + Send + Sync + 'static,
{
    Find.call(env, asset).await
}

/// Checks whether an asset exists, see [`Exists`].
///
/// # Errors
///
/// Transport failures other than 401 and 404.
pub async fn exists<E>(env: &E, asset: AssetKey) -> Result<bool, Error>
where
    E: HasHttpClient + HasCacheStore + Clone + Send + Sync + 'static,
{
    Exists.call(env, asset).await
}

/// Writes an asset, see [`Set`].
///
/// # Errors
///
/// Transport failures of the write; caches are left as they were.
pub async fn set<E>(env: &E, input: SetInput) -> Result<AssetMeta, Error>
where
    E: HasHttpClient + HasCacheStore + ?Sized + Sync,
{
    Set.call(env, input).await
}

/// Deletes an asset, see [`Remove`].
///
/// # Errors
///
/// Transport failures of the delete; caches are left as they were.
pub async fn remove<E>(env: &E, asset: AssetKey) -> Result<(), Error>
where
    E: HasHttpClient + HasCacheStore + ?Sized + Sync,
{
    Remove.call(env, asset).await
}

/// Rewrites an asset, see [`Modify`].
///
/// # Errors
///
/// Failures of the read or of the write.
pub async fn modify<E>(env: &E, input: ModifyInput) -> Result<AssetMeta, Error>
where
    E: HasHttpClient + HasCacheStore + Clone + Send + Sync + 'static,
{
    Modify.call(env, input).await
}
