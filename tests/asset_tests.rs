//! Integration tests for cached theme assets.

mod common;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use common::{api_path, asset_json, config, env, session, FakeFetch};
use serde_json::{json, Value};
use shopify_runtime::api::asset::{self, AssetKey, AssetSource, ModifyInput, SetInput};
use shopify_runtime::auth::hmac::QueryParams;
use shopify_runtime::clients::{FetchRequest, HttpMethod};
use shopify_runtime::{Gid, ShopifyEnv};

const LAYOUT: &str = "layout/theme.liquid";

fn theme(id: u64) -> Gid {
    Gid::shopify("OnlineStoreTheme", id).unwrap()
}

fn layout() -> AssetKey {
    AssetKey::new(theme(1), LAYOUT)
}

/// An in-memory theme 1; theme 3 is a demo theme refusing asset reads.
struct Shop {
    assets: Mutex<BTreeMap<String, String>>,
    reject_writes: Mutex<bool>,
}

impl Shop {
    fn new() -> Arc<Self> {
        let layout = "<html>{{ content }}</html>".to_string();
        let assets = BTreeMap::from([(LAYOUT.to_string(), layout)]);
        Arc::new(Self {
            assets: Mutex::new(assets),
            reject_writes: Mutex::new(false),
        })
    }

    fn respond(&self, request: &FetchRequest) -> (u16, Value) {
        let path = api_path(&request.url);
        let (path, query) = path.split_once('?').unwrap_or((path, ""));
        let query = QueryParams::parse(query);

        if path.starts_with("themes/3/") {
            return (401, json!({"errors": "Unauthorized"}));
        }
        assert_eq!(path, "themes/1/assets.json");

        let mut assets = self.assets.lock().unwrap();
        match request.method {
            HttpMethod::Get => match query.get("asset[key]") {
                None => {
                    let list: Vec<Value> = assets
                        .iter()
                        .map(|(key, value)| {
                            let mut meta = asset_json(1, key, value);
                            meta.as_object_mut().unwrap().remove("value");
                            meta
                        })
                        .collect();
                    (200, json!({ "assets": list }))
                }
                Some(key) => match assets.get(key) {
                    Some(value) => (200, json!({"asset": asset_json(1, key, value)})),
                    None => (404, json!({"errors": "Not Found"})),
                },
            },
            HttpMethod::Put => {
                if *self.reject_writes.lock().unwrap() {
                    return (422, json!({"errors": {"asset": ["is invalid"]}}));
                }
                let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
                let key = body["asset"]["key"].as_str().unwrap().to_string();
                let value = body["asset"]["value"].as_str().unwrap_or_default().to_string();
                let mut meta = asset_json(1, &key, &value);
                meta.as_object_mut().unwrap().remove("value");
                assets.insert(key, value);
                (200, json!({ "asset": meta }))
            }
            HttpMethod::Delete => {
                let key = query.get("asset[key]").unwrap();
                match assets.remove(key) {
                    Some(_) => (200, json!({"message": "deleted"})),
                    None => (404, json!({"errors": "Not Found"})),
                }
            }
            _ => (405, json!({})),
        }
    }
}

fn setup() -> (Arc<Shop>, Arc<FakeFetch>, ShopifyEnv) {
    let shop = Shop::new();
    let responder = Arc::clone(&shop);
    let fetch = FakeFetch::new(move |request| responder.respond(request));
    let env = env(fetch.clone());
    (shop, fetch, env)
}

fn gets(fetch: &FakeFetch) -> usize {
    fetch.count(HttpMethod::Get, "themes/1/assets.json")
}

#[tokio::test]
async fn test_get_is_cached_per_asset() {
    let (_shop, fetch, env) = setup();

    let (first, second) = tokio::join!(asset::get(&env, layout()), asset::get(&env, layout()));
    let third = asset::get(&env, layout()).await.unwrap();

    assert_eq!(first.unwrap(), third);
    assert_eq!(second.unwrap().value.as_deref(), Some("<html>{{ content }}</html>"));
    assert_eq!(gets(&fetch), 1);
}

#[tokio::test]
async fn test_list_is_cached_per_theme() {
    let (_shop, fetch, env) = setup();

    let assets = asset::list(&env, theme(1)).await.unwrap();
    asset::list(&env, theme(1)).await.unwrap();

    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].key, LAYOUT);
    assert_eq!(gets(&fetch), 1);
}

#[tokio::test]
async fn test_set_invalidates_asset_and_list() {
    let (_shop, fetch, env) = setup();
    asset::get(&env, layout()).await.unwrap();
    asset::list(&env, theme(1)).await.unwrap();

    let meta = asset::set(
        &env,
        SetInput {
            asset: layout(),
            source: AssetSource::Value("<html></html>".to_string()),
        },
    )
    .await
    .unwrap();
    assert_eq!(meta.key, LAYOUT);

    let asset = asset::get(&env, layout()).await.unwrap();
    let list = asset::list(&env, theme(1)).await.unwrap();

    assert_eq!(asset.value.as_deref(), Some("<html></html>"));
    assert_eq!(list[0].size, 13);
    assert_eq!(gets(&fetch), 4);
}

#[tokio::test]
async fn test_failed_set_keeps_cache() {
    let (shop, fetch, env) = setup();
    asset::get(&env, layout()).await.unwrap();
    *shop.reject_writes.lock().unwrap() = true;

    let error = asset::set(
        &env,
        SetInput {
            asset: layout(),
            source: AssetSource::Value("broken".to_string()),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(error.status(), Some(422));

    asset::get(&env, layout()).await.unwrap();
    assert_eq!(gets(&fetch), 1);
}

#[tokio::test]
async fn test_remove_invalidates_asset() {
    let (_shop, fetch, env) = setup();
    assert!(asset::exists(&env, layout()).await.unwrap());

    asset::remove(&env, layout()).await.unwrap();

    assert!(!asset::exists(&env, layout()).await.unwrap());
    assert!(asset::find(&env, layout()).await.unwrap().is_none());
    assert_eq!(fetch.count(HttpMethod::Delete, "themes/1/assets.json"), 1);
    assert_eq!(gets(&fetch), 2);
}

#[tokio::test]
async fn test_exists_on_demo_theme_is_false() {
    let (_shop, _fetch, env) = setup();

    let exists = asset::exists(&env, AssetKey::new(theme(3), LAYOUT)).await.unwrap();
    let find = asset::find(&env, AssetKey::new(theme(3), LAYOUT)).await;

    assert!(!exists);
    assert_eq!(find.unwrap_err().status(), Some(401));
}

#[tokio::test]
async fn test_modify_writes_changed_contents() {
    let (shop, fetch, env) = setup();

    let input = ModifyInput::new(layout(), |liquid: &str| {
        liquid.replace("{{ content }}", "{{ content_for_layout }}")
    });
    asset::modify(&env, input).await.unwrap();

    assert_eq!(fetch.count(HttpMethod::Put, "themes/1/assets.json"), 1);
    assert_eq!(
        shop.assets.lock().unwrap()[LAYOUT],
        "<html>{{ content_for_layout }}</html>"
    );
    let put = fetch
        .requests()
        .into_iter()
        .find(|r| r.method == HttpMethod::Put)
        .unwrap();
    let body: Value = serde_json::from_str(put.body.as_deref().unwrap()).unwrap();
    assert_eq!(body["asset"]["key"], LAYOUT);
    assert!(body["asset"].get("attachment").is_none());
}

#[tokio::test]
async fn test_modify_skips_unchanged_contents() {
    let (_shop, fetch, env) = setup();

    let meta = asset::modify(&env, ModifyInput::new(layout(), |liquid: &str| liquid.to_string()))
        .await
        .unwrap();

    assert_eq!(meta.key, LAYOUT);
    assert_eq!(fetch.count(HttpMethod::Put, "themes/1/assets.json"), 0);
}

#[tokio::test]
async fn test_uncached_env_fetches_every_time() {
    let shop = Shop::new();
    let fetch = FakeFetch::new(move |request| shop.respond(request));
    let env = ShopifyEnv::builder()
        .config(config())
        .session(session())
        .fetch(fetch.clone())
        .build()
        .unwrap();

    asset::get(&env, layout()).await.unwrap();
    asset::get(&env, layout()).await.unwrap();

    assert_eq!(gets(&fetch), 2);
}
