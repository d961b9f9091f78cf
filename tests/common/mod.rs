//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use shopify_runtime::clients::{Fetch, FetchRequest, HttpError, HttpMethod, HttpResponse};
use shopify_runtime::{ApiKey, ApiSecretKey, Session, ShopDomain, ShopifyConfig, ShopifyEnv};

type Responder = dyn Fn(&FetchRequest) -> (u16, Value) + Send + Sync;

/// A [`Fetch`] answering from a closure and recording every request.
pub struct FakeFetch {
    respond: Box<Responder>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl FakeFetch {
    pub fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&FetchRequest) -> (u16, Value) + Send + Sync + 'static,
    {
        Arc::new(Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Counts requests with `method` whose API path starts with `path`.
    pub fn count(&self, method: HttpMethod, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && api_path(&r.url).starts_with(path))
            .count()
    }
}

#[async_trait]
impl Fetch for FakeFetch {
    async fn fetch(&self, request: FetchRequest) -> Result<HttpResponse, HttpError> {
        let (code, body) = (self.respond)(&request);
        self.requests.lock().unwrap().push(request);
        Ok(HttpResponse::new(code, HashMap::new(), body))
    }
}

/// Returns the part of an Admin API URL after `/admin/api/{version}/`.
pub fn api_path(url: &str) -> &str {
    url.split_once("/admin/api/")
        .and_then(|(_, rest)| rest.split_once('/'))
        .map_or(url, |(_, path)| path)
}

pub fn config() -> ShopifyConfig {
    ShopifyConfig::builder()
        .api_key(ApiKey::new("test-key").unwrap())
        .api_secret_key(ApiSecretKey::new("test-secret").unwrap())
        .build()
        .unwrap()
}

pub fn shop() -> ShopDomain {
    ShopDomain::new("test-shop.myshopify.com").unwrap()
}

pub fn session() -> Session {
    Session::new(shop(), "shpat_token")
}

/// A cached environment over `fetch`.
pub fn env(fetch: Arc<FakeFetch>) -> ShopifyEnv {
    ShopifyEnv::builder()
        .config(config())
        .session(session())
        .fetch(fetch)
        .with_cache()
        .build()
        .unwrap()
}

pub fn theme_json(id: u64, role: &str) -> Value {
    json!({
        "id": id,
        "admin_graphql_api_id": format!("gid://shopify/OnlineStoreTheme/{id}"),
        "name": format!("Theme {id}"),
        "role": role,
        "previewable": true,
        "processing": false,
        "theme_store_id": null,
        "created_at": "2024-01-02T09:28:43-05:00",
        "updated_at": "2024-01-02T09:28:43-05:00"
    })
}

pub fn asset_json(theme_id: u64, key: &str, value: &str) -> Value {
    json!({
        "key": key,
        "public_url": null,
        "value": value,
        "created_at": "2024-01-02T09:28:43-05:00",
        "updated_at": "2024-01-02T09:28:43-05:00",
        "content_type": "text/x-liquid",
        "size": value.len(),
        "checksum": null,
        "theme_id": theme_id
    })
}
