#![allow(dead_code)]

use std::sync::Arc;

use aquarent_client::{ApiClient, ApiConfig, HttpTokenRefresher, Session};
use aquarent_core::{paths, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use aquarent_store::{KeyValueStore, MemoryStore};

pub struct Harness {
    pub client: Arc<ApiClient>,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    pub async fn access_token(&self) -> Option<String> {
        self.store.get(ACCESS_TOKEN_KEY).await.expect("read access token")
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.store.get(REFRESH_TOKEN_KEY).await.expect("read refresh token")
    }
}

pub async fn harness(base_url: &str) -> Harness {
    build(base_url, &[]).await
}

pub async fn signed_in(base_url: &str, access: &str, refresh: &str) -> Harness {
    build(base_url, &[(ACCESS_TOKEN_KEY, access), (REFRESH_TOKEN_KEY, refresh)]).await
}

async fn build(base_url: &str, seed: &[(&str, &str)]) -> Harness {
    let store = Arc::new(MemoryStore::new());
    store.set_many(seed).await.expect("seed store");

    let config = ApiConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        ..ApiConfig::default()
    };
    let refresher = HttpTokenRefresher::new(reqwest::Client::new(), base_url, paths::REFRESH_TOKEN)
        .expect("refresher");
    let session = Arc::new(Session::new(store.clone(), Arc::new(refresher)));
    session.restore().await.expect("restore session");
    let client = ApiClient::new(&config, session).expect("client");

    Harness {
        client: Arc::new(client),
        store,
    }
}
