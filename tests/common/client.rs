//! HTTP client testing utilities

use std::time::Duration;

use reqwest::{Client, Response};

/// HTTP testing client wrapper
pub struct TestClient {
    pub client: Client,
}

impl TestClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        TestClient { client }
    }

    pub async fn get(&self, url: &str) -> Result<Response, reqwest::Error> {
        self.client.get(url).send().await
    }

    pub async fn head(&self, url: &str) -> Result<Response, reqwest::Error> {
        self.client.head(url).send().await
    }

    pub async fn post_text(&self, url: &str, text: &str) -> Result<Response, reqwest::Error> {
        self.client
            .post(url)
            .header("Content-Type", "text/plain")
            .body(text.to_string())
            .send()
            .await
    }
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}
