//! Shared helpers for the claw-webapp integration tests.

#![allow(dead_code)] // Each suite uses a different subset of helpers
#![allow(unused_imports)]

pub mod assertions;
pub mod client;
pub mod logging;

pub use client::TestClient;
pub use logging::RecordingSink;

use claw_webapp::{AssetSource, MemoryAssets};
use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Arc;

/// The smallest valid distribution.
pub fn hello_assets() -> MemoryAssets {
    MemoryAssets::new().with_file("index.html", "<html>hi</html>")
}

pub fn shared(assets: MemoryAssets) -> Arc<dyn AssetSource> {
    Arc::new(assets)
}

/// Environment lookup backed by a fixed map.
pub fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind probe listener");
    listener
        .local_addr()
        .expect("Failed to read probe address")
        .port()
}
