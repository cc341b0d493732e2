// src/error.rs
// Error types for the web app service

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("asset access denied: {0}")]
    Forbidden(String),

    #[error("failed to read asset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl AssetError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AssetError::NotFound(_))
    }
}

/// Construction of the request pipeline failed; no pipeline exists.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error(
        "asset source doesn't have an index.html, it probably needs to be re-rooted on the actual distribution directory: {0}"
    )]
    MissingEntryPoint(#[source] AssetError),
}

/// Binding the listener failed, or the server is not in a startable state.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("web server is already listening on {0}")]
    AlreadyStarted(SocketAddr),

    #[error("web server has been closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Start(#[from] StartError),
}
