//! Embedded web server for the claw game frontend.
//!
//! Serves a static web app distribution, publishes the service configuration
//! on `/config.json` and stamps robot identity cookies on every response so
//! the browser can reach the machine without extra configuration.

pub mod access_log;
pub mod assets;
pub mod config;
pub mod cookies;
pub mod error;
pub mod files;
pub mod logger;
pub mod module;
pub mod network;
pub mod server;
pub mod shutdown;

pub use assets::{dist_assets, AssetSource, DirAssets, EmbeddedAssets, MemoryAssets};
pub use config::{ResourceConfig, ResourceName, ServiceConfig};
pub use cookies::{default_bindings, CookieBinding, IdentityCookies};
pub use error::{AssetError, ConfigurationError, ModuleError, StartError};
pub use logger::Logger;
pub use module::WebModule;
pub use server::{ServerStatus, WebServer};
