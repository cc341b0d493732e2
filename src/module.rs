// src/module.rs
// Service wrapper adapting the web server to the host resource lifecycle

use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;

use crate::assets::AssetSource;
use crate::config::{ResourceConfig, ResourceName, ServiceConfig};
use crate::cookies::{CookieBinding, IdentityCookies};
use crate::error::{ModuleError, StartError};
use crate::logger::Logger;
use crate::server::{ServerStatus, WebServer};

#[derive(Debug)]
pub struct WebModule {
    name: ResourceName,
    server: WebServer<ServiceConfig>,
}

impl WebModule {
    /// Builds the pipeline with identity cookies read from the process environment.
    pub fn new(
        config: ServiceConfig,
        assets: Arc<dyn AssetSource>,
        logger: Logger,
        bindings: &[CookieBinding],
    ) -> Result<Self, ModuleError> {
        let cookies = IdentityCookies::from_env(bindings, &logger.sublogger("accessLog"));
        Self::with_cookies(config, assets, logger, cookies)
    }

    pub fn with_cookies(
        config: ServiceConfig,
        assets: Arc<dyn AssetSource>,
        logger: Logger,
        cookies: IdentityCookies,
    ) -> Result<Self, ModuleError> {
        let name = config.resource_name();
        let server = WebServer::from_shared(Arc::new(config), assets, logger, cookies)?;
        Ok(Self { name, server })
    }

    pub fn new_and_start(
        config: ServiceConfig,
        assets: Arc<dyn AssetSource>,
        logger: Logger,
        bindings: &[CookieBinding],
        port: u16,
    ) -> Result<Self, ModuleError> {
        let module = Self::new(config, assets, logger, bindings)?;
        module.start(port)?;
        Ok(module)
    }

    pub fn start(&self, port: u16) -> Result<SocketAddr, StartError> {
        self.server.start(port)
    }

    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    pub fn config(&self) -> &ServiceConfig {
        self.server.config()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }

    pub fn status(&self) -> watch::Receiver<ServerStatus> {
        self.server.status()
    }

    pub fn server(&self) -> &WebServer<ServiceConfig> {
        &self.server
    }

    pub async fn close(&self) {
        self.server.close().await;
    }

    /// Generic command passthrough. The web app accepts no commands.
    pub async fn do_command(&self, _cmd: Map<String, Value>) -> Result<Map<String, Value>, ModuleError> {
        Ok(Map::new())
    }
}
