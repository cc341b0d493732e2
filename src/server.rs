// src/server.rs
// Request pipeline: routing, middleware chain and listener lifecycle

use actix_web::{
    body::MessageBody,
    dev::{ServerHandle, ServiceFactory, ServiceRequest, ServiceResponse},
    http::header,
    web, App, Error, HttpResponse, HttpServer,
};
use std::fmt;
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::access_log::AccessLog;
use crate::assets::{AssetSource, INDEX_FILE};
use crate::config::{ResourceConfig, ResourceName};
use crate::cookies::IdentityCookies;
use crate::error::{ConfigurationError, StartError};
use crate::files::serve_asset;
use crate::logger::Logger;

pub const DEFAULT_WORKERS: usize = 2;

/// Observable state of the listener, published on a watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    Unstarted,
    Listening(SocketAddr),
    /// The accept loop ended after `close` or an orderly stop.
    Stopped,
    /// The accept loop ended with an error after a successful start.
    Failed(String),
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Unstarted => write!(f, "unstarted"),
            ServerStatus::Listening(addr) => write!(f, "listening on {}", addr),
            ServerStatus::Stopped => write!(f, "stopped"),
            ServerStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

enum ServerState {
    Unstarted,
    Listening {
        addr: SocketAddr,
        handle: ServerHandle,
        task: JoinHandle<()>,
    },
    Closed,
}

/// Everything a worker needs to build the handler chain.
struct Routes<C> {
    config: Arc<C>,
    assets: Arc<dyn AssetSource>,
    cookies: IdentityCookies,
    access_log: Logger,
}

impl<C> Clone for Routes<C> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            assets: Arc::clone(&self.assets),
            cookies: self.cookies.clone(),
            access_log: self.access_log.clone(),
        }
    }
}

impl<C: ResourceConfig> Routes<C> {
    fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody>,
            Error = Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(web::Data::from(Arc::clone(&self.config)))
            .app_data(web::Data::from(Arc::clone(&self.assets)))
            .app_data(web::Data::new(self.access_log.clone()))
            .wrap(AccessLog::new(self.access_log.clone()))
            .wrap(self.cookies.clone())
            .service(web::resource("/config.json").to(config_json::<C>))
            .default_service(web::to(serve_asset))
    }
}

/// Serves the configuration record as JSON.
async fn config_json<C: ResourceConfig>(
    config: web::Data<C>,
    logger: web::Data<Logger>,
) -> HttpResponse {
    match serde_json::to_vec(config.get_ref()) {
        Ok(body) => HttpResponse::Ok()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
            .body(body),
        Err(err) => {
            logger.error(&format!("error marshalling config: {}", err));
            HttpResponse::InternalServerError()
                .content_type(mime::TEXT_PLAIN_UTF_8)
                .body(format!("Internal Server Error: Config File Invalid {}", err))
        }
    }
}

/// The composed request pipeline and its listener.
///
/// Construction validates the asset source but binds nothing. [`WebServer::start`]
/// binds synchronously and runs the accept loop on a spawned task;
/// [`WebServer::close`] stops it without draining in-flight requests.
pub struct WebServer<C> {
    routes: Routes<C>,
    logger: Logger,
    workers: usize,
    state: Mutex<ServerState>,
    status: Arc<watch::Sender<ServerStatus>>,
}

impl<C: ResourceConfig> WebServer<C> {
    pub fn new<A: AssetSource>(
        config: C,
        assets: A,
        logger: Logger,
        cookies: IdentityCookies,
    ) -> Result<Self, ConfigurationError> {
        let assets: Arc<dyn AssetSource> = Arc::new(assets);
        Self::from_shared(Arc::new(config), assets, logger, cookies)
    }

    pub fn from_shared(
        config: Arc<C>,
        assets: Arc<dyn AssetSource>,
        logger: Logger,
        cookies: IdentityCookies,
    ) -> Result<Self, ConfigurationError> {
        assets
            .open(INDEX_FILE)
            .map_err(ConfigurationError::MissingEntryPoint)?;

        logger.debug(&format!("serving {} assets", assets.list().len()));

        let access_log = logger.sublogger("accessLog");
        let (status, _) = watch::channel(ServerStatus::Unstarted);

        Ok(Self {
            routes: Routes {
                config,
                assets,
                cookies,
                access_log,
            },
            logger,
            workers: DEFAULT_WORKERS,
            state: Mutex::new(ServerState::Unstarted),
            status: Arc::new(status),
        })
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// The fully composed handler chain.
    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody>,
            Error = Error,
            InitError = (),
        >,
    > {
        self.routes.app()
    }

    pub fn name(&self) -> ResourceName {
        self.routes.config.resource_name()
    }

    pub fn config(&self) -> &C {
        &self.routes.config
    }

    pub fn cookies(&self) -> &IdentityCookies {
        &self.routes.cookies
    }

    /// Subscribes to listener status changes, including asynchronous failures.
    pub fn status(&self) -> watch::Receiver<ServerStatus> {
        self.status.subscribe()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        match *self.lock_state() {
            ServerState::Listening { addr, .. } => Some(addr),
            _ => None,
        }
    }

    /// Binds `0.0.0.0:<port>` and spawns the accept loop.
    ///
    /// Must be called from within a Tokio runtime. Returns the bound address.
    pub fn start(&self, port: u16) -> Result<SocketAddr, StartError> {
        let mut state = self.lock_state();
        match *state {
            ServerState::Unstarted => {}
            ServerState::Listening { addr, .. } => return Err(StartError::AlreadyStarted(addr)),
            ServerState::Closed => return Err(StartError::Closed),
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        self.logger.info(&format!("going to listen on {}", addr));

        let listener = TcpListener::bind(addr).map_err(|source| StartError::Bind { addr, source })?;
        let bound = listener
            .local_addr()
            .map_err(|source| StartError::Bind { addr, source })?;

        let routes = self.routes.clone();
        let server = HttpServer::new(move || routes.app())
            .workers(self.workers)
            .disable_signals()
            .shutdown_timeout(0)
            .listen(listener)
            .map_err(|source| StartError::Bind { addr, source })?
            .run();
        let handle = server.handle();

        self.status.send_replace(ServerStatus::Listening(bound));

        let status = Arc::clone(&self.status);
        let logger = self.logger.clone();
        let task = tokio::spawn(async move {
            match server.await {
                Ok(()) => {
                    logger.debug("accept loop finished");
                    status.send_replace(ServerStatus::Stopped);
                }
                Err(err) => {
                    logger.error(&format!("error serving HTTP: {}", err));
                    status.send_replace(ServerStatus::Failed(err.to_string()));
                }
            }
        });

        *state = ServerState::Listening {
            addr: bound,
            handle,
            task,
        };

        Ok(bound)
    }

    /// Hard-stops the listener and every open connection.
    ///
    /// Idempotent. Closing a server that was never started still moves it to
    /// the closed state, so a later `start` fails.
    pub async fn close(&self) {
        let previous = std::mem::replace(&mut *self.lock_state(), ServerState::Closed);

        match previous {
            ServerState::Listening { addr, handle, task } => {
                self.logger.info(&format!("closing web server on {}", addr));
                handle.stop(false).await;
                if let Err(err) = task.await {
                    self.logger.error(&format!("accept loop task failed: {}", err));
                }
            }
            ServerState::Unstarted => {
                self.status.send_replace(ServerStatus::Stopped);
            }
            ServerState::Closed => {}
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<C: fmt::Debug> fmt::Debug for WebServer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebServer")
            .field("config", &self.routes.config)
            .field("workers", &self.workers)
            .field("status", &*self.status.borrow())
            .finish()
    }
}

impl<C> Drop for WebServer<C> {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let ServerState::Listening { handle, .. } = state {
            // The stop command is sent eagerly; completion is not awaited here.
            drop(handle.stop(false));
        }
    }
}
