// src/access_log.rs
// Request access logging middleware

use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::USER_AGENT,
    Error,
};

use crate::logger::{LogLevel, Logger};

/// Logs one debug line per request before it is routed.
pub struct AccessLog {
    logger: Logger,
}

impl AccessLog {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AccessLog
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AccessLogMiddleware<S>;
    type InitError = ();
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AccessLogMiddleware {
            service,
            logger: self.logger.clone(),
        }))
    }
}

pub struct AccessLogMiddleware<S> {
    service: S,
    logger: Logger,
}

impl<S, B> Service<ServiceRequest> for AccessLogMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = S::Future;

    fn poll_ready(
        &self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.logger.is_enabled(LogLevel::Debug) {
            self.logger.debug(&access_line(&req));
        }
        self.service.call(req)
    }
}

/// `METHOD remote - [user agents] - url`
pub fn access_line(req: &ServiceRequest) -> String {
    let remote = req
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "-".to_string());

    let user_agents: Vec<&str> = req
        .headers()
        .get_all(USER_AGENT)
        .filter_map(|value| value.to_str().ok())
        .collect();

    format!(
        "{} {} - [{}] - {}",
        req.method(),
        remote,
        user_agents.join(" "),
        req.uri()
    )
}
