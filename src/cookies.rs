// src/cookies.rs
// Identity cookies stamped on every response

use actix_web::{
    body::{BoxBody, MessageBody},
    cookie::Cookie,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    error::InternalError,
    http::header::{HeaderMap, HeaderValue, SET_COOKIE},
    Error,
};
use futures_util::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::logger::Logger;

/// Maps an environment variable onto the cookie that carries its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieBinding {
    pub env: String,
    pub cookie: String,
}

impl CookieBinding {
    pub fn new(env: &str, cookie: &str) -> Self {
        Self {
            env: env.to_string(),
            cookie: cookie.to_string(),
        }
    }
}

pub const MACHINE_PART_ID_ENV_VAR: &str = "MACHINE_PART_ID";
pub const MACHINE_FQDN_ENV_VAR: &str = "MACHINE_FQDN";
pub const API_KEY_ID_ENV_VAR: &str = "API_KEY_ID";
pub const API_KEY_ENV_VAR: &str = "API_KEY";

/// The machine part id, host, api key id and api key bindings, in that order.
pub fn default_bindings() -> Vec<CookieBinding> {
    vec![
        CookieBinding::new(MACHINE_PART_ID_ENV_VAR, "part-id"),
        CookieBinding::new(MACHINE_FQDN_ENV_VAR, "host"),
        CookieBinding::new(API_KEY_ID_ENV_VAR, "api-key-id"),
        CookieBinding::new(API_KEY_ENV_VAR, "api-key"),
    ]
}

/// Cookie set resolved once at construction and re-sent on every response.
#[derive(Clone)]
pub struct IdentityCookies {
    cookies: Arc<[(String, String)]>,
    headers: Arc<[HeaderValue]>,
}

impl IdentityCookies {
    /// Resolves every binding through `lookup`.
    ///
    /// A missing or empty value is logged and becomes an empty cookie; one cookie
    /// is produced per binding no matter what.
    pub fn resolve<F>(bindings: &[CookieBinding], lookup: F, logger: &Logger) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cookies = Vec::with_capacity(bindings.len());
        let mut headers = Vec::with_capacity(bindings.len());

        for binding in bindings {
            let value = lookup(&binding.env).unwrap_or_default();
            if value.is_empty() {
                logger.warn(&format!(
                    "no value for env: {} cookie: {}",
                    binding.env, binding.cookie
                ));
            }

            let encoded = Cookie::new(binding.cookie.as_str(), value.as_str())
                .encoded()
                .to_string();
            let header = HeaderValue::from_str(&encoded).unwrap_or_else(|_| {
                logger.warn(&format!(
                    "cookie {} cannot be sent as a header, sending it empty",
                    binding.cookie
                ));
                HeaderValue::from_str(&format!("{}=", binding.cookie))
                    .unwrap_or_else(|_| HeaderValue::from_static(""))
            });

            cookies.push((binding.cookie.clone(), value));
            headers.push(header);
        }

        Self {
            cookies: cookies.into(),
            headers: headers.into(),
        }
    }

    /// Resolves the bindings from the process environment.
    pub fn from_env(bindings: &[CookieBinding], logger: &Logger) -> Self {
        Self::resolve(bindings, |name| std::env::var(name).ok(), logger)
    }

    /// `(cookie name, value)` pairs in binding order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.cookies
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityCookies
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = IdentityCookiesMiddleware<S>;
    type InitError = ();
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(IdentityCookiesMiddleware {
            service,
            headers: Arc::clone(&self.headers),
        }))
    }
}

pub struct IdentityCookiesMiddleware<S> {
    service: S,
    headers: Arc<[HeaderValue]>,
}

impl<S, B> Service<ServiceRequest> for IdentityCookiesMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // The router needs sole ownership of the request, so nothing here may
        // keep a handle to it while the inner service runs.
        let headers = Arc::clone(&self.headers);
        let fut = self.service.call(req);

        Box::pin(async move {
            match fut.await {
                Ok(res) => {
                    let mut res = res.map_into_boxed_body();
                    append_cookies(res.headers_mut(), &headers);
                    Ok(res)
                }
                Err(err) => {
                    // Rendered here so error responses carry the cookies too.
                    let mut response = err.error_response();
                    append_cookies(response.headers_mut(), &headers);
                    Err(InternalError::from_response(err, response).into())
                }
            }
        })
    }
}

fn append_cookies(map: &mut HeaderMap, headers: &[HeaderValue]) {
    for value in headers {
        map.append(SET_COOKIE, value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{LogLevel, LogRecord, LogSink};
    use actix_web::{test as actix_test, web, App, HttpResponse};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Warnings(Mutex<Vec<String>>);

    impl LogSink for Warnings {
        fn write(&self, record: &LogRecord<'_>) {
            if record.level == LogLevel::Warn {
                self.0.lock().unwrap().push(record.message.to_string());
            }
        }
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_bindings_order() {
        let cookies: Vec<String> = default_bindings().into_iter().map(|b| b.cookie).collect();
        assert_eq!(cookies, vec!["part-id", "host", "api-key-id", "api-key"]);
    }

    #[test]
    fn test_resolve_all_present() {
        let sink = Arc::new(Warnings::default());
        let logger = Logger::new().with_sink(sink.clone());
        let lookup = lookup_from(&[
            ("MACHINE_PART_ID", "part-123"),
            ("MACHINE_FQDN", "claw.local"),
            ("API_KEY_ID", "key-id"),
            ("API_KEY", "key"),
        ]);

        let cookies = IdentityCookies::resolve(&default_bindings(), lookup, &logger);

        assert_eq!(cookies.len(), 4);
        assert_eq!(cookies.pairs()[0], ("part-id".to_string(), "part-123".to_string()));
        assert_eq!(cookies.pairs()[1], ("host".to_string(), "claw.local".to_string()));
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_resolve_missing_values_warn_and_stay_empty() {
        let sink = Arc::new(Warnings::default());
        let logger = Logger::new().with_sink(sink.clone());
        let lookup = lookup_from(&[("API_KEY", "secret123"), ("API_KEY_ID", "")]);

        let cookies = IdentityCookies::resolve(&default_bindings(), lookup, &logger);

        assert_eq!(cookies.len(), 4);
        assert_eq!(cookies.pairs()[0].1, "");
        assert_eq!(cookies.pairs()[2].1, "");
        assert_eq!(cookies.pairs()[3].1, "secret123");

        let warnings = sink.0.lock().unwrap();
        assert_eq!(warnings.len(), 3);
        assert!(warnings
            .iter()
            .any(|w| w == "no value for env: MACHINE_FQDN cookie: host"));
        assert!(warnings
            .iter()
            .any(|w| w == "no value for env: API_KEY_ID cookie: api-key-id"));
    }

    #[test]
    fn test_resolve_custom_bindings() {
        let bindings = vec![CookieBinding::new("ROBOT_NAME", "robot")];
        let cookies =
            IdentityCookies::resolve(&bindings, lookup_from(&[("ROBOT_NAME", "claw")]), &Logger::new());
        assert_eq!(cookies.pairs(), &[("robot".to_string(), "claw".to_string())]);
    }

    #[actix_web::test]
    async fn test_middleware_passes_through_routed_requests() {
        let cookies = IdentityCookies::resolve(
            &default_bindings(),
            lookup_from(&[("MACHINE_PART_ID", "part-7")]),
            &Logger::new(),
        );
        let app = actix_test::init_service(App::new().wrap(cookies).route(
            "/robots/{id}",
            web::get().to(|id: web::Path<String>| async move {
                HttpResponse::Ok().body(id.into_inner())
            }),
        ))
        .await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/robots/claw-1").to_request(),
        )
        .await;
        assert_eq!(res.status(), actix_web::http::StatusCode::OK);
        assert_eq!(res.headers().get_all(SET_COOKIE).count(), 4);
        let body = actix_test::read_body(res).await;
        assert_eq!(body.as_ref(), b"claw-1");
    }

    #[actix_web::test]
    async fn test_middleware_sets_cookies_on_handler_errors() {
        let cookies = IdentityCookies::resolve(
            &default_bindings(),
            lookup_from(&[("API_KEY", "secret123")]),
            &Logger::new(),
        );
        let app = actix_test::init_service(App::new().wrap(cookies).route(
            "/fail",
            web::get().to(|| async {
                Err::<HttpResponse, Error>(actix_web::error::ErrorBadRequest("bad claw"))
            }),
        ))
        .await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/fail").to_request(),
        )
        .await;
        assert_eq!(res.status(), actix_web::http::StatusCode::BAD_REQUEST);
        let set_cookies: Vec<&str> = res
            .headers()
            .get_all(SET_COOKIE)
            .map(|v| v.to_str().unwrap())
            .collect();
        assert!(set_cookies.contains(&"api-key=secret123"));
    }

    #[actix_web::test]
    async fn test_middleware_sets_cookies_on_every_response() {
        let cookies = IdentityCookies::resolve(
            &default_bindings(),
            lookup_from(&[("API_KEY", "secret123")]),
            &Logger::new(),
        );
        let app = actix_test::init_service(
            App::new()
                .wrap(cookies)
                .route("/ok", web::get().to(|| async { HttpResponse::Ok().finish() }))
                .default_service(web::to(|| async { HttpResponse::NotFound().finish() })),
        )
        .await;

        for uri in ["/ok", "/missing"] {
            let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri(uri).to_request()).await;
            let set_cookies: Vec<&str> = res
                .headers()
                .get_all(SET_COOKIE)
                .map(|v| v.to_str().unwrap())
                .collect();
            assert_eq!(
                set_cookies,
                vec!["part-id=", "host=", "api-key-id=", "api-key=secret123"],
                "cookies missing on {}",
                uri
            );
        }
    }
}
