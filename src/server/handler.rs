// src/server/handler.rs
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;
use tracing::{debug, error, Instrument};
use uuid::Uuid;

use crate::health::{ErrorReport, HealthCheck, HealthReport};

pub const HEALTH_PATH: &str = "/health";
pub const METRICS_PATH: &str = "/metrics";

/// Routes health and metrics requests to a [`HealthCheck`].
#[derive(Clone)]
pub struct HealthHandler {
    health: Arc<HealthCheck>,
    health_path: Arc<str>,
    metrics_path: Arc<str>,
}

impl HealthHandler {
    pub fn new(health: Arc<HealthCheck>) -> Self {
        Self {
            health,
            health_path: Arc::from(HEALTH_PATH),
            metrics_path: Arc::from(METRICS_PATH),
        }
    }

    pub fn with_paths(mut self, health_path: &str, metrics_path: &str) -> Self {
        self.health_path = Arc::from(health_path);
        self.metrics_path = Arc::from(metrics_path);
        self
    }

    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let path = req.uri().path();

        if path != &*self.health_path && path != &*self.metrics_path {
            return plain(StatusCode::NOT_FOUND, "Not Found");
        }

        if req.method() != Method::GET && req.method() != Method::HEAD {
            let mut response = plain(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
            return response;
        }

        if path == &*self.health_path {
            self.health_response(wants_body(&req)).await
        } else {
            self.metrics_response()
        }
    }

    async fn health_response(&self, with_body: bool) -> Response<Body> {
        let result = self.health.status().await;
        let status = StatusCode::from_u16(result.http_status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        debug!("Health status {:?} -> {}", result.status, status);

        if !with_body {
            return json(status, Body::empty());
        }

        let report = HealthReport::new(&result, self.health.policy());
        match serde_json::to_vec(&report) {
            Ok(bytes) => json(status, Body::from(bytes)),
            Err(e) => {
                error!("Failed to encode health report: {}", e);
                let body = serde_json::to_vec(&ErrorReport::new(&e)).unwrap_or_default();
                json(StatusCode::INTERNAL_SERVER_ERROR, Body::from(body))
            }
        }
    }

    fn metrics_response(&self) -> Response<Body> {
        let Some(sink) = self.health.metrics() else {
            return plain(StatusCode::NOT_IMPLEMENTED, "Not Implemented");
        };

        match sink.gather() {
            Ok(bytes) => {
                let mut response = Response::new(Body::from(bytes));
                let content_type = HeaderValue::from_str(sink.content_type())
                    .unwrap_or_else(|_| HeaderValue::from_static("text/plain"));
                response.headers_mut().insert(CONTENT_TYPE, content_type);
                response
            }
            Err(e) => {
                error!("Failed to gather metrics: {}", e);
                plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

fn wants_body(req: &Request<Body>) -> bool {
    req.uri()
        .query()
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .any(|(key, value)| key == "body" && value == "true")
        })
        .unwrap_or(false)
}

fn json(status: StatusCode, body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn plain(status: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response
}

impl Service<Request<Body>> for HealthHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        let span = tracing::info_span!(
            "request",
            request_id = %Uuid::new_v4(),
            method = %req.method(),
            path = %req.uri().path(),
        );

        Box::pin(async move { Ok(handler.handle(req).await) }.instrument(span))
    }
}
