use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpResponse, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, TextEncoder,
};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Requests by route and outcome; rejected sessions show up as `auth_rejected`.
static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "delivery_http_requests_total",
            "HTTP requests by route and outcome",
        ),
        &["route", "outcome"],
    )
    .expect("failed to create delivery_http_requests_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register delivery_http_requests_total");
    counter
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "delivery_http_request_duration_seconds",
            "HTTP request latency by route",
        )
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["route"],
    )
    .expect("failed to create delivery_http_request_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register delivery_http_request_duration_seconds");
    histogram
});

static PUSH_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "delivery_push_total",
            "Live push attempts by destination and outcome",
        ),
        &["destination", "outcome"],
    )
    .expect("failed to create delivery_push_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register delivery_push_total");
    counter
});

static REMINDERS_PROCESSED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "reminders_processed_total",
            "Due reminders handled by the reminder engine",
        ),
        &["outcome"],
    )
    .expect("failed to create reminders_processed_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register reminders_processed_total");
    counter
});

static SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new("sessions_active", "Live sessions held in memory")
        .expect("failed to create sessions_active");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register sessions_active");
    gauge
});

static LIVE_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new("live_connections", "Registered live push channels")
        .expect("failed to create live_connections");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register live_connections");
    gauge
});

/// Collapse a status code into the outcomes this service distinguishes.
pub fn request_outcome(status: u16) -> &'static str {
    match status {
        401 => "auth_rejected",
        400 | 422 => "invalid",
        403 | 404 => "denied_or_missing",
        s if s >= 500 => "server_error",
        s if s >= 400 => "client_error",
        _ => "ok",
    }
}

pub fn observe_http_request(route: &str, status: u16, elapsed: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[route, request_outcome(status)])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[route])
        .observe(elapsed.as_secs_f64());
}

pub fn record_push(destination: &str, delivered: bool) {
    let outcome = if delivered { "delivered" } else { "no_channel" };
    PUSH_TOTAL.with_label_values(&[destination, outcome]).inc();
}

pub fn record_reminder(sent: bool) {
    let outcome = if sent { "sent" } else { "failed" };
    REMINDERS_PROCESSED_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn set_sessions_active(count: usize) {
    SESSIONS_ACTIVE.set(count as i64);
}

pub fn set_live_connections(count: usize) {
    LIVE_CONNECTIONS.set(count as i64);
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

/// Counts every request against its route pattern.
pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        // Pattern, not path: conversation and notification ids stay out of labels.
        let route = format!(
            "{} {}",
            req.method(),
            req.match_pattern().as_deref().unwrap_or("unmatched")
        );
        let start = Instant::now();

        Box::pin(async move {
            let result = service.call(req).await;
            let status = match &result {
                Ok(response) => response.status().as_u16(),
                Err(e) => e.as_response_error().status_code().as_u16(),
            };
            observe_http_request(&route, status, start.elapsed());
            result
        })
    }
}
