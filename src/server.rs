//! HTTP endpoint exposing the gauge registry for scraping

use crate::errors::{MonitorError, Result};
use crate::metrics::GatewayMetrics;

use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};
use serde::Serialize;
use std::net::SocketAddr;
use tracing::{debug, error, info};

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[get("/health")]
async fn health_check() -> impl Responder {
    web::Json(HealthResponse {
        status: "OK".into(),
    })
}

// Current snapshot of every series in the text exposition format
#[get("/metrics")]
async fn scrape(metrics: web::Data<GatewayMetrics>) -> impl Responder {
    debug!("Metrics scrape requested");

    match metrics.encode_text() {
        Ok(body) => HttpResponse::Ok()
            .content_type(metrics.content_type())
            .body(body),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            HttpResponse::InternalServerError().body(e.to_string())
        }
    }
}

/// Register the scrape and health routes
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(scrape).service(health_check);
}

/// Serve `/metrics` and `/health` until the server is stopped
pub async fn serve(addr: SocketAddr, metrics: GatewayMetrics) -> Result<()> {
    let data = web::Data::new(metrics);

    info!("Serving metrics on http://{}/metrics", addr);

    HttpServer::new(move || App::new().app_data(data.clone()).configure(routes))
        .bind(addr)
        .map_err(|e| MonitorError::Server(format!("failed to bind {}: {}", addr, e)))?
        .run()
        .await
        .map_err(|e| MonitorError::Server(e.to_string()))
}
