use axum::{routing::get, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::AppState;

pub mod customers;
pub mod forecast;
pub mod sales;

#[derive(Debug, Default, Deserialize)]
pub struct DaysParams {
    pub days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .nest("/api/sales", sales::router())
        .nest("/api/customers", customers::router())
        .nest("/api/forecast", forecast::router())
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message":   "Customer Analytics API",
        "version":   env!("CARGO_PKG_VERSION"),
        "status":    "operational",
        "timestamp": chrono::Local::now().to_rfc3339(),
        "endpoints": {
            "health":    "/api/health",
            "sales":     "/api/sales",
            "customers": "/api/customers",
            "forecast":  "/api/forecast",
        },
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status":    "healthy",
        "timestamp": chrono::Local::now().to_rfc3339(),
    }))
}
