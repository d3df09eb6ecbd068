//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::time::Duration;

use analytics_core::{
    config::AnalyticsConfig, engine::BatchEngine, model::Transaction, service::AnalyticsService,
    store::AnalyticsStore,
};
use analytics_server::{app, state::AppState};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

fn t() -> NaiveDate {
    NaiveDate::from_ymd_opt(2011, 12, 9).unwrap()
}

fn line(customer: &str, invoice: &str, revenue: f64) -> Transaction {
    Transaction {
        customer_id:         customer.to_string(),
        invoice_id:          invoice.to_string(),
        invoice_date:        t(),
        country:             "EIRE".to_string(),
        product_description: "HEART OF WICKER SMALL".to_string(),
        quantity:            1,
        unit_price:          revenue,
        total_revenue:       revenue,
    }
}

fn router(populate: bool) -> (TempDir, Router) {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut config = AnalyticsConfig::default_test();
    config.database.path = dir.path().join("api.db").to_string_lossy().into_owned();

    if populate {
        let store = AnalyticsStore::open(&config.database.path).expect("open store");
        store.migrate().expect("migration");
        store
            .replace_transactions("seed", &[line("12346", "1", 10.0), line("12347", "2", 20.0)])
            .expect("seed");
        BatchEngine::build(config.clone(), store)
            .run_as("run-api".into(), t())
            .expect("batch run");
    }

    let service = AnalyticsService::new(&config).with_today(t());
    let state = AppState::with_service(service, Duration::from_secs(5));
    (dir, app(state))
}

async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_and_root_respond() {
    let (_dir, app) = router(false);
    let (status, body) = get(app.clone(), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = get(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "operational");
}

#[tokio::test]
async fn invalid_parameters_are_400() {
    let (_dir, app) = router(false);
    let (status, body) = get(app.clone(), "/api/sales/daily?days=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("days"));

    let (status, _) = get(app, "/api/customers/rfm/champions?limit=51").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_store_serves_sample_envelope() {
    let (_dir, app) = router(false);
    let (status, body) = get(app, "/api/sales/countries?limit=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "sample");
    assert_eq!(body["period"], "Sample Data");
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn populated_store_serves_live_rows() {
    let (_dir, app) = router(true);
    let (status, body) = get(app.clone(), "/api/sales/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "live");
    assert_eq!(body["data"]["total_orders"], 2);
    assert_eq!(body["data"]["total_revenue"], 30.0);

    let (status, body) = get(app.clone(), "/api/customers/rfm/12347").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["customer_id"], "12347");

    let (status, body) = get(app, "/api/customers/rfm/99999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("99999"));
}
