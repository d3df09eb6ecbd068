//! Integration tests for the query service.
//!
//! Tests verify:
//! 1. Out-of-range parameters are rejected before any store access
//! 2. A missing or unpopulated store degrades to marked sample data
//! 3. A populated store is served live and rounded for display
//! 4. Empty filters are live empty lists; absent customers are NotFound

use analytics_core::{
    clock,
    config::AnalyticsConfig,
    engine::BatchEngine,
    error::AnalyticsError,
    model::Transaction,
    outcome::DataSource,
    service::{AnalyticsService, Query, QueryResponse},
    store::AnalyticsStore,
};
use chrono::{Duration, NaiveDate};
use tempfile::TempDir;

fn t() -> NaiveDate {
    NaiveDate::from_ymd_opt(2011, 12, 9).unwrap()
}

fn line(customer: &str, invoice: &str, days_ago: i64, revenue: f64) -> Transaction {
    Transaction {
        customer_id:         customer.to_string(),
        invoice_id:          invoice.to_string(),
        invoice_date:        t() - Duration::days(days_ago),
        country:             "United Kingdom".to_string(),
        product_description: "PARTY BUNTING".to_string(),
        quantity:            1,
        unit_price:          revenue,
        total_revenue:       revenue,
    }
}

/// Three customers: one Loyal, one Hibernating, one Lost.
fn transactions() -> Vec<Transaction> {
    let mut txns = Vec::new();
    for i in 0..10 {
        txns.push(line("A", &format!("A{i}"), 1 + i, 500.0));
    }
    for i in 0..5 {
        txns.push(line("C", &format!("C{i}"), 30 + i, 200.0));
    }
    txns.push(line("B", "B0", 300, 50.0));
    // Three invoices on T with a total of 100 gives an average of 33.333...
    txns.push(line("D", "D0", 0, 40.0));
    txns.push(line("D", "D1", 0, 30.0));
    txns.push(line("D", "D2", 0, 30.0));
    txns
}

fn config_for(dir: &TempDir) -> AnalyticsConfig {
    let mut config = AnalyticsConfig::default_test();
    config.database.path = dir.path().join("analytics.db").to_string_lossy().into_owned();
    config
}

/// Migrate and (optionally) run one batch against a fresh file database.
fn prepare(recompute: bool) -> (TempDir, AnalyticsConfig) {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = config_for(&dir);
    let store = AnalyticsStore::open(&config.database.path).expect("open store");
    store.migrate().expect("migration");
    store.replace_transactions("seed", &transactions()).expect("seed");
    if recompute {
        let mut engine = BatchEngine::build(config.clone(), store);
        engine.run_as("run-1".into(), t()).expect("batch run");
    }
    (dir, config)
}

fn service(config: &AnalyticsConfig) -> AnalyticsService {
    AnalyticsService::new(config).with_today(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: validation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn out_of_range_parameters_are_rejected_not_clamped() {
    // No database at all: validation must fail before the store is touched.
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&config_for(&dir));

    for (query, param) in [
        (Query::DailySales { days: 0 }, "days"),
        (Query::DailySales { days: 366 }, "days"),
        (Query::TopCountries { limit: 101 }, "limit"),
        (Query::ChampionCustomers { limit: 51 }, "limit"),
        (Query::ForecastDaily { days: 91 }, "days"),
        (Query::AtRiskCustomers { limit: -1 }, "limit"),
    ] {
        match svc.execute(&query) {
            Err(AnalyticsError::InvalidInput { param: p, .. }) => assert_eq!(p, param),
            other => panic!("{query:?} should be InvalidInput, got {other:?}"),
        }
    }
    assert!(svc.execute(&Query::ChampionCustomers { limit: 50 }).is_ok());
    assert!(svc.execute(&Query::DailySales { days: 365 }).is_ok());
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: degraded mode
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn missing_database_serves_marked_sample_data() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&config_for(&dir));

    let served = svc.daily_sales(7).unwrap();
    assert_eq!(served.source, DataSource::Sample);
    assert_eq!(served.period.as_deref(), Some("Sample Data"));
    assert_eq!(served.data.len(), 7);
    assert_eq!(served.data.last().unwrap().sale_date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());

    let customer = svc.customer_detail("17850").unwrap();
    assert!(customer.is_sample(), "lookups on an unreadable store fall back too");
    assert_eq!(customer.data.customer_id, "17850");
}

#[test]
fn unpopulated_tables_serve_sample_data() {
    let (_dir, config) = prepare(false);
    let svc = service(&config);

    assert!(svc.sales_summary().unwrap().is_sample());
    assert!(svc.segment_summaries().unwrap().is_sample());
    assert!(svc.forecast_insights().unwrap().is_sample());
    assert!(svc.forecast_daily(10).unwrap().is_sample());
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: live data
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn populated_tables_are_served_live_and_rounded() {
    let (_dir, config) = prepare(true);
    let svc = service(&config);

    let daily = svc.daily_sales(30).unwrap();
    assert_eq!(daily.source, DataSource::Live);
    assert_eq!(daily.period, None);
    assert!(daily.as_of.is_some());
    let last = daily.data.last().unwrap();
    assert_eq!(last.sale_date, t());
    assert_eq!(last.avg_order_value, 33.33, "money is rounded to cents");

    let summary = svc.sales_summary().unwrap();
    assert!(!summary.is_sample());
    assert_eq!(summary.data.total_orders, 19);

    let top = svc.top_customers(2).unwrap();
    assert_eq!(top.data.len(), 2);
    assert!(top.data[0].rfm_score >= top.data[1].rfm_score);
}

#[test]
fn at_risk_filter_matches_lost_and_at_risk() {
    let (_dir, config) = prepare(true);
    let svc = service(&config);

    let at_risk = svc.at_risk_customers(20).unwrap();
    assert!(!at_risk.is_sample());
    assert!(!at_risk.data.is_empty());
    for r in &at_risk.data {
        assert!(r.segment.contains("At Risk") || r.segment.contains("Lost"), "{}", r.segment);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: empty vs not found
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn empty_filter_is_a_live_empty_list() {
    let (_dir, config) = prepare(true);
    let svc = service(&config);

    let champions = svc.champion_customers(10).unwrap();
    let has_champion = svc
        .segment_summaries()
        .unwrap()
        .data
        .iter()
        .any(|s| s.segment.contains("Champion"));
    assert_eq!(champions.source, DataSource::Live, "an empty match is not a fallback");
    assert_eq!(champions.data.is_empty(), !has_champion);
}

#[test]
fn absent_customer_is_not_found() {
    let (_dir, config) = prepare(true);
    let svc = service(&config);

    match svc.customer_detail("NOPE") {
        Err(AnalyticsError::NotFound { customer_id }) => assert_eq!(customer_id, "NOPE"),
        other => panic!("expected NotFound, got {other:?}"),
    }

    let found = svc.customer_detail("A").unwrap();
    assert!(!found.is_sample());
    assert_eq!(found.data.total_orders, 10);
    assert_eq!(found.data.total_spent, 5000.0);
    assert_eq!(found.data.avg_order_value, 500.0);
}

#[test]
fn forecast_queries_without_series_stay_sample_after_batch() {
    let (_dir, config) = prepare(true);
    let svc = service(&config);
    let served = svc.execute(&Query::ForecastSummary).unwrap();
    assert!(served.is_sample());
    assert!(matches!(served.data, QueryResponse::ForecastSummary(_)));
}

#[test]
fn unpinned_service_samples_end_on_local_today() {
    let dir = tempfile::tempdir().unwrap();
    let svc = AnalyticsService::new(&config_for(&dir));
    let before = clock::local_today();
    let served = svc.daily_sales(3).unwrap();
    let last = served.data.last().unwrap().sale_date;
    assert!(
        last == before || last == clock::local_today(),
        "sample series ends on the local date, got {last}"
    );
}

#[test]
fn sample_payloads_match_query_shape() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&config_for(&dir));
    let served = svc.sample(&Query::TopProducts { limit: 3 }).unwrap();
    assert!(served.is_sample());
    match served.data {
        QueryResponse::Products(rows) => assert_eq!(rows.len(), 3),
        other => panic!("unexpected payload {other:?}"),
    }
    assert!(svc.sample(&Query::TopProducts { limit: 0 }).is_err());
}
