//! Integration tests for the RFM engine.
//!
//! Tests verify:
//! 1. The three-customer example lands in the expected segment tiers
//! 2. Every customer with a transaction gets a record, recency >= 0
//! 3. Quintile buckets are balanced for any population of N >= 5
//! 4. Repeated runs over identical input are byte-identical
//! 5. Segment customer percentages sum to 100

use analytics_core::{
    model::Transaction,
    rfm_engine::{customer_metrics, quintile_scores, score_customers, summarize_segments},
};
use chrono::{Duration, NaiveDate};

fn analysis_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2011, 12, 10).unwrap()
}

fn line(customer: &str, invoice: &str, days_ago: i64, revenue: f64) -> Transaction {
    Transaction {
        customer_id:         customer.to_string(),
        invoice_id:          invoice.to_string(),
        invoice_date:        analysis_date() - Duration::days(days_ago),
        country:             "United Kingdom".to_string(),
        product_description: "REGENCY CAKESTAND 3 TIER".to_string(),
        quantity:            1,
        unit_price:          revenue,
        total_revenue:       revenue,
    }
}

/// `invoices` invoices for one customer, the latest `recency` days ago,
/// summing to `monetary`.
fn customer(id: &str, recency: i64, invoices: usize, monetary: f64) -> Vec<Transaction> {
    (0..invoices)
        .map(|i| line(id, &format!("{id}-{i}"), recency + i as i64, monetary / invoices as f64))
        .collect()
}

/// N customers with strictly increasing activity.
fn population(n: usize) -> Vec<Transaction> {
    (0..n)
        .flat_map(|i| customer(&format!("C{i:04}"), 400 - i as i64, 1 + i % 7, 10.0 * (i + 1) as f64))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: worked example
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn three_customer_example_lands_in_expected_tiers() {
    let mut txns = customer("A", 1, 10, 5000.0);
    txns.extend(customer("B", 300, 1, 50.0));
    txns.extend(customer("C", 30, 5, 1000.0));

    let records = score_customers(&txns, analysis_date());
    assert_eq!(records.len(), 3);

    let a = records.iter().find(|r| r.customer_id == "A").unwrap();
    let b = records.iter().find(|r| r.customer_id == "B").unwrap();
    let c = records.iter().find(|r| r.customer_id == "C").unwrap();

    assert_eq!((a.recency_days, a.frequency), (1, 10));
    assert!((a.monetary - 5000.0).abs() < 1e-9);

    for r in &records {
        if r.customer_id == "A" {
            continue;
        }
        assert!(a.r_score > r.r_score, "A must outscore {} on recency", r.customer_id);
        assert!(a.f_score > r.f_score, "A must outscore {} on frequency", r.customer_id);
        assert!(a.m_score > r.m_score, "A must outscore {} on monetary", r.customer_id);
    }
    assert!(
        a.segment == "Champions" || a.segment == "Loyal Customers",
        "best customer should be in the Champions/Loyal tier, got {}",
        a.segment
    );
    assert!(
        b.segment == "Lost" || b.segment == "Hibernating",
        "worst customer should be Lost/Hibernating, got {}",
        b.segment
    );
    assert_eq!((b.r_score, b.f_score, b.m_score), (1, 1, 1));
    assert!(c.rfm_score > b.rfm_score && c.rfm_score < a.rfm_score);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: existence and recency
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn every_identified_customer_gets_a_record() {
    let mut txns = population(23);
    txns.push(line("", "ANON-1", 3, 99.0));
    txns.push(line("   ", "ANON-2", 4, 12.0));

    let records = score_customers(&txns, analysis_date());
    assert_eq!(records.len(), 23, "lines without a customer must not create records");
    for r in &records {
        assert!(r.recency_days >= 0, "{} has negative recency", r.customer_id);
        assert!((1..=5).contains(&r.r_score));
        assert!((1..=5).contains(&r.f_score));
        assert!((1..=5).contains(&r.m_score));
    }
    let ids: Vec<&str> = records.iter().map(|r| r.customer_id.as_str()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted, "records are ordered by customer_id");
}

#[test]
fn lines_after_analysis_date_are_ignored() {
    let mut txns = customer("A", 5, 2, 100.0);
    txns.push(line("A", "FUTURE", -3, 1_000.0));

    let metrics = customer_metrics(&txns, analysis_date());
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].frequency, 2);
    assert_eq!(metrics[0].recency_days, 5);
    assert!((metrics[0].monetary - 100.0).abs() < 1e-9);
}

#[test]
fn returns_reduce_monetary_and_share_the_invoice_count() {
    let txns = vec![
        line("R", "INV-1", 10, 200.0),
        line("R", "INV-1", 10, 50.0),
        line("R", "C-INV-2", 2, -80.0),
    ];
    let metrics = customer_metrics(&txns, analysis_date());
    assert_eq!(metrics[0].frequency, 2, "frequency counts distinct invoices");
    assert!((metrics[0].monetary - 170.0).abs() < 1e-9, "returns are not filtered");
    assert_eq!(metrics[0].recency_days, 2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: balanced quintiles
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn quintile_buckets_are_balanced() {
    for n in 5..=60usize {
        let order: Vec<usize> = (0..n).collect();
        let scores = quintile_scores(&order);
        let (lo, hi) = (n / 5, n.div_ceil(5));
        for bucket in 1..=5u8 {
            let size = scores.iter().filter(|&&s| s == bucket).count();
            assert!(
                size == lo || size == hi,
                "n={n}: bucket {bucket} holds {size}, expected {lo} or {hi}"
            );
        }
    }
}

#[test]
fn scored_population_has_balanced_monetary_buckets() {
    let records = score_customers(&population(37), analysis_date());
    for bucket in 1..=5u8 {
        let size = records.iter().filter(|r| r.m_score == bucket).count();
        assert!(size == 7 || size == 8, "m bucket {bucket} holds {size}");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: determinism
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn repeated_runs_are_byte_identical() {
    let txns = population(50);
    let a = serde_json::to_string(&score_customers(&txns, analysis_date())).unwrap();
    let b = serde_json::to_string(&score_customers(&txns, analysis_date())).unwrap();
    assert_eq!(a, b, "RFM output diverged between identical runs");

    let mut shuffled = txns.clone();
    shuffled.reverse();
    let c = serde_json::to_string(&score_customers(&shuffled, analysis_date())).unwrap();
    assert_eq!(a, c, "RFM output must not depend on input order");
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: segment summary
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn segment_percentages_sum_to_one_hundred() {
    let records = score_customers(&population(41), analysis_date());
    let summaries = summarize_segments(&records);

    let customers: f64 = summaries.iter().map(|s| s.customer_percentage).sum();
    let revenue: f64 = summaries.iter().map(|s| s.revenue_percentage).sum();
    assert!((customers - 100.0).abs() < 1e-6, "customer shares sum to {customers}");
    assert!((revenue - 100.0).abs() < 1e-6, "revenue shares sum to {revenue}");

    let counted: i64 = summaries.iter().map(|s| s.customer_count).sum();
    assert_eq!(counted, 41);
    for pair in summaries.windows(2) {
        assert!(pair[0].total_revenue >= pair[1].total_revenue, "ordered by revenue desc");
    }
}

#[test]
fn no_customers_yields_no_segments() {
    assert!(score_customers(&[], analysis_date()).is_empty());
    assert!(summarize_segments(&[]).is_empty());
}
