//! Integration tests for the aggregation engine reducers.

use analytics_core::{
    aggregation_engine::{by_country, by_product, daily, monthly, sales_summary, truncate_for_display},
    model::Transaction,
};
use chrono::NaiveDate;

fn line(
    invoice: &str,
    customer: &str,
    date: (i32, u32, u32),
    country: &str,
    product: &str,
    quantity: i64,
    revenue: f64,
) -> Transaction {
    Transaction {
        customer_id:         customer.to_string(),
        invoice_id:          invoice.to_string(),
        invoice_date:        NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        country:             country.to_string(),
        product_description: product.to_string(),
        quantity,
        unit_price:          if quantity == 0 { 0.0 } else { revenue / quantity as f64 },
        total_revenue:       revenue,
    }
}

#[test]
fn daily_includes_returns() {
    let txns = vec![
        line("536365", "17850", (2010, 12, 1), "United Kingdom", "HEART", 10, 100.0),
        line("C536379", "17850", (2010, 12, 1), "United Kingdom", "HEART", -2, -20.0),
    ];
    let rows = daily(&txns);
    assert_eq!(rows.len(), 1);
    assert!((rows[0].daily_revenue - 80.0).abs() < 1e-9, "return must be netted, got {}", rows[0].daily_revenue);
    assert_eq!(rows[0].transaction_count, 2);
    assert!((rows[0].avg_order_value - 40.0).abs() < 1e-9);
}

#[test]
fn daily_counts_distinct_invoices_and_sorts_by_date() {
    let txns = vec![
        line("2", "A", (2011, 1, 5), "France", "X", 1, 5.0),
        line("1", "A", (2011, 1, 4), "France", "X", 1, 3.0),
        line("1", "A", (2011, 1, 4), "France", "Y", 1, 7.0),
    ];
    let rows = daily(&txns);
    assert_eq!(rows.len(), 2);
    assert!(rows[0].sale_date < rows[1].sale_date);
    assert_eq!(rows[0].transaction_count, 1, "two lines of one invoice count once");
    assert!((rows[0].daily_revenue - 10.0).abs() < 1e-9);
}

#[test]
fn country_shares_include_unknown_and_sum_to_one_hundred() {
    let txns = vec![
        line("1", "A", (2011, 1, 4), "United Kingdom", "X", 1, 600.0),
        line("2", "B", (2011, 1, 4), "Germany", "X", 1, 250.0),
        line("3", "",  (2011, 1, 5), "", "X", 1, 100.0),
        line("4", "C", (2011, 1, 5), "  ", "X", 1, 50.0),
    ];
    let rows = by_country(&txns);
    let total: f64 = rows.iter().map(|c| c.revenue_share_percentage).sum();
    assert!((total - 100.0).abs() < 1e-6, "shares sum to {total}");

    let unknown = rows.iter().find(|c| c.country == "Unknown").expect("Unknown bucket");
    assert!((unknown.total_revenue - 150.0).abs() < 1e-9);
    assert_eq!(unknown.transaction_count, 2);
    assert_eq!(rows[0].country, "United Kingdom", "ordered by revenue desc");
}

#[test]
fn products_group_by_full_description_and_truncate_display() {
    let long = "SET OF 3 REGENCY CAKE TINS WITH EXTRA LONG DESCRIPTION TEXT";
    let txns = vec![
        line("1", "A", (2011, 1, 4), "UK", long, 4, 40.0),
        line("2", "B", (2011, 1, 4), "UK", long, 6, 60.0),
        line("3", "B", (2011, 1, 4), "UK", "MUG", 2, 10.0),
    ];
    let rows = by_product(&txns, 20);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].description, long);
    assert_eq!(rows[0].display_name.chars().count(), 20);
    assert!(rows[0].display_name.ends_with("..."));
    assert_eq!(rows[0].total_quantity, 10);
    assert!((rows[0].total_revenue - 100.0).abs() < 1e-9);
    assert_eq!(rows[1].display_name, "MUG", "short names are kept whole");
}

#[test]
fn truncation_respects_character_boundaries() {
    assert_eq!(truncate_for_display("abcdef", 6), "abcdef");
    assert_eq!(truncate_for_display("abcdefg", 6), "abc...");
    assert_eq!(truncate_for_display("ÉÉÉÉÉÉÉÉ", 5), "ÉÉ...");
}

#[test]
fn monthly_labels_and_unique_customers() {
    let txns = vec![
        line("1", "A", (2011, 1, 4), "UK", "X", 1, 10.0),
        line("2", "B", (2011, 1, 20), "UK", "X", 1, 20.0),
        line("3", "A", (2011, 1, 21), "UK", "X", 1, 5.0),
        line("4", "",  (2011, 1, 21), "UK", "X", 1, 5.0),
        line("5", "A", (2011, 2, 1), "UK", "X", 1, 1.0),
    ];
    let rows = monthly(&txns);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].month_label, "2011-01");
    assert_eq!((rows[0].year, rows[0].month), (2011, 1));
    assert_eq!(rows[0].unique_customers, 2, "lines without a customer are not counted");
    assert_eq!(rows[0].transaction_count, 4);
    assert!((rows[0].total_revenue - 40.0).abs() < 1e-9);
}

#[test]
fn sales_summary_uses_distinct_invoices() {
    let txns = vec![
        line("1", "A", (2011, 1, 4), "UK", "X", 1, 30.0),
        line("1", "A", (2011, 1, 4), "UK", "Y", 1, 30.0),
        line("2", "B", (2011, 1, 5), "UK", "X", 1, 40.0),
    ];
    let s = sales_summary(&txns);
    assert_eq!(s.total_orders, 2);
    assert_eq!(s.unique_customers, 2);
    assert!((s.total_revenue - 100.0).abs() < 1e-9);
    assert!((s.avg_order_value - 50.0).abs() < 1e-9);

    let empty = sales_summary(&[]);
    assert_eq!(empty.total_orders, 0);
    assert_eq!(empty.avg_order_value, 0.0);
}
