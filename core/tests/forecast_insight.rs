//! Integration tests for the forecast insight engine.

use analytics_core::{
    aggregation_engine::DailyAggregate,
    error::AnalyticsError,
    insight_engine::{
        build_insight, build_insight_with_history, growth_percentage, historical_average,
        peak_month, recommendations, summarize,
    },
    model::{ForecastPoint, MonthlyForecast},
};
use chrono::{Duration, NaiveDate};

fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2012, 1, 1).unwrap() + Duration::days(n)
}

fn series(values: &[f64]) -> Vec<ForecastPoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| ForecastPoint {
            date:              day(i as i64),
            predicted_revenue: v,
            confidence_lower:  v * 0.9,
            confidence_upper:  v * 1.1,
            month:             day(i as i64).format("%Y-%m").to_string(),
        })
        .collect()
}

fn history(date: NaiveDate, revenue: f64) -> DailyAggregate {
    DailyAggregate {
        sale_date:         date,
        daily_revenue:     revenue,
        transaction_count: 1,
        avg_order_value:   revenue,
    }
}

fn month(label: &str, revenue: f64) -> MonthlyForecast {
    MonthlyForecast { month: label.to_string(), predicted_revenue: revenue }
}

#[test]
fn worked_example_against_history_of_120() {
    let insight = build_insight_with_history(&series(&[100.0, 200.0, 150.0]), &[], 120.0).unwrap();
    assert!((insight.summary.avg_daily - 150.0).abs() < 1e-9);
    assert!((insight.growth_percentage - 25.0).abs() < 1e-9, "got {}", insight.growth_percentage);
    assert_eq!(insight.summary.peak_day, day(1), "peak is the second day");
    assert_eq!(insight.summary.low_day, day(0));
    assert_eq!(insight.summary.days_forecasted, 3);
    assert!((insight.summary.total_forecast - 450.0).abs() < 1e-9);
    assert_eq!(insight.recommendations[0], "Increase inventory by 25.0% to meet expected demand");
}

#[test]
fn zero_history_means_zero_growth() {
    let insight = build_insight_with_history(&series(&[10.0, 20.0]), &[], 0.0).unwrap();
    assert_eq!(insight.growth_percentage, 0.0);
    assert!(insight.growth_percentage.is_finite());
    assert_eq!(growth_percentage(f64::NAN, 100.0), 0.0);
    assert_eq!(growth_percentage(50.0, -10.0), 0.0);
    assert_eq!(insight.recommendations[0], "Hold inventory steady at current levels");
}

#[test]
fn empty_forecast_is_an_error() {
    assert!(matches!(summarize(&[]), Err(AnalyticsError::EmptyForecast)));
}

#[test]
fn ties_pick_the_earliest_day() {
    let s = summarize(&series(&[50.0, 80.0, 80.0, 50.0])).unwrap();
    assert_eq!(s.peak_day, day(1));
    assert_eq!(s.low_day, day(0));
}

#[test]
fn history_window_ends_at_analysis_date() {
    let t = NaiveDate::from_ymd_opt(2011, 12, 9).unwrap();
    let daily = vec![
        history(t - Duration::days(10), 1_000.0), // outside a 7-day window
        history(t - Duration::days(6), 100.0),
        history(t - Duration::days(2), 300.0),
        history(t, 200.0),
        history(t + Duration::days(1), 9_999.0), // after T
    ];
    let avg = historical_average(&daily, t, 7);
    assert!((avg - 200.0).abs() < 1e-9, "mean over present days in window, got {avg}");
    assert_eq!(historical_average(&daily, t + Duration::days(100), 7), 0.0);
}

#[test]
fn build_insight_compares_against_window() {
    let t = day(-1);
    let daily = vec![history(t, 100.0), history(t - Duration::days(1), 100.0)];
    let monthly = vec![month("2012-01", 3_000.0), month("2012-02", 4_500.0)];
    let insight = build_insight(&series(&[80.0, 80.0]), &monthly, &daily, t, 90).unwrap();
    assert!((insight.avg_daily_historical - 100.0).abs() < 1e-9);
    assert!((insight.growth_percentage + 20.0).abs() < 1e-9);
    assert_eq!(insight.peak_month.as_deref(), Some("2012-02"));
    assert_eq!(insight.peak_month_revenue, Some(4_500.0));
    assert_eq!(insight.recommendations[0], "Reduce inventory by 20.0% to avoid overstock");
    assert_eq!(insight.recommendations[1], "Prepare for peak season in 2012-02");
}

#[test]
fn peak_month_prefers_earliest_on_ties() {
    let monthly = vec![month("2012-01", 10.0), month("2012-02", 10.0)];
    assert_eq!(peak_month(&monthly).map(|m| m.month.as_str()), Some("2012-01"));
    assert!(peak_month(&[]).is_none());
}

#[test]
fn recommendations_without_a_peak_month() {
    let recs = recommendations(3.04, None);
    assert_eq!(recs.len(), 4);
    assert_eq!(recs[0], "Increase inventory by 3.0% to meet expected demand");
    assert_eq!(recs[1], "Prepare for peak season in upcoming months");
}
