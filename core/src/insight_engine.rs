//! Forecast insight engine.
//!
//! Compares an externally produced forecast series against the trailing
//! window of the daily rollup. The forecasting model itself lives
//! upstream; this module only summarises what it produced.
//!
//! This engine:
//!   1. Summarises the daily forecast (total, mean, peak and low day)
//!   2. Averages historical daily revenue over the window ending at T
//!   3. Derives growth against that history (0 when history is 0)
//!   4. Picks the peak forecast month
//!   5. Renders recommendations from a fixed template set

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    aggregation_engine::{self, DailyAggregate},
    error::{AnalyticsError, AnalyticsResult},
    job::{BatchInput, RecomputeJob, TableWrite},
    model::{ForecastPoint, MonthlyForecast},
    outcome::RoundForDisplay,
    store::{tables, AnalyticsStore},
    types::{round_money, round_pct, round_to},
};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub total_forecast:  f64,
    pub avg_daily:       f64,
    pub peak_day:        NaiveDate,
    pub peak_value:      f64,
    pub low_day:         NaiveDate,
    pub low_value:       f64,
    pub days_forecasted: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastInsight {
    #[serde(flatten)]
    pub summary:              ForecastSummary,
    pub avg_daily_historical: f64,
    pub growth_percentage:    f64,
    pub peak_month:           Option<String>,
    pub peak_month_revenue:   Option<f64>,
    pub recommendations:      Vec<String>,
}

impl RoundForDisplay for ForecastSummary {
    fn rounded(mut self) -> Self {
        self.total_forecast = round_money(self.total_forecast);
        self.avg_daily = round_money(self.avg_daily);
        self.peak_value = round_money(self.peak_value);
        self.low_value = round_money(self.low_value);
        self
    }
}

impl RoundForDisplay for ForecastInsight {
    fn rounded(mut self) -> Self {
        self.summary = self.summary.rounded();
        self.avg_daily_historical = round_money(self.avg_daily_historical);
        self.growth_percentage = round_pct(self.growth_percentage);
        self.peak_month_revenue = self.peak_month_revenue.map(round_money);
        self
    }
}

impl RoundForDisplay for ForecastPoint {
    fn rounded(mut self) -> Self {
        self.predicted_revenue = round_money(self.predicted_revenue);
        self.confidence_lower = round_money(self.confidence_lower);
        self.confidence_upper = round_money(self.confidence_upper);
        self
    }
}

impl RoundForDisplay for MonthlyForecast {
    fn rounded(mut self) -> Self {
        self.predicted_revenue = round_money(self.predicted_revenue);
        self
    }
}

// ── Computation ──────────────────────────────────────────────────────────────

/// Summarise a non-empty daily forecast. Earliest date wins ties for both
/// the peak and the low day.
pub fn summarize(points: &[ForecastPoint]) -> AnalyticsResult<ForecastSummary> {
    let first = points.first().ok_or(AnalyticsError::EmptyForecast)?;

    let mut peak = first;
    let mut low = first;
    let mut total = 0.0;
    for p in points {
        total += p.predicted_revenue;
        if p.predicted_revenue > peak.predicted_revenue
            || (p.predicted_revenue == peak.predicted_revenue && p.date < peak.date)
        {
            peak = p;
        }
        if p.predicted_revenue < low.predicted_revenue
            || (p.predicted_revenue == low.predicted_revenue && p.date < low.date)
        {
            low = p;
        }
    }

    Ok(ForecastSummary {
        total_forecast:  total,
        avg_daily:       total / points.len() as f64,
        peak_day:        peak.date,
        peak_value:      peak.predicted_revenue,
        low_day:         low.date,
        low_value:       low.predicted_revenue,
        days_forecasted: points.len() as i64,
    })
}

/// Mean daily revenue over the `window_days` days ending at `analysis_date`
/// (inclusive). Days with no rollup row are not counted. Empty window → 0.
pub fn historical_average(
    daily: &[DailyAggregate],
    analysis_date: NaiveDate,
    window_days: i64,
) -> f64 {
    let start = analysis_date - Duration::days(window_days.max(1) - 1);
    let (sum, n) = daily
        .iter()
        .filter(|d| d.sale_date >= start && d.sale_date <= analysis_date)
        .fold((0.0, 0usize), |(sum, n), d| (sum + d.daily_revenue, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Growth of the forecast mean over the historical mean, in percent.
/// Zero whenever the historical mean is not positive.
pub fn growth_percentage(avg_forecast: f64, avg_historical: f64) -> f64 {
    if avg_historical > 0.0 && avg_forecast.is_finite() {
        (avg_forecast - avg_historical) / avg_historical * 100.0
    } else {
        0.0
    }
}

/// Month with the highest predicted revenue; earliest listed month on ties.
pub fn peak_month(monthly: &[MonthlyForecast]) -> Option<&MonthlyForecast> {
    monthly.iter().fold(None, |best: Option<&MonthlyForecast>, m| match best {
        Some(b) if b.predicted_revenue >= m.predicted_revenue => Some(b),
        _ => Some(m),
    })
}

pub fn recommendations(growth: f64, peak_month: Option<&str>) -> Vec<String> {
    let growth = round_to(growth, 1);
    let inventory = if growth > 0.0 {
        format!("Increase inventory by {growth:.1}% to meet expected demand")
    } else if growth < 0.0 {
        format!("Reduce inventory by {:.1}% to avoid overstock", growth.abs())
    } else {
        "Hold inventory steady at current levels".to_string()
    };

    vec![
        inventory,
        format!(
            "Prepare for peak season in {}",
            peak_month.unwrap_or("upcoming months")
        ),
        "Plan promotions during low periods to boost sales".to_string(),
        "Ensure adequate staffing for predicted busy periods".to_string(),
    ]
}

/// Build the insight from a forecast and a precomputed historical mean.
pub fn build_insight_with_history(
    points: &[ForecastPoint],
    monthly: &[MonthlyForecast],
    avg_daily_historical: f64,
) -> AnalyticsResult<ForecastInsight> {
    let summary = summarize(points)?;
    let growth = growth_percentage(summary.avg_daily, avg_daily_historical);
    let peak = peak_month(monthly);

    Ok(ForecastInsight {
        recommendations: recommendations(growth, peak.map(|m| m.month.as_str())),
        summary,
        avg_daily_historical,
        growth_percentage: growth,
        peak_month: peak.map(|m| m.month.clone()),
        peak_month_revenue: peak.map(|m| m.predicted_revenue),
    })
}

/// Build the insight against the daily rollup's trailing window.
pub fn build_insight(
    points: &[ForecastPoint],
    monthly: &[MonthlyForecast],
    daily: &[DailyAggregate],
    analysis_date: NaiveDate,
    window_days: i64,
) -> AnalyticsResult<ForecastInsight> {
    let history = historical_average(daily, analysis_date, window_days);
    build_insight_with_history(points, monthly, history)
}

// ── Job ──────────────────────────────────────────────────────────────────────

/// Writes the single-row forecast_insight table. With no forecast series
/// loaded the job writes nothing and the previous insight stays.
#[derive(Debug)]
pub struct ForecastInsightJob {
    window_days: i64,
}

impl ForecastInsightJob {
    pub fn new(window_days: i64) -> Self {
        Self { window_days }
    }
}

impl RecomputeJob for ForecastInsightJob {
    fn name(&self) -> &'static str {
        "forecast_insight"
    }

    fn tables(&self) -> &'static [&'static str] {
        &[tables::FORECAST_INSIGHT]
    }

    fn recompute(
        &mut self,
        input: &BatchInput,
        store: &AnalyticsStore,
    ) -> AnalyticsResult<Vec<TableWrite>> {
        if input.forecast.is_empty() {
            log::info!("forecast_insight: no forecast series loaded, skipping");
            return Ok(Vec::new());
        }

        // Same snapshot as the daily rollup job, so history matches daily_sales.
        let daily = aggregation_engine::daily(&input.transactions);
        let insight = build_insight(
            &input.forecast.daily,
            &input.forecast.monthly,
            &daily,
            input.analysis_date,
            self.window_days,
        )?;

        store.replace_forecast_insight(&input.run_id, &insight)?;
        log::debug!(
            "forecast_insight: {} days, growth {:.1}%",
            insight.summary.days_forecasted,
            insight.growth_percentage
        );
        Ok(vec![TableWrite { table: tables::FORECAST_INSIGHT, rows: 1 }])
    }
}
