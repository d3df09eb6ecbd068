use rusqlite::{params, Connection, OptionalExtension};

use super::{date_column, tables, AnalyticsStore, DATE_FORMAT};
use crate::{
    error::AnalyticsResult,
    insight_engine::ForecastInsight,
    model::{ForecastPoint, MonthlyForecast},
    outcome::{DataOutcome, LiveRows},
};

impl AnalyticsStore {
    // ── Forecast series (external) ─────────────────────────────

    pub fn replace_forecast(&self, run_id: &str, points: &[ForecastPoint]) -> AnalyticsResult<()> {
        self.replace_tables(run_id, &[(tables::SALES_FORECAST, points.len())], |conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO sales_forecast (
                    forecast_date, predicted_revenue, confidence_lower, confidence_upper, month
                ) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for p in points {
                stmt.execute(params![
                    p.date.format(DATE_FORMAT).to_string(),
                    p.predicted_revenue,
                    p.confidence_lower,
                    p.confidence_upper,
                    p.month,
                ])?;
            }
            Ok(())
        })
    }

    pub fn replace_monthly_forecast(
        &self,
        run_id: &str,
        months: &[MonthlyForecast],
    ) -> AnalyticsResult<()> {
        self.replace_tables(run_id, &[(tables::MONTHLY_FORECAST, months.len())], |conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO monthly_forecast (forecast_month, predicted_revenue) VALUES (?1, ?2)",
            )?;
            for m in months {
                stmt.execute(params![m.month, m.predicted_revenue])?;
            }
            Ok(())
        })
    }

    /// First `days` forecast days, ascending.
    pub fn forecast_daily(&self, days: usize) -> DataOutcome<LiveRows<Vec<ForecastPoint>>> {
        self.read_list(tables::SALES_FORECAST, |conn| daily_points(conn, Some(days)))
    }

    pub fn forecast_monthly(&self) -> DataOutcome<LiveRows<Vec<MonthlyForecast>>> {
        self.read_list(tables::MONTHLY_FORECAST, monthly_points)
    }

    // ── Forecast insight (derived) ─────────────────────────────

    pub fn replace_forecast_insight(
        &self,
        run_id: &str,
        insight: &ForecastInsight,
    ) -> AnalyticsResult<()> {
        let payload = serde_json::to_string(insight)?;
        self.replace_tables(run_id, &[(tables::FORECAST_INSIGHT, 1)], |conn| {
            conn.execute(
                "INSERT INTO forecast_insight (id, payload) VALUES (1, ?1)",
                params![payload],
            )?;
            Ok(())
        })
    }

    pub fn forecast_insight(&self) -> DataOutcome<LiveRows<ForecastInsight>> {
        self.read_table(tables::FORECAST_INSIGHT, |conn| {
            let payload: Option<String> = conn
                .query_row("SELECT payload FROM forecast_insight WHERE id = 1", [], |row| {
                    row.get(0)
                })
                .optional()?;
            payload
                .map(|p| serde_json::from_str(&p))
                .transpose()
                .map_err(Into::into)
        })
    }
}

pub(super) fn daily_points(
    conn: &Connection,
    limit: Option<usize>,
) -> AnalyticsResult<Vec<ForecastPoint>> {
    let limit = limit.map_or(-1, |n| n as i64);
    let mut stmt = conn.prepare(
        "SELECT forecast_date, predicted_revenue, confidence_lower, confidence_upper, month
         FROM sales_forecast
         ORDER BY forecast_date ASC
         LIMIT ?1",
    )?;
    let points = stmt
        .query_map(params![limit], |row| {
            Ok(ForecastPoint {
                date:              date_column(row, 0)?,
                predicted_revenue: row.get(1)?,
                confidence_lower:  row.get(2)?,
                confidence_upper:  row.get(3)?,
                month:             row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(points)
}

pub(super) fn monthly_points(conn: &Connection) -> AnalyticsResult<Vec<MonthlyForecast>> {
    let mut stmt = conn.prepare(
        "SELECT forecast_month, predicted_revenue
         FROM monthly_forecast
         ORDER BY forecast_month ASC",
    )?;
    let months = stmt
        .query_map([], |row| {
            Ok(MonthlyForecast {
                month:             row.get(0)?,
                predicted_revenue: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(months)
}
