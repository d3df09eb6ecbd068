use rusqlite::{params, OptionalExtension};

use super::{date_column, tables, AnalyticsStore, DATE_FORMAT};
use crate::{
    aggregation_engine::{
        CountryAggregate, DailyAggregate, MonthlyAggregate, ProductAggregate, SalesSummary,
    },
    error::AnalyticsResult,
    outcome::{DataOutcome, LiveRows},
};

impl AnalyticsStore {
    // ── Rollup writes ──────────────────────────────────────────

    pub fn replace_daily(&self, run_id: &str, rows: &[DailyAggregate]) -> AnalyticsResult<()> {
        self.replace_tables(run_id, &[(tables::DAILY_SALES, rows.len())], |conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO daily_sales (sale_date, daily_revenue, transaction_count, avg_order_value)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for d in rows {
                stmt.execute(params![
                    d.sale_date.format(DATE_FORMAT).to_string(),
                    d.daily_revenue,
                    d.transaction_count,
                    d.avg_order_value,
                ])?;
            }
            Ok(())
        })
    }

    pub fn replace_countries(&self, run_id: &str, rows: &[CountryAggregate]) -> AnalyticsResult<()> {
        self.replace_tables(run_id, &[(tables::COUNTRY_SUMMARY, rows.len())], |conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO country_summary (
                    country, total_revenue, transaction_count,
                    avg_transaction_value, revenue_share_percentage
                ) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for c in rows {
                stmt.execute(params![
                    c.country,
                    c.total_revenue,
                    c.transaction_count,
                    c.avg_transaction_value,
                    c.revenue_share_percentage,
                ])?;
            }
            Ok(())
        })
    }

    pub fn replace_products(&self, run_id: &str, rows: &[ProductAggregate]) -> AnalyticsResult<()> {
        self.replace_tables(run_id, &[(tables::PRODUCT_PERFORMANCE, rows.len())], |conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO product_performance (
                    description, display_name, total_quantity, total_revenue,
                    avg_unit_price, revenue_share_percentage
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for p in rows {
                stmt.execute(params![
                    p.description,
                    p.display_name,
                    p.total_quantity,
                    p.total_revenue,
                    p.avg_unit_price,
                    p.revenue_share_percentage,
                ])?;
            }
            Ok(())
        })
    }

    pub fn replace_monthly(&self, run_id: &str, rows: &[MonthlyAggregate]) -> AnalyticsResult<()> {
        self.replace_tables(run_id, &[(tables::MONTHLY_SALES, rows.len())], |conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO monthly_sales (
                    year, month, month_label, total_revenue, unique_customers, transaction_count
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for m in rows {
                stmt.execute(params![
                    m.year,
                    m.month,
                    m.month_label,
                    m.total_revenue,
                    m.unique_customers,
                    m.transaction_count,
                ])?;
            }
            Ok(())
        })
    }

    pub fn replace_sales_summary(&self, run_id: &str, s: &SalesSummary) -> AnalyticsResult<()> {
        self.replace_tables(run_id, &[(tables::SALES_SUMMARY, 1)], |conn| {
            conn.execute(
                "INSERT INTO sales_summary (
                    id, total_revenue, total_orders, unique_customers, avg_order_value
                ) VALUES (1, ?1, ?2, ?3, ?4)",
                params![s.total_revenue, s.total_orders, s.unique_customers, s.avg_order_value],
            )?;
            Ok(())
        })
    }

    // ── Rollup reads ───────────────────────────────────────────

    pub fn sales_summary(&self) -> DataOutcome<LiveRows<SalesSummary>> {
        self.read_table(tables::SALES_SUMMARY, |conn| {
            let summary = conn
                .query_row(
                    "SELECT total_revenue, total_orders, unique_customers, avg_order_value
                     FROM sales_summary WHERE id = 1",
                    [],
                    |row| {
                        Ok(SalesSummary {
                            total_revenue:    row.get(0)?,
                            total_orders:     row.get(1)?,
                            unique_customers: row.get(2)?,
                            avg_order_value:  row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(summary)
        })
    }

    /// The most recent `days` days, returned in ascending date order.
    pub fn daily_sales(&self, days: usize) -> DataOutcome<LiveRows<Vec<DailyAggregate>>> {
        self.read_list(tables::DAILY_SALES, |conn| {
            let mut stmt = conn.prepare(
                "SELECT sale_date, daily_revenue, transaction_count, avg_order_value
                 FROM daily_sales
                 ORDER BY sale_date DESC
                 LIMIT ?1",
            )?;
            let mut rows = stmt
                .query_map(params![days as i64], |row| {
                    Ok(DailyAggregate {
                        sale_date:         date_column(row, 0)?,
                        daily_revenue:     row.get(1)?,
                        transaction_count: row.get(2)?,
                        avg_order_value:   row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows.reverse();
            Ok(rows)
        })
    }

    pub fn top_countries(&self, limit: usize) -> DataOutcome<LiveRows<Vec<CountryAggregate>>> {
        self.read_list(tables::COUNTRY_SUMMARY, |conn| {
            let mut stmt = conn.prepare(
                "SELECT country, total_revenue, transaction_count,
                        avg_transaction_value, revenue_share_percentage
                 FROM country_summary
                 ORDER BY total_revenue DESC, country ASC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(params![limit as i64], |row| {
                    Ok(CountryAggregate {
                        country:                  row.get(0)?,
                        total_revenue:            row.get(1)?,
                        transaction_count:        row.get(2)?,
                        avg_transaction_value:    row.get(3)?,
                        revenue_share_percentage: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn top_products(&self, limit: usize) -> DataOutcome<LiveRows<Vec<ProductAggregate>>> {
        self.read_list(tables::PRODUCT_PERFORMANCE, |conn| {
            let mut stmt = conn.prepare(
                "SELECT description, display_name, total_quantity, total_revenue,
                        avg_unit_price, revenue_share_percentage
                 FROM product_performance
                 ORDER BY total_revenue DESC, description ASC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(params![limit as i64], |row| {
                    Ok(ProductAggregate {
                        description:              row.get(0)?,
                        display_name:             row.get(1)?,
                        total_quantity:           row.get(2)?,
                        total_revenue:            row.get(3)?,
                        avg_unit_price:           row.get(4)?,
                        revenue_share_percentage: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Months ascending, optionally restricted to one year.
    pub fn monthly_trend(&self, year: Option<i32>) -> DataOutcome<LiveRows<Vec<MonthlyAggregate>>> {
        self.read_list(tables::MONTHLY_SALES, |conn| {
            let mut stmt = conn.prepare(
                "SELECT year, month, month_label, total_revenue, unique_customers, transaction_count
                 FROM monthly_sales
                 WHERE ?1 IS NULL OR year = ?1
                 ORDER BY year ASC, month ASC",
            )?;
            let rows = stmt
                .query_map(params![year], |row| {
                    Ok(MonthlyAggregate {
                        year:              row.get(0)?,
                        month:             row.get(1)?,
                        month_label:       row.get(2)?,
                        total_revenue:     row.get(3)?,
                        unique_customers:  row.get(4)?,
                        transaction_count: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
