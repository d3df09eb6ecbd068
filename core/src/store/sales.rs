use chrono::NaiveDate;
use rusqlite::{params, Connection};

use super::{date_column, tables, AnalyticsStore, DATE_FORMAT};
use crate::{
    error::AnalyticsResult,
    model::{ForecastSeries, Transaction},
};

const TRANSACTION_COLUMNS: &str = "customer_id, invoice_id, invoice_date, country,
    product_description, quantity, unit_price, total_revenue";

impl AnalyticsStore {
    // ── Transactions ───────────────────────────────────────────

    /// Replace the transaction table with a fresh export.
    pub fn replace_transactions(&self, run_id: &str, rows: &[Transaction]) -> AnalyticsResult<()> {
        self.replace_tables(run_id, &[(tables::TRANSACTIONS, rows.len())], |conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO transactions (
                    customer_id, invoice_id, invoice_date, country,
                    product_description, quantity, unit_price, total_revenue
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for t in rows {
                stmt.execute(params![
                    t.customer_id,
                    t.invoice_id,
                    t.invoice_date.format(DATE_FORMAT).to_string(),
                    t.country,
                    t.product_description,
                    t.quantity,
                    t.unit_price,
                    t.total_revenue,
                ])?;
            }
            Ok(())
        })
    }

    /// Lines with `from <= invoice_date <= to`, in insertion order.
    pub fn transactions_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AnalyticsResult<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions
             WHERE invoice_date >= ?1 AND invoice_date <= ?2
             ORDER BY id ASC"
        ))?;
        let rows = stmt
            .query_map(
                params![
                    from.format(DATE_FORMAT).to_string(),
                    to.format(DATE_FORMAT).to_string()
                ],
                transaction_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Batch snapshot ─────────────────────────────────────────

    /// Every transaction plus the forecast series, read in one transaction
    /// so all jobs of a batch see the same data.
    pub fn read_batch_snapshot(&self) -> AnalyticsResult<(Vec<Transaction>, ForecastSeries)> {
        let tx = self.conn.unchecked_transaction()?;
        let conn: &Connection = &tx;
        let transactions = all_transactions(conn)?;
        let forecast = ForecastSeries {
            daily:   super::forecast::daily_points(conn, None)?,
            monthly: super::forecast::monthly_points(conn)?,
        };
        tx.finish()?;
        Ok((transactions, forecast))
    }
}

fn all_transactions(conn: &Connection) -> AnalyticsResult<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY id ASC"
    ))?;
    let rows = stmt
        .query_map([], transaction_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn transaction_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        customer_id:         row.get(0)?,
        invoice_id:          row.get(1)?,
        invoice_date:        date_column(row, 2)?,
        country:             row.get(3)?,
        product_description: row.get(4)?,
        quantity:            row.get(5)?,
        unit_price:          row.get(6)?,
        total_revenue:       row.get(7)?,
    })
}
