//! CSV ingestion for the transaction export and the forecast series.
//!
//! Each loader parses a whole file before anything is written, then the
//! store replaces the target table in one transaction. A malformed row
//! aborts the import and leaves the table untouched.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use crate::{
    error::{AnalyticsError, AnalyticsResult},
    model::{ForecastPoint, MonthlyForecast, Transaction},
    store::AnalyticsStore,
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M", "%Y-%m-%dT%H:%M:%S"];

/// Row of the retail transaction export.
#[derive(Debug, Deserialize)]
struct SalesRow {
    #[serde(rename = "InvoiceNo")]
    invoice_no:    String,
    #[serde(rename = "Description", default)]
    description:   String,
    #[serde(rename = "Quantity")]
    quantity:      f64,
    #[serde(rename = "InvoiceDate")]
    invoice_date:  String,
    #[serde(rename = "UnitPrice")]
    unit_price:    f64,
    #[serde(rename = "CustomerID", default)]
    customer_id:   String,
    #[serde(rename = "Country", default)]
    country:       String,
    #[serde(rename = "TotalRevenue", default)]
    total_revenue: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ForecastRow {
    date:              String,
    predicted_revenue: f64,
    confidence_lower:  f64,
    confidence_upper:  f64,
    #[serde(default)]
    month:             String,
}

#[derive(Debug, Deserialize)]
struct MonthlyForecastRow {
    month:             String,
    predicted_revenue: f64,
}

/// Parse a calendar date from any of the accepted export formats.
/// Time-of-day is dropped.
pub fn parse_date(text: &str) -> AnalyticsResult<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
        return Ok(date);
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(dt.date());
        }
    }
    Err(AnalyticsError::InvalidDate { value: text.to_string() })
}

/// Spreadsheet exports write integer ids as floats ("17850.0").
pub fn normalize_customer_id(raw: &str) -> String {
    let raw = raw.trim();
    match raw.strip_suffix(".0") {
        Some(int) if !int.is_empty() && int.bytes().all(|b| b.is_ascii_digit()) => int.to_string(),
        _ => raw.to_string(),
    }
}

pub fn read_transactions<R: Read>(reader: R) -> AnalyticsResult<Vec<Transaction>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut out = Vec::new();
    for row in rdr.deserialize::<SalesRow>() {
        let row = row?;
        let total_revenue = row
            .total_revenue
            .unwrap_or(row.quantity * row.unit_price);
        out.push(Transaction {
            customer_id:         normalize_customer_id(&row.customer_id),
            invoice_id:          row.invoice_no,
            invoice_date:        parse_date(&row.invoice_date)?,
            country:             row.country,
            product_description: row.description,
            quantity:            row.quantity.round() as i64,
            unit_price:          row.unit_price,
            total_revenue,
        });
    }
    Ok(out)
}

pub fn read_forecast<R: Read>(reader: R) -> AnalyticsResult<Vec<ForecastPoint>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut out = Vec::new();
    for row in rdr.deserialize::<ForecastRow>() {
        let row = row?;
        let date = parse_date(&row.date)?;
        let month = if row.month.is_empty() {
            date.format("%Y-%m").to_string()
        } else {
            row.month
        };
        out.push(ForecastPoint {
            date,
            predicted_revenue: row.predicted_revenue,
            confidence_lower:  row.confidence_lower,
            confidence_upper:  row.confidence_upper,
            month,
        });
    }
    out.sort_by_key(|p| p.date);
    Ok(out)
}

pub fn read_monthly_forecast<R: Read>(reader: R) -> AnalyticsResult<Vec<MonthlyForecast>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut out = Vec::new();
    for row in rdr.deserialize::<MonthlyForecastRow>() {
        let row = row?;
        out.push(MonthlyForecast {
            month:             row.month,
            predicted_revenue: row.predicted_revenue,
        });
    }
    Ok(out)
}

fn open(path: &Path) -> AnalyticsResult<std::fs::File> {
    Ok(std::fs::File::open(path)?)
}

// ── Store imports ────────────────────────────────────────────────────────────

pub fn import_sales(store: &AnalyticsStore, run_id: &str, path: &Path) -> AnalyticsResult<usize> {
    let rows = read_transactions(open(path)?)?;
    store.replace_transactions(run_id, &rows)?;
    log::info!("Imported {} transactions from {}", rows.len(), path.display());
    Ok(rows.len())
}

pub fn import_forecast(store: &AnalyticsStore, run_id: &str, path: &Path) -> AnalyticsResult<usize> {
    let points = read_forecast(open(path)?)?;
    store.replace_forecast(run_id, &points)?;
    log::info!("Imported {} forecast days from {}", points.len(), path.display());
    Ok(points.len())
}

pub fn import_monthly_forecast(
    store: &AnalyticsStore,
    run_id: &str,
    path: &Path,
) -> AnalyticsResult<usize> {
    let months = read_monthly_forecast(open(path)?)?;
    store.replace_monthly_forecast(run_id, &months)?;
    log::info!("Imported {} forecast months from {}", months.len(), path.display());
    Ok(months.len())
}
