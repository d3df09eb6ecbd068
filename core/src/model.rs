//! Input records consumed by the engines. Produced upstream; read-only here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{CustomerId, InvoiceId};

/// One sales line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Empty when the export had no customer on the line.
    pub customer_id:         CustomerId,
    pub invoice_id:          InvoiceId,
    pub invoice_date:        NaiveDate,
    pub country:             String,
    pub product_description: String,
    pub quantity:            i64,
    pub unit_price:          f64,
    /// Authoritative line revenue. Negative for returns.
    pub total_revenue:       f64,
}

impl Transaction {
    pub fn has_customer(&self) -> bool {
        !self.customer_id.trim().is_empty()
    }
}

/// One day of the externally produced forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date:              NaiveDate,
    pub predicted_revenue: f64,
    pub confidence_lower:  f64,
    pub confidence_upper:  f64,
    pub month:             String,
}

/// One month of the externally produced forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyForecast {
    pub month:             String,
    pub predicted_revenue: f64,
}

/// Complete forecast dataset as supplied on refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastSeries {
    pub daily:   Vec<ForecastPoint>,
    pub monthly: Vec<MonthlyForecast>,
}

impl ForecastSeries {
    pub fn is_empty(&self) -> bool {
        self.daily.is_empty()
    }
}
