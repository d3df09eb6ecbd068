//! Degraded-mode sample data.
//!
//! Every query has a synthetic counterpart of the same shape. Output is a
//! pure function of (requested size, today): revenue series are linear
//! progressions and the remaining variation comes from `SampleRng` streams
//! seeded by the date. Nothing here reads the store.

use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

use crate::{
    aggregation_engine::{
        truncate_for_display, CountryAggregate, DailyAggregate, MonthlyAggregate,
        ProductAggregate, SalesSummary,
    },
    error::AnalyticsResult,
    insight_engine::{self, ForecastInsight, ForecastSummary},
    model::{ForecastPoint, MonthlyForecast, Transaction},
    rfm_engine::{self, CustomerValue, RfmOverview, RfmRecord, SegmentSummary},
    rng::{SampleRng, SampleSlot},
    types::share_pct,
};

const SAMPLE_COUNTRIES: [&str; 10] = [
    "United Kingdom",
    "Germany",
    "France",
    "EIRE",
    "Netherlands",
    "Spain",
    "Belgium",
    "Switzerland",
    "Portugal",
    "Australia",
];

const SAMPLE_PRODUCTS: [&str; 10] = [
    "WHITE HANGING HEART T-LIGHT HOLDER",
    "REGENCY CAKESTAND 3 TIER",
    "JUMBO BAG RED RETROSPOT",
    "PARTY BUNTING",
    "LUNCH BAG RED RETROSPOT",
    "ASSORTED COLOUR BIRD ORNAMENT",
    "SET OF 3 CAKE TINS PANTRY DESIGN",
    "PACK OF 72 RETROSPOT CAKE CASES",
    "NATURAL SLATE HEART CHALKBOARD",
    "HEART OF WICKER SMALL",
];

/// Size of the synthetic customer base. Covers the largest customer limit.
const SAMPLE_CUSTOMERS: usize = 100;

/// Days of synthetic forecast behind the monthly and summary samples.
const SAMPLE_FORECAST_DAYS: usize = 90;

/// Synthetic dataset generator pinned to one calendar day.
#[derive(Debug, Clone, Copy)]
pub struct SampleData {
    today:         NaiveDate,
    display_limit: usize,
}

impl SampleData {
    pub fn new(today: NaiveDate, display_limit: usize) -> Self {
        Self { today, display_limit }
    }

    // ── Sales ────────────────────────────────────────────────────────────

    pub fn sales_summary(&self) -> SalesSummary {
        let daily = self.daily_sales(SAMPLE_FORECAST_DAYS);
        let total_revenue: f64 = daily.iter().map(|d| d.daily_revenue).sum();
        let total_orders: i64 = daily.iter().map(|d| d.transaction_count).sum();
        SalesSummary {
            total_revenue,
            total_orders,
            unique_customers: SAMPLE_CUSTOMERS as i64,
            avg_order_value: total_revenue / total_orders as f64,
        }
    }

    /// `days` consecutive days ending today, revenue rising 50 per day.
    pub fn daily_sales(&self, days: usize) -> Vec<DailyAggregate> {
        (0..days)
            .map(|offset| {
                let sale_date = self.today - Duration::days((days - 1 - offset) as i64);
                let daily_revenue = 1000.0 + 50.0 * offset as f64;
                let transaction_count = 20 + offset as i64;
                DailyAggregate {
                    sale_date,
                    daily_revenue,
                    transaction_count,
                    avg_order_value: daily_revenue / transaction_count as f64,
                }
            })
            .collect()
    }

    pub fn top_countries(&self, limit: usize) -> Vec<CountryAggregate> {
        let mut rng = SampleRng::new(self.today, SampleSlot::Countries);
        let mut rows: Vec<(&str, f64, i64)> = SAMPLE_COUNTRIES
            .iter()
            .enumerate()
            .map(|(i, &country)| {
                let revenue = (50_000.0 - 4_500.0 * i as f64) * rng.jitter(0.05);
                let orders = 400 - 35 * i as i64;
                (country, revenue, orders)
            })
            .collect();
        rows.sort_by(|a, b| b.1.total_cmp(&a.1));
        let grand_total: f64 = rows.iter().map(|r| r.1).sum();

        rows.into_iter()
            .take(limit)
            .map(|(country, revenue, orders)| CountryAggregate {
                country:                  country.to_string(),
                total_revenue:            revenue,
                transaction_count:        orders,
                avg_transaction_value:    revenue / orders as f64,
                revenue_share_percentage: share_pct(revenue, grand_total),
            })
            .collect()
    }

    pub fn top_products(&self, limit: usize) -> Vec<ProductAggregate> {
        let mut rng = SampleRng::new(self.today, SampleSlot::Products);
        let rows: Vec<(&str, i64, f64)> = SAMPLE_PRODUCTS
            .iter()
            .enumerate()
            .map(|(i, &description)| {
                let quantity = 2_000 - 150 * i as i64;
                let price = 2.5 + 0.25 * rng.next_u64_below(8) as f64;
                (description, quantity, price)
            })
            .collect();
        let grand_total: f64 = rows.iter().map(|(_, q, p)| *q as f64 * p).sum();

        let mut products: Vec<ProductAggregate> = rows
            .into_iter()
            .map(|(description, quantity, price)| {
                let revenue = quantity as f64 * price;
                ProductAggregate {
                    description:              description.to_string(),
                    display_name:             truncate_for_display(description, self.display_limit),
                    total_quantity:           quantity,
                    total_revenue:            revenue,
                    avg_unit_price:           price,
                    revenue_share_percentage: share_pct(revenue, grand_total),
                }
            })
            .collect();
        products.sort_by(|a, b| {
            b.total_revenue
                .total_cmp(&a.total_revenue)
                .then_with(|| a.description.cmp(&b.description))
        });
        products.truncate(limit);
        products
    }

    /// Twelve months of `year` (default: the current year).
    pub fn monthly_trend(&self, year: Option<i32>) -> Vec<MonthlyAggregate> {
        let year = year.unwrap_or_else(|| self.today.year());
        let mut rng = SampleRng::new(self.today, SampleSlot::Monthly);
        (1..=12u32)
            .map(|month| MonthlyAggregate {
                year,
                month,
                month_label:       format!("{year:04}-{month:02}"),
                total_revenue:     (30_000.0 + 1_500.0 * month as f64) * rng.jitter(0.05),
                unique_customers:  60 + month as i64 * 3,
                transaction_count: 500 + month as i64 * 25,
            })
            .collect()
    }

    // ── Customers ────────────────────────────────────────────────────────

    /// Synthetic customer base, scored by the real RFM engine so samples
    /// obey the same quintile and segment rules as live data.
    fn customer_base(&self) -> Vec<RfmRecord> {
        let mut rng = SampleRng::new(self.today, SampleSlot::Customers);
        let mut transactions = Vec::new();
        for c in 0..SAMPLE_CUSTOMERS {
            let customer_id = format!("{}", 12_000 + c);
            let invoices = 1 + rng.next_u64_below(12);
            for inv in 0..invoices {
                let days_ago = rng.next_u64_below(365) as i64;
                let revenue = (40.0 + 8.0 * c as f64) * rng.jitter(0.3);
                transactions.push(Transaction {
                    customer_id:         customer_id.clone(),
                    invoice_id:          format!("S{c:03}{inv:02}"),
                    invoice_date:        self.today - Duration::days(days_ago),
                    country:             SAMPLE_COUNTRIES[c % SAMPLE_COUNTRIES.len()].to_string(),
                    product_description: SAMPLE_PRODUCTS[c % SAMPLE_PRODUCTS.len()].to_string(),
                    quantity:            1,
                    unit_price:          revenue,
                    total_revenue:       revenue,
                });
            }
        }
        rfm_engine::score_customers(&transactions, self.today)
    }

    pub fn segment_summaries(&self) -> Vec<SegmentSummary> {
        rfm_engine::summarize_segments(&self.customer_base())
    }

    pub fn top_customers(&self, limit: usize) -> Vec<RfmRecord> {
        let mut base = self.customer_base();
        base.sort_by(|a, b| {
            b.rfm_score
                .cmp(&a.rfm_score)
                .then_with(|| b.monetary.total_cmp(&a.monetary))
                .then_with(|| a.customer_id.cmp(&b.customer_id))
        });
        base.truncate(limit);
        base
    }

    pub fn customers_matching(&self, needles: &[&str], limit: usize) -> Vec<RfmRecord> {
        let mut matched: Vec<RfmRecord> = self
            .customer_base()
            .into_iter()
            .filter(|r| needles.iter().any(|n| r.segment.contains(n)))
            .collect();
        matched.sort_by(|a, b| {
            b.monetary
                .total_cmp(&a.monetary)
                .then_with(|| a.customer_id.cmp(&b.customer_id))
        });
        matched.truncate(limit);
        matched
    }

    /// A plausible record for any requested id.
    pub fn customer_detail(&self, customer_id: &str) -> CustomerValue {
        let base = self.customer_base();
        let pick = customer_id
            .bytes()
            .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
            % base.len().max(1);
        let mut value = base
            .get(pick)
            .map(CustomerValue::from)
            .unwrap_or_else(|| CustomerValue {
                customer_id:           String::new(),
                total_spent:           0.0,
                total_orders:          0,
                avg_order_value:       0.0,
                days_since_last_order: 0,
                segment:               "New Customers".to_string(),
            });
        value.customer_id = customer_id.to_string();
        value
    }

    pub fn rfm_overview(&self) -> RfmOverview {
        let base = self.customer_base();
        let n = base.len().max(1) as f64;
        let total_value: f64 = base.iter().map(|r| r.monetary).sum();
        RfmOverview {
            total_customers:        base.len() as i64,
            average_recency_days:   base.iter().map(|r| r.recency_days as f64).sum::<f64>() / n,
            average_frequency:      base.iter().map(|r| r.frequency as f64).sum::<f64>() / n,
            average_customer_value: total_value / n,
            total_customer_value:   total_value,
            best_recency_days:      base.iter().map(|r| r.recency_days).min().unwrap_or(0),
            worst_recency_days:     base.iter().map(|r| r.recency_days).max().unwrap_or(0),
            max_frequency:          base.iter().map(|r| r.frequency).max().unwrap_or(0),
            max_customer_value:     base.iter().map(|r| r.monetary).fold(0.0, f64::max),
        }
    }

    // ── Forecast ─────────────────────────────────────────────────────────

    /// `days` days starting tomorrow, revenue rising 40 per day, ±15% band.
    pub fn forecast_daily(&self, days: usize) -> Vec<ForecastPoint> {
        (0..days)
            .map(|offset| {
                let date = self.today + Duration::days(offset as i64 + 1);
                let predicted_revenue = 1200.0 + 40.0 * offset as f64;
                ForecastPoint {
                    date,
                    predicted_revenue,
                    confidence_lower: predicted_revenue * 0.85,
                    confidence_upper: predicted_revenue * 1.15,
                    month: format!("{:04}-{:02}", date.year(), date.month()),
                }
            })
            .collect()
    }

    pub fn forecast_monthly(&self) -> Vec<MonthlyForecast> {
        let mut months: BTreeMap<String, f64> = BTreeMap::new();
        for p in self.forecast_daily(SAMPLE_FORECAST_DAYS) {
            *months.entry(p.month).or_insert(0.0) += p.predicted_revenue;
        }
        months
            .into_iter()
            .map(|(month, predicted_revenue)| MonthlyForecast { month, predicted_revenue })
            .collect()
    }

    pub fn forecast_summary(&self) -> AnalyticsResult<ForecastSummary> {
        insight_engine::summarize(&self.forecast_daily(SAMPLE_FORECAST_DAYS))
    }

    pub fn forecast_insights(&self) -> AnalyticsResult<ForecastInsight> {
        let history = self.daily_sales(SAMPLE_FORECAST_DAYS);
        insight_engine::build_insight(
            &self.forecast_daily(SAMPLE_FORECAST_DAYS),
            &self.forecast_monthly(),
            &history,
            self.today,
            SAMPLE_FORECAST_DAYS as i64,
        )
    }
}
