//! Query service: the read side.
//!
//! Every operation follows the same path:
//!   1. Validate parameters (out of range → InvalidInput, never clamped)
//!   2. Open a read-only connection and read one committed table version
//!   3. Decide from the DataOutcome: Rows/Empty are served live,
//!      Missing/Failed degrade to sample data (logged at warn)
//!   4. Round money and percentages for display
//!
//! The service never computes analytics; it only reads what the batch
//! engine committed.

use chrono::NaiveDate;
use serde::Serialize;
use std::time::Duration;

use crate::{
    aggregation_engine::{
        CountryAggregate, DailyAggregate, MonthlyAggregate, ProductAggregate, SalesSummary,
    },
    clock::local_today,
    config::AnalyticsConfig,
    error::{AnalyticsError, AnalyticsResult},
    fallback::SampleData,
    insight_engine::{ForecastInsight, ForecastSummary},
    model::{ForecastPoint, MonthlyForecast},
    outcome::{DataOutcome, LiveRows, RoundForDisplay, Served},
    rfm_engine::{CustomerValue, RfmOverview, RfmRecord, SegmentSummary},
    store::AnalyticsStore,
};

// ── Parameters ───────────────────────────────────────────────────────────────

/// Allowed range and default for one numeric request parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamRange {
    pub param:   &'static str,
    pub default: i64,
    pub min:     i64,
    pub max:     i64,
}

impl ParamRange {
    pub fn check(&self, value: i64) -> AnalyticsResult<usize> {
        if value < self.min || value > self.max {
            return Err(AnalyticsError::InvalidInput {
                param: self.param,
                value,
                min:   self.min,
                max:   self.max,
            });
        }
        Ok(value as usize)
    }

    pub fn or_default(&self, value: Option<i64>) -> i64 {
        value.unwrap_or(self.default)
    }
}

pub const DAILY_DAYS: ParamRange = ParamRange { param: "days", default: 30, min: 1, max: 365 };
pub const COUNTRY_LIMIT: ParamRange = ParamRange { param: "limit", default: 10, min: 1, max: 100 };
pub const PRODUCT_LIMIT: ParamRange = ParamRange { param: "limit", default: 10, min: 1, max: 100 };
pub const TOP_CUSTOMER_LIMIT: ParamRange = ParamRange { param: "limit", default: 10, min: 1, max: 100 };
pub const AT_RISK_LIMIT: ParamRange = ParamRange { param: "limit", default: 20, min: 1, max: 100 };
pub const CHAMPION_LIMIT: ParamRange = ParamRange { param: "limit", default: 10, min: 1, max: 50 };
pub const FORECAST_DAYS: ParamRange = ParamRange { param: "days", default: 30, min: 1, max: 90 };

/// Segment label substrings for the filtered customer lists.
pub const AT_RISK_NEEDLES: [&str; 2] = ["At Risk", "Lost"];
pub const CHAMPION_NEEDLES: [&str; 1] = ["Champion"];

// ── Query dispatch ───────────────────────────────────────────────────────────

/// Every read operation the service answers, with raw (unvalidated)
/// parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    SalesSummary,
    DailySales { days: i64 },
    TopCountries { limit: i64 },
    TopProducts { limit: i64 },
    MonthlyTrend { year: Option<i32> },
    SegmentSummaries,
    TopCustomers { limit: i64 },
    AtRiskCustomers { limit: i64 },
    ChampionCustomers { limit: i64 },
    CustomerDetail { customer_id: String },
    RfmOverview,
    ForecastDaily { days: i64 },
    ForecastMonthly,
    ForecastSummary,
    ForecastInsights,
}

impl Query {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SalesSummary           => "sales_summary",
            Self::DailySales { .. }      => "daily_sales",
            Self::TopCountries { .. }    => "top_countries",
            Self::TopProducts { .. }     => "top_products",
            Self::MonthlyTrend { .. }    => "monthly_trend",
            Self::SegmentSummaries       => "segment_summaries",
            Self::TopCustomers { .. }    => "top_customers",
            Self::AtRiskCustomers { .. } => "at_risk_customers",
            Self::ChampionCustomers { .. } => "champion_customers",
            Self::CustomerDetail { .. }  => "customer_detail",
            Self::RfmOverview            => "rfm_overview",
            Self::ForecastDaily { .. }   => "forecast_daily",
            Self::ForecastMonthly        => "forecast_monthly",
            Self::ForecastSummary        => "forecast_summary",
            Self::ForecastInsights       => "forecast_insights",
        }
    }

    /// Reject out-of-range parameters before any store access.
    pub fn validate(&self) -> AnalyticsResult<()> {
        match self {
            Self::DailySales { days } => DAILY_DAYS.check(*days).map(drop),
            Self::TopCountries { limit } => COUNTRY_LIMIT.check(*limit).map(drop),
            Self::TopProducts { limit } => PRODUCT_LIMIT.check(*limit).map(drop),
            Self::TopCustomers { limit } => TOP_CUSTOMER_LIMIT.check(*limit).map(drop),
            Self::AtRiskCustomers { limit } => AT_RISK_LIMIT.check(*limit).map(drop),
            Self::ChampionCustomers { limit } => CHAMPION_LIMIT.check(*limit).map(drop),
            Self::ForecastDaily { days } => FORECAST_DAYS.check(*days).map(drop),
            _ => Ok(()),
        }
    }
}

/// Any payload the service can return.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResponse {
    SalesSummary(SalesSummary),
    DailySales(Vec<DailyAggregate>),
    Countries(Vec<CountryAggregate>),
    Products(Vec<ProductAggregate>),
    Monthly(Vec<MonthlyAggregate>),
    Segments(Vec<SegmentSummary>),
    Customers(Vec<RfmRecord>),
    Customer(CustomerValue),
    RfmOverview(RfmOverview),
    ForecastDaily(Vec<ForecastPoint>),
    ForecastMonthly(Vec<MonthlyForecast>),
    ForecastSummary(ForecastSummary),
    ForecastInsight(ForecastInsight),
}

// ── Service ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AnalyticsService {
    db_path:       String,
    busy_timeout:  Duration,
    display_limit: usize,
    /// Pinned "today" for sample data; the local date when unset.
    today:         Option<NaiveDate>,
}

impl AnalyticsService {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            db_path:       config.database.path.clone(),
            busy_timeout:  config.database.busy_timeout(),
            display_limit: config.product_display_limit,
            today:         None,
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn samples(&self) -> SampleData {
        SampleData::new(self.today.unwrap_or_else(local_today), self.display_limit)
    }

    /// Validate and answer `query`.
    pub fn execute(&self, query: &Query) -> AnalyticsResult<Served<QueryResponse>> {
        use QueryResponse as R;
        Ok(match query {
            Query::SalesSummary => self.sales_summary()?.map(R::SalesSummary),
            Query::DailySales { days } => self.daily_sales(*days)?.map(R::DailySales),
            Query::TopCountries { limit } => self.top_countries(*limit)?.map(R::Countries),
            Query::TopProducts { limit } => self.top_products(*limit)?.map(R::Products),
            Query::MonthlyTrend { year } => self.monthly_trend(*year)?.map(R::Monthly),
            Query::SegmentSummaries => self.segment_summaries()?.map(R::Segments),
            Query::TopCustomers { limit } => self.top_customers(*limit)?.map(R::Customers),
            Query::AtRiskCustomers { limit } => self.at_risk_customers(*limit)?.map(R::Customers),
            Query::ChampionCustomers { limit } => {
                self.champion_customers(*limit)?.map(R::Customers)
            }
            Query::CustomerDetail { customer_id } => {
                self.customer_detail(customer_id)?.map(R::Customer)
            }
            Query::RfmOverview => self.rfm_overview()?.map(R::RfmOverview),
            Query::ForecastDaily { days } => self.forecast_daily(*days)?.map(R::ForecastDaily),
            Query::ForecastMonthly => self.forecast_monthly()?.map(R::ForecastMonthly),
            Query::ForecastSummary => self.forecast_summary()?.map(R::ForecastSummary),
            Query::ForecastInsights => self.forecast_insights()?.map(R::ForecastInsight),
        })
    }

    /// The sample payload for `query`, without touching the store. Used when
    /// the live read cannot finish in time.
    pub fn sample(&self, query: &Query) -> AnalyticsResult<Served<QueryResponse>> {
        use QueryResponse as R;
        query.validate()?;
        let s = self.samples();
        let payload = match query {
            Query::SalesSummary => R::SalesSummary(s.sales_summary().rounded()),
            Query::DailySales { days } => R::DailySales(s.daily_sales(*days as usize).rounded()),
            Query::TopCountries { limit } => R::Countries(s.top_countries(*limit as usize).rounded()),
            Query::TopProducts { limit } => R::Products(s.top_products(*limit as usize).rounded()),
            Query::MonthlyTrend { year } => R::Monthly(s.monthly_trend(*year).rounded()),
            Query::SegmentSummaries => R::Segments(s.segment_summaries().rounded()),
            Query::TopCustomers { limit } => R::Customers(s.top_customers(*limit as usize).rounded()),
            Query::AtRiskCustomers { limit } => {
                R::Customers(s.customers_matching(&AT_RISK_NEEDLES, *limit as usize).rounded())
            }
            Query::ChampionCustomers { limit } => {
                R::Customers(s.customers_matching(&CHAMPION_NEEDLES, *limit as usize).rounded())
            }
            Query::CustomerDetail { customer_id } => R::Customer(s.customer_detail(customer_id).rounded()),
            Query::RfmOverview => R::RfmOverview(s.rfm_overview().rounded()),
            Query::ForecastDaily { days } => R::ForecastDaily(s.forecast_daily(*days as usize).rounded()),
            Query::ForecastMonthly => R::ForecastMonthly(s.forecast_monthly().rounded()),
            Query::ForecastSummary => R::ForecastSummary(s.forecast_summary()?.rounded()),
            Query::ForecastInsights => R::ForecastInsight(s.forecast_insights()?.rounded()),
        };
        Ok(Served::sample(payload))
    }

    // ── Sales ─────────────────────────────────────────────────────────────

    pub fn sales_summary(&self) -> AnalyticsResult<Served<SalesSummary>> {
        self.serve_one(
            "sales_summary",
            AnalyticsStore::sales_summary,
            |s| Ok(s.sales_summary()),
            || Ok(None),
        )
    }

    pub fn daily_sales(&self, days: i64) -> AnalyticsResult<Served<Vec<DailyAggregate>>> {
        let days = DAILY_DAYS.check(days)?;
        self.serve_list(
            "daily_sales",
            |store| store.daily_sales(days),
            |s| Ok(s.daily_sales(days)),
        )
    }

    pub fn top_countries(&self, limit: i64) -> AnalyticsResult<Served<Vec<CountryAggregate>>> {
        let limit = COUNTRY_LIMIT.check(limit)?;
        self.serve_list(
            "top_countries",
            |store| store.top_countries(limit),
            |s| Ok(s.top_countries(limit)),
        )
    }

    pub fn top_products(&self, limit: i64) -> AnalyticsResult<Served<Vec<ProductAggregate>>> {
        let limit = PRODUCT_LIMIT.check(limit)?;
        self.serve_list(
            "top_products",
            |store| store.top_products(limit),
            |s| Ok(s.top_products(limit)),
        )
    }

    pub fn monthly_trend(&self, year: Option<i32>) -> AnalyticsResult<Served<Vec<MonthlyAggregate>>> {
        self.serve_list(
            "monthly_trend",
            |store| store.monthly_trend(year),
            |s| Ok(s.monthly_trend(year)),
        )
    }

    // ── Customers ─────────────────────────────────────────────────────────

    pub fn segment_summaries(&self) -> AnalyticsResult<Served<Vec<SegmentSummary>>> {
        self.serve_list(
            "segment_summaries",
            AnalyticsStore::segment_summaries,
            |s| Ok(s.segment_summaries()),
        )
    }

    pub fn top_customers(&self, limit: i64) -> AnalyticsResult<Served<Vec<RfmRecord>>> {
        let limit = TOP_CUSTOMER_LIMIT.check(limit)?;
        self.serve_list(
            "top_customers",
            |store| store.top_customers(limit),
            |s| Ok(s.top_customers(limit)),
        )
    }

    pub fn at_risk_customers(&self, limit: i64) -> AnalyticsResult<Served<Vec<RfmRecord>>> {
        let limit = AT_RISK_LIMIT.check(limit)?;
        self.serve_list(
            "at_risk_customers",
            |store| store.customers_matching(&AT_RISK_NEEDLES, limit),
            |s| Ok(s.customers_matching(&AT_RISK_NEEDLES, limit)),
        )
    }

    pub fn champion_customers(&self, limit: i64) -> AnalyticsResult<Served<Vec<RfmRecord>>> {
        let limit = CHAMPION_LIMIT.check(limit)?;
        self.serve_list(
            "champion_customers",
            |store| store.customers_matching(&CHAMPION_NEEDLES, limit),
            |s| Ok(s.customers_matching(&CHAMPION_NEEDLES, limit)),
        )
    }

    /// Single-key lookup. An absent customer in a populated table is
    /// `NotFound`; an unreadable table serves a sample record.
    pub fn customer_detail(&self, customer_id: &str) -> AnalyticsResult<Served<CustomerValue>> {
        self.serve_one(
            "customer_detail",
            |store| store.customer(customer_id).map(|l| l.map(|r| CustomerValue::from(&r))),
            |s| Ok(s.customer_detail(customer_id)),
            || {
                Err(AnalyticsError::NotFound {
                    customer_id: customer_id.to_string(),
                })
            },
        )
    }

    pub fn rfm_overview(&self) -> AnalyticsResult<Served<RfmOverview>> {
        self.serve_one(
            "rfm_overview",
            AnalyticsStore::rfm_overview,
            |s| Ok(s.rfm_overview()),
            || {
                Ok(Some(RfmOverview {
                    total_customers:        0,
                    average_recency_days:   0.0,
                    average_frequency:      0.0,
                    average_customer_value: 0.0,
                    total_customer_value:   0.0,
                    best_recency_days:      0,
                    worst_recency_days:     0,
                    max_frequency:          0,
                    max_customer_value:     0.0,
                }))
            },
        )
    }

    // ── Forecast ──────────────────────────────────────────────────────────

    pub fn forecast_daily(&self, days: i64) -> AnalyticsResult<Served<Vec<ForecastPoint>>> {
        let days = FORECAST_DAYS.check(days)?;
        self.serve_list(
            "forecast_daily",
            |store| store.forecast_daily(days),
            |s| Ok(s.forecast_daily(days)),
        )
    }

    pub fn forecast_monthly(&self) -> AnalyticsResult<Served<Vec<MonthlyForecast>>> {
        self.serve_list(
            "forecast_monthly",
            AnalyticsStore::forecast_monthly,
            |s| Ok(s.forecast_monthly()),
        )
    }

    pub fn forecast_summary(&self) -> AnalyticsResult<Served<ForecastSummary>> {
        self.serve_one(
            "forecast_summary",
            |store| store.forecast_insight().map(|l| l.map(|i| i.summary)),
            SampleData::forecast_summary,
            || Ok(None),
        )
    }

    pub fn forecast_insights(&self) -> AnalyticsResult<Served<ForecastInsight>> {
        self.serve_one(
            "forecast_insights",
            AnalyticsStore::forecast_insight,
            SampleData::forecast_insights,
            || Ok(None),
        )
    }

    // ── Outcome handling ──────────────────────────────────────────────────

    fn open(&self) -> AnalyticsResult<AnalyticsStore> {
        AnalyticsStore::open_read_only(&self.db_path, self.busy_timeout)
    }

    fn read<T, F>(&self, read: F) -> DataOutcome<LiveRows<T>>
    where
        F: FnOnce(&AnalyticsStore) -> DataOutcome<LiveRows<T>>,
    {
        match self.open() {
            Ok(store) => read(&store),
            Err(e) => DataOutcome::Failed(e),
        }
    }

    fn serve_list<T, F, G>(&self, op: &'static str, read: F, sample: G) -> AnalyticsResult<Served<Vec<T>>>
    where
        T: RoundForDisplay,
        F: FnOnce(&AnalyticsStore) -> DataOutcome<LiveRows<Vec<T>>>,
        G: FnOnce(&SampleData) -> AnalyticsResult<Vec<T>>,
    {
        self.serve_one(op, read, sample, || Ok(Some(Vec::new())))
    }

    /// `on_empty` decides what a populated table with no matching row
    /// means: a live value, `None` for sample data, or a caller error.
    fn serve_one<T, F, G, E>(
        &self,
        op: &'static str,
        read: F,
        sample: G,
        on_empty: E,
    ) -> AnalyticsResult<Served<T>>
    where
        T: RoundForDisplay,
        F: FnOnce(&AnalyticsStore) -> DataOutcome<LiveRows<T>>,
        G: FnOnce(&SampleData) -> AnalyticsResult<T>,
        E: FnOnce() -> AnalyticsResult<Option<T>>,
    {
        match self.read(read) {
            DataOutcome::Rows(live) => Ok(Served::live(live.data.rounded(), live.as_of)),
            DataOutcome::Empty => match on_empty()? {
                Some(data) => Ok(Served::live(data.rounded(), None)),
                None => {
                    log::warn!("{op}: table committed without rows, serving sample data");
                    self.serve_sample(sample)
                }
            },
            DataOutcome::Missing { table } => {
                log::warn!("{op}: {table} is missing or unpopulated, serving sample data");
                self.serve_sample(sample)
            }
            DataOutcome::Failed(e) => {
                log::warn!("{op}: read failed ({e}), serving sample data");
                self.serve_sample(sample)
            }
        }
    }

    fn serve_sample<T, G>(&self, sample: G) -> AnalyticsResult<Served<T>>
    where
        T: RoundForDisplay,
        G: FnOnce(&SampleData) -> AnalyticsResult<T>,
    {
        Ok(Served::sample(sample(&self.samples())?.rounded()))
    }
}
