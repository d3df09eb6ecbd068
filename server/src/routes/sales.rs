use analytics_core::{
    outcome::Served,
    service::{Query as AnalyticsQuery, QueryResponse, COUNTRY_LIMIT, DAILY_DAYS, PRODUCT_LIMIT},
};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::{DaysParams, LimitParams};
use crate::{error::ApiError, state::AppState};

type Reply = Result<Json<Served<QueryResponse>>, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct YearParams {
    pub year: Option<i32>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/summary", get(summary))
        .route("/daily", get(daily))
        .route("/countries", get(countries))
        .route("/products", get(products))
        .route("/monthly", get(monthly))
}

async fn summary(State(state): State<AppState>) -> Reply {
    Ok(Json(state.run(AnalyticsQuery::SalesSummary).await?))
}

async fn daily(State(state): State<AppState>, Query(p): Query<DaysParams>) -> Reply {
    let days = DAILY_DAYS.or_default(p.days);
    Ok(Json(state.run(AnalyticsQuery::DailySales { days }).await?))
}

async fn countries(State(state): State<AppState>, Query(p): Query<LimitParams>) -> Reply {
    let limit = COUNTRY_LIMIT.or_default(p.limit);
    Ok(Json(state.run(AnalyticsQuery::TopCountries { limit }).await?))
}

async fn products(State(state): State<AppState>, Query(p): Query<LimitParams>) -> Reply {
    let limit = PRODUCT_LIMIT.or_default(p.limit);
    Ok(Json(state.run(AnalyticsQuery::TopProducts { limit }).await?))
}

async fn monthly(State(state): State<AppState>, Query(p): Query<YearParams>) -> Reply {
    Ok(Json(state.run(AnalyticsQuery::MonthlyTrend { year: p.year }).await?))
}
