use analytics_core::{
    outcome::Served,
    service::{Query as AnalyticsQuery, QueryResponse, FORECAST_DAYS},
};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use super::DaysParams;
use crate::{error::ApiError, state::AppState};

type Reply = Result<Json<Served<QueryResponse>>, ApiError>;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/daily", get(daily))
        .route("/monthly", get(monthly))
        .route("/summary", get(summary))
        .route("/insights", get(insights))
}

async fn daily(State(state): State<AppState>, Query(p): Query<DaysParams>) -> Reply {
    let days = FORECAST_DAYS.or_default(p.days);
    Ok(Json(state.run(AnalyticsQuery::ForecastDaily { days }).await?))
}

async fn monthly(State(state): State<AppState>) -> Reply {
    Ok(Json(state.run(AnalyticsQuery::ForecastMonthly).await?))
}

async fn summary(State(state): State<AppState>) -> Reply {
    Ok(Json(state.run(AnalyticsQuery::ForecastSummary).await?))
}

async fn insights(State(state): State<AppState>) -> Reply {
    Ok(Json(state.run(AnalyticsQuery::ForecastInsights).await?))
}
