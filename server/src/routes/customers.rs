use analytics_core::{
    outcome::Served,
    service::{
        Query as AnalyticsQuery, QueryResponse, AT_RISK_LIMIT, CHAMPION_LIMIT, TOP_CUSTOMER_LIMIT,
    },
};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use super::LimitParams;
use crate::{error::ApiError, state::AppState};

type Reply = Result<Json<Served<QueryResponse>>, ApiError>;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/segments", get(segments))
        .route("/rfm/top", get(top))
        .route("/rfm/at-risk", get(at_risk))
        .route("/rfm/champions", get(champions))
        .route("/rfm/stats/overview", get(overview))
        .route("/rfm/{customer_id}", get(detail))
}

async fn segments(State(state): State<AppState>) -> Reply {
    Ok(Json(state.run(AnalyticsQuery::SegmentSummaries).await?))
}

async fn top(State(state): State<AppState>, Query(p): Query<LimitParams>) -> Reply {
    let limit = TOP_CUSTOMER_LIMIT.or_default(p.limit);
    Ok(Json(state.run(AnalyticsQuery::TopCustomers { limit }).await?))
}

async fn at_risk(State(state): State<AppState>, Query(p): Query<LimitParams>) -> Reply {
    let limit = AT_RISK_LIMIT.or_default(p.limit);
    Ok(Json(state.run(AnalyticsQuery::AtRiskCustomers { limit }).await?))
}

async fn champions(State(state): State<AppState>, Query(p): Query<LimitParams>) -> Reply {
    let limit = CHAMPION_LIMIT.or_default(p.limit);
    Ok(Json(state.run(AnalyticsQuery::ChampionCustomers { limit }).await?))
}

async fn overview(State(state): State<AppState>) -> Reply {
    Ok(Json(state.run(AnalyticsQuery::RfmOverview).await?))
}

async fn detail(State(state): State<AppState>, Path(customer_id): Path<String>) -> Reply {
    Ok(Json(state.run(AnalyticsQuery::CustomerDetail { customer_id }).await?))
}
