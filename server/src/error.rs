use analytics_core::error::AnalyticsError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Analytics(AnalyticsError::InvalidInput { .. })
            | ApiError::Analytics(AnalyticsError::InvalidDate { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Analytics(AnalyticsError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Analytics(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request failed: {self}");
        }
        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}
