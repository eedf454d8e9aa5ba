//! JSON types for the web API.
//!
//! Request/response bodies live in the `fairway` lib; the error mapping to
//! HTTP status codes lives here.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub use fairway::{
    CompletedView, CreatePlacementRequest, ErrorResponse, PlacementResponse, PlacementView,
    PostSettingsResponse, ProximityResponse, SkillRequest, StatusResponse, UnitsQuery,
};
use fairway::EngineError;

/// Error answer for any endpoint.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: ErrorResponse {
                error: message.into(),
                detail: None,
            },
        }
    }

    /// The owning actor never answered.
    pub fn no_reply(from: &str) -> Self {
        Self {
            status: StatusCode::GATEWAY_TIMEOUT,
            body: ErrorResponse {
                error: format!("no reply from {from}"),
                detail: None,
            },
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        let status = match &e {
            EngineError::AlreadyInFlight | EngineError::NoActivePlacement => StatusCode::CONFLICT,
            EngineError::InvalidCoordinate { .. } | EngineError::UnknownSkillTier { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            EngineError::AdvisoryUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            body: e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::from(EngineError::AlreadyInFlight).status,
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(EngineError::NoActivePlacement).status,
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(EngineError::UnknownSkillTier { tier: "x".into() }).status,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(EngineError::InvalidCoordinate {
                latitude: 99.0,
                longitude: 0.0
            })
            .status,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::no_reply("placement").status, StatusCode::GATEWAY_TIMEOUT);
    }
}
