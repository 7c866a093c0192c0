//! Remote search service contract.
//!
//! The controller, lead board and CLI only see the `SearchService`, `LeadService`
//! and `ProfileService` traits; `HttpApiClient` is the production implementation over REST.

mod auth;
mod http;

pub use auth::{StaticToken, TokenProvider};
pub use http::HttpApiClient;

use crate::model::{
    AnalyticsQuery, ClientProfile, CreateSearchRequest, HistoryQuery, Lead, LeadDetail, LeadPage,
    LeadQuery, LeadUpdate, ProfileAnalytics, SearchHistory, SearchRun,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("authentication unavailable: {0}")]
    Auth(String),

    #[error("invalid service URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn status(status: StatusCode, detail: Option<&str>) -> Self {
        Self::Status {
            status,
            detail: detail.map(str::to_string),
        }
    }

    /// Message to surface to the user. The server's `detail` wins; otherwise
    /// transport and auth errors report themselves and bare HTTP failures use `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Status {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => detail.clone(),
            ApiError::Status { .. } => fallback.to_string(),
            ApiError::Transport(e) => {
                let msg = e.to_string();
                if msg.is_empty() {
                    fallback.to_string()
                } else {
                    msg
                }
            }
            ApiError::Auth(msg) | ApiError::InvalidUrl(msg) => msg.clone(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

/// Search endpoints consumed by the lifecycle controller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn create_search(&self, request: &CreateSearchRequest) -> Result<SearchRun, ApiError>;

    async fn get_search(&self, search_id: &str) -> Result<SearchRun, ApiError>;

    async fn cancel_search(&self, search_id: &str) -> Result<SearchRun, ApiError>;

    async fn list_searches(
        &self,
        client_profile_id: &str,
        query: &HistoryQuery,
    ) -> Result<SearchHistory, ApiError>;
}

/// Lead endpoints. Listings are scoped to the caller's active client profile.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeadService: Send + Sync {
    async fn list_leads(&self, query: &LeadQuery) -> Result<LeadPage, ApiError>;

    async fn get_lead(&self, lead_id: &str) -> Result<LeadDetail, ApiError>;

    async fn update_lead(&self, lead_id: &str, update: &LeadUpdate) -> Result<Lead, ApiError>;
}

/// Client-profile endpoints: which profile is active, and how its leads perform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileService: Send + Sync {
    /// `None` when the user has no active profile.
    async fn active_profile(&self) -> Result<Option<ClientProfile>, ApiError>;

    async fn profile_analytics(&self, query: &AnalyticsQuery) -> Result<ProfileAnalytics, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_is_preferred_over_fallback() {
        let err = ApiError::status(StatusCode::TOO_MANY_REQUESTS, Some("quota exceeded"));
        assert_eq!(err.user_message("Failed to start search"), "quota exceeded");
    }

    #[test]
    fn missing_or_blank_detail_uses_fallback() {
        let err = ApiError::status(StatusCode::INTERNAL_SERVER_ERROR, None);
        assert_eq!(err.user_message("Failed to start search"), "Failed to start search");
        let err = ApiError::status(StatusCode::BAD_GATEWAY, Some("  "));
        assert_eq!(err.user_message("Failed to cancel search"), "Failed to cancel search");
    }

    #[test]
    fn not_found_is_detected() {
        assert!(ApiError::status(StatusCode::NOT_FOUND, Some("Search not found")).is_not_found());
        assert!(!ApiError::Auth("no token".into()).is_not_found());
    }
}
