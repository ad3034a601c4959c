//! API request and response structures

use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{BackgroundResource, DisplayPreferences, TimerPhase, TimerState};

/// Timer state as observed by the UI boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerSummary {
    pub formatted_time: String,
    pub running: bool,
    pub can_start: bool,
    pub can_reset: bool,
    pub phase: TimerPhase,
    pub duration_seconds: u64,
    pub remaining_seconds: u64,
}

impl From<&TimerState> for TimerSummary {
    fn from(timer: &TimerState) -> Self {
        Self {
            formatted_time: timer.formatted_time(),
            running: timer.running,
            can_start: timer.can_start(),
            can_reset: timer.can_reset(),
            phase: timer.phase(),
            duration_seconds: timer.duration_seconds,
            remaining_seconds: timer.remaining_seconds,
        }
    }
}

/// Response for timer mutation endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerSummary,
}

impl TimerResponse {
    pub fn new(message: String, timer: &TimerState) -> Self {
        let status = if timer.running { "running" } else { "stopped" };
        Self {
            status: status.to_string(),
            message,
            timestamp: Utc::now(),
            timer: timer.into(),
        }
    }
}

/// Response for background mutation endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub background: BackgroundResource,
}

impl BackgroundResponse {
    pub fn installed(message: String, background: BackgroundResource) -> Self {
        Self {
            status: "installed".to_string(),
            message,
            timestamp: Utc::now(),
            background,
        }
    }
}

/// Full status response for the UI boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub timer: TimerSummary,
    pub background: BackgroundResource,
    pub generating: bool,
    pub fullscreen: bool,
    pub preferences: DisplayPreferences,
    pub last_expired_at: Option<DateTime<Utc>>,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Fullscreen mirror state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullscreenResponse {
    pub active: bool,
    pub timestamp: DateTime<Utc>,
}

impl FullscreenResponse {
    pub fn new(active: bool) -> Self {
        Self {
            active,
            timestamp: Utc::now(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: "1.0.0".to_string(),
        }
    }
}

/// Error payload with a user-visible message
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    pub code: StatusCode,
}

impl ErrorResponse {
    /// Rejected input; the caller should fix the request
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            status: "invalid".to_string(),
            message: message.into(),
            timestamp: Utc::now(),
            code: StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// Upstream failure; the caller may retry
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            timestamp: Utc::now(),
            code: StatusCode::BAD_GATEWAY,
        }
    }

    /// Requested resource does not exist
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: "not_found".to_string(),
            message: message.into(),
            timestamp: Utc::now(),
            code: StatusCode::NOT_FOUND,
        }
    }

    /// Internal failure
    pub fn internal() -> Self {
        Self {
            status: "error".to_string(),
            message: "Internal server error".to_string(),
            timestamp: Utc::now(),
            code: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.code, Json(self)).into_response()
    }
}

/// Body for POST /timer/duration
#[derive(Debug, Clone, Deserialize)]
pub struct DurationRequest {
    pub minutes: Option<i64>,
}

/// Body for POST /background/gallery
#[derive(Debug, Clone, Deserialize)]
pub struct GalleryPickRequest {
    pub url: String,
}

/// Body for POST /background/generate
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

/// Body for PUT /fullscreen
#[derive(Debug, Clone, Deserialize)]
pub struct FullscreenRequest {
    pub active: bool,
}
