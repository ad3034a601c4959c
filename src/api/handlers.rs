//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Json},
};
use tracing::{error, info, warn};

use crate::{
    services::styled_prompt,
    state::{AppState, BackgroundUpdateError, DisplayPreferences, CURATED_GALLERY},
};

use super::responses::{
    BackgroundResponse, DurationRequest, ErrorResponse, FullscreenRequest, FullscreenResponse,
    GalleryPickRequest, GenerateRequest, HealthResponse, StatusResponse, TimerResponse,
};

/// Handle POST /timer/start-pause - Toggle the countdown
pub async fn start_pause_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TimerResponse>, ErrorResponse> {
    let before = state.get_timer_state().map_err(log_internal)?;
    let timer = state.start_pause().map_err(log_internal)?;

    let message = if timer.running {
        "Countdown started"
    } else if !before.can_start() {
        // Expired timers cannot start; only reset or a duration change can
        "Countdown expired, start ignored"
    } else {
        "Countdown paused"
    };

    info!("Start-pause endpoint called: {}", message);
    Ok(Json(TimerResponse::new(message.to_string(), &timer)))
}

/// Handle POST /timer/reset - Restore the configured duration
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TimerResponse>, ErrorResponse> {
    let timer = state.reset().map_err(log_internal)?;
    info!("Reset endpoint called");
    Ok(Json(TimerResponse::new("Countdown reset".to_string(), &timer)))
}

/// Handle POST /timer/duration - Set the countdown length in minutes
pub async fn duration_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DurationRequest>,
) -> Result<Json<TimerResponse>, ErrorResponse> {
    let timer = state.set_duration(request.minutes).map_err(log_internal)?;
    Ok(Json(TimerResponse::new(
        format!("Duration set to {} minutes", timer.duration_seconds / 60),
        &timer,
    )))
}

/// Handle GET /status - Full observed state for the UI boundary
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, ErrorResponse> {
    let timer = state.get_timer_state().map_err(log_internal)?;
    let background = state.get_background().map_err(log_internal)?;
    let preferences = state.get_preferences().map_err(log_internal)?;
    let fullscreen = state.is_fullscreen().map_err(log_internal)?;
    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timer: (&timer).into(),
        background,
        generating: state.is_generating(),
        fullscreen,
        preferences,
        last_expired_at: state.get_last_expired_at(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Handle GET /gallery - Curated gallery entries
pub async fn gallery_handler() -> impl IntoResponse {
    Json(CURATED_GALLERY)
}

/// Handle GET /background - Current background resource
pub async fn background_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let background = state.get_background().map_err(log_internal)?;
    Ok(Json(background))
}

/// Handle GET /background/data - Bytes of the live local allocation
pub async fn background_data_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ErrorResponse> {
    match state.current_background_blob().map_err(log_internal)? {
        Some(blob) => Ok(([(header::CONTENT_TYPE, blob.mime_type)], blob.bytes)),
        None => Err(ErrorResponse::not_found(
            "Current background is not locally allocated",
        )),
    }
}

/// Handle POST /background/gallery - Install a gallery pick
pub async fn select_gallery_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GalleryPickRequest>,
) -> Result<Json<BackgroundResponse>, ErrorResponse> {
    let background = state
        .set_background_from_url(&request.url)
        .map_err(log_internal)?;
    Ok(Json(BackgroundResponse::installed(
        "Background selected".to_string(),
        background,
    )))
}

/// Handle POST /background/upload - Install an uploaded image
///
/// The raw request body is the file; the Content-Type header carries the
/// mime type and must be `image/*`.
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<BackgroundResponse>, ErrorResponse> {
    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    match state.set_background_from_upload(body.to_vec(), mime_type) {
        Ok(background) => Ok(Json(BackgroundResponse::installed(
            "Background uploaded".to_string(),
            background,
        ))),
        Err(BackgroundUpdateError::Validation(e)) => {
            warn!("Upload rejected: {}", e);
            Err(ErrorResponse::validation(e.to_string()))
        }
        Err(BackgroundUpdateError::Internal(e)) => Err(log_internal(e)),
    }
}

/// Handle POST /background/generate - Generate a background image
pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<BackgroundResponse>, ErrorResponse> {
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        warn!("Generate endpoint called with an empty prompt");
        return Err(ErrorResponse::validation("Please enter a prompt"));
    }

    let guard = GeneratingGuard::arm(&state);
    let result = state.generator.generate(&styled_prompt(prompt)).await;
    drop(guard);

    match result {
        Ok(image) => {
            let background = state
                .install_generated_background(image.to_data_url())
                .map_err(log_internal)?;
            info!("Generate endpoint installed a new background");
            Ok(Json(BackgroundResponse::installed(
                "Background generated".to_string(),
                background,
            )))
        }
        Err(e) => {
            error!("Image generation failed: {}", e);
            Err(ErrorResponse::retryable(
                "Failed to generate image. Please try again.",
            ))
        }
    }
}

/// Handle GET /preferences - Current display preferences
pub async fn preferences_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let preferences = state.get_preferences().map_err(log_internal)?;
    Ok(Json(preferences))
}

/// Handle PUT /preferences - Update and persist display preferences
pub async fn set_preferences_handler(
    State(state): State<Arc<AppState>>,
    Json(preferences): Json<DisplayPreferences>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let preferences = state.set_preferences(preferences).map_err(log_internal)?;
    info!("Preferences updated");
    Ok(Json(preferences))
}

/// Handle POST /fullscreen/toggle - Toggle the fullscreen mirror
pub async fn fullscreen_toggle_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FullscreenResponse>, ErrorResponse> {
    let active = state.toggle_fullscreen().map_err(log_internal)?;
    Ok(Json(FullscreenResponse::new(active)))
}

/// Handle PUT /fullscreen - Mirror a host-reported fullscreen change
pub async fn fullscreen_set_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FullscreenRequest>,
) -> Result<Json<FullscreenResponse>, ErrorResponse> {
    let active = state.set_fullscreen(request.active).map_err(log_internal)?;
    Ok(Json(FullscreenResponse::new(active)))
}

/// Keeps the generating flag set for the lifetime of a generation call
///
/// The flag is cleared on drop, so a handler future dropped at the await
/// point (client disconnect) cannot leave it stuck at true.
struct GeneratingGuard(Arc<AppState>);

impl GeneratingGuard {
    fn arm(state: &Arc<AppState>) -> Self {
        state.set_generating(true);
        Self(Arc::clone(state))
    }
}

impl Drop for GeneratingGuard {
    fn drop(&mut self) {
        self.0.set_generating(false);
    }
}

fn log_internal(e: String) -> ErrorResponse {
    error!("Internal state error: {}", e);
    ErrorResponse::internal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use crate::services::MockImageGenerator;
    use crate::state::Ownership;

    fn test_state(generator: MockImageGenerator) -> Arc<AppState> {
        Arc::new(AppState::new(
            0,
            "127.0.0.1".to_string(),
            5,
            DisplayPreferences::new(),
            std::env::temp_dir().join("backdrop-timer-handler-prefs.json"),
            Arc::new(generator),
        ))
    }

    #[tokio::test]
    async fn status_reports_formatted_time_and_capabilities() {
        let state = test_state(MockImageGenerator::success("image/jpeg", vec![1]));
        let Json(status) = status_handler(State(state)).await.unwrap();

        assert_eq!(status.timer.formatted_time, "05:00");
        assert!(status.timer.can_start);
        assert!(!status.timer.can_reset);
        assert!(!status.timer.running);
        assert!(!status.generating);
        assert_eq!(status.preferences.text_color, "#FFFFFF");
        assert_eq!(status.background.ownership, Ownership::Remote);
    }

    #[tokio::test]
    async fn start_pause_at_zero_reports_no_op() {
        let state = test_state(MockImageGenerator::success("image/jpeg", vec![1]));
        state.set_duration(Some(1)).unwrap();
        state.start_pause().unwrap();
        for _ in 0..60 {
            state.apply_tick().unwrap();
        }

        let Json(response) = start_pause_handler(State(Arc::clone(&state))).await.unwrap();
        assert_eq!(response.message, "Countdown expired, start ignored");
        assert!(!response.timer.running);
        assert_eq!(response.timer.remaining_seconds, 0);
    }

    #[tokio::test]
    async fn duration_endpoint_clamps_input() {
        let state = test_state(MockImageGenerator::success("image/jpeg", vec![1]));

        let Json(response) = duration_handler(
            State(Arc::clone(&state)),
            Json(DurationRequest { minutes: Some(90) }),
        )
        .await
        .unwrap();
        assert_eq!(response.timer.duration_seconds, 3600);

        let Json(response) = duration_handler(
            State(state),
            Json(DurationRequest { minutes: None }),
        )
        .await
        .unwrap();
        assert_eq!(response.timer.duration_seconds, 60);
    }

    #[tokio::test]
    async fn generate_with_empty_prompt_is_rejected_without_calling_the_client() {
        let generator = MockImageGenerator::success("image/jpeg", vec![1]);
        let state = test_state(generator);
        let before = state.get_background().unwrap();

        let err = generate_handler(
            State(Arc::clone(&state)),
            Json(GenerateRequest {
                prompt: "   ".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.code, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.message, "Please enter a prompt");
        assert_eq!(state.get_background().unwrap().url, before.url);
    }

    #[tokio::test]
    async fn generate_success_installs_inline_image_and_releases_local_upload() {
        let state = test_state(MockImageGenerator::success("image/jpeg", vec![1, 2, 3]));
        state
            .set_background_from_upload(vec![7], "image/png")
            .unwrap();

        let Json(response) = generate_handler(
            State(Arc::clone(&state)),
            Json(GenerateRequest {
                prompt: "beach".to_string(),
            }),
        )
        .await
        .unwrap();

        assert!(response.background.url.starts_with("data:image/jpeg;base64,"));
        assert_eq!(response.background.ownership, Ownership::Remote);

        let registry = state.background.lock().unwrap();
        assert_eq!(registry.live_allocations(), 0);
        assert_eq!(registry.released_count(), 1);
    }

    #[tokio::test]
    async fn generate_failure_is_retryable_and_leaves_state_unchanged() {
        let state = test_state(MockImageGenerator::failure());
        let before = state.get_background().unwrap();

        let err = generate_handler(
            State(Arc::clone(&state)),
            Json(GenerateRequest {
                prompt: "beach".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.code, StatusCode::BAD_GATEWAY);
        assert_eq!(state.get_background().unwrap().url, before.url);
        assert!(!state.is_generating());
    }

    #[tokio::test]
    async fn dropped_generate_call_clears_the_generating_flag() {
        let state = test_state(MockImageGenerator::stalled());

        let mut call = Box::pin(generate_handler(
            State(Arc::clone(&state)),
            Json(GenerateRequest {
                prompt: "beach".to_string(),
            }),
        ));

        // The stalled client keeps the call in flight
        assert!(futures::poll!(call.as_mut()).is_pending());
        assert!(state.is_generating());

        // Client disconnect drops the handler future mid-call; the flag
        // must not stay wedged at true.
        drop(call);
        assert!(!state.is_generating());
    }

    #[tokio::test]
    async fn upload_rejects_non_image_payloads() {
        let state = test_state(MockImageGenerator::success("image/jpeg", vec![1]));

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());

        let err = upload_handler(State(Arc::clone(&state)), headers, Bytes::from_static(b"hi"))
            .await
            .unwrap_err();
        assert_eq!(err.code, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(state.background.lock().unwrap().live_allocations(), 0);
    }

    #[tokio::test]
    async fn upload_then_data_round_trip() {
        let state = test_state(MockImageGenerator::success("image/jpeg", vec![1]));

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "image/png".parse().unwrap());

        let Json(response) = upload_handler(
            State(Arc::clone(&state)),
            headers,
            Bytes::from_static(&[9, 8, 7]),
        )
        .await
        .unwrap();
        assert_eq!(response.background.ownership, Ownership::LocallyAllocated);

        let blob = state.current_background_blob().unwrap().unwrap();
        assert_eq!(blob.bytes, vec![9, 8, 7]);
        assert_eq!(blob.mime_type, "image/png");
    }

    #[tokio::test]
    async fn gallery_pick_installs_remote_resource() {
        let state = test_state(MockImageGenerator::success("image/jpeg", vec![1]));

        let Json(response) = select_gallery_handler(
            State(state),
            Json(GalleryPickRequest {
                url: CURATED_GALLERY[1].full.to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.background.url, CURATED_GALLERY[1].full);
        assert_eq!(response.background.ownership, Ownership::Remote);
    }
}
