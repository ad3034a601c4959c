//! Main application state management

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Instant,
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::services::ImageGenerator;

use super::{
    BackgroundError, BackgroundRegistry, BackgroundResource, Blob, DisplayPreferences,
    TickOutcome, TimerState,
};

/// Errors from background mutations routed through [`AppState`]
#[derive(Debug, Error)]
pub enum BackgroundUpdateError {
    /// User input rejected; state is unchanged
    #[error(transparent)]
    Validation(#[from] BackgroundError),
    /// Internal failure (lock poisoning)
    #[error("{0}")]
    Internal(String),
}

/// Main application state shared between handlers and the countdown task
#[derive(Debug)]
pub struct AppState {
    /// Countdown timer state machine
    pub timer: Arc<Mutex<TimerState>>,
    /// Background resource ownership and allocations
    pub background: Arc<Mutex<BackgroundRegistry>>,
    /// Persisted display preferences and their storage location
    pub preferences: Arc<Mutex<DisplayPreferences>>,
    pub preferences_path: PathBuf,
    /// Mirror of the host viewport's fullscreen flag
    pub fullscreen: Arc<Mutex<bool>>,
    /// Whether an image generation request is in flight
    pub generating: Arc<Mutex<bool>>,
    /// Image generation collaborator
    pub generator: Arc<dyn ImageGenerator>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// When the countdown last ran to zero
    pub last_expired_at: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Channel for timer change notifications (drives the countdown task)
    pub timer_change_tx: broadcast::Sender<TimerState>,
    /// Channel for timer observation by the UI boundary
    pub timer_update_tx: watch::Sender<TimerState>,
    /// Channel for expiry notices
    pub expiry_tx: broadcast::Sender<DateTime<Utc>>,
    /// Keep the receivers alive to prevent channel closure
    pub _timer_update_rx: watch::Receiver<TimerState>,
    pub _expiry_rx: broadcast::Receiver<DateTime<Utc>>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(
        port: u16,
        host: String,
        default_duration_minutes: u64,
        preferences: DisplayPreferences,
        preferences_path: PathBuf,
        generator: Arc<dyn ImageGenerator>,
    ) -> Self {
        let timer = TimerState::with_duration(default_duration_minutes);
        let (timer_change_tx, _) = broadcast::channel(100);
        let (timer_update_tx, timer_update_rx) = watch::channel(timer.clone());
        let (expiry_tx, expiry_rx) = broadcast::channel(16);

        Self {
            timer: Arc::new(Mutex::new(timer)),
            background: Arc::new(Mutex::new(BackgroundRegistry::new())),
            preferences: Arc::new(Mutex::new(preferences)),
            preferences_path,
            fullscreen: Arc::new(Mutex::new(false)),
            generating: Arc::new(Mutex::new(false)),
            generator,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
            last_expired_at: Arc::new(Mutex::new(None)),
            timer_change_tx,
            timer_update_tx,
            expiry_tx,
            _timer_update_rx: timer_update_rx,
            _expiry_rx: expiry_rx,
        }
    }

    /// Apply a timer mutation and notify change listeners
    pub fn update_timer<F>(&self, action: &str, updater: F) -> Result<TimerState, String>
    where
        F: FnOnce(&mut TimerState),
    {
        let mut timer = self
            .timer
            .lock()
            .map_err(|e| format!("Failed to lock timer state: {}", e))?;

        updater(&mut timer);
        let new_timer = timer.clone();
        drop(timer); // Release the lock early

        // Update last action tracking
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }

        self.notify_timer_change(&new_timer);
        Ok(new_timer)
    }

    fn notify_timer_change(&self, timer: &TimerState) {
        // The countdown task may not be subscribed yet during startup
        if let Err(e) = self.timer_change_tx.send(timer.clone()) {
            warn!("Failed to send timer change notification: {}", e);
        }
        if let Err(e) = self.timer_update_tx.send(timer.clone()) {
            warn!("Failed to send timer update: {}", e);
        }
    }

    /// Set the countdown duration (clamped to 1-60 minutes)
    pub fn set_duration(&self, minutes: Option<i64>) -> Result<TimerState, String> {
        info!("Setting timer duration to: {:?} minutes", minutes);
        self.update_timer("set-duration", |timer| timer.set_duration(minutes))
    }

    /// Toggle the countdown between running and paused
    pub fn start_pause(&self) -> Result<TimerState, String> {
        self.update_timer("start-pause", |timer| timer.start_pause())
    }

    /// Stop the countdown and restore the configured duration
    pub fn reset(&self) -> Result<TimerState, String> {
        self.update_timer("reset", |timer| timer.reset())
    }

    /// Apply one scheduler tick and publish an expiry notice when the
    /// countdown runs to zero
    pub fn apply_tick(&self) -> Result<(TimerState, TickOutcome), String> {
        let mut timer = self
            .timer
            .lock()
            .map_err(|e| format!("Failed to lock timer state: {}", e))?;

        let outcome = timer.tick();
        let new_timer = timer.clone();
        drop(timer);

        if outcome == TickOutcome::Ignored {
            return Ok((new_timer, outcome));
        }

        if outcome == TickOutcome::Expired {
            let now = Utc::now();
            if let Ok(mut expired_at) = self.last_expired_at.lock() {
                *expired_at = Some(now);
            }
            info!("Countdown expired: time is up");
            if let Err(e) = self.expiry_tx.send(now) {
                warn!("Failed to send expiry notice: {}", e);
            }
        }

        self.notify_timer_change(&new_timer);
        Ok((new_timer, outcome))
    }

    /// Get current timer state
    pub fn get_timer_state(&self) -> Result<TimerState, String> {
        self.timer
            .lock()
            .map(|timer| timer.clone())
            .map_err(|e| format!("Failed to lock timer state: {}", e))
    }

    /// Record a non-timer action for status reporting
    pub fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Install a remote URL as the background
    pub fn set_background_from_url(&self, url: &str) -> Result<BackgroundResource, String> {
        let mut registry = self
            .background
            .lock()
            .map_err(|e| format!("Failed to lock background registry: {}", e))?;

        let resource = registry.set_remote(url).clone();
        drop(registry);

        info!("Background set from remote URL: {}", url);
        self.record_action("select-background");
        Ok(resource)
    }

    /// Install an uploaded file as the background
    pub fn set_background_from_upload(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> Result<BackgroundResource, BackgroundUpdateError> {
        let mut registry = self
            .background
            .lock()
            .map_err(|e| {
                BackgroundUpdateError::Internal(format!(
                    "Failed to lock background registry: {}",
                    e
                ))
            })?;

        let resource = registry.set_uploaded(bytes, mime_type)?.clone();
        drop(registry);

        info!("Background set from uploaded file: {}", resource.url);
        self.record_action("upload-background");
        Ok(resource)
    }

    /// Install a generated inline image as the background
    pub fn install_generated_background(
        &self,
        data_url: String,
    ) -> Result<BackgroundResource, String> {
        let mut registry = self
            .background
            .lock()
            .map_err(|e| format!("Failed to lock background registry: {}", e))?;

        let resource = registry.install_generated(data_url).clone();
        drop(registry);

        info!("Background set from generated image");
        self.record_action("generate-background");
        Ok(resource)
    }

    /// Get the current background resource
    pub fn get_background(&self) -> Result<BackgroundResource, String> {
        self.background
            .lock()
            .map(|registry| registry.current().clone())
            .map_err(|e| format!("Failed to lock background registry: {}", e))
    }

    /// Payload of the live local allocation, if the current background is one
    pub fn current_background_blob(&self) -> Result<Option<Blob>, String> {
        self.background
            .lock()
            .map(|registry| registry.current_blob().cloned())
            .map_err(|e| format!("Failed to lock background registry: {}", e))
    }

    /// Mark whether a generation request is in flight
    pub fn set_generating(&self, generating: bool) {
        if let Ok(mut flag) = self.generating.lock() {
            *flag = generating;
        }
    }

    /// Check whether a generation request is in flight
    pub fn is_generating(&self) -> bool {
        self.generating.lock().map(|flag| *flag).unwrap_or(false)
    }

    /// Toggle the fullscreen mirror flag
    pub fn toggle_fullscreen(&self) -> Result<bool, String> {
        let mut fullscreen = self
            .fullscreen
            .lock()
            .map_err(|e| format!("Failed to lock fullscreen flag: {}", e))?;
        *fullscreen = !*fullscreen;
        let active = *fullscreen;
        drop(fullscreen);

        info!("Fullscreen toggled to: {}", active);
        Ok(active)
    }

    /// Set the fullscreen mirror flag to what the host reports
    pub fn set_fullscreen(&self, active: bool) -> Result<bool, String> {
        let mut fullscreen = self
            .fullscreen
            .lock()
            .map_err(|e| format!("Failed to lock fullscreen flag: {}", e))?;
        *fullscreen = active;
        Ok(active)
    }

    /// Read the fullscreen mirror flag
    pub fn is_fullscreen(&self) -> Result<bool, String> {
        self.fullscreen
            .lock()
            .map(|flag| *flag)
            .map_err(|e| format!("Failed to lock fullscreen flag: {}", e))
    }

    /// Get current display preferences
    pub fn get_preferences(&self) -> Result<DisplayPreferences, String> {
        self.preferences
            .lock()
            .map(|prefs| prefs.clone())
            .map_err(|e| format!("Failed to lock preferences: {}", e))
    }

    /// Update display preferences and persist them
    ///
    /// Preferences are best-effort: a failed write is logged but does not
    /// fail the update.
    pub fn set_preferences(&self, new_prefs: DisplayPreferences) -> Result<DisplayPreferences, String> {
        let mut prefs = self
            .preferences
            .lock()
            .map_err(|e| format!("Failed to lock preferences: {}", e))?;
        *prefs = new_prefs.clone();
        drop(prefs);

        if let Err(e) = new_prefs.save(&self.preferences_path) {
            warn!("Failed to persist preferences: {}", e);
        }
        self.record_action("set-preferences");
        Ok(new_prefs)
    }

    /// When the countdown last ran to zero
    pub fn get_last_expired_at(&self) -> Option<DateTime<Utc>> {
        self.last_expired_at.lock().ok().and_then(|t| *t)
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockImageGenerator;

    fn test_state() -> AppState {
        let dir = std::env::temp_dir().join("backdrop-timer-test-prefs.json");
        AppState::new(
            0,
            "127.0.0.1".to_string(),
            5,
            DisplayPreferences::new(),
            dir,
            Arc::new(MockImageGenerator::success("image/jpeg", vec![1, 2, 3])),
        )
    }

    #[test]
    fn start_pause_round_trip() {
        let state = test_state();
        let running = state.start_pause().unwrap();
        assert!(running.running);

        let paused = state.start_pause().unwrap();
        assert!(!paused.running);
    }

    #[test]
    fn apply_tick_outside_running_is_ignored() {
        let state = test_state();
        let (timer, outcome) = state.apply_tick().unwrap();
        assert_eq!(outcome, TickOutcome::Ignored);
        assert_eq!(timer.remaining_seconds, 300);
    }

    #[test]
    fn expiry_notice_fires_exactly_once() {
        let state = test_state();
        let mut expiry_rx = state.expiry_tx.subscribe();

        state.set_duration(Some(1)).unwrap();
        state.start_pause().unwrap();

        let mut expirations = 0;
        for _ in 0..65 {
            let (_, outcome) = state.apply_tick().unwrap();
            if outcome == TickOutcome::Expired {
                expirations += 1;
            }
        }
        assert_eq!(expirations, 1);
        assert!(state.get_last_expired_at().is_some());

        // Exactly one notice was published
        assert!(expiry_rx.try_recv().is_ok());
        assert!(expiry_rx.try_recv().is_err());
    }

    #[test]
    fn watch_channel_tracks_timer_updates() {
        let state = test_state();
        let rx = state.timer_update_tx.subscribe();

        state.set_duration(Some(2)).unwrap();
        assert_eq!(rx.borrow().remaining_seconds, 120);

        state.start_pause().unwrap();
        assert!(rx.borrow().running);
    }

    #[test]
    fn upload_with_wrong_mime_is_a_validation_error() {
        let state = test_state();
        let before = state.get_background().unwrap();

        let err = state
            .set_background_from_upload(vec![1], "application/pdf")
            .unwrap_err();
        assert!(matches!(err, BackgroundUpdateError::Validation(_)));
        assert_eq!(state.get_background().unwrap().url, before.url);
    }

    #[test]
    fn uploaded_blob_is_served_back() {
        let state = test_state();
        state
            .set_background_from_upload(vec![9, 9, 9], "image/png")
            .unwrap();

        let blob = state.current_background_blob().unwrap().unwrap();
        assert_eq!(blob.bytes, vec![9, 9, 9]);
        assert_eq!(blob.mime_type, "image/png");
    }

    #[test]
    fn fullscreen_mirror_follows_host_reports() {
        let state = test_state();
        assert!(!state.is_fullscreen().unwrap());

        assert!(state.toggle_fullscreen().unwrap());
        assert!(state.is_fullscreen().unwrap());

        // Host left fullscreen through its own controls
        state.set_fullscreen(false).unwrap();
        assert!(!state.is_fullscreen().unwrap());
    }
}
