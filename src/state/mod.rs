//! State management module
//!
//! This module contains all state-related structures and their management logic.

pub mod app_state;
pub mod background;
pub mod preferences;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppState, BackgroundUpdateError};
pub use background::{
    BackgroundError, BackgroundRegistry, BackgroundResource, Blob, GalleryEntry, Ownership,
    CURATED_GALLERY,
};
pub use preferences::DisplayPreferences;
pub use timer_state::{TickOutcome, TimerPhase, TimerState};
