//! Backdrop Timer - A state-managed countdown timer service
//!
//! This library provides a countdown timer state machine with a
//! customizable background: curated gallery picks, uploaded images whose
//! memory-backed allocations are released when superseded, and generated
//! images from an external image generation service.

pub mod api;
pub mod config;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use state::AppState;
pub use utils::signals::shutdown_signal;
