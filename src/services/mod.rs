//! External service collaborators
//!
//! This module contains the image generation client used to produce
//! background images on demand.

pub mod generation;

// Re-export main types
pub use generation::{styled_prompt, GeneratedImage, GenerationError, ImageGenerator, ImagenClient};

#[cfg(test)]
pub use generation::MockImageGenerator;
