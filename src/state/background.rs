//! Background resource ownership and lifecycle

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Curated gallery entry shipped with the service
#[derive(Debug, Clone, Serialize)]
pub struct GalleryEntry {
    pub id: &'static str,
    pub thumb: &'static str,
    pub full: &'static str,
    pub alt: &'static str,
}

/// Built-in gallery of remote backgrounds; the first entry is the default
pub const CURATED_GALLERY: &[GalleryEntry] = &[
    GalleryEntry {
        id: "space-nebula",
        thumb: "https://storage.googleapis.com/aai-web-samples/backgrounds/thumbs/space-nebula.jpg",
        full: "https://storage.googleapis.com/aai-web-samples/backgrounds/full/space-nebula.jpg",
        alt: "A colorful nebula in deep space",
    },
    GalleryEntry {
        id: "serene-lake",
        thumb: "https://storage.googleapis.com/aai-web-samples/backgrounds/thumbs/serene-lake.jpg",
        full: "https://storage.googleapis.com/aai-web-samples/backgrounds/full/serene-lake.jpg",
        alt: "A serene lake with mountains in the background during sunset",
    },
    GalleryEntry {
        id: "abstract-waves",
        thumb: "https://storage.googleapis.com/aai-web-samples/backgrounds/thumbs/abstract-waves.jpg",
        full: "https://storage.googleapis.com/aai-web-samples/backgrounds/full/abstract-waves.jpg",
        alt: "Abstract colorful digital waves",
    },
    GalleryEntry {
        id: "forest-path",
        thumb: "https://storage.googleapis.com/aai-web-samples/backgrounds/thumbs/forest-path.jpg",
        full: "https://storage.googleapis.com/aai-web-samples/backgrounds/full/forest-path.jpg",
        alt: "A sunlit path through a lush green forest",
    },
];

/// Errors surfaced to the user when changing the background fails
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackgroundError {
    #[error("Please enter a prompt")]
    EmptyPrompt,
    #[error("Uploaded file is not an image")]
    NotAnImage,
}

/// How a background reference is owned
///
/// Remote references (gallery picks, data URLs) need no cleanup;
/// locally-allocated references hold uploaded bytes in the registry and
/// must be released when superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ownership {
    Remote,
    LocallyAllocated,
}

/// The active background image reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundResource {
    pub url: String,
    pub ownership: Ownership,
}

impl BackgroundResource {
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ownership: Ownership::Remote,
        }
    }
}

/// Payload behind a locally-allocated background
#[derive(Debug, Clone)]
pub struct Blob {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Owns the current background and the bytes behind local allocations
///
/// Invariant: at most one locally-allocated resource is live at a time.
/// Every install releases the previous resource first when it was
/// locally allocated, so uploads cannot accumulate.
#[derive(Debug)]
pub struct BackgroundRegistry {
    current: BackgroundResource,
    blobs: HashMap<String, Blob>,
    next_blob_id: u64,
    released: u64,
}

impl BackgroundRegistry {
    /// Create a registry showing the default gallery background
    pub fn new() -> Self {
        Self {
            current: BackgroundResource::remote(CURATED_GALLERY[0].full),
            blobs: HashMap::new(),
            next_blob_id: 0,
            released: 0,
        }
    }

    /// Install a remote URL (gallery pick or any external reference)
    pub fn set_remote(&mut self, url: impl Into<String>) -> &BackgroundResource {
        self.install(BackgroundResource::remote(url))
    }

    /// Install an uploaded file as the background
    ///
    /// The mime type must be `image/*`; anything else leaves the current
    /// background untouched.
    pub fn set_uploaded(
        &mut self,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> Result<&BackgroundResource, BackgroundError> {
        if !mime_type.starts_with("image/") {
            return Err(BackgroundError::NotAnImage);
        }

        let url = format!("mem://background/{}", self.next_blob_id);
        self.next_blob_id += 1;

        let resource = BackgroundResource {
            url: url.clone(),
            ownership: Ownership::LocallyAllocated,
        };
        self.install(resource);
        self.blobs.insert(
            url,
            Blob {
                mime_type: mime_type.to_string(),
                bytes,
            },
        );
        Ok(&self.current)
    }

    /// Install a generated image delivered as an inline data URL
    ///
    /// Data URLs carry their payload in the reference itself, so they are
    /// treated as Remote: nothing to release when superseded.
    pub fn install_generated(&mut self, data_url: String) -> &BackgroundResource {
        self.install(BackgroundResource::remote(data_url))
    }

    fn install(&mut self, resource: BackgroundResource) -> &BackgroundResource {
        if self.current.ownership == Ownership::LocallyAllocated {
            if self.blobs.remove(&self.current.url).is_some() {
                self.released += 1;
                debug!("Released local background allocation: {}", self.current.url);
            }
        }
        self.current = resource;
        &self.current
    }

    /// The active background resource
    pub fn current(&self) -> &BackgroundResource {
        &self.current
    }

    /// Payload of the live local allocation, if the current background is one
    pub fn current_blob(&self) -> Option<&Blob> {
        if self.current.ownership == Ownership::LocallyAllocated {
            self.blobs.get(&self.current.url)
        } else {
            None
        }
    }

    /// Number of locally-allocated resources still live
    pub fn live_allocations(&self) -> usize {
        self.blobs.len()
    }

    /// Number of locally-allocated resources released so far
    pub fn released_count(&self) -> u64 {
        self.released
    }
}

impl Default for BackgroundRegistry {
    fn default() -> Self {
        Self::new()
    }
}
