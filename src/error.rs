use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwipeboxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("localization error: {0}")]
    Localization(String),

    #[error("gallery has no images")]
    EmptyGallery,
}

pub type Result<T> = std::result::Result<T, SwipeboxError>;
