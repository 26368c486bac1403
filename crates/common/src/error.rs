//! Error types shared across VerseReel crates.

use std::path::PathBuf;

/// Top-level error type for a generation request.
///
/// Every variant carries a human-readable cause. Callers that need to map
/// errors to a transport status should use [`GenerationError::class`].
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Provider format error: {message}")]
    ProviderFormat { message: String },

    #[error("No units found for collection {collection} in range {start}-{end}")]
    EmptyRange { collection: u32, start: u32, end: u32 },

    #[error("Failed to resolve audio for unit {unit}: {message}")]
    AssetResolution { unit: u32, message: String },

    #[error("Failed to load background video {path}: {message}")]
    BackgroundLoad { path: PathBuf, message: String },

    #[error("Background video unavailable: {message}")]
    BackgroundUnavailable { message: String },

    #[error("Font unavailable: {path}")]
    FontUnavailable { path: PathBuf },

    #[error("Encoding error: {message}")]
    Encoding { message: String },

    #[error("Worker failure: {message}")]
    Worker { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using GenerationError.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Coarse classification used by outer layers to pick a status class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself was malformed or out of bounds.
    Input,
    /// Anything else: upstream data, assets, fonts, encoding.
    Failure,
}

impl GenerationError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn provider_format(msg: impl Into<String>) -> Self {
        Self::ProviderFormat {
            message: msg.into(),
        }
    }

    pub fn asset_resolution(unit: u32, msg: impl Into<String>) -> Self {
        Self::AssetResolution {
            unit,
            message: msg.into(),
        }
    }

    pub fn background_load(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::BackgroundLoad {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn background_unavailable(msg: impl Into<String>) -> Self {
        Self::BackgroundUnavailable {
            message: msg.into(),
        }
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding {
            message: msg.into(),
        }
    }

    pub fn worker(msg: impl Into<String>) -> Self {
        Self::Worker {
            message: msg.into(),
        }
    }

    /// Status class for this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidInput { .. } => ErrorClass::Input,
            _ => ErrorClass::Failure,
        }
    }

    /// Short machine-friendly name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::ProviderFormat { .. } => "provider_format",
            Self::EmptyRange { .. } => "empty_range",
            Self::AssetResolution { .. } => "asset_resolution",
            Self::BackgroundLoad { .. } => "background_load",
            Self::BackgroundUnavailable { .. } => "background_unavailable",
            Self::FontUnavailable { .. } => "font_unavailable",
            Self::Encoding { .. } => "encoding",
            Self::Worker { .. } => "worker",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}
