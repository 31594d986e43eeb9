use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building options or watermarking a document.
#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("input not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported layout: {0}")]
    UnsupportedLayout(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("malformed PDF: {0}")]
    MalformedPdf(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("font error: {0}")]
    Font(String),

    #[error(transparent)]
    Raster(#[from] RasterError),
}

impl WatermarkError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

#[derive(Debug, Error)]
pub enum RasterError {
    /// The external converter is not installed. Callers degrade gracefully.
    #[error("rasterization backend `{0}` is not available")]
    BackendUnavailable(String),

    #[error("rasterization failed: {0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, WatermarkError>;
