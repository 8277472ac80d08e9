//! Render and raster errors.

use crate::arena::NodeId;
use thiserror::Error;

/// Reconciliation errors. Any of these aborts the current pass.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("container {0:?} already received a clip element in this pass")]
    DuplicateClip(NodeId),
    #[error("node {0:?} no longer exists")]
    StaleNode(NodeId),
    #[error("node {0:?} cannot hold children")]
    NotAContainer(NodeId),
}

/// Result type for reconciliation operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Raster loading errors.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("image not found: {0}")]
    NotFound(String),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported image source: {0}")]
    UnsupportedSource(String),
}
