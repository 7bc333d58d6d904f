//! Error types for csl_multiplayer

use thiserror::Error;

/// Main error type for CSL model operations
#[derive(Error, Debug)]
pub enum CslError {
    #[error("Object error: {0}")]
    Obj(#[from] crate::obj::ObjError),

    #[error("Texture error: {0}")]
    Texture(#[from] crate::texture::TextureError),

    #[error("GPU error: {0}")]
    Gpu(#[from] crate::gpu::GpuError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown plane: {0}")]
    UnknownPlane(crate::plane::PlaneId),

    #[error("Unknown model reference: package {package}, plane {plane}")]
    UnknownModel { package: usize, plane: usize },
}

/// Result type alias for CSL model operations
pub type Result<T> = std::result::Result<T, CslError>;
