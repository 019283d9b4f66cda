//! Error type for the stippling core.

/// Error kinds surfaced by [`crate::controller::run`] and the partition
/// backends.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("density image is empty (0x0)")]
    EmptyDensity,

    #[error("no generator points provided")]
    EmptyGeneratorSet,

    #[error("partition backend failed to initialize: {0}")]
    BackendInit(String),

    #[error("partition backend failed at runtime: {0}")]
    BackendRuntime(String),
}

pub type Result<T> = std::result::Result<T, Error>;
