use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrthtreeError {
    #[error("Coordinate {value} on axis {axis} lies outside the bounding box of the index")]
    OutOfBounds { axis: usize, value: f64 },

    #[error("Maximum depth exceeded: more than {bucket_size} items share a single grid coordinate")]
    MaxDepthExceeded { bucket_size: usize },

    #[error("Item is not present in the index and can not be removed")]
    NotFound,

    #[error("Bucket size {bucket_size} is too small, at least {min} is required")]
    InvalidBucketSize { bucket_size: usize, min: usize },

    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    #[error("Unsupported dimension {0}")]
    UnsupportedDimension(usize),

    #[error("Expected a coordinate with {expected} dimensions, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, OrthtreeError>;
