use thiserror::Error;

/// Errors raised while building or deriving a [`PointBuffer`](crate::PointBuffer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloudError {
    /// Parallel header arrays disagree in length, or a field layout is unusable.
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("field `{0}` not found")]
    FieldNotFound(String),

    /// The operation needs at least one (finite) point.
    #[error("point cloud is empty")]
    EmptyPointCloud,

    #[error("buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("stride mismatch: base records are {base} bytes, patch records are {patch} bytes")]
    StrideMismatch { base: usize, patch: usize },

    #[error("mask covers {mask} points but the cloud has {points}")]
    MaskLength { mask: usize, points: usize },

    #[error("point index {index} out of range for {points} points")]
    IndexOutOfRange { index: usize, points: usize },

    /// A resolution, spacing or axis argument outside its domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("voxel grid of {size:?} cells exceeds the limit of {limit} buckets")]
    GridTooLarge { size: [usize; 3], limit: usize },
}
