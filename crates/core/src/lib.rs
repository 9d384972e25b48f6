#![forbid(unsafe_code)]

pub mod bbox;
pub mod cloud;
pub mod cloud_view;
pub mod error;
pub mod header;
pub mod scalar;
pub mod traits;

pub use bbox::Aabb;
pub use cloud::PointBuffer;
pub use cloud_view::{
    FieldIter, FieldView, FieldViewMut, PositionIter, PositionView, PositionViewMut,
};
pub use error::CloudError;
pub use header::{FieldLayout, FieldType, PointCloudHeader};
pub use scalar::Scalar;
pub use traits::PointAccess;
