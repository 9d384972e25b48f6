#![forbid(unsafe_code)]

//! Point-cloud editing engine.
//!
//! [`EditSession`] ties the pieces together: a current [`PointBuffer`], the
//! undo [`SnapshotHistory`], and queries that build a [`VoxelIndex`] on demand
//! for plane fitting and region growth.

pub mod session;

pub use session::{EditSession, PlaneSelection, SessionConfig, SessionError};

pub use pcedit_core::{
    Aabb, CloudError, FieldLayout, FieldType, PointAccess, PointBuffer, PointCloudHeader,
};
pub use pcedit_filters as filters;
pub use pcedit_history::SnapshotHistory;
pub use pcedit_io as pcd;
pub use pcedit_segmentation as segmentation;
pub use pcedit_spatial::VoxelIndex;
