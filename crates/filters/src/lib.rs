#![forbid(unsafe_code)]

pub mod crop_box;
pub mod passthrough;
pub mod surface_patch;
pub mod voxel_downsample;

pub use crop_box::crop_box;
pub use passthrough::passthrough_filter;
pub use surface_patch::surface_patch;
pub use voxel_downsample::voxel_downsample;
