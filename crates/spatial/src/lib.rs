#![forbid(unsafe_code)]

pub mod voxel_index;

pub use voxel_index::VoxelIndex;
