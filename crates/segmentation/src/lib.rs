#![forbid(unsafe_code)]

pub mod consensus;
pub mod region_grow;
pub mod surface;

pub use consensus::{Coefficients, ConsensusEngine, Model, Sampler, UniformSampler};
pub use region_grow::{extract_clusters, ClusterParams, Segmenter, NEIGHBORS_26};
pub use surface::{CrossSection, SurfaceCoefficients, SurfaceModel, EDGE_TOPOLOGY, EPSILON};
