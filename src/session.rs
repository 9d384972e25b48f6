use std::path::Path;

use log::debug;
use pcedit_core::{Aabb, CloudError, PointBuffer};
use pcedit_filters::{crop_box, voxel_downsample};
use pcedit_history::SnapshotHistory;
use pcedit_io::{read_pcd, write_pcd_binary, PcdError};
use pcedit_segmentation::{
    Coefficients, ConsensusEngine, CrossSection, Segmenter, SurfaceModel, UniformSampler,
};
use pcedit_spatial::VoxelIndex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no point cloud loaded")]
    NoPointCloud,

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error(transparent)]
    Pcd(#[from] PcdError),
}

/// Tunables for an [`EditSession`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Undo depth; the history keeps one more snapshot than this.
    pub max_history: usize,
    /// Voxel edge length of the index built for plane fits and region growth.
    pub voxel_resolution: f32,
    /// Inlier distance for plane fits.
    pub plane_tolerance: f32,
    pub ransac_trials: usize,
    /// Fixed sampler seed; `None` draws a fresh one per fit.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history: 10,
            voxel_resolution: 0.1,
            plane_tolerance: 0.05,
            ransac_trials: 30,
            seed: None,
        }
    }
}

/// Best plane found by [`EditSession::fit_plane`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneSelection {
    /// Unit normal.
    pub normal: [f32; 3],
    /// World-space plane is `normal . p = offset`.
    pub offset: f32,
    /// Ascending indices within the configured tolerance.
    pub inliers: Vec<usize>,
    /// Where the plane cuts the index box; feed to
    /// [`surface_patch`](pcedit_filters::surface_patch) to re-tessellate.
    pub section: CrossSection,
}

/// One editable cloud with undo.
///
/// Every destructive operation builds a new buffer, records it in the history
/// and makes it current. The top of the history is always the current cloud.
#[derive(Debug)]
pub struct EditSession {
    config: SessionConfig,
    current: Option<PointBuffer>,
    history: SnapshotHistory,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl EditSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            history: SnapshotHistory::new(config.max_history),
            config,
            current: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Loads a PCD file, replacing the current cloud and clearing history.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let cloud = read_pcd(path.as_ref())?;
        debug!("opened {}", path.as_ref().display());
        self.load(cloud);
        Ok(())
    }

    /// Replaces the current cloud and clears history.
    pub fn load(&mut self, cloud: PointBuffer) {
        self.history.clear();
        self.history.push(&cloud);
        debug!("session loaded {} points", cloud.len());
        self.current = Some(cloud);
    }

    /// Writes the current cloud as binary PCD.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        write_pcd_binary(path, self.cloud()?)?;
        Ok(())
    }

    pub fn cloud(&self) -> Result<&PointBuffer, SessionError> {
        self.current.as_ref().ok_or(SessionError::NoPointCloud)
    }

    fn commit(&mut self, next: PointBuffer) {
        self.history.push(&next);
        self.current = Some(next);
    }

    fn apply<F>(&mut self, op: F) -> Result<(), SessionError>
    where
        F: FnOnce(&PointBuffer) -> Result<PointBuffer, CloudError>,
    {
        let next = op(self.cloud()?)?;
        self.commit(next);
        Ok(())
    }

    /// Keeps only the points inside `aabb`.
    pub fn crop(&mut self, aabb: &Aabb) -> Result<(), SessionError> {
        self.apply(|c| crop_box(c, aabb, true))
    }

    pub fn delete(&mut self, indices: &[usize]) -> Result<(), SessionError> {
        self.apply(|c| c.select_inverse(indices))
    }

    /// Sets the `label` field of `indices`.
    pub fn label(&mut self, indices: &[usize], label: u32) -> Result<(), SessionError> {
        self.apply(|c| c.label_indices(indices, label))
    }

    /// Appends `patch`, which must share the current record layout.
    pub fn merge(&mut self, patch: &PointBuffer) -> Result<(), SessionError> {
        self.apply(|c| c.merge(patch))
    }

    pub fn downsample(&mut self, voxel_size: f32) -> Result<(), SessionError> {
        self.apply(|c| voxel_downsample(c, voxel_size))
    }

    /// Dense grid over the whole cloud at the configured resolution. Fails
    /// when the resolution is unusable or the grid would exceed
    /// [`VoxelIndex::MAX_VOXELS`].
    fn index(&self, cloud: &PointBuffer) -> Result<VoxelIndex, SessionError> {
        let positions = cloud.positions()?;
        Ok(VoxelIndex::covering(&positions, self.config.voxel_resolution)?)
    }

    /// Runs RANSAC over the current cloud. `Ok(None)` when no trial produced
    /// a plane.
    pub fn fit_plane(&self) -> Result<Option<PlaneSelection>, SessionError> {
        let cloud = self.cloud()?;
        if cloud.is_empty() {
            return Ok(None);
        }
        let index = self.index(cloud)?;
        let positions = cloud.positions()?;
        let sampler = match self.config.seed {
            Some(seed) => UniformSampler::seeded(cloud.len(), seed),
            None => UniformSampler::new(cloud.len()),
        };

        let mut engine = ConsensusEngine::new(SurfaceModel::new(&positions, &index), sampler);
        if !engine.compute(self.config.ransac_trials) {
            debug!("no plane in {} trials", self.config.ransac_trials);
            return Ok(None);
        }
        let Some(fit) = engine.coefficients() else {
            return Ok(None);
        };
        let Some(section) = fit.cross_section() else {
            return Ok(None);
        };

        let normal = fit.normal();
        let origin = index.origin();
        let offset = fit.offset() + normal.iter().zip(origin).map(|(n, o)| n * o).sum::<f32>();
        let inliers = fit.inliers(self.config.plane_tolerance);
        debug!(
            "plane {:?} . p = {}: {} inliers of {}",
            normal,
            offset,
            inliers.len(),
            cloud.len()
        );
        Ok(Some(PlaneSelection {
            normal,
            offset,
            inliers,
            section,
        }))
    }

    /// Indices of the region grown from `seed`, ascending; `Ok(None)` if the
    /// seed is outside the cloud's voxel grid.
    pub fn segment(&self, seed: [f32; 3]) -> Result<Option<Vec<usize>>, SessionError> {
        let cloud = self.cloud()?;
        if cloud.is_empty() {
            return Ok(None);
        }
        let index = self.index(cloud)?;
        Ok(Segmenter::new(&index).segment(seed).map(|mut region| {
            region.sort_unstable();
            region
        }))
    }

    /// Restores the previous cloud. `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, SessionError> {
        self.cloud()?;
        match self.history.undo() {
            Some(previous) => {
                debug!("undo to {} points", previous.len());
                self.current = Some(previous);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    pub fn set_max_history(&mut self, max_history: usize) {
        self.config.max_history = max_history;
        self.history.set_max_history(max_history);
    }
}
