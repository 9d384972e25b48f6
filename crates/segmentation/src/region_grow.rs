use log::debug;
use pcedit_spatial::VoxelIndex;
use std::collections::VecDeque;

const fn neighbor_offsets() -> [[i32; 3]; 26] {
    let mut offsets = [[0i32; 3]; 26];
    let mut n = 0;
    let mut z = -1;
    while z <= 1 {
        let mut y = -1;
        while y <= 1 {
            let mut x = -1;
            while x <= 1 {
                if x != 0 || y != 0 || z != 0 {
                    offsets[n] = [x, y, z];
                    n += 1;
                }
                x += 1;
            }
            y += 1;
        }
        z += 1;
    }
    offsets
}

/// Every offset in `{-1, 0, 1}^3` except the origin.
pub static NEIGHBORS_26: [[i32; 3]; 26] = neighbor_offsets();

/// Size limits for [`extract_clusters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterParams {
    pub min_size: usize,
    pub max_size: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            min_size: 1,
            max_size: usize::MAX,
        }
    }
}

/// Flood fill over a [`VoxelIndex`] with 26-connectivity.
///
/// Empty voxels are visited but never expanded, so a region ends one voxel
/// past its last occupied voxel.
pub struct Segmenter<'a> {
    index: &'a VoxelIndex,
}

impl<'a> Segmenter<'a> {
    pub fn new(index: &'a VoxelIndex) -> Self {
        Self { index }
    }

    /// Point indices of the region containing `seed`, or `None` if the seed is
    /// outside the grid. Order is unspecified.
    pub fn segment(&self, seed: [f32; 3]) -> Option<Vec<usize>> {
        self.segment_until(seed, || false)
    }

    /// Like [`segment`](Self::segment), checking `cancel` between voxels. A
    /// cancelled fill returns `None`.
    pub fn segment_until<C>(&self, seed: [f32; 3], cancel: C) -> Option<Vec<usize>>
    where
        C: FnMut() -> bool,
    {
        let start = self.index.addr(seed)?;
        let mut visited = vec![false; self.index.len()];
        let region = self.grow(start, &mut visited, cancel)?;
        debug!("segment from {:?}: {} points", seed, region.len());
        Some(region)
    }

    fn grow<C>(&self, start: usize, visited: &mut [bool], mut cancel: C) -> Option<Vec<usize>>
    where
        C: FnMut() -> bool,
    {
        let mut region = Vec::new();
        let mut queue = VecDeque::new();
        visited[start] = true;
        queue.push_back(start);

        while let Some(addr) = queue.pop_front() {
            if cancel() {
                debug!("segment cancelled with {} points collected", region.len());
                return None;
            }
            let bucket = self.index.bucket(addr);
            if bucket.is_empty() && addr != start {
                continue;
            }
            region.extend(bucket.iter().map(|&i| i as usize));

            let Some(pos) = self.index.pos_by_addr(addr) else {
                continue;
            };
            for offset in NEIGHBORS_26.iter() {
                let next = [pos[0] + offset[0], pos[1] + offset[1], pos[2] + offset[2]];
                if let Some(n) = self.index.addr_by_pos_int(next) {
                    if !visited[n] {
                        visited[n] = true;
                        queue.push_back(n);
                    }
                }
            }
        }
        Some(region)
    }
}

/// Splits every indexed point into 26-connected voxel regions.
///
/// Clusters outside `[min_size, max_size]` are dropped. The result is sorted
/// by size (largest first), and the indices within each cluster ascending.
pub fn extract_clusters(index: &VoxelIndex, params: ClusterParams) -> Vec<Vec<usize>> {
    if params.min_size == 0 || params.min_size > params.max_size {
        return Vec::new();
    }
    let segmenter = Segmenter::new(index);
    let mut visited = vec![false; index.len()];
    let mut clusters = Vec::new();

    for addr in 0..index.len() {
        if visited[addr] || index.bucket(addr).is_empty() {
            continue;
        }
        let Some(mut cluster) = segmenter.grow(addr, &mut visited, || false) else {
            continue;
        };
        if cluster.len() >= params.min_size && cluster.len() <= params.max_size {
            cluster.sort_unstable();
            clusters.push(cluster);
        }
    }

    clusters.sort_by_key(|c| std::cmp::Reverse(c.len()));
    debug!("extracted {} clusters", clusters.len());
    clusters
}
