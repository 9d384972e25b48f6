use log::debug;
use pcedit_core::{Aabb, CloudError, PointAccess};

/// Dense grid of point-index buckets.
///
/// Voxel `(i, j, k)` is centred on `origin + (i, j, k) * resolution`: a position
/// maps to its voxel by rounding `(p - origin) / resolution` to the nearest
/// integer per axis, halves rounding away from zero. The grid never resizes;
/// rebuild it when the working set changes.
#[derive(Debug, Clone)]
pub struct VoxelIndex {
    resolution: f32,
    size: [usize; 3],
    origin: [f32; 3],
    buckets: Vec<Vec<u32>>,
}

impl VoxelIndex {
    /// Largest bucket count [`new`](Self::new) and [`covering`](Self::covering)
    /// will allocate.
    pub const MAX_VOXELS: usize = 1 << 25;

    /// Empty grid of `size` voxels anchored at `origin`.
    ///
    /// Fails with [`CloudError::InvalidArgument`] unless `resolution` is finite
    /// and positive, and with [`CloudError::GridTooLarge`] when the grid holds
    /// more than [`MAX_VOXELS`](Self::MAX_VOXELS) buckets.
    pub fn new(resolution: f32, size: [usize; 3], origin: [f32; 3]) -> Result<Self, CloudError> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(CloudError::InvalidArgument(format!(
                "voxel resolution {resolution} must be finite and > 0"
            )));
        }
        let count = size[0]
            .checked_mul(size[1])
            .and_then(|n| n.checked_mul(size[2]))
            .filter(|&n| n <= Self::MAX_VOXELS)
            .ok_or(CloudError::GridTooLarge {
                size,
                limit: Self::MAX_VOXELS,
            })?;
        Ok(Self {
            resolution,
            size,
            origin,
            buckets: vec![Vec::new(); count],
        })
    }

    /// Grid anchored at the bounding-box minimum of `points`, large enough to
    /// hold every finite point, with every point inserted.
    pub fn covering<P: PointAccess + ?Sized>(
        points: &P,
        resolution: f32,
    ) -> Result<Self, CloudError> {
        let aabb = Aabb::from_points(points);
        if aabb.is_empty() {
            return Err(CloudError::EmptyPointCloud);
        }
        // float-to-int casts saturate, so a huge extent reports as usize::MAX
        let size = aabb.extent().map(|e| ((e / resolution).ceil() as usize).saturating_add(1));

        let mut index = Self::new(resolution, size, aabb.min)?;
        for i in 0..points.len() {
            index.add(points.position(i), i as u32);
        }
        debug!("voxel grid {:?} at {} over {} points", size, resolution, points.len());
        Ok(index)
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    pub fn origin(&self) -> [f32; 3] {
        self.origin
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Empties every bucket, keeping allocations.
    pub fn reset(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }

    /// World-space box `[origin, origin + size * resolution)`.
    pub fn min_max(&self) -> ([f32; 3], [f32; 3]) {
        let max = [0, 1, 2].map(|a| self.origin[a] + self.size[a] as f32 * self.resolution);
        (self.origin, max)
    }

    /// Integer voxel coordinates of `p`, or `None` outside the grid.
    #[inline]
    pub fn pos_int(&self, p: [f32; 3]) -> Option<[i32; 3]> {
        let mut out = [0i32; 3];
        for axis in 0..3 {
            let v = ((p[axis] - self.origin[axis]) / self.resolution).round();
            if !(v >= 0.0 && v < self.size[axis] as f32) {
                return None;
            }
            out[axis] = v as i32;
        }
        Some(out)
    }

    /// Bucket address of integer coordinates, or `None` outside the grid.
    #[inline]
    pub fn addr_by_pos_int(&self, pos: [i32; 3]) -> Option<usize> {
        if (0..3).any(|a| pos[a] < 0 || pos[a] as usize >= self.size[a]) {
            return None;
        }
        let [x, y, z] = pos.map(|v| v as usize);
        Some(x + self.size[0] * (y + self.size[1] * z))
    }

    /// Inverse of [`addr_by_pos_int`](Self::addr_by_pos_int).
    pub fn pos_by_addr(&self, addr: usize) -> Option<[i32; 3]> {
        if addr >= self.buckets.len() {
            return None;
        }
        let x = addr % self.size[0];
        let rest = addr / self.size[0];
        let y = rest % self.size[1];
        let z = rest / self.size[1];
        Some([x as i32, y as i32, z as i32])
    }

    #[inline]
    pub fn addr(&self, p: [f32; 3]) -> Option<usize> {
        self.pos_int(p).and_then(|pos| self.addr_by_pos_int(pos))
    }

    /// Files `index` under the voxel containing `p`; `false` if `p` is outside.
    pub fn add(&mut self, p: [f32; 3], index: u32) -> bool {
        match self.addr(p) {
            Some(addr) => {
                self.buckets[addr].push(index);
                true
            }
            None => false,
        }
    }

    /// Indices stored in the voxel containing `p`; empty outside the grid.
    pub fn get(&self, p: [f32; 3]) -> &[u32] {
        self.addr(p).map(|a| self.bucket(a)).unwrap_or(&[])
    }

    pub fn bucket(&self, addr: usize) -> &[u32] {
        self.buckets.get(addr).map(Vec::as_slice).unwrap_or(&[])
    }
}
