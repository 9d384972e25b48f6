use log::trace;
use pcedit_core::PointAccess;
use pcedit_spatial::VoxelIndex;

use crate::consensus::{Coefficients, Model};

/// Degeneracy threshold for normals and coincident box intersections.
pub const EPSILON: f32 = 1e-3;

/// Slots are the 12 box edges: slot `axis * 4 + k` runs parallel to `axis`,
/// placed at corner `k` of the perpendicular face.
const SLOTS: usize = 12;

/// Every box edge shares a face with 6 others.
const EDGE_PAIRS: usize = SLOTS * 6 / 2;

/// The two faces (`axis * 2 + side`) a box edge lies on.
const fn slot_faces(slot: usize) -> [usize; 2] {
    let axis = slot / 4;
    let k = slot % 4;
    [
        ((axis + 1) % 3) * 2 + (k & 1),
        ((axis + 2) % 3) * 2 + ((k >> 1) & 1),
    ]
}

const fn edge_topology() -> [[usize; 2]; EDGE_PAIRS] {
    let mut pairs = [[0usize; 2]; EDGE_PAIRS];
    let mut n = 0;
    let mut i = 0;
    while i < SLOTS {
        let mut j = i + 1;
        while j < SLOTS {
            let fi = slot_faces(i);
            let fj = slot_faces(j);
            if fi[0] == fj[0] || fi[0] == fj[1] || fi[1] == fj[0] || fi[1] == fj[1] {
                pairs[n] = [i, j];
                n += 1;
            }
            j += 1;
        }
        i += 1;
    }
    pairs
}

/// Box edge pairs that can bound one side of a planar cross-section.
pub static EDGE_TOPOLOGY: [[usize; 2]; EDGE_PAIRS] = edge_topology();

#[inline]
fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
fn length(a: [f32; 3]) -> f32 {
    dot(a, a).sqrt()
}

fn coincident(a: [f32; 3], b: [f32; 3]) -> bool {
    (0..3).all(|i| (a[i] - b[i]).abs() < EPSILON)
}

/// Parallelogram spanned by two adjacent sides of a plane's cut through the
/// index box: `anchor + a * u + b * v` for `a, b` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossSection {
    /// World space.
    pub anchor: [f32; 3],
    pub u: [f32; 3],
    pub v: [f32; 3],
}

impl CrossSection {
    pub fn point_at(&self, a: f32, b: f32) -> [f32; 3] {
        [0, 1, 2].map(|i| self.anchor[i] + a * self.u[i] + b * self.v[i])
    }
}

/// Plane model scored by how many indexed points lie in voxels the plane
/// passes through.
///
/// Positions are taken relative to the index's grid minimum, and the plane is
/// clipped against the index box `[origin, origin + size * resolution)`.
pub struct SurfaceModel<'a, P: PointAccess + ?Sized> {
    points: &'a P,
    index: &'a VoxelIndex,
}

impl<'a, P: PointAccess + ?Sized> SurfaceModel<'a, P> {
    pub fn new(points: &'a P, index: &'a VoxelIndex) -> Self {
        Self { points, index }
    }

    /// Intersections of the plane `n . q = d` with the 12 box edges, in local
    /// coordinates. Slots that coincide with an earlier slot alias to it.
    fn candidates(&self, normal: [f32; 3], d: f32) -> ([Option<[f32; 3]>; SLOTS], [usize; SLOTS]) {
        let extent = self.box_extent();
        let mut points = [None; SLOTS];
        let mut canonical = [usize::MAX; SLOTS];

        for slot in 0..SLOTS {
            let axis = slot / 4;
            if normal[axis].abs() <= EPSILON {
                continue;
            }
            let k = slot % 4;
            let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
            let mut q = [0.0f32; 3];
            q[u] = (k & 1) as f32 * extent[u];
            q[v] = ((k >> 1) & 1) as f32 * extent[v];
            let t = (d - normal[u] * q[u] - normal[v] * q[v]) / normal[axis];
            if !(t >= -EPSILON && t <= extent[axis] + EPSILON) {
                continue;
            }
            q[axis] = t.clamp(0.0, extent[axis]);

            let alias = (0..slot)
                .find(|&j| canonical[j] == j && points[j].is_some_and(|p| coincident(p, q)))
                .unwrap_or(slot);
            canonical[slot] = alias;
            points[slot] = Some(q);
        }
        (points, canonical)
    }

    fn box_extent(&self) -> [f32; 3] {
        let size = self.index.size();
        let res = self.index.resolution();
        [0, 1, 2].map(|a| size[a] as f32 * res)
    }

    /// Two adjacent sides of the cross-section with the greatest combined
    /// length, in local coordinates.
    fn cross_section(&self, normal: [f32; 3], d: f32) -> Option<([f32; 3], [f32; 3], [f32; 3])> {
        let (points, canonical) = self.candidates(normal, d);

        let mut edges: Vec<[usize; 2]> = Vec::with_capacity(EDGE_PAIRS);
        for &[i, j] in EDGE_TOPOLOGY.iter() {
            if points[i].is_none() || points[j].is_none() {
                continue;
            }
            let (a, b) = (canonical[i], canonical[j]);
            if a == b {
                continue;
            }
            let edge = [a.min(b), a.max(b)];
            if !edges.contains(&edge) {
                edges.push(edge);
            }
        }

        let position = |slot: usize| points[slot].unwrap_or([0.0; 3]);
        let mut best: Option<(f32, usize, usize, usize)> = None;
        for (n, e1) in edges.iter().enumerate() {
            for e2 in &edges[n + 1..] {
                let shared = if e1.contains(&e2[0]) {
                    e2[0]
                } else if e1.contains(&e2[1]) {
                    e2[1]
                } else {
                    continue;
                };
                let far1 = if e1[0] == shared { e1[1] } else { e1[0] };
                let far2 = if e2[0] == shared { e2[1] } else { e2[0] };
                let anchor = position(shared);
                let total =
                    length(sub(position(far1), anchor)) + length(sub(position(far2), anchor));
                if best.map_or(true, |(len, ..)| total > len) {
                    best = Some((total, shared, far1, far2));
                }
            }
        }

        best.map(|(_, shared, far1, far2)| {
            let anchor = position(shared);
            (anchor, sub(position(far1), anchor), sub(position(far2), anchor))
        })
    }

    /// Sum of bucket sizes over the distinct voxels the section passes through.
    fn score(&self, section: &CrossSection) -> usize {
        let step = self.index.resolution() / 3f32.sqrt();
        let na = ((length(section.u) / step).ceil() as usize).max(1);
        let nb = ((length(section.v) / step).ceil() as usize).max(1);

        let mut visited = vec![false; self.index.len()];
        let mut total = 0;
        for ia in 0..=na {
            let a = ia as f32 / na as f32;
            for ib in 0..=nb {
                let b = ib as f32 / nb as f32;
                let Some(addr) = self.index.addr(section.point_at(a, b)) else {
                    continue;
                };
                if !visited[addr] {
                    visited[addr] = true;
                    total += self.index.bucket(addr).len();
                }
            }
        }
        total
    }
}

impl<'a, P: PointAccess + ?Sized> Model for SurfaceModel<'a, P> {
    type Coefficients = SurfaceCoefficients<'a, P>;

    fn num_samples(&self) -> (usize, usize) {
        (3, 3)
    }

    fn fit(&self, samples: &[usize]) -> Option<SurfaceCoefficients<'a, P>> {
        if samples.len() < 3 || samples[..3].iter().any(|&i| i >= self.points.len()) {
            return None;
        }
        let origin = self.index.origin();
        let local = |i: usize| sub(self.points.position(samples[i]), origin);
        let (p0, p1, p2) = (local(0), local(1), local(2));

        let normal = cross(sub(p1, p0), sub(p2, p0));
        let norm2 = dot(normal, normal);
        if !(norm2 >= EPSILON * EPSILON) {
            return None;
        }
        let inv = 1.0 / norm2.sqrt();
        let normal = normal.map(|c| c * inv);
        let d = dot(normal, p0);

        let (anchor, u, v) = self.cross_section(normal, d)?;
        let section = CrossSection {
            anchor: [0, 1, 2].map(|a| anchor[a] + origin[a]),
            u,
            v,
        };
        let fitness = self.score(&section);
        trace!("surface fit normal {:?} d {} fitness {}", normal, d, fitness);

        Some(SurfaceCoefficients {
            points: self.points,
            origin,
            normal,
            d,
            section,
            fitness: fitness as f32,
        })
    }
}

/// A fitted plane `normal . (p - origin) = d`, with `normal` of unit length.
pub struct SurfaceCoefficients<'a, P: PointAccess + ?Sized> {
    points: &'a P,
    origin: [f32; 3],
    normal: [f32; 3],
    d: f32,
    section: CrossSection,
    fitness: f32,
}

impl<P: PointAccess + ?Sized> SurfaceCoefficients<'_, P> {
    pub fn normal(&self) -> [f32; 3] {
        self.normal
    }

    /// Offset along the normal, measured from the index grid minimum.
    pub fn offset(&self) -> f32 {
        self.d
    }

    /// Signed distance from `p` to the plane.
    #[inline]
    pub fn distance(&self, p: [f32; 3]) -> f32 {
        dot(self.normal, sub(p, self.origin)) - self.d
    }

    pub fn cross_section(&self) -> Option<CrossSection> {
        Some(self.section)
    }
}

impl<P: PointAccess + ?Sized> std::fmt::Debug for SurfaceCoefficients<'_, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceCoefficients")
            .field("normal", &self.normal)
            .field("d", &self.d)
            .field("fitness", &self.fitness)
            .finish()
    }
}

impl<P: PointAccess + ?Sized> Coefficients for SurfaceCoefficients<'_, P> {
    fn fitness(&self) -> f32 {
        self.fitness
    }

    fn inliers(&self, tolerance: f32) -> Vec<usize> {
        (0..self.points.len())
            .filter(|&i| self.is_in(self.points.position(i), tolerance))
            .collect()
    }

    fn is_in(&self, p: [f32; 3], tolerance: f32) -> bool {
        self.distance(p).abs() < tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{ConsensusEngine, UniformSampler};

    fn plane_cloud(tolerance: f32) -> Vec<[f32; 3]> {
        vec![
            [0.0, 0.0, 0.5],
            [2.0, 0.0, 0.5],
            [0.0, 2.0, 0.5],
            [1.0, 1.0, 0.5 + 0.5 * tolerance],
            [1.0, 1.0, 0.5 + 10.0 * tolerance],
        ]
    }

    #[test]
    fn every_box_edge_has_six_face_neighbours() {
        let mut degree = [0; SLOTS];
        for &[i, j] in EDGE_TOPOLOGY.iter() {
            assert_ne!(i, j);
            degree[i] += 1;
            degree[j] += 1;
        }
        assert_eq!(degree, [6; SLOTS]);
    }

    #[test]
    fn collinear_sample_fails() {
        let pts = vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]];
        let index = VoxelIndex::covering(&pts, 0.1).unwrap();
        let model = SurfaceModel::new(&pts, &index);
        assert!(model.fit(&[0, 1, 2]).is_none());
        assert!(model.fit(&[0, 0, 1]).is_none());
    }

    #[test]
    fn out_of_range_sample_fails() {
        let pts = plane_cloud(0.05);
        let index = VoxelIndex::covering(&pts, 0.1).unwrap();
        let model = SurfaceModel::new(&pts, &index);
        assert!(model.fit(&[0, 1, 99]).is_none());
        assert!(model.fit(&[0, 1]).is_none());
    }

    #[test]
    fn inliers_respect_tolerance() {
        let tolerance = 0.05;
        let pts = plane_cloud(tolerance);
        let index = VoxelIndex::covering(&pts, 0.1).unwrap();
        let model = SurfaceModel::new(&pts, &index);
        let fit = model.fit(&[0, 1, 2]).unwrap();

        assert_eq!(fit.inliers(tolerance), vec![0, 1, 2, 3]);
        assert!(fit.is_in(pts[3], tolerance));
        assert!(!fit.is_in(pts[4], tolerance));
        assert!((fit.normal()[2].abs() - 1.0).abs() < 1e-6);
        assert!(fit.distance([5.0, -3.0, 0.5]).abs() < 1e-6);
    }

    #[test]
    fn fitness_counts_points_in_crossed_voxels() {
        let pts = plane_cloud(0.05);
        let index = VoxelIndex::covering(&pts, 0.1).unwrap();
        let fit = SurfaceModel::new(&pts, &index).fit(&[0, 1, 2]).unwrap();
        // the far point sits five voxels above the plane
        assert_eq!(fit.fitness(), 4.0);
    }

    #[test]
    fn axis_aligned_section_spans_the_box() {
        let pts = plane_cloud(0.05);
        let index = VoxelIndex::covering(&pts, 0.1).unwrap();
        let fit = SurfaceModel::new(&pts, &index).fit(&[0, 1, 2]).unwrap();
        let section = fit.cross_section().unwrap();

        let (min, max) = index.min_max();
        let spans = [length(section.u), length(section.v)];
        for s in spans {
            assert!((s - (max[0] - min[0])).abs() < 1e-4);
        }
        assert!(dot(section.u, fit.normal()).abs() < 1e-6);
        assert!(dot(section.v, fit.normal()).abs() < 1e-6);
        assert!(fit.distance(section.anchor).abs() < 1e-5);
        assert!(fit.distance(section.point_at(1.0, 1.0)).abs() < 1e-5);
    }

    #[test]
    fn oblique_section_lies_on_the_plane() {
        let pts = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.5],
            [0.0, 1.0, 0.25],
            [1.0, 1.0, 1.0],
        ];
        let index = VoxelIndex::covering(&pts, 0.1).unwrap();
        let fit = SurfaceModel::new(&pts, &index).fit(&[0, 1, 2]).unwrap();
        let section = fit.cross_section().unwrap();
        for (a, b) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (0.5, 0.5)] {
            assert!(fit.distance(section.point_at(a, b)).abs() < 1e-4);
        }
        assert!(fit.fitness() >= 3.0);
    }

    fn ring_with_outliers() -> Vec<[f32; 3]> {
        let mut pts: Vec<[f32; 3]> = (0..7)
            .map(|k| {
                let angle = std::f32::consts::TAU * k as f32 / 7.0;
                [2.0 * angle.cos(), 2.0 * angle.sin(), 0.0]
            })
            .collect();
        pts.extend([[0.0, 0.0, 3.0], [0.5, 0.0, 3.0], [0.0, 0.5, 3.0]]);
        pts
    }

    fn fit_ring(seed: u64) -> Vec<usize> {
        let pts = ring_with_outliers();
        let mut index = VoxelIndex::new(0.25, [25, 25, 25], [-3.0, -3.0, -3.0]).unwrap();
        for (i, p) in pts.iter().enumerate() {
            assert!(index.add(*p, i as u32));
        }
        let model = SurfaceModel::new(&pts, &index);
        let mut engine = ConsensusEngine::new(model, UniformSampler::seeded(pts.len(), seed));
        assert!(engine.compute(30));
        engine.coefficients().unwrap().inliers(0.1)
    }

    #[test]
    fn recovers_plane_among_outliers() {
        assert_eq!(fit_ring(7), (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn seeded_runs_repeat() {
        assert_eq!(fit_ring(1234), fit_ring(1234));
    }
}
