use crate::PointAccess;

#[derive(Debug, Clone, PartialEq)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
    empty: bool,
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: [f32::INFINITY; 3],
            max: [f32::NEG_INFINITY; 3],
            empty: true,
        }
    }

    /// Box spanning `min..=max`; the corners are reordered per axis if needed.
    pub fn new(a: [f32; 3], b: [f32; 3]) -> Self {
        let mut aabb = Self::empty();
        aabb.expand_with_point(a);
        aabb.expand_with_point(b);
        aabb
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn expand_with_point(&mut self, point: [f32; 3]) {
        if !point.iter().all(|v| v.is_finite()) {
            return;
        }

        if self.empty {
            self.min = point;
            self.max = point;
            self.empty = false;
            return;
        }

        for (axis, &val) in point.iter().enumerate() {
            self.min[axis] = self.min[axis].min(val);
            self.max[axis] = self.max[axis].max(val);
        }
    }

    pub fn contains(&self, point: &[f32; 3]) -> bool {
        if self.empty || !point.iter().all(|v| v.is_finite()) {
            return false;
        }

        (0..3).all(|axis| point[axis] >= self.min[axis] && point[axis] <= self.max[axis])
    }

    pub fn extent(&self) -> [f32; 3] {
        if self.empty {
            return [0.0; 3];
        }
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Bounding box of every finite position; non-finite points are skipped.
    pub fn from_points<P: PointAccess + ?Sized>(points: &P) -> Self {
        let mut aabb = Self::empty();
        for i in 0..points.len() {
            aabb.expand_with_point(points.position(i));
        }
        aabb
    }
}
