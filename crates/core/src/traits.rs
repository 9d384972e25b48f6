/// Random access to 3-D positions by point index.
///
/// Spatial structures build on this instead of a concrete storage layout.
pub trait PointAccess {
    fn len(&self) -> usize;

    fn position(&self, i: usize) -> [f32; 3];

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PointAccess for [[f32; 3]] {
    fn len(&self) -> usize {
        <[[f32; 3]]>::len(self)
    }

    fn position(&self, i: usize) -> [f32; 3] {
        self[i]
    }
}

impl PointAccess for Vec<[f32; 3]> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn position(&self, i: usize) -> [f32; 3] {
        self[i]
    }
}
