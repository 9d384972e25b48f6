use crate::{
    Aabb, CloudError, FieldView, FieldViewMut, PointCloudHeader, PositionView, PositionViewMut,
    Scalar,
};

/// Stride-packed point records described by a [`PointCloudHeader`].
///
/// Record `i` occupies `data[i * stride..(i + 1) * stride]`; a field lives at
/// the record base plus the summed size of the fields before it. The buffer
/// length is always `len() * stride()`.
///
/// Derived operations (`filter`, `label`, `merge`, `select`, ...) never touch
/// `self`; they return a fresh buffer with a cloned header, so the source can
/// be kept for undo.
#[derive(Debug, Clone, PartialEq)]
pub struct PointBuffer {
    header: PointCloudHeader,
    num_points: usize,
    data: Vec<u8>,
}

impl PointBuffer {
    pub fn from_bytes(
        header: PointCloudHeader,
        num_points: usize,
        data: Vec<u8>,
    ) -> Result<Self, CloudError> {
        header.validate()?;
        let expected = num_points.checked_mul(header.stride()).ok_or_else(|| {
            CloudError::MalformedHeader(format!("{} records overflow", num_points))
        })?;
        if data.len() != expected {
            return Err(CloudError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            header,
            num_points,
            data,
        })
    }

    /// `num_points` all-zero records; the header is reshaped to `num_points x 1`.
    pub fn zeroed(header: &PointCloudHeader, num_points: usize) -> Result<Self, CloudError> {
        let header = header.with_points(num_points);
        header.validate()?;
        let len = num_points.checked_mul(header.stride()).ok_or_else(|| {
            CloudError::MalformedHeader(format!("{} records overflow", num_points))
        })?;
        Self::from_bytes(header, num_points, vec![0u8; len])
    }

    /// Records holding `positions`, every other field zeroed.
    pub fn from_positions(
        header: &PointCloudHeader,
        positions: &[[f32; 3]],
    ) -> Result<Self, CloudError> {
        let mut buffer = Self::zeroed(header, positions.len())?;
        let mut view = buffer.positions_mut()?;
        for (i, &p) in positions.iter().enumerate() {
            view.set(i, p);
        }
        Ok(buffer)
    }

    pub fn header(&self) -> &PointCloudHeader {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.num_points
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    pub fn stride(&self) -> usize {
        self.header.stride()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_parts(self) -> (PointCloudHeader, usize, Vec<u8>) {
        (self.header, self.num_points, self.data)
    }

    pub fn record(&self, i: usize) -> &[u8] {
        let stride = self.stride();
        &self.data[i * stride..(i + 1) * stride]
    }

    pub fn field<T: Scalar>(&self, name: &str) -> Result<FieldView<'_, T>, CloudError> {
        let layout = self.header.require(name)?;
        Ok(FieldView::new(&self.data, self.stride(), layout, self.num_points))
    }

    pub fn field_mut<T: Scalar>(&mut self, name: &str) -> Result<FieldViewMut<'_, T>, CloudError> {
        let layout = self.header.require(name)?;
        let stride = self.stride();
        Ok(FieldViewMut::new(&mut self.data, stride, layout, self.num_points))
    }

    /// Position view, served from the word-aligned path when the layout allows.
    pub fn positions(&self) -> Result<PositionView<'_>, CloudError> {
        PositionView::new(&self.data, &self.header, self.num_points)
    }

    /// Position view that decodes every scalar from bytes.
    pub fn positions_decoded(&self) -> Result<PositionView<'_>, CloudError> {
        PositionView::decoded(&self.data, &self.header, self.num_points)
    }

    pub fn positions_mut(&mut self) -> Result<PositionViewMut<'_>, CloudError> {
        PositionViewMut::new(&mut self.data, &self.header, self.num_points)
    }

    pub fn aabb(&self) -> Result<Aabb, CloudError> {
        let aabb = Aabb::from_points(&self.positions()?);
        if aabb.is_empty() {
            return Err(CloudError::EmptyPointCloud);
        }
        Ok(aabb)
    }

    /// Keeps the points whose position satisfies `keep`, in original order.
    pub fn filter<F>(&self, mut keep: F) -> Result<Self, CloudError>
    where
        F: FnMut([f32; 3]) -> bool,
    {
        let positions = self.positions()?;
        Ok(self.compact(|i| keep(positions.get(i))))
    }

    /// Keeps point `i` iff `mask[i] & bits == value`.
    pub fn filter_by_mask(&self, mask: &[u32], bits: u32, value: u32) -> Result<Self, CloudError> {
        if mask.len() != self.num_points {
            return Err(CloudError::MaskLength {
                mask: mask.len(),
                points: self.num_points,
            });
        }
        Ok(self.compact(|i| mask[i] & bits == value))
    }

    /// Copies the buffer and compacts kept records toward the front.
    fn compact(&self, mut keep: impl FnMut(usize) -> bool) -> Self {
        let stride = self.stride();
        let mut data = self.data.clone();
        let mut kept = 0;
        for i in 0..self.num_points {
            if !keep(i) {
                continue;
            }
            if kept != i {
                data.copy_within(i * stride..(i + 1) * stride, kept * stride);
            }
            kept += 1;
        }
        data.truncate(kept * stride);
        data.shrink_to_fit();

        Self {
            header: self.header.with_points(kept),
            num_points: kept,
            data,
        }
    }

    /// Rewrites the `label` field of every point whose position satisfies `pred`.
    pub fn label<F>(&self, label: u32, mut pred: F) -> Result<Self, CloudError>
    where
        F: FnMut([f32; 3]) -> bool,
    {
        let positions = self.positions()?;
        let hits: Vec<usize> = (0..self.num_points)
            .filter(|&i| pred(positions.get(i)))
            .collect();
        self.label_indices(&hits, label)
    }

    /// Rewrites the `label` field of the given points.
    pub fn label_indices(&self, indices: &[usize], label: u32) -> Result<Self, CloudError> {
        self.check_indices(indices)?;
        let mut out = self.clone();
        let mut labels = out.field_mut::<u32>("label")?;
        for &i in indices {
            labels.set(i, label);
        }
        Ok(out)
    }

    /// Appends `patch` after the records of `self`; the header comes from `self`.
    pub fn merge(&self, patch: &PointBuffer) -> Result<Self, CloudError> {
        if patch.stride() != self.stride() {
            return Err(CloudError::StrideMismatch {
                base: self.stride(),
                patch: patch.stride(),
            });
        }
        let num_points = self.num_points + patch.num_points;
        let mut data = Vec::with_capacity(self.data.len() + patch.data.len());
        data.extend_from_slice(&self.data);
        data.extend_from_slice(&patch.data);

        Ok(Self {
            header: self.header.with_points(num_points),
            num_points,
            data,
        })
    }

    /// Records at `indices`, in the given order.
    pub fn select(&self, indices: &[usize]) -> Result<Self, CloudError> {
        self.check_indices(indices)?;
        let stride = self.stride();
        let mut data = Vec::with_capacity(indices.len() * stride);
        for &i in indices {
            data.extend_from_slice(self.record(i));
        }
        Ok(Self {
            header: self.header.with_points(indices.len()),
            num_points: indices.len(),
            data,
        })
    }

    /// Select all points NOT in the given index set.
    ///
    /// Complement of [`select`](Self::select); retained points keep their
    /// relative order and duplicate indices count once.
    pub fn select_inverse(&self, indices: &[usize]) -> Result<Self, CloudError> {
        self.check_indices(indices)?;
        let mut exclude = vec![false; self.num_points];
        for &i in indices {
            exclude[i] = true;
        }
        Ok(self.compact(|i| !exclude[i]))
    }

    fn check_indices(&self, indices: &[usize]) -> Result<(), CloudError> {
        match indices.iter().find(|&&i| i >= self.num_points) {
            Some(&index) => Err(CloudError::IndexOutOfRange {
                index,
                points: self.num_points,
            }),
            None => Ok(()),
        }
    }
}
