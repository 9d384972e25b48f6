use std::marker::PhantomData;

use crate::{CloudError, FieldLayout, PointAccess, PointCloudHeader, Scalar};

/// Read-only typed view of one field across every record.
///
/// Only the first element of multi-count fields is exposed.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a, T> {
    data: &'a [u8],
    stride: usize,
    layout: FieldLayout,
    num_points: usize,
    _marker: PhantomData<T>,
}

impl<'a, T: Scalar> FieldView<'a, T> {
    pub(crate) fn new(
        data: &'a [u8],
        stride: usize,
        layout: FieldLayout,
        num_points: usize,
    ) -> Self {
        Self {
            data,
            stride,
            layout,
            num_points,
            _marker: PhantomData,
        }
    }

    pub fn layout(&self) -> FieldLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.num_points
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> T {
        assert!(i < self.num_points, "index out of bounds");
        let base = i * self.stride + self.layout.offset;
        T::decode(&self.data[base..base + self.layout.size], self.layout.ty)
    }

    pub fn iter(&self) -> FieldIter<'a, T> {
        FieldIter {
            view: *self,
            next: 0,
        }
    }
}

/// Cursor advancing one record (`stride` bytes) per step.
#[derive(Debug, Clone)]
pub struct FieldIter<'a, T> {
    view: FieldView<'a, T>,
    next: usize,
}

impl<T: Scalar> Iterator for FieldIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.next >= self.view.num_points {
            return None;
        }
        let value = self.view.get(self.next);
        self.next += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.view.num_points - self.next;
        (left, Some(left))
    }
}

impl<T: Scalar> ExactSizeIterator for FieldIter<'_, T> {}

/// Mutable typed view of one field.
#[derive(Debug)]
pub struct FieldViewMut<'a, T> {
    data: &'a mut [u8],
    stride: usize,
    layout: FieldLayout,
    num_points: usize,
    _marker: PhantomData<T>,
}

impl<'a, T: Scalar> FieldViewMut<'a, T> {
    pub(crate) fn new(
        data: &'a mut [u8],
        stride: usize,
        layout: FieldLayout,
        num_points: usize,
    ) -> Self {
        Self {
            data,
            stride,
            layout,
            num_points,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.num_points
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    pub fn get(&self, i: usize) -> T {
        assert!(i < self.num_points, "index out of bounds");
        let base = i * self.stride + self.layout.offset;
        T::decode(&self.data[base..base + self.layout.size], self.layout.ty)
    }

    pub fn set(&mut self, i: usize, value: T) {
        assert!(i < self.num_points, "index out of bounds");
        let base = i * self.stride + self.layout.offset;
        value.encode(&mut self.data[base..base + self.layout.size], self.layout.ty);
    }
}

#[derive(Debug, Clone, Copy)]
enum PositionSource<'a> {
    /// Consecutive `F4` x/y/z with word-aligned offset and stride, read as
    /// little-endian words. `stride` and `offset` are counted in words.
    Words {
        words: &'a [u32],
        stride: usize,
        offset: usize,
    },
    /// Consecutive `F4` x/y/z decoded from raw bytes.
    Packed {
        data: &'a [u8],
        stride: usize,
        offset: usize,
    },
    /// Three independent fields combined per step.
    Split {
        x: FieldView<'a, f32>,
        y: FieldView<'a, f32>,
        z: FieldView<'a, f32>,
    },
}

/// Random-access view of `(x, y, z)` positions.
///
/// Every source yields bit-identical values for the same bytes; the word path
/// only skips per-byte decoding.
#[derive(Debug, Clone, Copy)]
pub struct PositionView<'a> {
    source: PositionSource<'a>,
    num_points: usize,
}

/// Offset of `x` when `x`, `y`, `z` are adjacent single 4-byte floats.
fn contiguous_xyz(header: &PointCloudHeader) -> Result<Option<usize>, CloudError> {
    let x = header.require("x")?;
    let y = header.require("y")?;
    let z = header.require("z")?;
    let packed = [x, y, z]
        .iter()
        .all(|f| f.ty == crate::FieldType::Float && f.size == 4 && f.count == 1)
        && y.index == x.index + 1
        && z.index == y.index + 1;
    Ok(packed.then_some(x.offset))
}

impl<'a> PositionView<'a> {
    pub(crate) fn new(
        data: &'a [u8],
        header: &PointCloudHeader,
        num_points: usize,
    ) -> Result<Self, CloudError> {
        let stride = header.stride();
        if let Some(offset) = contiguous_xyz(header)? {
            if offset % 4 == 0 && stride % 4 == 0 {
                if let Ok(words) = bytemuck::try_cast_slice::<u8, u32>(data) {
                    return Ok(Self {
                        source: PositionSource::Words {
                            words,
                            stride: stride / 4,
                            offset: offset / 4,
                        },
                        num_points,
                    });
                }
            }
        }
        Self::decoded(data, header, num_points)
    }

    /// Builds a view that always decodes from bytes, never through words.
    pub(crate) fn decoded(
        data: &'a [u8],
        header: &PointCloudHeader,
        num_points: usize,
    ) -> Result<Self, CloudError> {
        let stride = header.stride();
        let source = match contiguous_xyz(header)? {
            Some(offset) => PositionSource::Packed {
                data,
                stride,
                offset,
            },
            None => PositionSource::Split {
                x: FieldView::new(data, stride, header.require("x")?, num_points),
                y: FieldView::new(data, stride, header.require("y")?, num_points),
                z: FieldView::new(data, stride, header.require("z")?, num_points),
            },
        };
        Ok(Self { source, num_points })
    }

    /// Whether positions are served from the word-aligned path.
    pub fn is_word_aligned(&self) -> bool {
        matches!(self.source, PositionSource::Words { .. })
    }

    pub fn len(&self) -> usize {
        self.num_points
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> [f32; 3] {
        assert!(i < self.num_points, "index out of bounds");
        match self.source {
            PositionSource::Words {
                words,
                stride,
                offset,
            } => {
                let base = i * stride + offset;
                [
                    f32::from_bits(u32::from_le(words[base])),
                    f32::from_bits(u32::from_le(words[base + 1])),
                    f32::from_bits(u32::from_le(words[base + 2])),
                ]
            }
            PositionSource::Packed {
                data,
                stride,
                offset,
            } => {
                let base = i * stride + offset;
                let read = |at: usize| {
                    f32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
                };
                [read(base), read(base + 4), read(base + 8)]
            }
            PositionSource::Split { x, y, z } => [x.get(i), y.get(i), z.get(i)],
        }
    }

    pub fn iter(&self) -> PositionIter<'a> {
        PositionIter {
            view: *self,
            next: 0,
        }
    }
}

impl PointAccess for PositionView<'_> {
    fn len(&self) -> usize {
        self.num_points
    }

    fn position(&self, i: usize) -> [f32; 3] {
        self.get(i)
    }
}

#[derive(Debug, Clone)]
pub struct PositionIter<'a> {
    view: PositionView<'a>,
    next: usize,
}

impl Iterator for PositionIter<'_> {
    type Item = [f32; 3];

    fn next(&mut self) -> Option<[f32; 3]> {
        if self.next >= self.view.num_points {
            return None;
        }
        let p = self.view.get(self.next);
        self.next += 1;
        Some(p)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.view.num_points - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for PositionIter<'_> {}

/// Mutable position view; writes go through the per-field encoders.
#[derive(Debug)]
pub struct PositionViewMut<'a> {
    data: &'a mut [u8],
    stride: usize,
    axes: [FieldLayout; 3],
    num_points: usize,
}

impl<'a> PositionViewMut<'a> {
    pub(crate) fn new(
        data: &'a mut [u8],
        header: &PointCloudHeader,
        num_points: usize,
    ) -> Result<Self, CloudError> {
        Ok(Self {
            stride: header.stride(),
            axes: [header.require("x")?, header.require("y")?, header.require("z")?],
            data,
            num_points,
        })
    }

    pub fn len(&self) -> usize {
        self.num_points
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    pub fn get(&self, i: usize) -> [f32; 3] {
        assert!(i < self.num_points, "index out of bounds");
        let base = i * self.stride;
        self.axes.map(|f| {
            let at = base + f.offset;
            f32::decode(&self.data[at..at + f.size], f.ty)
        })
    }

    pub fn set(&mut self, i: usize, p: [f32; 3]) {
        assert!(i < self.num_points, "index out of bounds");
        let base = i * self.stride;
        for (f, v) in self.axes.iter().zip(p) {
            let at = base + f.offset;
            v.encode(&mut self.data[at..at + f.size], f.ty);
        }
    }
}
