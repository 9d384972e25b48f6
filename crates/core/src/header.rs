use crate::CloudError;

/// PCD element type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// `F`: IEEE 754 float, 4 or 8 bytes.
    Float,
    /// `U`: unsigned integer, 1, 2, 4 or 8 bytes.
    Unsigned,
    /// `I`: signed integer, 1, 2, 4 or 8 bytes.
    Signed,
}

impl FieldType {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'F' => Some(Self::Float),
            'U' => Some(Self::Unsigned),
            'I' => Some(Self::Signed),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Float => 'F',
            Self::Unsigned => 'U',
            Self::Signed => 'I',
        }
    }

    fn accepts_size(self, size: usize) -> bool {
        match self {
            Self::Float => size == 4 || size == 8,
            Self::Unsigned | Self::Signed => matches!(size, 1 | 2 | 4 | 8),
        }
    }
}

/// Where one field sits inside a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    /// Position of the field in the header arrays.
    pub index: usize,
    /// Byte offset from the start of the record.
    pub offset: usize,
    pub size: usize,
    pub ty: FieldType,
    pub count: usize,
}

/// Field list and cloud shape of a PCD point cloud.
///
/// `fields`, `sizes`, `types` and `counts` are parallel arrays. Constructors
/// validate them; code that edits the public fields directly must call
/// [`validate`](Self::validate) before handing the header to a
/// [`PointBuffer`](crate::PointBuffer).
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudHeader {
    pub fields: Vec<String>,
    pub sizes: Vec<usize>,
    pub types: Vec<FieldType>,
    pub counts: Vec<usize>,
    pub width: usize,
    pub height: usize,
    /// Sensor pose as `tx ty tz qw qx qy qz`.
    pub viewpoint: Option<[f32; 7]>,
}

impl PointCloudHeader {
    pub fn new(
        fields: Vec<String>,
        sizes: Vec<usize>,
        types: Vec<FieldType>,
        counts: Vec<usize>,
        width: usize,
        height: usize,
        viewpoint: Option<[f32; 7]>,
    ) -> Result<Self, CloudError> {
        let header = Self {
            fields,
            sizes,
            types,
            counts,
            width,
            height,
            viewpoint,
        };
        header.validate()?;
        Ok(header)
    }

    /// `x y z` as three 4-byte floats.
    pub fn xyz(points: usize) -> Self {
        Self::float_fields(&["x", "y", "z"], points)
    }

    /// `x y z` floats followed by a 4-byte unsigned `label`.
    pub fn xyz_label(points: usize) -> Self {
        let mut header = Self::xyz(points);
        header.fields.push("label".to_string());
        header.sizes.push(4);
        header.types.push(FieldType::Unsigned);
        header.counts.push(1);
        header
    }

    fn float_fields(names: &[&str], points: usize) -> Self {
        Self {
            fields: names.iter().map(|s| s.to_string()).collect(),
            sizes: vec![4; names.len()],
            types: vec![FieldType::Float; names.len()],
            counts: vec![1; names.len()],
            width: points,
            height: 1,
            viewpoint: None,
        }
    }

    pub fn validate(&self) -> Result<(), CloudError> {
        let n = self.fields.len();
        if self.sizes.len() != n || self.types.len() != n || self.counts.len() != n {
            return Err(CloudError::MalformedHeader(format!(
                "{} fields but {} sizes, {} types, {} counts",
                n,
                self.sizes.len(),
                self.types.len(),
                self.counts.len()
            )));
        }
        for i in 0..n {
            if !self.types[i].accepts_size(self.sizes[i]) {
                return Err(CloudError::MalformedHeader(format!(
                    "field `{}` has invalid size {} for type {}",
                    self.fields[i],
                    self.sizes[i],
                    self.types[i].as_char()
                )));
            }
            if self.counts[i] == 0 {
                return Err(CloudError::MalformedHeader(format!(
                    "field `{}` has zero count",
                    self.fields[i]
                )));
            }
        }
        let stride = self
            .sizes
            .iter()
            .zip(&self.counts)
            .try_fold(0usize, |acc, (size, count)| {
                size.checked_mul(*count).and_then(|w| acc.checked_add(w))
            });
        if stride.is_none() {
            return Err(CloudError::MalformedHeader(
                "record stride overflows".to_string(),
            ));
        }
        Ok(())
    }

    /// Bytes per record: `Σ size[i] * count[i]`.
    pub fn stride(&self) -> usize {
        self.sizes
            .iter()
            .zip(&self.counts)
            .map(|(size, count)| size * count)
            .sum()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    pub fn field_layout(&self, name: &str) -> Option<FieldLayout> {
        let index = self.field_index(name)?;
        let offset = self.sizes[..index]
            .iter()
            .zip(&self.counts[..index])
            .map(|(size, count)| size * count)
            .sum();
        Some(FieldLayout {
            index,
            offset,
            size: self.sizes[index],
            ty: self.types[index],
            count: self.counts[index],
        })
    }

    /// Like [`field_layout`](Self::field_layout) but reports a missing field as an error.
    pub fn require(&self, name: &str) -> Result<FieldLayout, CloudError> {
        self.field_layout(name)
            .ok_or_else(|| CloudError::FieldNotFound(name.to_string()))
    }

    /// Clone of this header describing an unorganized cloud of `points` points.
    pub fn with_points(&self, points: usize) -> Self {
        Self {
            width: points,
            height: 1,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_sums_size_times_count() {
        let mut header = PointCloudHeader::xyz_label(0);
        assert_eq!(header.stride(), 16);
        header.fields.push("rgb".to_string());
        header.sizes.push(1);
        header.types.push(FieldType::Unsigned);
        header.counts.push(3);
        assert_eq!(header.stride(), 19);
    }

    #[test]
    fn field_layout_offsets() {
        let header = PointCloudHeader::xyz_label(0);
        let label = header.field_layout("label").unwrap();
        assert_eq!(label.offset, 12);
        assert_eq!(label.index, 3);
        assert_eq!(label.ty, FieldType::Unsigned);
        assert!(header.field_layout("intensity").is_none());
        assert_eq!(
            header.require("intensity"),
            Err(CloudError::FieldNotFound("intensity".to_string()))
        );
    }

    #[test]
    fn mismatched_arrays_are_malformed() {
        let err = PointCloudHeader::new(
            vec!["x".into(), "y".into()],
            vec![4],
            vec![FieldType::Float, FieldType::Float],
            vec![1, 1],
            0,
            1,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CloudError::MalformedHeader(_)));
    }

    #[test]
    fn overflowing_stride_is_malformed() {
        let err = PointCloudHeader::new(
            vec!["rgb".into(), "pad".into()],
            vec![8, 1],
            vec![FieldType::Unsigned, FieldType::Unsigned],
            vec![usize::MAX / 8, 8],
            0,
            1,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CloudError::MalformedHeader(_)));
    }

    #[test]
    fn invalid_float_size_is_malformed() {
        let err = PointCloudHeader::new(
            vec!["x".into()],
            vec![2],
            vec![FieldType::Float],
            vec![1],
            0,
            1,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CloudError::MalformedHeader(_)));
    }

    #[test]
    fn type_tags_roundtrip() {
        for ty in [FieldType::Float, FieldType::Unsigned, FieldType::Signed] {
            assert_eq!(FieldType::from_char(ty.as_char()), Some(ty));
        }
        assert_eq!(FieldType::from_char('X'), None);
    }
}
