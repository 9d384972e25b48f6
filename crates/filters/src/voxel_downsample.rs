use hashbrown::HashSet;
use log::debug;
use pcedit_core::{CloudError, PointBuffer};

/// Keeps the first point in each `voxel_size` cube, in original order.
///
/// Cubes are addressed by `floor(p / voxel_size)`. Non-finite points are
/// dropped. Every field of a kept record is carried over unchanged.
pub fn voxel_downsample(cloud: &PointBuffer, voxel_size: f32) -> Result<PointBuffer, CloudError> {
    if !(voxel_size.is_finite() && voxel_size > 0.0) {
        return Err(CloudError::InvalidArgument(format!(
            "voxel size {} must be finite and > 0",
            voxel_size
        )));
    }

    let positions = cloud.positions()?;
    let mut occupied: HashSet<(i32, i32, i32)> = HashSet::new();
    let mut keep = Vec::new();

    for (i, p) in positions.iter().enumerate() {
        if !p.iter().all(|v| v.is_finite()) {
            continue;
        }
        let key = (
            (p[0] / voxel_size).floor() as i32,
            (p[1] / voxel_size).floor() as i32,
            (p[2] / voxel_size).floor() as i32,
        );
        if occupied.insert(key) {
            keep.push(i);
        }
    }

    debug!(
        "voxel downsample at {}: {} -> {} points",
        voxel_size,
        cloud.len(),
        keep.len()
    );
    cloud.select(&keep)
}

#[cfg(test)]
mod tests {
    use super::voxel_downsample;
    use pcedit_core::{CloudError, PointBuffer, PointCloudHeader};
    use proptest::prelude::*;

    fn cloud_of(pts: &[[f32; 3]]) -> PointBuffer {
        PointBuffer::from_positions(&PointCloudHeader::xyz(pts.len()), pts).unwrap()
    }

    #[test]
    fn voxel_downsample_reduces_points() {
        let cloud = cloud_of(&[
            [0.0, 0.0, 0.0],
            [0.5, 0.0, 0.0],
            [0.0, 0.5, 0.0],
            [0.5, 0.5, 0.5],
            [1.5, 0.0, 0.0],
            [1.9, 0.9, 0.9],
        ]);
        let out = voxel_downsample(&cloud, 1.0).unwrap();
        let kept: Vec<[f32; 3]> = out.positions().unwrap().iter().collect();
        assert_eq!(kept, vec![[0.0, 0.0, 0.0], [1.5, 0.0, 0.0]]);
    }

    #[test]
    fn negative_coordinates_use_floor() {
        let cloud = cloud_of(&[[-0.5, 0.0, 0.0], [0.5, 0.0, 0.0], [-0.1, 0.0, 0.0]]);
        let out = voxel_downsample(&cloud, 1.0).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn keeps_other_fields() {
        let header = PointCloudHeader::xyz_label(2);
        let mut cloud =
            PointBuffer::from_positions(&header, &[[0.0, 0.0, 0.0], [5.0, 0.0, 0.0]]).unwrap();
        cloud.field_mut::<u32>("label").unwrap().set(1, 42);
        let out = voxel_downsample(&cloud, 1.0).unwrap();
        assert_eq!(out.as_bytes(), cloud.as_bytes());
    }

    #[test]
    fn voxel_downsample_empty_cloud() {
        let out = voxel_downsample(&cloud_of(&[]), 1.0).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn rejects_bad_voxel_size() {
        for size in [0.0, -1.0, f32::NAN] {
            assert!(matches!(
                voxel_downsample(&cloud_of(&[[0.0; 3]]), size),
                Err(CloudError::InvalidArgument(_))
            ));
        }
    }

    proptest! {
        #[test]
        fn voxel_downsample_never_increases_points(
            pts in prop::collection::vec(
                (-100.0f32..100.0f32, -100.0f32..100.0f32, -100.0f32..100.0f32),
                1..3000
            ),
            voxel_size in 0.01f32..10.0f32,
        ) {
            let pts: Vec<[f32; 3]> = pts.into_iter().map(|(x, y, z)| [x, y, z]).collect();
            let cloud = cloud_of(&pts);
            let out = voxel_downsample(&cloud, voxel_size).unwrap();
            prop_assert!(out.len() <= cloud.len());
            prop_assert!(!out.is_empty());
        }
    }
}
