use pcedit_core::{CloudError, PointBuffer};

/// Keeps the points whose `axis` coordinate lies in `[min, max]`.
///
/// `axis` is one of `x`, `y`, `z` in either case.
pub fn passthrough_filter(
    cloud: &PointBuffer,
    axis: char,
    min: f32,
    max: f32,
) -> Result<PointBuffer, CloudError> {
    let a = match axis {
        'x' | 'X' => 0,
        'y' | 'Y' => 1,
        'z' | 'Z' => 2,
        _ => {
            return Err(CloudError::InvalidArgument(format!(
                "axis `{}` is not one of x/y/z",
                axis
            )))
        }
    };
    cloud.filter(|p| p[a].is_finite() && p[a] >= min && p[a] <= max)
}

#[cfg(test)]
mod tests {
    use super::passthrough_filter;
    use pcedit_core::{CloudError, PointBuffer, PointCloudHeader};
    use proptest::prelude::*;

    fn cloud_of(pts: &[[f32; 3]]) -> PointBuffer {
        PointBuffer::from_positions(&PointCloudHeader::xyz(pts.len()), pts).unwrap()
    }

    fn sample_cloud() -> PointBuffer {
        cloud_of(&[
            [1.0, 10.0, 100.0],
            [2.0, 20.0, 200.0],
            [3.0, 30.0, 300.0],
            [4.0, 40.0, 400.0],
            [5.0, 50.0, 500.0],
        ])
    }

    fn axis_values(cloud: &PointBuffer, axis: usize) -> Vec<f32> {
        cloud.positions().unwrap().iter().map(|p| p[axis]).collect()
    }

    #[test]
    fn passthrough_each_axis() {
        let cloud = sample_cloud();
        let x = passthrough_filter(&cloud, 'x', 2.0, 4.0).unwrap();
        assert_eq!(axis_values(&x, 0), vec![2.0, 3.0, 4.0]);
        let y = passthrough_filter(&cloud, 'Y', 20.0, 40.0).unwrap();
        assert_eq!(axis_values(&y, 1), vec![20.0, 30.0, 40.0]);
        let z = passthrough_filter(&cloud, 'z', 200.0, 400.0).unwrap();
        assert_eq!(axis_values(&z, 2), vec![200.0, 300.0, 400.0]);
    }

    #[test]
    fn passthrough_no_points_in_range() {
        let result = passthrough_filter(&sample_cloud(), 'x', 10.0, 20.0).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.as_bytes().len(), 0);
    }

    #[test]
    fn passthrough_drops_nan() {
        let cloud = cloud_of(&[[f32::NAN, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        let result = passthrough_filter(&cloud, 'x', -10.0, 10.0).unwrap();
        assert_eq!(axis_values(&result, 0), vec![1.0]);
    }

    #[test]
    fn passthrough_rejects_unknown_axis() {
        assert!(matches!(
            passthrough_filter(&sample_cloud(), 'w', 0.0, 1.0),
            Err(CloudError::InvalidArgument(_))
        ));
    }

    proptest! {
        #[test]
        fn passthrough_result_within_bounds(
            pts in prop::collection::vec(
                (-100.0f32..100.0f32, -100.0f32..100.0f32, -100.0f32..100.0f32),
                1..500
            ),
            min_val in -50.0f32..0.0f32,
            max_val in 0.0f32..50.0f32,
        ) {
            let pts: Vec<[f32; 3]> = pts.into_iter().map(|(x, y, z)| [x, y, z]).collect();
            let result = passthrough_filter(&cloud_of(&pts), 'x', min_val, max_val).unwrap();
            for x in axis_values(&result, 0) {
                prop_assert!(x >= min_val, "x={} < min={}", x, min_val);
                prop_assert!(x <= max_val, "x={} > max={}", x, max_val);
            }
            prop_assert_eq!(result.as_bytes().len(), result.len() * result.stride());
        }
    }
}
