use pcedit_core::{Aabb, CloudError, PointBuffer};

/// Keeps the points inside `aabb` (bounds inclusive), or those outside it
/// when `keep_inside` is false. Non-finite points count as outside.
pub fn crop_box(
    cloud: &PointBuffer,
    aabb: &Aabb,
    keep_inside: bool,
) -> Result<PointBuffer, CloudError> {
    cloud.filter(|p| aabb.contains(&p) == keep_inside)
}
