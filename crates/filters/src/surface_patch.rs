use pcedit_core::{CloudError, PointBuffer, PointCloudHeader};
use pcedit_segmentation::CrossSection;

/// Grid of points covering `section` at roughly `spacing` apart, edges
/// included. Fields other than `x y z` are zeroed.
///
/// The result shares `header`'s field layout, so it can be
/// [`merge`](PointBuffer::merge)d into the cloud the section was fitted on.
pub fn surface_patch(
    header: &PointCloudHeader,
    section: &CrossSection,
    spacing: f32,
) -> Result<PointBuffer, CloudError> {
    if !(spacing.is_finite() && spacing > 0.0) {
        return Err(CloudError::InvalidArgument(format!(
            "patch spacing {} must be finite and > 0",
            spacing
        )));
    }

    let steps = |v: [f32; 3]| {
        let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        ((len / spacing).ceil() as usize).max(1)
    };
    let (na, nb) = (steps(section.u), steps(section.v));
    let count = na
        .checked_add(1)
        .zip(nb.checked_add(1))
        .and_then(|(a, b)| a.checked_mul(b))
        .ok_or_else(|| {
            CloudError::InvalidArgument(format!("spacing {} is too fine for the section", spacing))
        })?;

    let mut positions = Vec::with_capacity(count);
    for ia in 0..=na {
        for ib in 0..=nb {
            positions.push(section.point_at(ia as f32 / na as f32, ib as f32 / nb as f32));
        }
    }
    PointBuffer::from_positions(header, &positions)
}
