use anyhow::{bail, Result};
use log::debug;
use tessera_core::{
    containers::{Cloud, PersistentIndexedCloud, PointIter, ReferenceCloud},
    math::AABB,
    ScalarType,
};

/// Returns a view onto all points of `cloud` whose scalar value lies within `[min, max]`. NaN values never match.
///
/// # Errors
///
/// If the scalar field of `cloud` is not enabled, if `min > max`, or if the memory for the view can't be
/// allocated
pub fn segment_by_scalar_range<C: PersistentIndexedCloud + ?Sized>(
    cloud: &C,
    min: ScalarType,
    max: ScalarType,
) -> Result<ReferenceCloud<&C>> {
    if !cloud.is_scalar_field_enabled() {
        bail!("Cloud has no scalar field");
    }
    if min > max {
        bail!("Invalid scalar range [{}, {}]", min, max);
    }

    let mut view = ReferenceCloud::new(cloud);
    for index in 0..cloud.size() {
        let value = cloud.scalar_value(index)?;
        if value >= min && value <= max {
            view.add_index(index)?;
        }
    }
    debug!(
        "{} of {} points have a scalar value within [{}, {}]",
        view.size(),
        cloud.size(),
        min,
        max
    );
    Ok(view)
}

/// Returns a view onto all points of `cloud` that are inside of `bounds` (if `inside` is `true`) or outside of
/// `bounds` (if `inside` is `false`). Points on the boundary count as inside
///
/// # Errors
///
/// If the memory for the view can't be allocated
pub fn crop_to_box<'a, C: PersistentIndexedCloud + ?Sized>(
    cloud: &'a C,
    bounds: &AABB<f64>,
    inside: bool,
) -> Result<ReferenceCloud<&'a C>> {
    let mut view = ReferenceCloud::new(cloud);
    for (index, point) in PointIter::new(cloud).enumerate() {
        if bounds.contains(&point) == inside {
            view.add_index(index)?;
        }
    }
    Ok(view)
}
