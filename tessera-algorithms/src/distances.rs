use anyhow::Result;
use log::trace;
use tessera_core::{
    containers::{CloudMut, IndexedCloud, Visibility},
    nalgebra::Point3,
    ScalarType, NAN_VALUE,
};

/// Computes the euclidean distance of every point of `cloud` to `reference` and writes it to the scalar field of
/// `cloud`, enabling the scalar field if necessary. Points that are not [`Visibility::Visible`] are skipped and
/// get [`NAN_VALUE`] as their distance. Returns the number of points for which a distance was computed.
///
/// If `cloud` is a [`ReferenceCloud`](tessera_core::containers::ReferenceCloud), the distances end up in the
/// scalar field of its source, only for the points the view references.
///
/// # Errors
///
/// If the scalar field can't be enabled
pub fn compute_distances_to_point<C: IndexedCloud + CloudMut + ?Sized>(
    cloud: &mut C,
    reference: &Point3<f64>,
) -> Result<usize> {
    cloud.enable_scalar_field()?;

    let mut visible_points = 0;
    for index in 0..cloud.size() {
        let Some(point) = cloud.get_point(index) else {
            continue;
        };
        let distance = match cloud.test_visibility(&point) {
            Visibility::Visible => {
                visible_points += 1;
                (point - reference).norm() as ScalarType
            }
            visibility => {
                trace!("Skipping point {} ({:?})", index, visibility);
                NAN_VALUE
            }
        };
        cloud.set_scalar_value(index, distance)?;
    }
    Ok(visible_points)
}
