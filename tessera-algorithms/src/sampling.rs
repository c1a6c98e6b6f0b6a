use anyhow::Result;
use itertools::Itertools;
use log::debug;
use rand::{seq::index::sample, Rng};
use tessera_core::containers::{PersistentIndexedCloud, ReferenceCloud};

/// Selects `count` distinct points of `cloud` at random and returns them as a view. The selected points keep
/// the order they have in `cloud`. If `count` is not smaller than the number of points in `cloud`, the view
/// contains all points.
///
/// # Errors
///
/// If the memory for the indices of the view can't be allocated
pub fn subsample_randomly<'a, C, R>(
    cloud: &'a C,
    count: usize,
    rng: &mut R,
) -> Result<ReferenceCloud<&'a C>>
where
    C: PersistentIndexedCloud + ?Sized,
    R: Rng + ?Sized,
{
    let size = cloud.size();
    let mut view = ReferenceCloud::new(cloud);
    if count >= size {
        view.add_index_range(0..size)?;
        return Ok(view);
    }

    debug!("Selecting {} of {} points at random", count, size);
    view.reserve(count)?;
    for index in sample(rng, size, count).into_iter().sorted() {
        view.add_index(index)?;
    }
    Ok(view)
}
