use rayon::prelude::*;
use tessera_core::{
    containers::{IndexedCloud, PointIter},
    math::AABB,
};

/// Calculate the bounding box of the points in the given `cloud`. Returns `None` if the cloud contains zero
/// points. Unlike [`Cloud::bounding_box`](tessera_core::containers::Cloud::bounding_box), this never uses or updates
/// a cached value and only needs shared access to `cloud`
pub fn calculate_bounds<C: IndexedCloud + ?Sized>(cloud: &C) -> Option<AABB<f64>> {
    AABB::from_points(PointIter::new(cloud))
}

/// Parallel version of [`calculate_bounds`]. The index range of `cloud` is split into blocks of `block_size`
/// points which are processed independently, each with its own iterator, and then merged
///
/// # Panics
///
/// If `block_size` is zero
pub fn par_calculate_bounds<C: IndexedCloud + Sync + ?Sized>(
    cloud: &C,
    block_size: usize,
) -> Option<AABB<f64>> {
    assert!(block_size > 0, "block_size must not be zero");
    let num_blocks = cloud.size().div_ceil(block_size);
    (0..num_blocks)
        .into_par_iter()
        .filter_map(|block| {
            let start = block * block_size;
            AABB::from_points(PointIter::with_range(cloud, start..(start + block_size)))
        })
        .reduce_with(|a, b| AABB::union(&a, &b))
}
