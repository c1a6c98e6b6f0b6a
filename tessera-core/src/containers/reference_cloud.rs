use std::{
    fmt,
    ops::{Deref, DerefMut, Range},
};

use log::{debug, trace, warn};
use nalgebra::Point3;

use crate::{
    math::{BoundsCache, AABB},
    CloudError, ScalarType, NAN_VALUE,
};

use super::{ChunkedArray, Cloud, CloudMut, IndexedCloud, PersistentIndexedCloud, Visibility};

/// A view onto a subset (or a permutation, or a selection with repetitions) of the points of another cloud,
/// the *source*. A `ReferenceCloud` stores nothing but an ordered list of *global* indices into the source
/// together with a cached bounding box and its own cursor. The position of an entry in this list is its *local*
/// index.
///
/// `ReferenceCloud` is itself a [`PersistentIndexedCloud`], so every algorithm that works on a cloud also works
/// on a view: all point and scalar accesses are forwarded through the index list to the source. Views never
/// have their own scalar field, reading or writing a scalar value through a view reads or writes the scalar
/// value of the source.
///
/// # Source handles
///
/// The source is held through a handle `S` that dereferences to the source cloud. This can be a shared borrow
/// (`&ChunkedCloud`), which allows any number of views over the same source (also across threads), a mutable
/// borrow (`&mut ChunkedCloud`), which additionally allows writing scalar values through the view, or an owning
/// smart pointer such as `Arc<ChunkedCloud>`. In all cases the source outlives the view and can't be resized while
/// the view exists.
///
/// # Indices
///
/// Global indices are not validated on insertion, since the source might be rebound or grow later. Accessing a
/// point through an index that is out of bounds for the current source returns `None` (or
/// [`CloudError::IndexOutOfRange`] for scalar values).
///
/// ```
/// # use tessera_core::containers::*;
/// # use nalgebra::Point3;
/// let cloud: ChunkedCloud = (0..5).map(|i| Point3::new(i as f64, i as f64, i as f64)).collect();
/// let mut view = ReferenceCloud::new(&cloud);
/// view.add_index_range(1..4).unwrap();
/// assert_eq!(3, view.size());
/// assert_eq!(Some(Point3::new(1.0, 1.0, 1.0)), view.get_point(0));
///
/// let bounds = view.bounding_box().unwrap();
/// assert_eq!(Point3::new(3.0, 3.0, 3.0), *bounds.max());
/// ```
pub struct ReferenceCloud<S> {
    source: Option<S>,
    indices: ChunkedArray<usize>,
    bounds: BoundsCache,
    cursor: usize,
}

impl<S> ReferenceCloud<S>
where
    S: Deref,
    S::Target: PersistentIndexedCloud,
{
    /// Creates a new empty `ReferenceCloud` over the given `source`
    pub fn new(source: S) -> Self {
        Self {
            source: Some(source),
            ..Self::detached()
        }
    }

    /// Creates a new empty `ReferenceCloud` that is not associated with any source yet. Indices can be added,
    /// but all point and scalar accesses fail until a source is set with [`set_source`](Self::set_source)
    pub fn detached() -> Self {
        Self {
            source: None,
            indices: ChunkedArray::new(),
            bounds: BoundsCache::new(),
            cursor: 0,
        }
    }

    /// Returns the source cloud of this view, if there is one
    pub fn source(&self) -> Option<&S::Target> {
        self.source.as_deref()
    }

    /// Returns the handle through which this view accesses its source
    pub fn source_handle(&self) -> Option<&S> {
        self.source.as_ref()
    }

    /// Associates this view with `source` and returns the previous handle. The indices are kept and are from now
    /// on interpreted as indices into `source`
    pub fn set_source(&mut self, source: S) -> Option<S> {
        self.bounds.invalidate();
        self.source.replace(source)
    }

    /// Removes the association with the source and returns its handle. The indices are kept
    pub fn detach_source(&mut self) -> Option<S> {
        self.bounds.invalidate();
        self.source.take()
    }

    /// All changes to the set of referenced points go through here so that the cached bounds are invalidated
    fn indices_mut(&mut self) -> &mut ChunkedArray<usize> {
        self.bounds.invalidate();
        &mut self.indices
    }

    /// Appends the global index `global_index` to this view
    pub fn add_index(&mut self, global_index: usize) -> Result<(), CloudError> {
        self.indices_mut().push(global_index)
    }

    /// Appends all global indices in `global_indices`. Memory for the whole range is reserved before the first
    /// index is written, so on failure the view is unchanged
    pub fn add_index_range(&mut self, global_indices: Range<usize>) -> Result<(), CloudError> {
        if global_indices.is_empty() {
            return Ok(());
        }
        let new_size = self.indices.len_after(global_indices.len())?;
        if let Err(err) = self.indices.reserve(new_size) {
            debug!("Could not reserve {} indices for reference cloud: {}", new_size, err);
            return Err(err);
        }
        self.indices_mut().extend_from_iter(global_indices)
    }

    /// Sets the global index of the entry at `local_index` to `global_index`
    pub fn set_index_at(&mut self, local_index: usize, global_index: usize) -> Result<(), CloudError> {
        self.check_local_index(local_index)?;
        self.indices_mut().set(local_index, global_index)
    }

    /// Removes the entry at `local_index` and returns its global index. All following entries move down by one
    /// position, their relative order is kept.
    ///
    /// If `local_index` is the position of the cursor, the cursor stays where it is and thus points to the entry
    /// that followed the removed one. If the removed entry was before the cursor, the cursor moves back by one so
    /// that it keeps pointing to the same entry
    pub fn remove_at(&mut self, local_index: usize) -> Result<usize, CloudError> {
        self.check_local_index(local_index)?;
        let removed = self.indices_mut().remove(local_index)?;
        if local_index < self.cursor {
            self.cursor -= 1;
        }
        self.cursor = self.cursor.min(self.indices.len());
        Ok(removed)
    }

    /// Removes the entry at the cursor. See [`remove_at`](Self::remove_at)
    pub fn remove_current(&mut self) -> Result<usize, CloudError> {
        self.remove_at(self.cursor)
    }

    /// Exchanges the entries at `first` and `second`. Since this does not change the set of referenced points,
    /// the cached bounding box stays valid
    pub fn swap(&mut self, first: usize, second: usize) -> Result<(), CloudError> {
        self.indices.swap(first, second)
    }

    /// Reserves memory for `count` entries in total
    pub fn reserve(&mut self, count: usize) -> Result<(), CloudError> {
        self.indices.reserve(count)
    }

    /// Sets the number of entries to `count`. New entries reference the global index 0 and are expected to be
    /// overwritten with [`set_index_at`](Self::set_index_at)
    pub fn resize(&mut self, count: usize) -> Result<(), CloudError> {
        if count == self.indices.len() {
            return Ok(());
        }
        self.indices.reserve(count)?;
        self.indices_mut().resize(count, 0)?;
        self.cursor = self.cursor.min(count);
        Ok(())
    }

    /// Returns the number of entries this view can hold without allocating
    pub fn capacity(&self) -> usize {
        self.indices.capacity()
    }

    /// Removes all entries and resets the cursor. The source is kept
    pub fn clear(&mut self, release_memory: bool) {
        self.indices_mut().clear(release_memory);
        self.cursor = 0;
    }

    /// Appends all entries of `other` to this view. Both views must be associated with the very same source
    /// instance. Duplicate indices are not removed.
    ///
    /// # Errors
    ///
    /// [`CloudError::SourceMismatch`] if the sources differ or one of the views has no source. This view is
    /// unchanged in that case
    pub fn append<T>(&mut self, other: &ReferenceCloud<T>) -> Result<(), CloudError>
    where
        T: Deref<Target = S::Target>,
    {
        let same_source = match (self.source.as_deref(), other.source.as_deref()) {
            (Some(own), Some(theirs)) => {
                std::ptr::addr_eq(own as *const S::Target, theirs as *const S::Target)
            }
            _ => false,
        };
        if !same_source {
            warn!("Refusing to append a reference cloud with a different source");
            return Err(CloudError::SourceMismatch);
        }
        if other.indices.is_empty() {
            return Ok(());
        }
        self.indices
            .reserve(self.indices.len_after(other.indices.len())?)?;
        self.indices_mut().extend_from_array(&other.indices)
    }

    /// Returns the global index of the entry at `local_index`
    pub fn global_index(&self, local_index: usize) -> Option<usize> {
        self.indices.get(local_index).copied()
    }

    /// Returns an iterator over all global indices of this view, in order
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    /// Returns the position of the cursor. A position equal to `size()` means the cursor is exhausted
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Advances the cursor by one entry without accessing the point
    pub fn forward_iterator(&mut self) {
        self.cursor = (self.cursor + 1).min(self.indices.len());
    }

    /// Returns the global index of the entry at the cursor
    pub fn current_global_index(&self) -> Option<usize> {
        self.global_index(self.cursor)
    }

    /// Returns the point of the entry at the cursor without moving the cursor
    pub fn current_point(&self) -> Option<&Point3<f64>> {
        self.point_persistent(self.cursor)
    }

    /// Returns the scalar value of the entry at the cursor
    pub fn current_scalar_value(&self) -> Result<ScalarType, CloudError> {
        self.scalar_value(self.cursor)
    }

    /// Marks the cached bounding box as stale. This is required if the coordinates of the source points changed
    /// while this view was detached from the source
    pub fn invalidate_bounding_box(&mut self) {
        self.bounds.invalidate();
    }

    /// Returns `true` if the cached bounding box is up to date
    pub fn is_bounding_box_valid(&self) -> bool {
        self.bounds.is_valid()
    }

    fn check_local_index(&self, local_index: usize) -> Result<(), CloudError> {
        if local_index >= self.indices.len() {
            return Err(CloudError::IndexOutOfRange {
                index: local_index,
                size: self.indices.len(),
            });
        }
        Ok(())
    }

    /// Resolves `local_index` to the source and the global index
    fn resolve(&self, local_index: usize) -> Result<(&S::Target, usize), CloudError> {
        let source = self.source.as_deref().ok_or(CloudError::NoSource)?;
        let global_index = self
            .indices
            .get(local_index)
            .copied()
            .ok_or(CloudError::IndexOutOfRange {
                index: local_index,
                size: self.indices.len(),
            })?;
        Ok((source, global_index))
    }
}

impl<S> ReferenceCloud<S>
where
    S: DerefMut,
    S::Target: PersistentIndexedCloud + CloudMut,
{
    /// Returns the source cloud of this view for modification, if there is one
    pub fn source_mut(&mut self) -> Option<&mut S::Target> {
        self.source.as_deref_mut()
    }

    /// Sets the scalar value of the entry at the cursor
    pub fn set_current_scalar_value(&mut self, value: ScalarType) -> Result<(), CloudError> {
        self.set_scalar_value(self.cursor, value)
    }
}

impl<S> Cloud for ReferenceCloud<S>
where
    S: Deref,
    S::Target: PersistentIndexedCloud,
{
    fn size(&self) -> usize {
        self.indices.len()
    }

    fn bounding_box(&mut self) -> Option<AABB<f64>> {
        let source = self.source.as_deref();
        let indices = &self.indices;
        self.bounds.get_or_compute(|| {
            trace!("Recomputing bounding box of {} referenced points", indices.len());
            let source = source?;
            AABB::from_points(
                indices
                    .iter()
                    .filter_map(|&global_index| source.point_persistent(global_index))
                    .copied(),
            )
        })
    }

    fn test_visibility(&self, point: &Point3<f64>) -> Visibility {
        self.source
            .as_deref()
            .map_or(Visibility::Visible, |source| source.test_visibility(point))
    }

    fn reset_iterator(&mut self) {
        self.cursor = 0;
    }

    /// Entries whose global index is out of range for the source are stepped over, so `None` only signals that
    /// the cursor is exhausted (or that there is no source)
    fn next_point(&mut self) -> Option<&Point3<f64>> {
        let source = self.source.as_deref()?;
        while let Some(&global_index) = self.indices.get(self.cursor) {
            self.cursor += 1;
            if let Some(point) = source.point_persistent(global_index) {
                return Some(point);
            }
            trace!("Skipping unresolvable global index {}", global_index);
        }
        None
    }

    fn is_scalar_field_enabled(&self) -> bool {
        self.source
            .as_deref()
            .map_or(false, |source| source.is_scalar_field_enabled())
    }

    fn scalar_value(&self, index: usize) -> Result<ScalarType, CloudError> {
        let (source, global_index) = self.resolve(index)?;
        source.scalar_value(global_index)
    }
}

impl<S> CloudMut for ReferenceCloud<S>
where
    S: DerefMut,
    S::Target: PersistentIndexedCloud + CloudMut,
{
    fn enable_scalar_field(&mut self) -> Result<(), CloudError> {
        self.source
            .as_deref_mut()
            .ok_or(CloudError::NoSource)?
            .enable_scalar_field()
    }

    fn set_scalar_value(&mut self, index: usize, value: ScalarType) -> Result<(), CloudError> {
        let (_, global_index) = self.resolve(index)?;
        self.source
            .as_deref_mut()
            .ok_or(CloudError::NoSource)?
            .set_scalar_value(global_index, value)
    }

    fn for_each(&mut self, action: &mut dyn FnMut(&Point3<f64>, &mut ScalarType)) {
        let Some(source) = self.source.as_deref_mut() else {
            return;
        };
        let scalar_field_enabled = source.is_scalar_field_enabled();
        for global_index in self.indices.iter().copied() {
            let Some(point) = source.get_point(global_index) else {
                continue;
            };
            let mut value = if scalar_field_enabled {
                source.scalar_value(global_index).unwrap_or(NAN_VALUE)
            } else {
                NAN_VALUE
            };
            action(&point, &mut value);
            if scalar_field_enabled {
                let written = source.set_scalar_value(global_index, value);
                debug_assert!(written.is_ok());
            }
        }
    }
}

impl<S> IndexedCloud for ReferenceCloud<S>
where
    S: Deref,
    S::Target: PersistentIndexedCloud,
{
    fn get_point(&self, index: usize) -> Option<Point3<f64>> {
        let (source, global_index) = self.resolve(index).ok()?;
        source.get_point(global_index)
    }

    fn point_at(&mut self, index: usize) -> Option<&Point3<f64>> {
        self.point_persistent(index)
    }
}

impl<S> PersistentIndexedCloud for ReferenceCloud<S>
where
    S: Deref,
    S::Target: PersistentIndexedCloud,
{
    fn point_persistent(&self, index: usize) -> Option<&Point3<f64>> {
        let (source, global_index) = self.resolve(index).ok()?;
        source.point_persistent(global_index)
    }
}

/// Cloning a view copies its indices and shares the source. The clone starts with its cursor at the beginning
impl<S: Clone> Clone for ReferenceCloud<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            indices: self.indices.clone(),
            bounds: self.bounds.clone(),
            cursor: 0,
        }
    }
}

impl<S> fmt::Debug for ReferenceCloud<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceCloud")
            .field("has_source", &self.source.is_some())
            .field("indices", &self.indices)
            .field("bounds", &self.bounds)
            .field("cursor", &self.cursor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use itertools::Itertools;
    use rand::{seq::index::sample, thread_rng};
    use rayon::prelude::*;

    use super::*;
    use crate::containers::ChunkedCloud;
    use crate::test_utils::{diagonal_cloud, random_cloud, CountingCloud, HalfVisibleCloud};

    fn diagonal(value: f64) -> Point3<f64> {
        Point3::new(value, value, value)
    }

    fn collect_points<C: IndexedCloud>(cloud: &C) -> Vec<Point3<f64>> {
        cloud.points().collect()
    }

    #[test]
    fn test_new_view_is_empty() {
        let source = diagonal_cloud(5);
        let mut view = ReferenceCloud::new(&source);
        assert_eq!(0, view.size());
        assert!(view.is_empty());
        assert_eq!(0, view.cursor());
        assert!(!view.is_bounding_box_valid());
        assert_eq!(None, view.bounding_box());
        assert_eq!(None, view.next_point());
    }

    #[test]
    fn test_diagonal_scenario() {
        let source = diagonal_cloud(5);
        let mut view = ReferenceCloud::new(&source);
        view.add_index_range(1..4).unwrap();

        assert_eq!(3, view.size());
        assert_eq!(Some(diagonal(1.0)), view.get_point(0));
        let bounds = view.bounding_box().unwrap();
        assert_eq!(diagonal(1.0), *bounds.min());
        assert_eq!(diagonal(3.0), *bounds.max());

        assert_eq!(2, view.remove_at(1).unwrap());
        assert_eq!(2, view.size());
        assert_eq!(vec![diagonal(1.0), diagonal(3.0)], collect_points(&view));
        assert!(!view.is_bounding_box_valid());
        let bounds = view.bounding_box().unwrap();
        assert_eq!(diagonal(1.0), *bounds.min());
        assert_eq!(diagonal(3.0), *bounds.max());
    }

    #[test]
    fn test_points_match_source_through_global_indices() {
        let source = diagonal_cloud(10);
        let mut view = ReferenceCloud::new(&source);
        for global_index in [7, 2, 2, 9, 0] {
            view.add_index(global_index).unwrap();
        }
        assert_eq!(5, view.size());
        for local_index in 0..view.size() {
            let global_index = view.global_index(local_index).unwrap();
            assert_eq!(source.get_point(global_index), view.get_point(local_index));
            assert_eq!(
                source.point_persistent(global_index),
                view.point_persistent(local_index)
            );
        }
        assert_eq!(vec![7, 2, 2, 9, 0], view.indices().collect_vec());
    }

    #[test]
    fn test_out_of_range_access_is_checked() {
        let source = diagonal_cloud(3);
        let mut view = ReferenceCloud::new(&source);
        view.add_index(1).unwrap();
        view.add_index(10).unwrap();

        assert_eq!(None, view.get_point(2));
        assert_eq!(None, view.get_point(1));
        assert_eq!(None, view.point_at(1));
        assert!(matches!(
            view.set_index_at(2, 0),
            Err(CloudError::IndexOutOfRange { index: 2, size: 2 })
        ));
        assert!(view.remove_at(2).is_err());
        assert_eq!(2, view.size());

        // Out-of-range indices do not contribute to the bounding box
        let bounds = view.bounding_box().unwrap();
        assert_eq!(diagonal(1.0), *bounds.min());
        assert_eq!(diagonal(1.0), *bounds.max());
    }

    #[test]
    fn test_swap_keeps_cached_bounds() {
        let source = CountingCloud::new(diagonal_cloud(6));
        let mut view = ReferenceCloud::new(&source);
        view.add_index_range(0..6).unwrap();
        let bounds_before = view.bounding_box().unwrap();
        let retrievals = source.retrievals();
        assert_eq!(6, retrievals);

        view.swap(0, 5).unwrap();
        assert!(view.is_bounding_box_valid());
        let bounds_after = view.bounding_box().unwrap();
        assert_eq!(retrievals, source.retrievals());
        assert_eq!(bounds_before.min().coords.map(f64::to_bits), bounds_after.min().coords.map(f64::to_bits));
        assert_eq!(bounds_before.max().coords.map(f64::to_bits), bounds_after.max().coords.map(f64::to_bits));
        assert_eq!(Some(5), view.global_index(0));
        assert_eq!(Some(0), view.global_index(5));
    }

    #[test]
    fn test_mutations_invalidate_bounds_and_reads_do_not() {
        let source_cloud = CountingCloud::new(diagonal_cloud(10));
        let mut view = ReferenceCloud::new(&source_cloud);
        view.add_index_range(2..5).unwrap();

        fn check(view: &mut ReferenceCloud<&CountingCloud>, source_cloud: &CountingCloud, min: f64, max: f64) {
            let before = source_cloud.retrievals();
            let bounds = view.bounding_box().unwrap();
            assert_eq!(diagonal(min), *bounds.min());
            assert_eq!(diagonal(max), *bounds.max());
            let recomputed = source_cloud.retrievals() - before;
            assert_eq!(view.size(), recomputed);

            // A second query is served from the cache
            let cached = view.bounding_box().unwrap();
            assert_eq!(bounds, cached);
            assert_eq!(before + recomputed, source_cloud.retrievals());
        }

        check(&mut view, &source_cloud, 2.0, 4.0);

        view.add_index(8).unwrap();
        check(&mut view, &source_cloud, 2.0, 8.0);

        view.add_index_range(0..1).unwrap();
        check(&mut view, &source_cloud, 0.0, 8.0);

        view.set_index_at(0, 3).unwrap();
        check(&mut view, &source_cloud, 0.0, 8.0);

        view.remove_at(view.size() - 1).unwrap();
        check(&mut view, &source_cloud, 3.0, 8.0);

        let before = source_cloud.retrievals();
        view.reserve(100).unwrap();
        let _ = view.size();
        let _ = view.global_index(0);
        assert!(view.is_bounding_box_valid());
        assert_eq!(before, source_cloud.retrievals());
    }

    #[test]
    fn test_set_source_invalidates_bounds_and_keeps_indices() {
        let first = diagonal_cloud(5);
        let second: ChunkedCloud = (0..5).map(|i| diagonal(10.0 * i as f64)).collect();
        let mut view = ReferenceCloud::new(&first);
        view.add_index_range(1..3).unwrap();
        assert_eq!(diagonal(2.0), *view.bounding_box().unwrap().max());

        let previous = view.set_source(&second);
        assert!(std::ptr::eq(previous.unwrap(), &first));
        assert!(!view.is_bounding_box_valid());
        assert_eq!(vec![1, 2], view.indices().collect_vec());
        assert_eq!(diagonal(20.0), *view.bounding_box().unwrap().max());
    }

    #[test]
    fn test_detached_view() {
        let source = diagonal_cloud(3);
        let mut view = ReferenceCloud::<&ChunkedCloud>::detached();
        view.add_index(2).unwrap();
        assert_eq!(1, view.size());
        assert_eq!(None, view.get_point(0));
        assert_eq!(None, view.bounding_box());
        assert!(!view.is_scalar_field_enabled());
        assert!(matches!(view.scalar_value(0), Err(CloudError::NoSource)));

        view.set_source(&source);
        assert_eq!(Some(diagonal(2.0)), view.get_point(0));
        assert_eq!(diagonal(2.0), *view.bounding_box().unwrap().min());

        assert!(view.detach_source().is_some());
        assert!(view.source().is_none());
        assert_eq!(None, view.bounding_box());
    }

    #[test]
    fn test_remove_at_preserves_order() {
        let source = diagonal_cloud(10);
        let mut view = ReferenceCloud::new(&source);
        view.add_index_range(0..10).unwrap();
        view.remove_at(0).unwrap();
        view.remove_at(4).unwrap();
        view.remove_at(7).unwrap();
        assert_eq!(7, view.size());
        assert_eq!(
            vec![1, 2, 3, 4, 6, 7, 8],
            view.indices().collect_vec()
        );
    }

    #[test]
    fn test_remove_during_iteration() {
        let source = diagonal_cloud(6);
        let mut view = ReferenceCloud::new(&source);
        view.add_index_range(0..6).unwrap();

        // Remove every point with an odd coordinate while walking the view once
        view.reset_iterator();
        let mut visited = vec![];
        while let Some(global_index) = view.current_global_index() {
            visited.push(global_index);
            let odd = view.current_point().unwrap().x as usize % 2 == 1;
            if odd {
                view.remove_current().unwrap();
            } else {
                view.forward_iterator();
            }
        }
        assert_eq!(vec![0, 1, 2, 3, 4, 5], visited);
        assert_eq!(vec![0, 2, 4], view.indices().collect_vec());
        assert_eq!(view.size(), view.cursor());
    }

    #[test]
    fn test_remove_before_cursor_keeps_current_entry() {
        let source = diagonal_cloud(5);
        let mut view = ReferenceCloud::new(&source);
        view.add_index_range(0..5).unwrap();
        view.next_point();
        view.next_point();
        view.next_point();
        assert_eq!(Some(3), view.current_global_index());

        view.remove_at(0).unwrap();
        assert_eq!(2, view.cursor());
        assert_eq!(Some(3), view.current_global_index());

        view.remove_at(3).unwrap();
        assert_eq!(2, view.cursor());
        view.remove_at(2).unwrap();
        assert_eq!(2, view.cursor());
        assert_eq!(view.size(), view.cursor());
        assert_eq!(None, view.next_point());
    }

    #[test]
    fn test_iteration_does_not_touch_source_cursor() {
        let mut source = diagonal_cloud(4);
        source.reset_iterator();
        source.next_point();

        {
            let mut view = ReferenceCloud::new(&source);
            view.add_index(3).unwrap();
            view.add_index(1).unwrap();
            view.reset_iterator();
            assert_eq!(Some(&diagonal(3.0)), view.next_point());
            assert_eq!(Some(&diagonal(1.0)), view.next_point());
            assert_eq!(None, view.next_point());
            assert_eq!(2, view.cursor());

            view.reset_iterator();
            assert_eq!(Some(&diagonal(3.0)), view.next_point());
        }

        assert_eq!(Some(&diagonal(1.0)), source.next_point());
    }

    #[test]
    fn test_append_same_source() {
        let source = diagonal_cloud(8);
        let mut first = ReferenceCloud::new(&source);
        first.add_index_range(0..3).unwrap();
        let mut second = ReferenceCloud::new(&source);
        second.add_index(7).unwrap();
        second.add_index(1).unwrap();

        first.bounding_box();
        first.append(&second).unwrap();
        assert_eq!(5, first.size());
        assert_eq!(vec![0, 1, 2, 7, 1], first.indices().collect_vec());
        assert!(!first.is_bounding_box_valid());
        assert_eq!(diagonal(7.0), *first.bounding_box().unwrap().max());
    }

    #[test]
    fn test_append_different_sources_fails() {
        let source_a = diagonal_cloud(4);
        let source_b = diagonal_cloud(4);
        let mut first = ReferenceCloud::new(&source_a);
        first.add_index_range(0..2).unwrap();
        let mut second = ReferenceCloud::new(&source_b);
        second.add_index_range(0..4).unwrap();

        first.bounding_box();
        assert!(matches!(
            first.append(&second),
            Err(CloudError::SourceMismatch)
        ));
        assert_eq!(2, first.size());
        assert!(first.is_bounding_box_valid());

        let detached = ReferenceCloud::<&ChunkedCloud>::detached();
        assert!(first.append(&detached).is_err());
        assert_eq!(2, first.size());
    }

    #[test]
    fn test_self_append_duplicates_indices() {
        let source = diagonal_cloud(5);
        let mut view = ReferenceCloud::new(&source);
        view.add_index_range(1..4).unwrap();
        let snapshot = view.clone();
        view.append(&snapshot).unwrap();
        assert_eq!(6, view.size());
        assert_eq!(vec![1, 2, 3, 1, 2, 3], view.indices().collect_vec());
    }

    #[test]
    fn test_append_across_handle_types() {
        let source = Arc::new(diagonal_cloud(4));
        let mut owning = ReferenceCloud::new(source.clone());
        owning.add_index(0).unwrap();
        let mut borrowing = ReferenceCloud::new(&*source);
        borrowing.add_index(3).unwrap();
        owning.append(&borrowing).unwrap();
        assert_eq!(vec![0, 3], owning.indices().collect_vec());
    }

    #[test]
    fn test_resize_and_clear() {
        let source = diagonal_cloud(4);
        let mut view = ReferenceCloud::new(&source);
        view.add_index_range(1..4).unwrap();
        view.bounding_box();

        view.resize(3).unwrap();
        assert!(view.is_bounding_box_valid());

        view.resize(5).unwrap();
        assert!(!view.is_bounding_box_valid());
        assert_eq!(vec![1, 2, 3, 0, 0], view.indices().collect_vec());
        assert_eq!(diagonal(0.0), *view.bounding_box().unwrap().min());

        view.next_point();
        view.next_point();
        view.resize(1).unwrap();
        assert_eq!(1, view.cursor());
        assert_eq!(diagonal(1.0), *view.bounding_box().unwrap().max());

        view.clear(false);
        assert!(view.is_empty());
        assert_eq!(0, view.cursor());
        assert!(view.capacity() >= 5);
        assert!(view.source().is_some());
        assert_eq!(None, view.bounding_box());
    }

    #[test]
    fn test_failed_reservation_leaves_view_unchanged() {
        let source = diagonal_cloud(4);
        let mut view = ReferenceCloud::new(&source);
        view.add_index_range(0..2).unwrap();
        view.bounding_box();

        assert!(matches!(
            view.add_index_range(0..usize::MAX / 2),
            Err(CloudError::OutOfMemory { .. })
        ));
        assert!(view.reserve(usize::MAX / 2).is_err());
        assert_eq!(vec![0, 1], view.indices().collect_vec());
        assert!(view.is_bounding_box_valid());
    }

    #[test]
    fn test_index_count_overflow_is_rejected() {
        let source = diagonal_cloud(4);
        let mut view = ReferenceCloud::new(&source);
        view.add_index(0).unwrap();
        view.bounding_box();

        assert!(matches!(
            view.add_index_range(0..usize::MAX),
            Err(CloudError::CapacityOverflow {
                len: 1,
                additional: usize::MAX
            })
        ));
        assert_eq!(1, view.size());
        assert_eq!(vec![0], view.indices().collect_vec());
        assert!(view.is_bounding_box_valid());
    }

    #[test]
    fn test_scalar_values_are_shared_with_source() {
        let mut source = diagonal_cloud(5);
        source.enable_scalar_field().unwrap();

        {
            let mut view = ReferenceCloud::new(&mut source);
            view.add_index(4).unwrap();
            view.add_index(2).unwrap();
            assert!(view.is_scalar_field_enabled());
            view.set_scalar_value(0, 40.0).unwrap();
            view.set_scalar_value(1, 20.0).unwrap();
            assert_eq!(40.0, view.scalar_value(0).unwrap());
            assert!(view.set_scalar_value(2, 1.0).is_err());

            view.reset_iterator();
            view.forward_iterator();
            view.set_current_scalar_value(21.0).unwrap();
            assert_eq!(21.0, view.current_scalar_value().unwrap());
        }

        assert_eq!(40.0, source.scalar_value(4).unwrap());
        assert_eq!(21.0, source.scalar_value(2).unwrap());

        source.set_scalar_value(3, 3.5).unwrap();
        let mut first = ReferenceCloud::new(&source);
        first.add_index(3).unwrap();
        let mut second = ReferenceCloud::new(&source);
        second.add_index_range(0..5).unwrap();
        assert_eq!(3.5, first.scalar_value(0).unwrap());
        assert_eq!(3.5, second.scalar_value(3).unwrap());
    }

    #[test]
    fn test_enable_scalar_field_through_view() {
        let mut source = diagonal_cloud(3);
        {
            let mut view = ReferenceCloud::new(&mut source);
            view.add_index(1).unwrap();
            assert!(!view.is_scalar_field_enabled());
            assert!(matches!(
                view.scalar_value(0),
                Err(CloudError::ScalarFieldDisabled)
            ));
            view.enable_scalar_field().unwrap();
            assert!(view.is_scalar_field_enabled());
        }
        assert!(source.is_scalar_field_enabled());
        assert_eq!(3, source.scalar_field().unwrap().len());
    }

    #[test]
    fn test_for_each_visits_indices_in_order() {
        let mut source = diagonal_cloud(5);
        source.enable_scalar_field().unwrap();
        let mut view = ReferenceCloud::new(&mut source);
        view.add_index(3).unwrap();
        view.add_index(0).unwrap();
        view.add_index(3).unwrap();

        let mut visited = vec![];
        view.for_each(&mut |point, value| {
            visited.push(point.x);
            *value = if value.is_nan() { 1.0 } else { *value + 1.0 };
        });
        assert_eq!(vec![3.0, 0.0, 3.0], visited);
        drop(view);

        assert_eq!(2.0, source.scalar_value(3).unwrap());
        assert_eq!(1.0, source.scalar_value(0).unwrap());
        assert!(source.scalar_value(1).unwrap().is_nan());
    }

    #[test]
    fn test_for_each_skips_unresolvable_indices() {
        let mut source = diagonal_cloud(3);
        source.enable_scalar_field().unwrap();
        let mut view = ReferenceCloud::new(&mut source);
        view.add_index(1).unwrap();
        view.add_index(10).unwrap();

        let mut visited = vec![];
        view.for_each(&mut |point, value| {
            visited.push(point.x);
            *value = 7.0;
        });
        assert_eq!(vec![1.0], visited);
        drop(view);

        assert_eq!(7.0, source.scalar_value(1).unwrap());
        assert!(source.scalar_value(0).unwrap().is_nan());
    }

    #[test]
    fn test_for_each_point_over_shared_source() {
        let mut source = diagonal_cloud(4);
        source.enable_scalar_field().unwrap();
        source.set_scalar_value(2, 0.5).unwrap();

        let mut view = ReferenceCloud::new(&source);
        view.add_index(2).unwrap();
        view.add_index(10).unwrap();
        view.add_index(0).unwrap();
        let other = ReferenceCloud::new(&source);
        assert!(other.is_empty());

        let mut visited = vec![];
        view.for_each_point(&mut |point, value| visited.push((point.x, value)));
        assert_eq!(2, visited.len());
        assert_eq!((2.0, 0.5), visited[0]);
        assert_eq!(0.0, visited[1].0);
        assert!(visited[1].1.is_nan());
        assert_eq!(0, view.cursor());
    }

    #[test]
    fn test_next_point_steps_over_unresolvable_indices() {
        let source = diagonal_cloud(3);
        let mut view = ReferenceCloud::new(&source);
        view.add_index(0).unwrap();
        view.add_index(10).unwrap();
        view.add_index(1).unwrap();

        view.reset_iterator();
        assert_eq!(Some(&diagonal(0.0)), view.next_point());
        assert_eq!(Some(&diagonal(1.0)), view.next_point());
        assert_eq!(None, view.next_point());
        assert_eq!(3, view.cursor());

        view.add_index(20).unwrap();
        assert_eq!(None, view.next_point());
        assert_eq!(4, view.cursor());
    }

    #[test]
    fn test_visibility_is_forwarded() {
        let source = HalfVisibleCloud::new(diagonal_cloud(4));
        let view = ReferenceCloud::new(&source);
        assert_eq!(Visibility::Visible, view.test_visibility(&diagonal(1.0)));
        assert_eq!(Visibility::Hidden, view.test_visibility(&diagonal(3.0)));
    }

    #[test]
    fn test_views_over_dyn_sources() {
        let source = diagonal_cloud(4);
        let dyn_source: &dyn PersistentIndexedCloud = &source;
        let mut view = ReferenceCloud::new(dyn_source);
        view.add_index_range(2..4).unwrap();
        assert_eq!(Some(diagonal(3.0)), view.get_point(1));

        let boxed: Box<dyn PersistentIndexedCloud> = Box::new(diagonal_cloud(2));
        let mut owning_view = ReferenceCloud::new(boxed);
        owning_view.add_index(1).unwrap();
        assert_eq!(diagonal(1.0), *owning_view.bounding_box().unwrap().max());
    }

    #[test]
    fn test_nested_views() {
        let source = diagonal_cloud(6);
        let mut outer = ReferenceCloud::new(&source);
        outer.add_index_range(2..6).unwrap();
        let mut inner = ReferenceCloud::new(&outer);
        inner.add_index(3).unwrap();
        inner.add_index(0).unwrap();
        assert_eq!(vec![diagonal(5.0), diagonal(2.0)], collect_points(&inner));
    }

    #[test]
    fn test_clone_resets_cursor() {
        let source = diagonal_cloud(3);
        let mut view = ReferenceCloud::new(&source);
        view.add_index_range(0..3).unwrap();
        view.next_point();
        let copy = view.clone();
        assert_eq!(1, view.cursor());
        assert_eq!(0, copy.cursor());
        assert_eq!(
            view.indices().collect_vec(),
            copy.indices().collect_vec()
        );
    }

    #[test]
    fn test_concurrent_views_over_shared_source() {
        let source = diagonal_cloud(1000);
        let expected = (0..10)
            .map(|chunk| {
                let first = chunk * 100;
                (diagonal(first as f64), diagonal((first + 99) as f64))
            })
            .collect::<Vec<_>>();

        let computed = (0..10)
            .into_par_iter()
            .map(|chunk| {
                let mut view = ReferenceCloud::new(&source);
                view.add_index_range((chunk * 100)..((chunk + 1) * 100)).unwrap();
                let mut count = 0;
                view.reset_iterator();
                while view.next_point().is_some() {
                    count += 1;
                }
                assert_eq!(100, count);
                let bounds = view.bounding_box().unwrap();
                (*bounds.min(), *bounds.max())
            })
            .collect::<Vec<_>>();

        assert_eq!(expected, computed);
    }

    #[test]
    fn test_random_subset_bounds_within_source_bounds() {
        let mut rng = thread_rng();
        let mut source = random_cloud(2000, 100.0, &mut rng);
        let source_bounds = source.bounding_box().unwrap();

        let mut view = ReferenceCloud::new(&source);
        for index in sample(&mut rng, 2000, 300).iter() {
            view.add_index(index).unwrap();
        }
        let view_bounds = view.bounding_box().unwrap();
        assert!(source_bounds.contains(view_bounds.min()));
        assert!(source_bounds.contains(view_bounds.max()));
        for point in view.points() {
            assert!(view_bounds.contains(&point));
        }
    }
}
