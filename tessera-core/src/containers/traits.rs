use nalgebra::Point3;

use crate::{math::AABB, CloudError, ScalarType, NAN_VALUE};

use super::PointIter;

/// Visibility of a point, e.g. relative to a sensor. Algorithms that compare points call
/// [`Cloud::test_visibility`] first and skip the comparison for every point that is not
/// [`Visibility::Visible`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
    OutOfRange,
}

/// Base trait for everything that behaves like a collection of 3D points with an optional scalar field
/// (one [`ScalarType`] value per point).
///
/// Reading methods take `&self`. The methods that involve a cache or a cursor (`bounding_box`,
/// `reset_iterator`, `next_point`) take `&mut self`, so the built-in cursor of a cloud can never be
/// advanced from two places at once. Parallel algorithms instead partition the index range of an
/// [`IndexedCloud`] and use random access.
pub trait Cloud {
    /// Returns the number of points in this cloud
    fn size(&self) -> usize;
    /// Returns `true` if this cloud contains no points
    fn is_empty(&self) -> bool {
        self.size() == 0
    }
    /// Returns the axis-aligned bounding box of all points in this cloud, or `None` if the cloud is empty.
    /// Implementations may cache the bounding box
    fn bounding_box(&mut self) -> Option<AABB<f64>>;
    /// Returns the visibility of the given point. The default implementation considers every point visible
    fn test_visibility(&self, _point: &Point3<f64>) -> Visibility {
        Visibility::Visible
    }
    /// Places the cursor of this cloud before its first point
    fn reset_iterator(&mut self);
    /// Returns the point at the cursor and advances the cursor by one, or returns `None` if the cursor is exhausted.
    /// The returned reference is only valid until the next call that mutably borrows this cloud
    fn next_point(&mut self) -> Option<&Point3<f64>>;
    /// Returns `true` if the scalar field of this cloud is enabled
    fn is_scalar_field_enabled(&self) -> bool;
    /// Returns the scalar value of the point at `index`
    ///
    /// # Errors
    ///
    /// [`CloudError::ScalarFieldDisabled`] if the scalar field is not enabled, [`CloudError::IndexOutOfRange`]
    /// if `index` is out of bounds
    fn scalar_value(&self, index: usize) -> Result<ScalarType, CloudError>;
}

/// Extends [`Cloud`] with the operations that write scalar values
pub trait CloudMut: Cloud {
    /// Enables the scalar field of this cloud. The field gets one entry per point, the values are
    /// unspecified until set. Enabling an already enabled scalar field keeps its values
    fn enable_scalar_field(&mut self) -> Result<(), CloudError>;
    /// Sets the scalar value of the point at `index`
    ///
    /// # Errors
    ///
    /// Same as [`Cloud::scalar_value`]
    fn set_scalar_value(&mut self, index: usize, value: ScalarType) -> Result<(), CloudError>;
    /// Calls `action` for every point of this cloud in index order. `action` receives the point and a mutable
    /// reference to its scalar value. If the scalar field is disabled, `action` receives a scratch value
    /// initialized to [`NAN_VALUE`](crate::NAN_VALUE) and all writes to it are discarded
    fn for_each(&mut self, action: &mut dyn FnMut(&Point3<f64>, &mut ScalarType));
}

/// A [`Cloud`] with random access to its points by index
pub trait IndexedCloud: Cloud {
    /// Returns a copy of the point at `index`, or `None` if `index` is out of bounds. The copy stays valid
    /// regardless of any later calls on this cloud
    fn get_point(&self, index: usize) -> Option<Point3<f64>>;
    /// Returns a reference to the point at `index`, or `None` if `index` is out of bounds. The reference is
    /// transient: it is only valid until the next call that mutably borrows this cloud. Clouds that compute their
    /// points on the fly can use this to hand out a reference to an internal buffer
    fn point_at(&mut self, index: usize) -> Option<&Point3<f64>>;
    /// Calls `action` for every point of this cloud in index order, together with a copy of its scalar value
    /// ([`NAN_VALUE`] if the scalar field is disabled). This is the read-only counterpart of
    /// [`CloudMut::for_each`] and only needs shared access, so it also works on views over a shared source.
    /// Indices that don't resolve to a point are skipped
    fn for_each_point(&self, action: &mut dyn FnMut(&Point3<f64>, ScalarType)) {
        let scalar_field_enabled = self.is_scalar_field_enabled();
        for index in 0..self.size() {
            let Some(point) = self.get_point(index) else {
                continue;
            };
            let value = if scalar_field_enabled {
                self.scalar_value(index).unwrap_or(NAN_VALUE)
            } else {
                NAN_VALUE
            };
            action(&point, value);
        }
    }
    /// Returns an iterator over copies of all points of this cloud. The iterator owns its own position, so
    /// any number of traversals can be in flight at the same time and the built-in cursor of this cloud is
    /// never touched
    fn points(&self) -> PointIter<'_, Self>
    where
        Self: Sized,
    {
        PointIter::new(self)
    }
}

/// An [`IndexedCloud`] that can hand out references to its points that live as long as the borrow of the cloud
/// itself. This is the capability that a [`ReferenceCloud`](super::ReferenceCloud) requires from its source
pub trait PersistentIndexedCloud: IndexedCloud {
    /// Returns a reference to the point at `index` that is valid for as long as this cloud is borrowed, or `None`
    /// if `index` is out of bounds
    fn point_persistent(&self, index: usize) -> Option<&Point3<f64>>;
}
