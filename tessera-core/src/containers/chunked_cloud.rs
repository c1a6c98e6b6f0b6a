use std::iter::FromIterator;

use log::debug;
use nalgebra::Point3;

use crate::{
    math::{BoundsCache, AABB},
    CloudError, ScalarType, NAN_VALUE,
};

use super::{ChunkedArray, Cloud, CloudMut, IndexedCloud, PersistentIndexedCloud};

/// A point cloud that owns its points. Positions are stored in a [`ChunkedArray`], as is the optional scalar
/// field. Since points never move while the cloud is borrowed, `ChunkedCloud` is a [`PersistentIndexedCloud`]
/// and can be the source of any number of [`ReferenceCloud`](super::ReferenceCloud)s.
///
/// The bounding box is cached and recomputed on the first request after the points changed.
///
/// ```
/// # use tessera_core::containers::*;
/// # use nalgebra::Point3;
/// let mut cloud = ChunkedCloud::new();
/// cloud.add_point(Point3::new(1.0, 2.0, 3.0)).unwrap();
/// cloud.enable_scalar_field().unwrap();
/// cloud.set_scalar_value(0, 0.5).unwrap();
/// assert_eq!(0.5, cloud.scalar_value(0).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChunkedCloud {
    points: ChunkedArray<Point3<f64>>,
    scalar_field: Option<ChunkedArray<ScalarType>>,
    bounds: BoundsCache,
    cursor: usize,
}

impl ChunkedCloud {
    /// Creates a new empty `ChunkedCloud` without a scalar field
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty `ChunkedCloud` with room for `capacity` points
    pub fn with_capacity(capacity: usize) -> Result<Self, CloudError> {
        let mut cloud = Self::new();
        cloud.reserve(capacity)?;
        Ok(cloud)
    }

    /// Returns the number of points this cloud can hold without allocating
    pub fn capacity(&self) -> usize {
        self.points.capacity()
    }

    /// Reserves memory for `count` points in total (and as many scalar values if the scalar field is enabled)
    pub fn reserve(&mut self, count: usize) -> Result<(), CloudError> {
        self.points.reserve(count)?;
        if let Some(scalar_field) = self.scalar_field.as_mut() {
            scalar_field.reserve(count)?;
        }
        Ok(())
    }

    /// Appends a point. If the scalar field is enabled, the scalar value of the new point is [`NAN_VALUE`]
    pub fn add_point(&mut self, point: Point3<f64>) -> Result<(), CloudError> {
        self.add_points(std::iter::once(point))
    }

    /// Appends all `points`. Memory for all points is reserved up front, so on failure the cloud is unchanged
    pub fn add_points<I>(&mut self, points: I) -> Result<(), CloudError>
    where
        I: IntoIterator<Item = Point3<f64>>,
        I::IntoIter: ExactSizeIterator,
    {
        let points = points.into_iter();
        let new_size = self.points.len_after(points.len())?;
        self.reserve(new_size)?;
        self.points.extend_from_iter(points)?;
        if let Some(scalar_field) = self.scalar_field.as_mut() {
            scalar_field.resize(self.points.len(), NAN_VALUE)?;
        }
        self.bounds.invalidate();
        Ok(())
    }

    /// Overwrites the position of the point at `index`
    pub fn set_point(&mut self, index: usize, point: Point3<f64>) -> Result<(), CloudError> {
        self.points.set(index, point)?;
        self.bounds.invalidate();
        Ok(())
    }

    /// Sets the number of points to `count`. New points are placed at the origin and get [`NAN_VALUE`] as their
    /// scalar value
    pub fn resize(&mut self, count: usize) -> Result<(), CloudError> {
        self.reserve(count)?;
        self.points.resize(count, Point3::origin())?;
        if let Some(scalar_field) = self.scalar_field.as_mut() {
            scalar_field.resize(count, NAN_VALUE)?;
        }
        self.cursor = self.cursor.min(count);
        self.bounds.invalidate();
        Ok(())
    }

    /// Removes all points. The scalar field stays enabled (but empty) if it was enabled before
    pub fn clear(&mut self, release_memory: bool) {
        self.points.clear(release_memory);
        if let Some(scalar_field) = self.scalar_field.as_mut() {
            scalar_field.clear(release_memory);
        }
        self.cursor = 0;
        self.bounds.invalidate();
    }

    /// Releases the scalar field of this cloud
    pub fn disable_scalar_field(&mut self) {
        self.scalar_field = None;
    }

    /// Returns the scalar field of this cloud, if it is enabled
    pub fn scalar_field(&self) -> Option<&ChunkedArray<ScalarType>> {
        self.scalar_field.as_ref()
    }

    /// Marks the cached bounding box as stale
    pub fn invalidate_bounding_box(&mut self) {
        self.bounds.invalidate();
    }

    fn scalar_field_or_err(&self) -> Result<&ChunkedArray<ScalarType>, CloudError> {
        self.scalar_field
            .as_ref()
            .ok_or(CloudError::ScalarFieldDisabled)
    }
}

impl Cloud for ChunkedCloud {
    fn size(&self) -> usize {
        self.points.len()
    }

    fn bounding_box(&mut self) -> Option<AABB<f64>> {
        self.bounds
            .get_or_compute(|| AABB::from_points(self.points.iter().copied()))
    }

    fn reset_iterator(&mut self) {
        self.cursor = 0;
    }

    fn next_point(&mut self) -> Option<&Point3<f64>> {
        if self.cursor >= self.points.len() {
            return None;
        }
        self.cursor += 1;
        self.points.get(self.cursor - 1)
    }

    fn is_scalar_field_enabled(&self) -> bool {
        self.scalar_field.is_some()
    }

    fn scalar_value(&self, index: usize) -> Result<ScalarType, CloudError> {
        let scalar_field = self.scalar_field_or_err()?;
        scalar_field
            .get(index)
            .copied()
            .ok_or(CloudError::IndexOutOfRange {
                index,
                size: scalar_field.len(),
            })
    }
}

impl CloudMut for ChunkedCloud {
    fn enable_scalar_field(&mut self) -> Result<(), CloudError> {
        if self.scalar_field.is_some() {
            return Ok(());
        }
        let mut scalar_field = ChunkedArray::new();
        scalar_field.resize(self.points.len(), NAN_VALUE)?;
        debug!(
            "Enabled scalar field with {} values",
            scalar_field.len()
        );
        self.scalar_field = Some(scalar_field);
        Ok(())
    }

    fn set_scalar_value(&mut self, index: usize, value: ScalarType) -> Result<(), CloudError> {
        self.scalar_field
            .as_mut()
            .ok_or(CloudError::ScalarFieldDisabled)?
            .set(index, value)
    }

    fn for_each(&mut self, action: &mut dyn FnMut(&Point3<f64>, &mut ScalarType)) {
        match self.scalar_field.as_mut() {
            Some(scalar_field) => {
                for index in 0..self.points.len() {
                    if let (Some(point), Some(value)) =
                        (self.points.get(index), scalar_field.get_mut(index))
                    {
                        action(point, value);
                    }
                }
            }
            None => {
                for point in self.points.iter() {
                    let mut scratch = NAN_VALUE;
                    action(point, &mut scratch);
                }
            }
        }
    }
}

impl IndexedCloud for ChunkedCloud {
    fn get_point(&self, index: usize) -> Option<Point3<f64>> {
        self.points.get(index).copied()
    }

    fn point_at(&mut self, index: usize) -> Option<&Point3<f64>> {
        self.points.get(index)
    }
}

impl PersistentIndexedCloud for ChunkedCloud {
    fn point_persistent(&self, index: usize) -> Option<&Point3<f64>> {
        self.points.get(index)
    }
}

/// Collects points into a `ChunkedCloud` without a scalar field.
///
/// # Panics
///
/// If memory for the points can't be allocated. Use [`ChunkedCloud::add_points`] to handle allocation failures
impl FromIterator<Point3<f64>> for ChunkedCloud {
    fn from_iter<I: IntoIterator<Item = Point3<f64>>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
            ..Default::default()
        }
    }
}
