use nalgebra::{Point3, Scalar};

use super::MinMax;

/// 3D axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AABB<T: Scalar + PartialOrd> {
    min: Point3<T>,
    max: Point3<T>,
}

impl<T: Scalar + PartialOrd + MinMax + Copy> AABB<T> {
    /// Creates a new AABB from the given minimum and maximum coordinates. Panics if the minimum position is
    /// not less than or equal to the maximum position
    /// ```
    /// # use tessera_core::math::AABB;
    /// let bounds = AABB::from_min_max(nalgebra::Point3::new(0.0, 0.0, 0.0), nalgebra::Point3::new(1.0, 1.0, 1.0));
    /// ```
    pub fn from_min_max(min: Point3<T>, max: Point3<T>) -> Self {
        if min.x > max.x || min.y > max.y || min.z > max.z {
            panic!("AABB::from_min_max: Minimum position must be <= maximum position!");
        }
        Self { min, max }
    }

    /// Creates a degenerate AABB that contains exactly the given point
    /// ```
    /// # use tessera_core::math::AABB;
    /// let bounds = AABB::from_point(nalgebra::Point3::new(1.0, 2.0, 3.0));
    /// assert_eq!(bounds.min(), bounds.max());
    /// ```
    pub fn from_point(point: Point3<T>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Returns the minimum corner of this AABB
    pub fn min(&self) -> &Point3<T> {
        &self.min
    }

    /// Returns the maximum corner of this AABB
    pub fn max(&self) -> &Point3<T> {
        &self.max
    }

    /// Returns true if `point` lies within this AABB. Points on the boundary are contained as well
    /// ```
    /// # use tessera_core::math::AABB;
    /// let bounds = AABB::from_min_max(nalgebra::Point3::new(0.0, 0.0, 0.0), nalgebra::Point3::new(1.0, 1.0, 1.0));
    /// assert!(bounds.contains(&nalgebra::Point3::new(1.0, 0.5, 0.0)));
    /// assert!(!bounds.contains(&nalgebra::Point3::new(1.5, 0.5, 0.0)));
    /// ```
    pub fn contains(&self, point: &Point3<T>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Computes the smallest AABB that contains both `a` and `b`
    /// ```
    /// # use tessera_core::math::AABB;
    /// let bounds_a = AABB::from_min_max(nalgebra::Point3::new(0.0, 0.0, 0.0), nalgebra::Point3::new(1.0, 1.0, 1.0));
    /// let bounds_b = AABB::from_min_max(nalgebra::Point3::new(2.0, 2.0, 2.0), nalgebra::Point3::new(3.0, 3.0, 3.0));
    /// let merged_bounds = AABB::union(&bounds_a, &bounds_b);
    /// assert_eq!(*merged_bounds.min(), nalgebra::Point3::new(0.0, 0.0, 0.0));
    /// assert_eq!(*merged_bounds.max(), nalgebra::Point3::new(3.0, 3.0, 3.0));
    /// ```
    pub fn union(a: &AABB<T>, b: &AABB<T>) -> Self {
        Self {
            min: a.min.coords.infimum(&b.min.coords).into(),
            max: a.max.coords.supremum(&b.max.coords).into(),
        }
    }

    /// Returns a copy of `bounds` that is extended to contain `point`
    pub fn extend_with_point(bounds: &AABB<T>, point: &Point3<T>) -> AABB<T> {
        Self {
            min: bounds.min.coords.infimum(&point.coords).into(),
            max: bounds.max.coords.supremum(&point.coords).into(),
        }
    }

    /// Grows this AABB in place so that it contains `point`
    pub fn expand(&mut self, point: &Point3<T>) {
        *self = Self::extend_with_point(self, point);
    }

    /// Computes the tightest AABB around all `points`. Returns `None` if `points` is empty
    /// ```
    /// # use tessera_core::math::AABB;
    /// # use nalgebra::Point3;
    /// let bounds = AABB::from_points([Point3::new(1.0, 5.0, 0.0), Point3::new(3.0, -1.0, 2.0)]).unwrap();
    /// assert_eq!(*bounds.min(), Point3::new(1.0, -1.0, 0.0));
    /// assert_eq!(*bounds.max(), Point3::new(3.0, 5.0, 2.0));
    /// assert!(AABB::<f64>::from_points(std::iter::empty()).is_none());
    /// ```
    pub fn from_points<I: IntoIterator<Item = Point3<T>>>(points: I) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::from_point(first), |bounds, point| {
            Self::extend_with_point(&bounds, &point)
        }))
    }
}

/// A lazily computed bounding box together with an explicit validity flag. Containers that cache their
/// bounds hold one of these and call [`invalidate`](BoundsCache::invalidate) from every operation that
/// changes the set of points they cover
#[derive(Debug, Clone, Default)]
pub struct BoundsCache {
    bounds: Option<AABB<f64>>,
    valid: bool,
}

impl BoundsCache {
    /// Creates a new, invalid cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the cached value reflects the current points
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Marks the cached value as stale. The next call to [`get_or_compute`](BoundsCache::get_or_compute)
    /// recomputes it
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Returns the cached bounds, or computes, stores and returns them using `compute` if the cache is
    /// invalid. A `None` from `compute` (no points) is cached as well
    pub fn get_or_compute<F: FnOnce() -> Option<AABB<f64>>>(&mut self, compute: F) -> Option<AABB<f64>> {
        if !self.valid {
            self.bounds = compute();
            self.valid = true;
        }
        self.bounds
    }
}
