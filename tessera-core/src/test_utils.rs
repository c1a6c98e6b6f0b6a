use std::sync::atomic::{AtomicUsize, Ordering};

use nalgebra::Point3;
use rand::{distributions::Uniform, prelude::Distribution, Rng};

use crate::{
    containers::{ChunkedCloud, Cloud, IndexedCloud, PersistentIndexedCloud, Visibility},
    math::AABB,
    CloudError, ScalarType,
};

/// Creates a cloud with `count` points where point `i` is at `(i, i, i)`
pub(crate) fn diagonal_cloud(count: usize) -> ChunkedCloud {
    (0..count)
        .map(|i| Point3::new(i as f64, i as f64, i as f64))
        .collect()
}

/// Creates a cloud with `count` random points within `[-extent, extent]` on every axis
pub(crate) fn random_cloud<R: Rng>(count: usize, extent: f64, rng: &mut R) -> ChunkedCloud {
    let distribution = Uniform::new_inclusive(-extent, extent);
    (0..count)
        .map(|_| {
            Point3::new(
                distribution.sample(rng),
                distribution.sample(rng),
                distribution.sample(rng),
            )
        })
        .collect()
}

/// Wraps a cloud and counts how often points were retrieved through `point_persistent` and `get_point`
#[derive(Debug)]
pub(crate) struct CountingCloud {
    inner: ChunkedCloud,
    retrievals: AtomicUsize,
}

impl CountingCloud {
    pub fn new(inner: ChunkedCloud) -> Self {
        Self {
            inner,
            retrievals: AtomicUsize::new(0),
        }
    }

    pub fn retrievals(&self) -> usize {
        self.retrievals.load(Ordering::SeqCst)
    }
}

impl Cloud for CountingCloud {
    fn size(&self) -> usize {
        self.inner.size()
    }

    fn bounding_box(&mut self) -> Option<AABB<f64>> {
        self.inner.bounding_box()
    }

    fn reset_iterator(&mut self) {
        self.inner.reset_iterator()
    }

    fn next_point(&mut self) -> Option<&Point3<f64>> {
        self.retrievals.fetch_add(1, Ordering::SeqCst);
        self.inner.next_point()
    }

    fn is_scalar_field_enabled(&self) -> bool {
        self.inner.is_scalar_field_enabled()
    }

    fn scalar_value(&self, index: usize) -> Result<ScalarType, CloudError> {
        self.inner.scalar_value(index)
    }
}

impl IndexedCloud for CountingCloud {
    fn get_point(&self, index: usize) -> Option<Point3<f64>> {
        self.retrievals.fetch_add(1, Ordering::SeqCst);
        self.inner.get_point(index)
    }

    fn point_at(&mut self, index: usize) -> Option<&Point3<f64>> {
        self.retrievals.fetch_add(1, Ordering::SeqCst);
        self.inner.point_at(index)
    }
}

impl PersistentIndexedCloud for CountingCloud {
    fn point_persistent(&self, index: usize) -> Option<&Point3<f64>> {
        self.retrievals.fetch_add(1, Ordering::SeqCst);
        self.inner.point_persistent(index)
    }
}

/// Wraps a cloud and reports every point with `x >= 2` as hidden
#[derive(Debug)]
pub(crate) struct HalfVisibleCloud {
    inner: ChunkedCloud,
}

impl HalfVisibleCloud {
    pub fn new(inner: ChunkedCloud) -> Self {
        Self { inner }
    }
}

impl Cloud for HalfVisibleCloud {
    fn size(&self) -> usize {
        self.inner.size()
    }

    fn bounding_box(&mut self) -> Option<AABB<f64>> {
        self.inner.bounding_box()
    }

    fn test_visibility(&self, point: &Point3<f64>) -> Visibility {
        if point.x >= 2.0 {
            Visibility::Hidden
        } else {
            Visibility::Visible
        }
    }

    fn reset_iterator(&mut self) {
        self.inner.reset_iterator()
    }

    fn next_point(&mut self) -> Option<&Point3<f64>> {
        self.inner.next_point()
    }

    fn is_scalar_field_enabled(&self) -> bool {
        self.inner.is_scalar_field_enabled()
    }

    fn scalar_value(&self, index: usize) -> Result<ScalarType, CloudError> {
        self.inner.scalar_value(index)
    }
}

impl IndexedCloud for HalfVisibleCloud {
    fn get_point(&self, index: usize) -> Option<Point3<f64>> {
        self.inner.get_point(index)
    }

    fn point_at(&mut self, index: usize) -> Option<&Point3<f64>> {
        self.inner.point_at(index)
    }
}

impl PersistentIndexedCloud for HalfVisibleCloud {
    fn point_persistent(&self, index: usize) -> Option<&Point3<f64>> {
        self.inner.point_persistent(index)
    }
}
