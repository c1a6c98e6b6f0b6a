use std::ops::Range;

use nalgebra::Point3;

use super::IndexedCloud;

/// Iterator over copies of the points of an [`IndexedCloud`]. The position of the iteration is owned by the
/// iterator, not by the cloud, so independent traversals (e.g. one per worker thread, each over its own index
/// range) never interfere with each other
///
/// ```
/// # use tessera_core::containers::*;
/// # use nalgebra::Point3;
/// let cloud: ChunkedCloud = (0..4).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect();
/// let xs = PointIter::with_range(&cloud, 1..3).map(|p| p.x).collect::<Vec<_>>();
/// assert_eq!(xs, vec![1.0, 2.0]);
/// ```
#[derive(Debug)]
pub struct PointIter<'a, C: ?Sized> {
    cloud: &'a C,
    current: usize,
    end: usize,
}

impl<'a, C: IndexedCloud + ?Sized> PointIter<'a, C> {
    /// Creates an iterator over all points of `cloud`
    pub fn new(cloud: &'a C) -> Self {
        Self {
            cloud,
            current: 0,
            end: cloud.size(),
        }
    }

    /// Creates an iterator over the points with indices in `range`. The range is clamped to the size of `cloud`
    pub fn with_range(cloud: &'a C, range: Range<usize>) -> Self {
        let end = range.end.min(cloud.size());
        Self {
            cloud,
            current: range.start.min(end),
            end,
        }
    }
}

impl<'a, C: IndexedCloud + ?Sized> Iterator for PointIter<'a, C> {
    type Item = Point3<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.end {
            return None;
        }
        let point = self.cloud.get_point(self.current);
        self.current += 1;
        point
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.current;
        (remaining, Some(remaining))
    }
}

impl<'a, C: IndexedCloud + ?Sized> DoubleEndedIterator for PointIter<'a, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.current >= self.end {
            return None;
        }
        self.end -= 1;
        self.cloud.get_point(self.end)
    }
}

impl<'a, C: IndexedCloud + ?Sized> ExactSizeIterator for PointIter<'a, C> {}
