//! Point cloud containers and the traits that describe them.
//!
//! # The cloud hierarchy
//!
//! All containers implement a small hierarchy of traits:
//!
//! 1) [`Cloud`] is a collection of 3D points with a size, a (possibly cached) bounding box, a built-in cursor for
//!    sequential traversal and an optional scalar field that stores one [`ScalarType`](crate::ScalarType) value
//!    per point
//! 2) [`CloudMut`] adds writing of scalar values and an in-order `for_each` over all points
//! 3) [`IndexedCloud`] adds random access to points by index
//! 4) [`PersistentIndexedCloud`] guarantees that references to points stay valid for as long as the cloud is
//!    borrowed. This is the requirement for being the source of a [`ReferenceCloud`]
//!
//! # Containers
//!
//! [`ChunkedCloud`] owns its points and scalar values, both stored in a [`ChunkedArray`], which allocates
//! memory in fixed-size blocks of [`CHUNK_SIZE`] elements. Growing a [`ChunkedArray`] never moves existing
//! elements and never needs one contiguous allocation for the whole array.
//!
//! [`ReferenceCloud`] is a lightweight view that selects points of another cloud by their indices:
//!
//! ```
//! # use tessera_core::containers::*;
//! # use nalgebra::Point3;
//! let cloud: ChunkedCloud = (0..10).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect();
//! let mut evens = ReferenceCloud::new(&cloud);
//! for index in (0..10).step_by(2) {
//!     evens.add_index(index).unwrap();
//! }
//! let xs = evens.points().map(|p| p.x).collect::<Vec<_>>();
//! assert_eq!(xs, vec![0.0, 2.0, 4.0, 6.0, 8.0]);
//! ```

mod chunked_array;
pub use self::chunked_array::*;

mod traits;
pub use self::traits::*;

mod iterators;
pub use self::iterators::*;

mod chunked_cloud;
pub use self::chunked_cloud::*;

mod reference_cloud;
pub use self::reference_cloud::*;
