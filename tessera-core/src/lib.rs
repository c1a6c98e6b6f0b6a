#![warn(clippy::all)]

//! Core data structures for working with point clouds
//!
//! The central types are found in the [containers](crate::containers) module: [`ChunkedCloud`](crate::containers::ChunkedCloud)
//! owns points and an optional scalar field, [`ReferenceCloud`](crate::containers::ReferenceCloud) is an index-based view
//! onto a subset of the points of another cloud. Algorithms are written against the traits in
//! [containers](crate::containers), so they work on owning clouds and views alike.

pub extern crate nalgebra;

pub mod containers;
/// Useful mathematical tools when working with point cloud data
pub mod math;

mod error;
pub use self::error::*;

/// Numeric type of the values in the scalar field of a cloud
pub type ScalarType = f32;

/// Marker for a scalar value that is not set or invalid
pub const NAN_VALUE: ScalarType = ScalarType::NAN;

#[cfg(test)]
pub(crate) mod test_utils;
