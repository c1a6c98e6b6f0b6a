#![warn(clippy::all)]
//! Algorithms that operate on clouds.
//!
//! All algorithms are written against the traits in [`tessera_core::containers`], so they accept owning clouds
//! as well as [`ReferenceCloud`](tessera_core::containers::ReferenceCloud) views. Algorithms that select points
//! return a `ReferenceCloud` over their input instead of copying points.

// Bounding box of a cloud, serial and parallel.
pub mod bounds;
// Minimum and maximum value of the scalar field.
pub mod minmax;
// Mean and variance of the scalar field.
pub mod statistics;
// Random subsets of a cloud as views.
pub mod sampling;
// Selecting points by scalar value or by position.
pub mod segmentation;
// Per-point distances written to the scalar field.
pub mod distances;
