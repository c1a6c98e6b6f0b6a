use std::collections::TryReserveError;

use thiserror::Error;

/// Errors reported by the cloud containers in tessera.
///
/// None of these errors leave a container in a partially modified state: if a mutating call returns
/// an error, the container is exactly as it was before the call.
#[derive(Debug, Error)]
pub enum CloudError {
    /// Growing a container failed because the allocator could not satisfy the request
    #[error("could not allocate memory for {requested} elements")]
    OutOfMemory {
        requested: usize,
        #[source]
        source: TryReserveError,
    },
    /// The number of elements after an insertion would not fit into a `usize`
    #[error("cannot add {additional} elements to a container of {len} elements")]
    CapacityOverflow { len: usize, additional: usize },
    /// An index was outside of the valid range `[0, size)`
    #[error("index {index} is out of range for a cloud of size {size}")]
    IndexOutOfRange { index: usize, size: usize },
    /// A scalar value was accessed but the scalar field of the cloud is not enabled
    #[error("the scalar field is not enabled")]
    ScalarFieldDisabled,
    /// Two reference clouds were combined but they are not associated with the same source cloud
    #[error("reference clouds are not associated with the same source cloud")]
    SourceMismatch,
    /// A reference cloud was dereferenced while it has no associated source cloud
    #[error("reference cloud has no associated source cloud")]
    NoSource,
}

impl CloudError {
    pub(crate) fn out_of_memory(requested: usize, source: TryReserveError) -> Self {
        Self::OutOfMemory { requested, source }
    }
}
