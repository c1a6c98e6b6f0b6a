use std::{fmt, iter::FromIterator, ops::Index};

use static_assertions::const_assert;

use crate::CloudError;

/// Number of elements per block of a [`ChunkedArray`]
pub const CHUNK_SIZE: usize = 1 << 16;
const_assert!(CHUNK_SIZE.is_power_of_two());

const CHUNK_SHIFT: u32 = CHUNK_SIZE.trailing_zeros();
const CHUNK_MASK: usize = CHUNK_SIZE - 1;

/// Growable array of `Copy` records that stores its elements in fixed-size blocks of [`CHUNK_SIZE`] elements.
///
/// Growing a `ChunkedArray` never moves elements that live in a full block, and only the last block is
/// ever reallocated, so appending is amortized O(1) even for very large arrays without ever copying the
/// whole array. All operations that allocate are fallible and leave the array unchanged if the allocation
/// fails.
///
/// ```
/// # use tessera_core::containers::*;
/// let mut array = ChunkedArray::new();
/// array.push(1u32).unwrap();
/// array.push(2u32).unwrap();
/// array.swap(0, 1).unwrap();
/// assert_eq!(array.iter().copied().collect::<Vec<_>>(), vec![2, 1]);
/// ```
#[derive(Clone)]
pub struct ChunkedArray<T> {
    // Invariant: every chunk except the last one has a capacity of at least CHUNK_SIZE, and element `i`
    // lives at `chunks[i / CHUNK_SIZE][i % CHUNK_SIZE]`
    chunks: Vec<Vec<T>>,
    len: usize,
}

#[inline]
fn locate(index: usize) -> (usize, usize) {
    (index >> CHUNK_SHIFT, index & CHUNK_MASK)
}

impl<T: Copy> ChunkedArray<T> {
    /// Creates a new empty `ChunkedArray`. Does not allocate
    pub fn new() -> Self {
        Self {
            chunks: vec![],
            len: 0,
        }
    }

    /// Creates a new empty `ChunkedArray` with room for at least `capacity` elements
    pub fn with_capacity(capacity: usize) -> Result<Self, CloudError> {
        let mut array = Self::new();
        array.reserve(capacity)?;
        Ok(array)
    }

    /// Returns the number of elements in this array
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if this array contains no elements
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of elements that this array can hold without allocating
    pub fn capacity(&self) -> usize {
        self.chunks
            .iter()
            .map(|chunk| chunk.capacity().min(CHUNK_SIZE))
            .sum()
    }

    /// Makes sure that this array can hold at least `count` elements in total (not additional elements,
    /// unlike `Vec::reserve`). On failure, the array is unchanged
    pub fn reserve(&mut self, count: usize) -> Result<(), CloudError> {
        if count <= self.capacity() {
            return Ok(());
        }
        let oom = |err| CloudError::out_of_memory(count, err);

        let existing_chunks = self.chunks.len();
        let required_chunks = count.div_ceil(CHUNK_SIZE);

        let mut fresh_chunks: Vec<Vec<T>> = Vec::new();
        fresh_chunks
            .try_reserve_exact(required_chunks.saturating_sub(existing_chunks))
            .map_err(oom)?;
        for chunk_index in existing_chunks..required_chunks {
            let chunk_capacity = if chunk_index + 1 == required_chunks {
                count - chunk_index * CHUNK_SIZE
            } else {
                CHUNK_SIZE
            };
            let mut chunk = Vec::new();
            chunk.try_reserve_exact(chunk_capacity).map_err(oom)?;
            fresh_chunks.push(chunk);
        }
        self.chunks.try_reserve(fresh_chunks.len()).map_err(oom)?;

        if let Some(last_chunk) = self.chunks.last_mut() {
            let last_chunk_capacity = if required_chunks > existing_chunks {
                CHUNK_SIZE
            } else {
                count - (existing_chunks - 1) * CHUNK_SIZE
            };
            if last_chunk.capacity() < last_chunk_capacity {
                last_chunk
                    .try_reserve_exact(last_chunk_capacity - last_chunk.len())
                    .map_err(oom)?;
            }
        }

        self.chunks.extend(fresh_chunks);
        Ok(())
    }

    /// Returns the number of elements this array would have after appending `additional` elements
    pub(crate) fn len_after(&self, additional: usize) -> Result<usize, CloudError> {
        self.len
            .checked_add(additional)
            .ok_or(CloudError::CapacityOverflow {
                len: self.len,
                additional,
            })
    }

    /// Like `reserve`, but grows geometrically so that repeated single-element growth stays amortized O(1)
    fn grow_to(&mut self, count: usize) -> Result<(), CloudError> {
        let capacity = self.capacity();
        if count <= capacity {
            return Ok(());
        }
        let amortized = if count <= CHUNK_SIZE {
            count.max(capacity * 2).min(CHUNK_SIZE)
        } else {
            count.div_ceil(CHUNK_SIZE).saturating_mul(CHUNK_SIZE)
        };
        self.reserve(amortized).or_else(|_| self.reserve(count))
    }

    /// Appends `value` to the end of this array
    pub fn push(&mut self, value: T) -> Result<(), CloudError> {
        self.grow_to(self.len + 1)?;
        self.push_within_capacity(value);
        Ok(())
    }

    fn push_within_capacity(&mut self, value: T) {
        let (chunk, _) = locate(self.len);
        debug_assert!(self.chunks[chunk].len() < self.chunks[chunk].capacity());
        self.chunks[chunk].push(value);
        self.len += 1;
    }

    /// Appends all values of `values`. The memory for all values is reserved with a single allocation
    /// before the first value is written, so on allocation failure the array is unchanged
    pub fn extend_from_iter<I>(&mut self, values: I) -> Result<(), CloudError>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let values = values.into_iter();
        self.reserve(self.len_after(values.len())?)?;
        for value in values {
            if self.len < self.capacity() {
                self.push_within_capacity(value);
            } else {
                self.push(value)?;
            }
        }
        Ok(())
    }

    /// Appends all elements of `other`, reserving the memory for them up front
    pub fn extend_from_array(&mut self, other: &ChunkedArray<T>) -> Result<(), CloudError> {
        self.reserve(self.len_after(other.len)?)?;
        for chunk in other.chunks() {
            for value in chunk {
                self.push_within_capacity(*value);
            }
        }
        Ok(())
    }

    /// Sets the number of elements in this array to `count`. New elements are set to `value`, surplus
    /// elements are dropped. Shrinking keeps the allocated memory
    pub fn resize(&mut self, count: usize, value: T) -> Result<(), CloudError> {
        if count <= self.len {
            self.truncate(count);
            return Ok(());
        }
        self.reserve(count)?;
        while self.len < count {
            self.push_within_capacity(value);
        }
        Ok(())
    }

    /// Shortens this array to `count` elements. Has no effect if `count >= self.len()`
    pub fn truncate(&mut self, count: usize) {
        if count >= self.len {
            return;
        }
        for (chunk_index, chunk) in self.chunks.iter_mut().enumerate() {
            chunk.truncate(count.saturating_sub(chunk_index * CHUNK_SIZE));
        }
        self.len = count;
    }

    /// Removes all elements. If `release_memory` is true, all blocks are deallocated as well
    pub fn clear(&mut self, release_memory: bool) {
        if release_memory {
            self.chunks = vec![];
            self.len = 0;
        } else {
            self.truncate(0);
        }
    }

    /// Returns a reference to the element at `index`, or `None` if `index` is out of bounds
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        let (chunk, offset) = locate(index);
        Some(&self.chunks[chunk][offset])
    }

    /// Returns a mutable reference to the element at `index`, or `None` if `index` is out of bounds
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len {
            return None;
        }
        let (chunk, offset) = locate(index);
        Some(&mut self.chunks[chunk][offset])
    }

    /// Overwrites the element at `index` with `value`
    pub fn set(&mut self, index: usize, value: T) -> Result<(), CloudError> {
        let size = self.len;
        let slot = self
            .get_mut(index)
            .ok_or(CloudError::IndexOutOfRange { index, size })?;
        *slot = value;
        Ok(())
    }

    /// Exchanges the elements at `first` and `second`
    pub fn swap(&mut self, first: usize, second: usize) -> Result<(), CloudError> {
        let size = self.len;
        let first_value = *self.get(first).ok_or(CloudError::IndexOutOfRange {
            index: first,
            size,
        })?;
        let second_value = *self.get(second).ok_or(CloudError::IndexOutOfRange {
            index: second,
            size,
        })?;
        self.set(first, second_value)?;
        self.set(second, first_value)
    }

    /// Removes the element at `index` and returns it. All subsequent elements are shifted down by one, so the
    /// relative order of the remaining elements is preserved. This is O(n) in the worst case
    pub fn remove(&mut self, index: usize) -> Result<T, CloudError> {
        if index >= self.len {
            return Err(CloudError::IndexOutOfRange {
                index,
                size: self.len,
            });
        }
        let (chunk, offset) = locate(index);
        let removed = self.chunks[chunk].remove(offset);
        // Move the first element of every following block to the end of its predecessor
        for next in (chunk + 1)..self.chunks.len() {
            if self.chunks[next].is_empty() {
                break;
            }
            let carried = self.chunks[next].remove(0);
            self.chunks[next - 1].push(carried);
        }
        self.len -= 1;
        Ok(removed)
    }

    /// Returns an iterator over all elements of this array, in order
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.chunks.iter().flat_map(|chunk| chunk.iter())
    }

    /// Returns the elements of this array as a sequence of contiguous slices, one per block
    pub fn chunks(&self) -> impl Iterator<Item = &[T]> + '_ {
        self.chunks
            .iter()
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| chunk.as_slice())
    }
}

impl<T: Copy> Default for ChunkedArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> Index<usize> for ChunkedArray<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        match self.get(index) {
            Some(value) => value,
            None => panic!(
                "ChunkedArray::index: Index {} out of bounds (len is {})",
                index, self.len
            ),
        }
    }
}

impl<T: Copy + PartialEq> PartialEq for ChunkedArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for ChunkedArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Collects values into a `ChunkedArray`.
///
/// # Panics
///
/// Like `Vec`, panics if the memory for the values can't be allocated. Use [`ChunkedArray::push`] or
/// [`ChunkedArray::extend_from_iter`] to handle allocation failures
impl<T: Copy> FromIterator<T> for ChunkedArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        for value in iter {
            if let Err(err) = array.push(value) {
                panic!("ChunkedArray::from_iter: {}", err);
            }
        }
        array
    }
}
