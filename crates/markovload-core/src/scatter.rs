//! Coprime-stride cursors over fixed-size tables.
//!
//! A cursor over a table of length `S` stepping by a stride coprime with
//! `S` visits every index exactly once in `S` steps. Workers use two such
//! cursors over the slot table (allocation and free) and two more over the
//! batch-size tables, which keeps revisit latency bounded and stops batch
//! sizes from repeating back to back.

use crate::error::ConfigError;

/// Candidate strides, tried in order.
pub const DEFAULT_STRIDE_PRIMES: &[usize] = &[
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
];

/// Batch sizes for ALLOC_MANY.
pub const DEFAULT_ALLOC_BATCH_SIZES: &[usize] = &[2, 4, 8, 16, 32, 64, 128, 3, 6, 12, 24, 48];

/// Batch sizes for DEALLOC_MANY.
pub const DEFAULT_FREE_BATCH_SIZES: &[usize] = &[2, 4, 8, 16, 32, 64, 3, 6, 12, 24, 48];

const fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// First candidate at or after position `from` that is coprime with `len`.
///
/// Returns the candidate's position and value.
fn first_coprime(len: usize, candidates: &[usize], from: usize) -> Option<(usize, usize)> {
    candidates
        .iter()
        .copied()
        .enumerate()
        .skip(from)
        .find(|&(_, stride)| stride > 1 && gcd(len, stride) == 1)
}

/// Pick two distinct strides from `candidates`, in sequence: the first
/// coprime with `first_len`, then the next later one coprime with
/// `second_len`.
pub fn pick_strides(
    first_len: usize,
    second_len: usize,
    candidates: &[usize],
) -> Result<(usize, usize), ConfigError> {
    let (pos, first) = first_coprime(first_len, candidates, 0)
        .ok_or(ConfigError::NoCoprimeStride { len: first_len })?;
    let (_, second) = first_coprime(second_len, candidates, pos + 1)
        .ok_or(ConfigError::NoCoprimeStride { len: second_len })?;
    Ok((first, second))
}

/// Cursor stepping `index = (index + stride) mod len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScatterCursor {
    len: usize,
    stride: usize,
    index: usize,
}

impl ScatterCursor {
    /// Cursor at index 0. `len` must be non-zero.
    pub fn new(len: usize, stride: usize) -> Result<Self, ConfigError> {
        if len == 0 {
            return Err(ConfigError::ZeroSlots);
        }
        Ok(Self {
            len,
            stride,
            index: 0,
        })
    }

    /// Allocation and free cursors over one table of length `len`.
    pub fn pair(len: usize, candidates: &[usize]) -> Result<(Self, Self), ConfigError> {
        if len == 0 {
            return Err(ConfigError::ZeroSlots);
        }
        let (alloc, free) = pick_strides(len, len, candidates)?;
        Ok((Self::new(len, alloc)?, Self::new(len, free)?))
    }

    #[must_use]
    pub const fn current(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn stride(&self) -> usize {
        self.stride
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Step once and return the new index.
    #[inline]
    pub fn advance(&mut self) -> usize {
        self.index = (self.index + self.stride % self.len) % self.len;
        self.index
    }
}

/// Scatter walk over a small table of batch sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSizer {
    sizes: Vec<usize>,
    cursor: ScatterCursor,
}

impl BatchSizer {
    /// Sizers for ALLOC_MANY and DEALLOC_MANY, strides drawn in sequence.
    pub fn pair(
        alloc_sizes: Vec<usize>,
        free_sizes: Vec<usize>,
        candidates: &[usize],
    ) -> Result<(Self, Self), ConfigError> {
        if alloc_sizes.is_empty() {
            return Err(ConfigError::EmptyBatchTable { which: "alloc" });
        }
        if free_sizes.is_empty() {
            return Err(ConfigError::EmptyBatchTable { which: "free" });
        }
        let (alloc_stride, free_stride) =
            pick_strides(alloc_sizes.len(), free_sizes.len(), candidates)?;
        let alloc = Self {
            cursor: ScatterCursor::new(alloc_sizes.len(), alloc_stride)?,
            sizes: alloc_sizes,
        };
        let free = Self {
            cursor: ScatterCursor::new(free_sizes.len(), free_stride)?,
            sizes: free_sizes,
        };
        Ok((alloc, free))
    }

    /// Advance the cursor and return the batch size it lands on.
    pub fn next_batch(&mut self) -> usize {
        self.sizes[self.cursor.advance()]
    }

    #[must_use]
    pub fn cursor(&self) -> &ScatterCursor {
        &self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_skip_divisors() {
        // 30 = 2 * 3 * 5, so the first coprime prime is 7 and the next is 11.
        assert_eq!(pick_strides(30, 30, DEFAULT_STRIDE_PRIMES).unwrap(), (7, 11));
        assert_eq!(pick_strides(1000, 1000, DEFAULT_STRIDE_PRIMES).unwrap(), (3, 7));
        assert_eq!(pick_strides(7, 7, DEFAULT_STRIDE_PRIMES).unwrap(), (2, 3));
    }

    #[test]
    fn exhausted_candidates_are_an_error() {
        assert_eq!(
            pick_strides(6, 6, &[2, 3, 5]),
            Err(ConfigError::NoCoprimeStride { len: 6 })
        );
    }

    #[test]
    fn composite_candidates_are_checked_by_gcd() {
        // 4 does not divide 6 but shares the factor 2; 9 shares 3.
        assert_eq!(pick_strides(6, 6, &[4, 9, 25, 35]).unwrap(), (25, 35));
    }

    #[test]
    fn every_length_gets_a_full_period() {
        for len in 1..=512usize {
            let (alloc, free) = ScatterCursor::pair(len, DEFAULT_STRIDE_PRIMES).unwrap();
            assert_ne!(alloc.stride(), free.stride());
            for mut cursor in [alloc, free] {
                assert_eq!(gcd(cursor.stride(), len), 1);
                let mut seen = vec![false; len];
                seen[cursor.current()] = true;
                for _ in 1..len {
                    let i = cursor.advance();
                    assert!(!seen[i], "len {len} revisited {i} early");
                    seen[i] = true;
                }
                assert!(seen.iter().all(|&s| s));
                assert_eq!(cursor.advance(), 0, "len {len} period is not {len}");
            }
        }
    }

    #[test]
    fn zero_length_is_rejected() {
        assert_eq!(
            ScatterCursor::pair(0, DEFAULT_STRIDE_PRIMES),
            Err(ConfigError::ZeroSlots)
        );
    }

    #[test]
    fn batch_sizes_cover_the_table_before_repeating() {
        let (mut alloc, mut free) = BatchSizer::pair(
            DEFAULT_ALLOC_BATCH_SIZES.to_vec(),
            DEFAULT_FREE_BATCH_SIZES.to_vec(),
            DEFAULT_STRIDE_PRIMES,
        )
        .unwrap();
        let mut drawn: Vec<usize> = (0..DEFAULT_ALLOC_BATCH_SIZES.len())
            .map(|_| alloc.next_batch())
            .collect();
        drawn.sort_unstable();
        let mut expected = DEFAULT_ALLOC_BATCH_SIZES.to_vec();
        expected.sort_unstable();
        assert_eq!(drawn, expected);

        let first = free.next_batch();
        let second = free.next_batch();
        assert_ne!(first, second);
    }

    #[test]
    fn empty_batch_table_is_rejected() {
        assert_eq!(
            BatchSizer::pair(vec![], vec![1], DEFAULT_STRIDE_PRIMES),
            Err(ConfigError::EmptyBatchTable { which: "alloc" })
        );
    }
}
