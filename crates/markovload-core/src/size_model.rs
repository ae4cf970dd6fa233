//! Size classes and the size model.
//!
//! A draw without an explicit class first picks a class with fixed
//! weights (70% small, 20% medium, 10% big) and then indexes that class's
//! table uniformly. The thresholds are part of the workload contract and
//! are not configurable.

use crate::error::ConfigError;
use crate::rng::RngStream;

/// Upper bound of the unit draw that selects [`SizeClass::Small`].
pub const SMALL_THRESHOLD: f64 = 0.7;
/// Upper bound of the unit draw that selects [`SizeClass::Medium`].
pub const MEDIUM_THRESHOLD: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SizeClass {
    Small,
    Medium,
    Big,
    /// All sizes from every class; only drawn when asked for explicitly.
    Combined,
}

impl SizeClass {
    /// Class selected by a unit draw `f` in `[0, 1)`.
    #[must_use]
    pub fn from_unit(f: f64) -> Self {
        if f < SMALL_THRESHOLD {
            Self::Small
        } else if f < MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Big
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Big => "big",
            Self::Combined => "combined",
        }
    }
}

/// Byte-size tables per class.
///
/// `combined` may be left empty, in which case draws for
/// [`SizeClass::Combined`] return the sentinel size `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeTables {
    pub small: Vec<usize>,
    pub medium: Vec<usize>,
    pub big: Vec<usize>,
    pub combined: Vec<usize>,
}

impl SizeTables {
    /// Tables with `combined` built as the concatenation of the three classes.
    #[must_use]
    pub fn new(small: Vec<usize>, medium: Vec<usize>, big: Vec<usize>) -> Self {
        let combined = small
            .iter()
            .chain(medium.iter())
            .chain(big.iter())
            .copied()
            .collect();
        Self {
            small,
            medium,
            big,
            combined,
        }
    }

    #[must_use]
    pub fn table(&self, class: SizeClass) -> &[usize] {
        match class {
            SizeClass::Small => &self.small,
            SizeClass::Medium => &self.medium,
            SizeClass::Big => &self.big,
            SizeClass::Combined => &self.combined,
        }
    }

    /// Replace the small table, keeping `combined` in sync.
    #[must_use]
    pub fn with_small(self, small: Vec<usize>) -> Self {
        Self::new(small, self.medium, self.big)
    }
}

impl Default for SizeTables {
    fn default() -> Self {
        Self::new(
            vec![8, 16, 24, 32, 40, 48, 64, 80, 96, 128, 160, 192, 256],
            vec![384, 512, 768, 1024, 1536, 2048, 3072, 4096, 8192],
            vec![16384, 32768, 65536, 131072, 262144, 524288, 1048576],
        )
    }
}

/// Validated size tables plus the class-selection policy.
#[derive(Debug, Clone)]
pub struct SizeModel {
    tables: SizeTables,
}

impl SizeModel {
    /// Validate that the small, medium and big tables are non-empty.
    pub fn new(tables: SizeTables) -> Result<Self, ConfigError> {
        for class in [SizeClass::Small, SizeClass::Medium, SizeClass::Big] {
            if tables.table(class).is_empty() {
                return Err(ConfigError::EmptySizeTable { class });
            }
        }
        Ok(Self { tables })
    }

    #[must_use]
    pub fn tables(&self) -> &SizeTables {
        &self.tables
    }

    /// Draw a size for `class`, or for a weighted random class if `None`.
    ///
    /// A class without a table yields `0`; callers treat that as a no-op.
    pub fn size_for(&self, class: Option<SizeClass>, rng: &mut RngStream) -> usize {
        let class = class.unwrap_or_else(|| SizeClass::from_unit(rng.next_unit()));
        let table = self.tables.table(class);
        if table.is_empty() {
            return 0;
        }
        table[rng.next_index(table.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::StreamId;

    #[test]
    fn class_thresholds() {
        assert_eq!(SizeClass::from_unit(0.0), SizeClass::Small);
        assert_eq!(SizeClass::from_unit(0.699_999), SizeClass::Small);
        assert_eq!(SizeClass::from_unit(0.7), SizeClass::Medium);
        assert_eq!(SizeClass::from_unit(0.899_999), SizeClass::Medium);
        assert_eq!(SizeClass::from_unit(0.9), SizeClass::Big);
        assert_eq!(SizeClass::from_unit(0.999_999), SizeClass::Big);
    }

    #[test]
    fn empty_mandatory_table_is_rejected() {
        let tables = SizeTables::new(vec![8], vec![], vec![4096]);
        assert_eq!(
            SizeModel::new(tables).unwrap_err(),
            ConfigError::EmptySizeTable {
                class: SizeClass::Medium
            }
        );
    }

    #[test]
    fn missing_combined_table_yields_sentinel_zero() {
        let mut tables = SizeTables::new(vec![8], vec![512], vec![4096]);
        tables.combined.clear();
        let model = SizeModel::new(tables).unwrap();
        let mut rng = RngStream::derive(1, StreamId::Sizes);
        assert_eq!(model.size_for(Some(SizeClass::Combined), &mut rng), 0);
    }

    #[test]
    fn explicit_class_draws_from_its_table() {
        let model = SizeModel::new(SizeTables::default()).unwrap();
        let mut rng = RngStream::derive(5, StreamId::Sizes);
        for _ in 0..1_000 {
            let s = model.size_for(Some(SizeClass::Big), &mut rng);
            assert!(model.tables().big.contains(&s));
        }
    }

    #[test]
    fn weighted_draws_roughly_follow_class_weights() {
        let model = SizeModel::new(SizeTables::new(vec![1], vec![2], vec![3])).unwrap();
        let mut rng = RngStream::derive(9, StreamId::Sizes);
        let mut counts = [0usize; 3];
        let n = 100_000;
        for _ in 0..n {
            counts[model.size_for(None, &mut rng) - 1] += 1;
        }
        let small = counts[0] as f64 / n as f64;
        let medium = counts[1] as f64 / n as f64;
        let big = counts[2] as f64 / n as f64;
        assert!((small - 0.7).abs() < 0.01, "small share {small}");
        assert!((medium - 0.2).abs() < 0.01, "medium share {medium}");
        assert!((big - 0.1).abs() < 0.01, "big share {big}");
    }

    #[test]
    fn default_combined_is_concatenation() {
        let t = SizeTables::default();
        assert_eq!(t.combined.len(), t.small.len() + t.medium.len() + t.big.len());
        assert_eq!(t.combined.first(), t.small.first());
        assert_eq!(t.combined.last(), t.big.last());
    }
}
