//! Allocator selection.
//!
//! The allocator is chosen by the `MARKOVLOAD_ALLOCATOR` environment
//! variable when nothing more specific is given:
//! - `system` (default): the Rust global allocator.
//! - `libc`: C `malloc`/`free`, i.e. whatever allocator is linked or preloaded.
//! - `counting`: the system allocator wrapped in call counters.

/// Environment variable consulted by [`AllocatorKind::from_env`].
pub const ALLOCATOR_ENV: &str = "MARKOVLOAD_ALLOCATOR";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocatorKind {
    #[default]
    System,
    Libc,
    Counting,
}

impl AllocatorKind {
    /// Parse from string (case-insensitive). Unknown values fall back to
    /// [`AllocatorKind::System`].
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    /// Strict parse; `None` for unknown names.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" | "std" | "global" | "default" => Some(Self::System),
            "libc" | "malloc" | "c" => Some(Self::Libc),
            "counting" | "count" | "counted" => Some(Self::Counting),
            _ => None,
        }
    }

    /// Kind named by [`ALLOCATOR_ENV`], or the default when unset.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var(ALLOCATOR_ENV)
            .map(|v| Self::from_str_loose(&v))
            .unwrap_or_default()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Libc => "libc",
            Self::Counting => "counting",
        }
    }
}
