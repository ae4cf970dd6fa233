//! Deterministic pseudo-random streams.
//!
//! Each workload concern (Markov transitions, size draws, slot picks, graph
//! construction) owns its own [`RngStream`]. Streams are derived from one
//! master seed by salting it with a per-stream constant, so the number of
//! draws taken from one stream never shifts the values seen by another.
//!
//! The generator is SplitMix64. Range reduction is a plain modulo and is
//! therefore slightly biased toward low values; that is fine for load
//! shaping and the reason these streams are not used for statistics.

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// 2^-53, the spacing of the 53-bit unit draws.
const UNIT_SCALE: f64 = 1.0 / (1u64 << 53) as f64;

#[inline]
const fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Pure SplitMix64 transition: returns the successor state and the output.
#[inline]
#[must_use]
pub const fn next(state: u64) -> (u64, u64) {
    let advanced = state.wrapping_add(GOLDEN_GAMMA);
    (advanced, mix64(advanced))
}

/// Named stream identities. Each name carries a fixed salt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamId {
    /// Markov chain transitions.
    Transitions,
    /// Size-class and size-table draws, batch uniformity draws.
    Sizes,
    /// Slot selection in the graph workload.
    Slots,
    /// Graph construction and payload values.
    Graph,
}

impl StreamId {
    #[must_use]
    pub const fn salt(self) -> u64 {
        match self {
            Self::Transitions => 0x7472_616E_7369_7469,
            Self::Sizes => 0x7369_7A65_7300_0000,
            Self::Slots => 0x736C_6F74_7300_0000,
            Self::Graph => 0x6772_6170_6800_0000,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transitions => "transitions",
            Self::Sizes => "sizes",
            Self::Slots => "slots",
            Self::Graph => "graph",
        }
    }
}

/// A single SplitMix64 stream.
///
/// Deliberately not `Copy`: copying a stream silently duplicates its
/// future draws. Clone explicitly when a fork is really wanted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RngStream {
    state: u64,
}

impl RngStream {
    /// Stream starting from a raw state.
    #[must_use]
    pub const fn from_state(state: u64) -> Self {
        Self { state }
    }

    /// Derive the stream `id` from `master`.
    #[must_use]
    pub const fn derive(master: u64, id: StreamId) -> Self {
        Self {
            state: mix64(master ^ id.salt()),
        }
    }

    #[must_use]
    pub const fn state(&self) -> u64 {
        self.state
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let (state, value) = next(self.state);
        self.state = state;
        value
    }

    /// Uniform-ish draw in `[min, max]` (inclusive) by modulo reduction.
    ///
    /// Returns `min` when `max <= min`.
    #[inline]
    pub fn next_in_range(&mut self, min: u64, max: u64) -> u64 {
        let value = self.next_u64();
        if max <= min {
            return min;
        }
        let span = (max - min).wrapping_add(1);
        if span == 0 {
            return value;
        }
        min + value % span
    }

    /// Index in `[0, len)`. `len` must be non-zero.
    #[inline]
    pub fn next_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "index draw over an empty table");
        self.next_in_range(0, len.saturating_sub(1) as u64) as usize
    }

    /// Draw in `[0, 1)` with 53 bits of resolution.
    #[inline]
    pub fn next_unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * UNIT_SCALE
    }

    /// Draw in `[0, 1)` affinely mapped onto `[min, max)`.
    #[inline]
    pub fn next_unit_float(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_unit() * (max - min)
    }
}
