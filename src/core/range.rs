//! Particle-id ranges: which particles a Species, Local, or Topology owns,
//! and which particle *pairs* an Interaction claims.

/// A set of particle ids.
///
/// `Span` is half-open (`start <= id < end`); `All` means every particle in
/// the simulation, whatever its size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticleRange {
    /// Every particle.
    All,
    /// The half-open id range `[start, end)`.
    Span {
        /// First id contained.
        start: u32,
        /// One past the last id contained.
        end: u32,
    },
    /// An explicit id list.
    List(Vec<u32>),
}

impl ParticleRange {
    /// Membership test.
    #[inline]
    pub fn contains(&self, id: u32) -> bool {
        match self {
            ParticleRange::All => true,
            ParticleRange::Span { start, end } => id >= *start && id < *end,
            ParticleRange::List(ids) => ids.contains(&id),
        }
    }

    /// Number of particles owned, given the simulation's total count.
    pub fn count(&self, n_total: u32) -> u32 {
        match self {
            ParticleRange::All => n_total,
            ParticleRange::Span { start, end } => end.saturating_sub(*start).min(n_total),
            ParticleRange::List(ids) => ids.len() as u32,
        }
    }

    /// Materialise the owned ids, given the simulation's total count.
    pub fn ids(&self, n_total: u32) -> Vec<u32> {
        match self {
            ParticleRange::All => (0..n_total).collect(),
            ParticleRange::Span { start, end } => (*start..(*end).min(n_total)).collect(),
            ParticleRange::List(ids) => ids.clone(),
        }
    }
}

/// Which particle pairs an Interaction claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairRange {
    /// Every realizable pair.
    All,
    /// Pairs with one member in each range (in either order).
    Pair(ParticleRange, ParticleRange),
    /// Pairs with both members inside one range.
    Within(ParticleRange),
}

impl PairRange {
    /// True when the unordered pair `(i, j)` is claimed.
    pub fn contains_pair(&self, i: u32, j: u32) -> bool {
        match self {
            PairRange::All => true,
            PairRange::Pair(a, b) => {
                (a.contains(i) && b.contains(j)) || (a.contains(j) && b.contains(i))
            }
            PairRange::Within(r) => r.contains(i) && r.contains(j),
        }
    }

    /// True when the range can claim pairs involving any particle of `r`.
    pub fn overlaps(&self, r: &ParticleRange, n_total: u32) -> bool {
        match self {
            PairRange::All => true,
            PairRange::Pair(a, b) => r
                .ids(n_total)
                .iter()
                .any(|&id| a.contains(id) || b.contains(id)),
            PairRange::Within(w) => r.ids(n_total).iter().any(|&id| w.contains(id)),
        }
    }
}
