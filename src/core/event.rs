use crate::core::math::{norm_sq, sub, Vec3, ZERO};
use crate::core::particle::Particle;
use crate::error::{Error, Result};
use ordered_float::NotNan;
use std::cmp::Ordering;

/// Tag describing what kind of state change an event performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventType {
    /// Hard-core elastic/inelastic collision.
    Core,
    /// Reflection off a static or moving wall.
    Wall,
    /// Full thermal re-draw of a particle's velocity.
    Gaussian,
    /// Square-well boundary crossing that raised kinetic energy.
    WellKeUp,
    /// Square-well boundary crossing that lowered kinetic energy.
    WellKeDown,
    /// Reflective bounce substituted for a well exit the pair could not afford.
    Bounce,
    /// Bookkeeping event with no momentum transfer (tickers, cell crossings,
    /// compression halts).
    Virtual,
}

/// Immutable record of an event's effect on a single particle.
///
/// Built in two steps mirroring the response-routine contract: `capture`
/// snapshots the pre-event velocity, the routine mutates the particle, and
/// `finalise` computes ΔKE from the *actual* post-update velocity so the
/// record is always self-consistent with the mutation performed.
#[derive(Debug, Clone)]
pub struct ParticleEvent {
    /// Id of the involved particle.
    pub particle_id: u32,
    /// Running id of the particle's species.
    pub species_id: usize,
    /// What happened.
    pub event_type: EventType,
    /// Velocity immediately before the event.
    pub old_velocity: Vec3,
    /// Kinetic-energy change, `½m(|v_new|² − |v_old|²)`.
    pub delta_ke: f64,
}

impl ParticleEvent {
    /// Snapshot the pre-event state of `p`.
    pub fn capture(p: &Particle, species_id: usize, event_type: EventType) -> Self {
        Self {
            particle_id: p.id,
            species_id,
            event_type,
            old_velocity: p.v,
            delta_ke: 0.0,
        }
    }

    /// Seal the record against the post-event state of `p`.
    pub fn finalise(mut self, p: &Particle, mass: f64) -> Self {
        self.delta_ke = 0.5 * mass * (norm_sq(&p.v) - norm_sq(&self.old_velocity));
        self
    }
}

/// Immutable record of a two-body event.
#[derive(Debug, Clone)]
pub struct PairEvent {
    /// Record for the first particle.
    pub particle1: ParticleEvent,
    /// Record for the second particle.
    pub particle2: ParticleEvent,
    /// Boundary-corrected separation `r1 − r2` at contact.
    pub rij: Vec3,
    /// Pre-event relative velocity `v1 − v2`.
    pub vij_old: Vec3,
    /// `rij · vij` at contact.
    pub rvdot: f64,
    /// Impulse applied (`−dP` to particle 1, `+dP` to particle 2).
    pub impulse: Vec3,
    /// What happened.
    pub event_type: EventType,
}

impl PairEvent {
    /// Snapshot the pre-event state of the pair. `rij`/`vij_old` start as
    /// raw differences; the response routine boundary-corrects them in
    /// place before computing the impulse.
    pub fn capture(
        p1: &Particle,
        p2: &Particle,
        species1: usize,
        species2: usize,
        event_type: EventType,
    ) -> Self {
        Self {
            particle1: ParticleEvent::capture(p1, species1, event_type),
            particle2: ParticleEvent::capture(p2, species2, event_type),
            rij: sub(&p1.r, &p2.r),
            vij_old: sub(&p1.v, &p2.v),
            rvdot: 0.0,
            impulse: ZERO,
            event_type,
        }
    }

    /// Retag the event (e.g. a well exit downgraded to a `Bounce`).
    pub fn set_type(&mut self, event_type: EventType) {
        self.event_type = event_type;
        self.particle1.event_type = event_type;
        self.particle2.event_type = event_type;
    }

    /// Seal both per-particle records against the post-event velocities.
    pub fn finalise(mut self, p1: &Particle, p2: &Particle, m1: f64, m2: f64) -> Self {
        self.particle1 = self.particle1.finalise(p1, m1);
        self.particle2 = self.particle2.finalise(p2, m2);
        self
    }

    /// Total kinetic-energy change of the pair.
    pub fn delta_ke(&self) -> f64 {
        self.particle1.delta_ke + self.particle2.delta_ke
    }
}

/// Result of an event touching an arbitrary number of particles
/// (multibody collisions, thermostats, tickers).
#[derive(Debug, Clone)]
pub struct NParticleEvent {
    /// What happened.
    pub event_type: EventType,
    /// Per-particle records, one per involved particle.
    pub events: Vec<ParticleEvent>,
}

impl NParticleEvent {
    /// An event of the given kind touching no particles yet.
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            events: Vec::new(),
        }
    }

    /// Append one per-particle record.
    pub fn push(&mut self, ev: ParticleEvent) {
        self.events.push(ev);
    }

    /// True when no particle was touched.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total kinetic-energy change over all involved particles.
    pub fn delta_ke(&self) -> f64 {
        self.events.iter().map(|e| e.delta_ke).sum()
    }
}

/// Which kernel object produced a candidate event.
///
/// Tie-breaking for deterministic ordering prefers interactions over
/// locals over globals over systems when times are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    /// Pairwise interaction `id` between particles `p1` and `p2`.
    Interaction { id: usize, p1: u32, p2: u32 },
    /// Local event source `id` acting on particle `p`.
    Local { id: usize, p: u32 },
    /// Global event source `id` triggered by particle `p`.
    Global { id: usize, p: u32 },
    /// System-wide event source `id`.
    System { id: usize },
}

impl EventSource {
    #[inline]
    fn order_key(&self) -> (u8, usize, u32, u32) {
        match *self {
            EventSource::Interaction { id, p1, p2 } => (0, id, p1, p2),
            EventSource::Local { id, p } => (1, id, p, 0),
            EventSource::Global { id, p } => (2, id, p, 0),
            EventSource::System { id } => (3, id, 0, 0),
        }
    }
}

/// A candidate event handed to the external scheduler.
///
/// `time` is the absolute event time; `f64::INFINITY` is a legal value
/// meaning "this source currently predicts nothing". NaN is a programming
/// error and is rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateEvent {
    /// Absolute event time (non-NaN; may be +inf).
    pub time: NotNan<f64>,
    /// Producer of the candidate.
    pub source: EventSource,
}

impl CandidateEvent {
    /// Create a new candidate, validating that the time is non-NaN.
    pub fn new(time: f64, source: EventSource) -> Result<Self> {
        let time =
            NotNan::new(time).map_err(|_| Error::InvalidParam("event time cannot be NaN".into()))?;
        Ok(Self { time, source })
    }

    /// The raw f64 event time.
    #[inline]
    pub fn time_f64(&self) -> f64 {
        self.time.into_inner()
    }
}

impl Ord for CandidateEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.time.cmp(&other.time) {
            Ordering::Equal => self.source.order_key().cmp(&other.source.order_key()),
            o => o,
        }
    }
}

impl PartialOrd for CandidateEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Self-description of a configured plugin object: enough (name, type tag,
/// parameters) for the external persistence collaborator to reconstruct it
/// identically.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginInfo {
    /// Configured object name.
    pub name: String,
    /// Concrete variant tag, e.g. `"HardSphere"`.
    pub type_tag: &'static str,
    /// Named scalar/textual parameters.
    pub params: Vec<(&'static str, String)>,
}

impl PluginInfo {
    /// Start a description for `name` of concrete type `type_tag`.
    pub fn new(name: impl Into<String>, type_tag: &'static str) -> Self {
        Self {
            name: name.into(),
            type_tag,
            params: Vec::new(),
        }
    }

    /// Append one named parameter.
    pub fn with(mut self, key: &'static str, value: impl ToString) -> Self {
        self.params.push((key, value.to_string()));
        self
    }
}
