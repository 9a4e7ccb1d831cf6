//! Species: homogeneous groups of particles sharing a mass and an
//! interaction-law membership.

use crate::core::event::PluginInfo;
use crate::core::particle::Particle;
use crate::core::range::ParticleRange;
use crate::error::{Error, Result};

/// Sentinel mass meaning "infinite/immovable".
///
/// Collision responses special-case this value so no momentum is ever
/// divided by it.
pub const INFINITE_MASS: f64 = 0.0;

/// Classifies a range of particles into one homogeneous group.
///
/// Every particle must belong to exactly one species; the registry checks
/// that partition once at initialisation.
#[derive(Debug, Clone)]
pub struct Species {
    name: String,
    mass: f64,
    range: ParticleRange,
    /// Running id assigned by the registry at initialisation.
    id: usize,
    /// Name of the Interaction representing this species' self-interaction,
    /// linked by the registry when the species is added.
    interaction: Option<String>,
}

impl Species {
    /// Create a species owning `range` with per-particle mass `mass`.
    ///
    /// `mass` may be [`INFINITE_MASS`] (exactly 0.0) for immovable
    /// particles; otherwise it must be finite and positive.
    pub fn new(name: impl Into<String>, mass: f64, range: ParticleRange) -> Result<Self> {
        if !mass.is_finite() || mass < 0.0 {
            return Err(Error::InvalidParam(
                "species mass must be finite and >= 0 (0 meaning infinite)".into(),
            ));
        }
        Ok(Self {
            name: name.into(),
            mass,
            range,
            id: 0,
            interaction: None,
        })
    }

    /// Configured name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Running id (valid after registry initialisation).
    pub fn id(&self) -> usize {
        self.id
    }

    /// The owned particle-id range.
    pub fn range(&self) -> &ParticleRange {
        &self.range
    }

    /// Mass of particle `id`. All particles of a species share one mass;
    /// the id parameter keeps the signature ready for per-particle masses.
    #[inline]
    pub fn mass_of(&self, _id: u32) -> f64 {
        self.mass
    }

    /// True when this species' mass is the infinite sentinel.
    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.mass == INFINITE_MASS
    }

    /// Membership test.
    #[inline]
    pub fn is_species(&self, p: &Particle) -> bool {
        self.range.contains(p.id)
    }

    /// Number of owned particles, given the simulation total.
    pub fn count(&self, n_total: u32) -> u32 {
        self.range.count(n_total)
    }

    /// Name of the linked self-interaction, if the registry has linked one.
    pub fn interaction(&self) -> Option<&str> {
        self.interaction.as_deref()
    }

    pub(crate) fn set_interaction(&mut self, name: &str) {
        self.interaction = Some(name.to_string());
    }

    pub(crate) fn initialise(&mut self, id: usize) {
        self.id = id;
    }

    /// Self-description for the persistence collaborator.
    pub fn describe(&self) -> PluginInfo {
        let mut info = PluginInfo::new(self.name.clone(), "Point").with("mass", self.mass);
        if let Some(int) = &self.interaction {
            info = info.with("interaction", int);
        }
        info
    }
}
