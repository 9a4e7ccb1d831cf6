//! Topology plugins: named groupings of particle ranges into structures,
//! used by multibody responses to treat a range as one rigid body.

use crate::core::event::PluginInfo;
use crate::core::range::ParticleRange;

/// A named grouping of particle ranges into structures.
pub trait Topology {
    /// Configured name.
    fn name(&self) -> &str;

    /// Assign the running id at registry initialisation.
    fn initialise(&mut self, id: usize);

    /// Running id (valid after initialisation).
    fn id(&self) -> usize;

    /// The member structures, one range per structure.
    fn structures(&self) -> &[ParticleRange];

    /// True when any structure contains particle `id`.
    fn contains(&self, id: u32) -> bool {
        self.structures().iter().any(|r| r.contains(id))
    }

    /// Self-description for the persistence collaborator.
    fn describe(&self) -> PluginInfo;
}

/// A set of rigid structures: each member range moves as one body in
/// multibody collisions.
#[derive(Debug, Clone)]
pub struct RigidStructure {
    name: String,
    structures: Vec<ParticleRange>,
    id: usize,
}

impl RigidStructure {
    pub fn new(name: impl Into<String>, structures: Vec<ParticleRange>) -> Self {
        Self {
            name: name.into(),
            structures,
            id: 0,
        }
    }

    /// Member ids of structure `idx`, given the total particle count.
    pub fn structure_ids(&self, idx: usize, n_total: u32) -> Option<Vec<u32>> {
        self.structures.get(idx).map(|r| r.ids(n_total))
    }
}

impl Topology for RigidStructure {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialise(&mut self, id: usize) {
        self.id = id;
    }

    fn id(&self) -> usize {
        self.id
    }

    fn structures(&self) -> &[ParticleRange] {
        &self.structures
    }

    fn describe(&self) -> PluginInfo {
        PluginInfo::new(self.name.clone(), "Rigid").with("structures", self.structures.len())
    }
}
