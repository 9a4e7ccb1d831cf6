//! Global event sources: schedulers that watch every particle, emitting
//! virtual events that keep cached neighbourhood data valid.

use crate::core::boundary::BoundaryCondition;
use crate::core::event::{EventType, ParticleEvent, PluginInfo};
use crate::core::liouvillean::NewtonianLiouvillean;
use crate::core::math::Vec3;
use crate::core::particle::Particle;
use crate::core::range::ParticleRange;
use crate::error::Result;

/// A global event source: predicts and runs events for any particle in the
/// simulation.
pub trait Global {
    /// Configured name.
    fn name(&self) -> &str;

    /// Assign the running id at registry initialisation.
    fn initialise(&mut self, id: usize);

    /// Running id (valid after initialisation).
    fn id(&self) -> usize;

    /// Particles this global acts on.
    fn range(&self) -> &ParticleRange;

    /// True when this global can produce events for `p`.
    fn applies_to(&self, p: &Particle) -> bool {
        self.range().contains(p.id)
    }

    /// Time from now until this global's next event for `p`, or `+∞`.
    fn event_time(
        &self,
        p: &Particle,
        liou: &NewtonianLiouvillean,
        bc: &dyn BoundaryCondition,
    ) -> f64;

    /// Run the response at absolute time `now`.
    fn run_event(
        &mut self,
        p: &mut Particle,
        species_id: usize,
        liou: &NewtonianLiouvillean,
        bc: &dyn BoundaryCondition,
        now: f64,
    ) -> Result<ParticleEvent>;

    /// Self-description for the persistence collaborator.
    fn describe(&self) -> PluginInfo;
}

/// Guards minimum-image pair predictions against fast particles: fires a
/// virtual event before any particle travels half a cell length past the
/// largest interaction distance, so no pair time is computed against the
/// wrong image.
#[derive(Debug, Clone)]
pub struct PbcSentinel {
    name: String,
    /// Largest interaction distance in the simulation.
    l_max: f64,
    range: ParticleRange,
    id: usize,
}

impl PbcSentinel {
    pub fn new(name: impl Into<String>, l_max: f64) -> Self {
        Self {
            name: name.into(),
            l_max,
            range: ParticleRange::All,
            id: 0,
        }
    }

    /// Refresh the guarded distance when interactions change size.
    pub fn set_max_distance(&mut self, l_max: f64) {
        self.l_max = l_max;
    }
}

impl Global for PbcSentinel {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialise(&mut self, id: usize) {
        self.id = id;
    }

    fn id(&self) -> usize {
        self.id
    }

    fn range(&self) -> &ParticleRange {
        &self.range
    }

    fn event_time(
        &self,
        p: &Particle,
        liou: &NewtonianLiouvillean,
        bc: &dyn BoundaryCondition,
    ) -> f64 {
        if p.v.iter().all(|&c| c == 0.0) {
            return f64::INFINITY;
        }
        liou.pbc_sentinel_time(p, self.l_max, bc)
    }

    fn run_event(
        &mut self,
        p: &mut Particle,
        species_id: usize,
        liou: &NewtonianLiouvillean,
        _bc: &dyn BoundaryCondition,
        now: f64,
    ) -> Result<ParticleEvent> {
        liou.update_particle(p, now);
        // No dynamics; the event exists so pair predictions involving this
        // particle are recomputed from its new position.
        let record = ParticleEvent::capture(p, species_id, EventType::Virtual);
        Ok(record.finalise(p, 0.0))
    }

    fn describe(&self) -> PluginInfo {
        PluginInfo::new(self.name.clone(), "PBCSentinel").with("max_distance", self.l_max)
    }
}

/// Fires a virtual event whenever a particle crosses out of its current
/// cell in a fixed cubic grid, standing in for neighbour-list maintenance.
#[derive(Debug, Clone)]
pub struct CellTransit {
    name: String,
    origin: Vec3,
    width: Vec3,
    range: ParticleRange,
    id: usize,
}

impl CellTransit {
    pub fn new(name: impl Into<String>, origin: Vec3, width: Vec3) -> Self {
        Self {
            name: name.into(),
            origin,
            width,
            range: ParticleRange::All,
            id: 0,
        }
    }
}

impl Global for CellTransit {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialise(&mut self, id: usize) {
        self.id = id;
    }

    fn id(&self) -> usize {
        self.id
    }

    fn range(&self) -> &ParticleRange {
        &self.range
    }

    fn event_time(
        &self,
        p: &Particle,
        liou: &NewtonianLiouvillean,
        bc: &dyn BoundaryCondition,
    ) -> f64 {
        liou.square_cell_time(p, &self.origin, &self.width, bc)
    }

    fn run_event(
        &mut self,
        p: &mut Particle,
        species_id: usize,
        liou: &NewtonianLiouvillean,
        bc: &dyn BoundaryCondition,
        now: f64,
    ) -> Result<ParticleEvent> {
        let axis = liou.square_cell_axis(p, &self.origin, &self.width, bc);
        liou.update_particle(p, now);
        tracing::trace!(particle = p.id, axis, "cell transit");
        let record = ParticleEvent::capture(p, species_id, EventType::Virtual);
        Ok(record.finalise(p, 0.0))
    }

    fn describe(&self) -> PluginInfo {
        PluginInfo::new(self.name.clone(), "CellTransit")
            .with("width_x", self.width[0])
            .with("width_y", self.width[1])
            .with("width_z", self.width[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::boundary::PeriodicBoundary;

    #[test]
    fn sentinel_fires_before_half_cell_travel() -> Result<()> {
        let bc = PeriodicBoundary::new([10.0, 10.0, 10.0])?;
        let liou = NewtonianLiouvillean::new();
        let sentinel = PbcSentinel::new("Sentinel", 1.0);
        let p = Particle::new(0, [0.0, 0.0, 0.0], [2.0, 0.0, 0.0])?;
        // (0.5 * 10 - 1) / 2 = 2.
        let t = sentinel.event_time(&p, &liou, &bc);
        assert!((t - 2.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn sentinel_ignores_motionless_particles() -> Result<()> {
        let bc = PeriodicBoundary::new([10.0, 10.0, 10.0])?;
        let liou = NewtonianLiouvillean::new();
        let sentinel = PbcSentinel::new("Sentinel", 1.0);
        let p = Particle::new(0, [1.0, 2.0, 3.0], [0.0, 0.0, 0.0])?;
        assert!(sentinel.event_time(&p, &liou, &bc).is_infinite());
        Ok(())
    }

    #[test]
    fn sentinel_event_is_virtual_and_inert() -> Result<()> {
        let bc = PeriodicBoundary::new([10.0, 10.0, 10.0])?;
        let liou = NewtonianLiouvillean::new();
        let mut sentinel = PbcSentinel::new("Sentinel", 1.0);
        let mut p = Particle::new(0, [0.0, 0.0, 0.0], [2.0, 0.0, 0.0])?;
        let ev = sentinel.run_event(&mut p, 0, &liou, &bc, 2.0)?;
        assert_eq!(ev.event_type, EventType::Virtual);
        assert_eq!(p.v, [2.0, 0.0, 0.0]);
        assert!((p.r[0] - 4.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn cell_transit_time_matches_nearest_face() -> Result<()> {
        let bc = PeriodicBoundary::new([10.0, 10.0, 10.0])?;
        let liou = NewtonianLiouvillean::new();
        let cells = CellTransit::new("Cells", [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let p = Particle::new(0, [0.25, 0.5, 0.5], [1.0, 0.0, 0.0])?;
        let t = cells.event_time(&p, &liou, &bc);
        assert!((t - 0.75).abs() < 1e-12, "transit time {t}");
        Ok(())
    }
}
