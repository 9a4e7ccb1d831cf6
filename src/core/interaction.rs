//! Pairwise interactions: classify which particle pairs a potential shape
//! claims, predict their contact times, and run the matching response.

use crate::core::boundary::BoundaryCondition;
use crate::core::event::{EventType, PairEvent, PluginInfo};
use crate::core::liouvillean::{CollisionPrediction, NewtonianLiouvillean};
use crate::core::math::Rotation;
use crate::core::particle::Particle;
use crate::core::range::PairRange;
use crate::core::species::Species;
use crate::error::{Error, Result};
use std::f64::consts::PI;

/// Which contact surface of an interaction fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    /// Hard-core contact.
    Core,
    /// Crossing into the outer well boundary.
    WellEntry,
    /// Crossing out of the outer well boundary.
    WellExit,
}

/// Per-pair response context resolved by the registry: masses and species
/// ids of both members.
#[derive(Debug, Clone, Copy)]
pub struct PairContext {
    /// Mass of the first particle (0.0 = infinite sentinel).
    pub m1: f64,
    /// Mass of the second particle.
    pub m2: f64,
    /// Species running id of the first particle.
    pub species1: usize,
    /// Species running id of the second particle.
    pub species2: usize,
}

/// A pairwise potential-shape classifier plus its collision algebra hooks.
///
/// For every realizable particle pair exactly one interaction must claim
/// it; the registry's lookup fails loudly otherwise.
pub trait Interaction {
    /// Configured name.
    fn name(&self) -> &str;

    /// Assign the running id at registry initialisation.
    fn initialise(&mut self, id: usize);

    /// Running id (valid after initialisation).
    fn id(&self) -> usize;

    /// The pair range this interaction claims.
    fn pair_range(&self) -> &PairRange;

    /// True when this interaction governs the pair `(p1, p2)`.
    fn claims_pair(&self, p1: &Particle, p2: &Particle) -> bool {
        self.pair_range().contains_pair(p1.id, p2.id)
    }

    /// True when this interaction can represent `sp` (used to link species
    /// to their self-interaction at configuration time).
    fn claims_species(&self, sp: &Species, n_total: u32) -> bool {
        self.pair_range().overlaps(sp.range(), n_total)
    }

    /// Largest centre separation at which this interaction can act.
    fn max_interaction_distance(&self) -> f64;

    /// Volume excluded by particle `id` under this interaction.
    fn excluded_volume(&self, id: u32) -> f64;

    /// Time to the next contact for the (boundary-corrected) relative
    /// kinematics in `dat`, or `None` when no event is predicted.
    fn predict(&self, dat: &mut CollisionPrediction) -> Option<(f64, ContactKind)>;

    /// Run the response for a `kind` contact at absolute time `now`.
    #[allow(clippy::too_many_arguments)]
    fn run_event(
        &self,
        p1: &mut Particle,
        p2: &mut Particle,
        kind: ContactKind,
        ctx: &PairContext,
        liou: &NewtonianLiouvillean,
        bc: &dyn BoundaryCondition,
        now: f64,
    ) -> Result<PairEvent>;

    /// True when the pair currently violates this interaction's hard core.
    fn overlapping(&self, dat: &CollisionPrediction) -> bool;

    /// Potential energy currently stored in this interaction over all
    /// claimed pairs. Hard potentials default to zero.
    fn internal_energy(&self, _particles: &[Particle], _bc: &dyn BoundaryCondition) -> f64 {
        0.0
    }

    /// Self-description for the persistence collaborator.
    fn describe(&self) -> PluginInfo;
}

// ---- smooth hard spheres -------------------------------------------------

/// Smooth hard spheres of fixed diameter with restitution `e`.
#[derive(Debug, Clone)]
pub struct HardSphere {
    name: String,
    diameter: f64,
    e: f64,
    range: PairRange,
    id: usize,
}

impl HardSphere {
    /// Create a hard-sphere interaction.
    pub fn new(name: impl Into<String>, diameter: f64, e: f64, range: PairRange) -> Result<Self> {
        if !diameter.is_finite() || diameter <= 0.0 {
            return Err(Error::InvalidParam("diameter must be finite and > 0".into()));
        }
        if !(0.0..=1.0).contains(&e) {
            return Err(Error::InvalidParam("restitution must lie in [0, 1]".into()));
        }
        Ok(Self {
            name: name.into(),
            diameter,
            e,
            range,
            id: 0,
        })
    }
}

impl Interaction for HardSphere {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialise(&mut self, id: usize) {
        self.id = id;
    }

    fn id(&self) -> usize {
        self.id
    }

    fn pair_range(&self) -> &PairRange {
        &self.range
    }

    fn max_interaction_distance(&self) -> f64 {
        self.diameter
    }

    fn excluded_volume(&self, _id: u32) -> f64 {
        PI * self.diameter.powi(3) / 6.0
    }

    fn predict(&self, dat: &mut CollisionPrediction) -> Option<(f64, ContactKind)> {
        let liou = NewtonianLiouvillean::new();
        if liou.sphere_sphere_in_root(dat, self.diameter * self.diameter) {
            Some((dat.dt, ContactKind::Core))
        } else {
            None
        }
    }

    fn run_event(
        &self,
        p1: &mut Particle,
        p2: &mut Particle,
        kind: ContactKind,
        ctx: &PairContext,
        liou: &NewtonianLiouvillean,
        bc: &dyn BoundaryCondition,
        now: f64,
    ) -> Result<PairEvent> {
        if kind != ContactKind::Core {
            return Err(Error::InvalidParam(
                "hard spheres only produce core contacts".into(),
            ));
        }
        Ok(liou.smooth_spheres_coll(
            p1,
            p2,
            ctx.m1,
            ctx.m2,
            ctx.species1,
            ctx.species2,
            self.e,
            EventType::Core,
            bc,
            now,
        ))
    }

    fn overlapping(&self, dat: &CollisionPrediction) -> bool {
        NewtonianLiouvillean::new().sphere_overlap(dat, self.diameter * self.diameter)
    }

    fn describe(&self) -> PluginInfo {
        PluginInfo::new(self.name.clone(), "HardSphere")
            .with("diameter", self.diameter)
            .with("elasticity", self.e)
    }
}

// ---- square well ---------------------------------------------------------

/// Hard core plus an attractive square well out to `lambda ×` the core
/// diameter.
///
/// The pair's captured/free state is inferred geometrically from the
/// current separation (`core² ≤ r² < well²` means captured) rather than
/// tracked in a capture map.
#[derive(Debug, Clone)]
pub struct SquareWell {
    name: String,
    diameter: f64,
    lambda: f64,
    well_depth: f64,
    e: f64,
    range: PairRange,
    id: usize,
}

impl SquareWell {
    /// Create a square-well interaction; `lambda` is the well-to-core
    /// diameter ratio (> 1), `well_depth` the well depth (> 0 attractive).
    pub fn new(
        name: impl Into<String>,
        diameter: f64,
        lambda: f64,
        well_depth: f64,
        e: f64,
        range: PairRange,
    ) -> Result<Self> {
        if !diameter.is_finite() || diameter <= 0.0 {
            return Err(Error::InvalidParam("diameter must be finite and > 0".into()));
        }
        if !lambda.is_finite() || lambda <= 1.0 {
            return Err(Error::InvalidParam("lambda must be > 1".into()));
        }
        if !well_depth.is_finite() {
            return Err(Error::InvalidParam("well depth must be finite".into()));
        }
        if !(0.0..=1.0).contains(&e) {
            return Err(Error::InvalidParam("restitution must lie in [0, 1]".into()));
        }
        Ok(Self {
            name: name.into(),
            diameter,
            lambda,
            well_depth,
            e,
            range,
            id: 0,
        })
    }

    #[inline]
    fn core2(&self) -> f64 {
        self.diameter * self.diameter
    }

    #[inline]
    fn well2(&self) -> f64 {
        let w = self.lambda * self.diameter;
        w * w
    }
}

impl Interaction for SquareWell {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialise(&mut self, id: usize) {
        self.id = id;
    }

    fn id(&self) -> usize {
        self.id
    }

    fn pair_range(&self) -> &PairRange {
        &self.range
    }

    fn max_interaction_distance(&self) -> f64 {
        self.lambda * self.diameter
    }

    fn excluded_volume(&self, _id: u32) -> f64 {
        PI * self.diameter.powi(3) / 6.0
    }

    fn predict(&self, dat: &mut CollisionPrediction) -> Option<(f64, ContactKind)> {
        let liou = NewtonianLiouvillean::new();

        if dat.r2 >= self.well2() {
            // Free pair: the only upcoming surface is the well boundary.
            if liou.sphere_sphere_in_root(dat, self.well2()) {
                return Some((dat.dt, ContactKind::WellEntry));
            }
            return None;
        }

        // Captured pair: core approach races against well escape.
        let mut best: Option<(f64, ContactKind)> = None;
        let mut core_dat = dat.clone();
        if liou.sphere_sphere_in_root(&mut core_dat, self.core2()) {
            best = Some((core_dat.dt, ContactKind::Core));
        }
        let mut out_dat = dat.clone();
        if liou.sphere_sphere_out_root(&mut out_dat, self.well2())
            && best.map_or(true, |(t, _)| out_dat.dt < t)
        {
            best = Some((out_dat.dt, ContactKind::WellExit));
        }
        if let Some((t, _)) = best {
            dat.dt = t;
        }
        best
    }

    fn run_event(
        &self,
        p1: &mut Particle,
        p2: &mut Particle,
        kind: ContactKind,
        ctx: &PairContext,
        liou: &NewtonianLiouvillean,
        bc: &dyn BoundaryCondition,
        now: f64,
    ) -> Result<PairEvent> {
        let ev = match kind {
            ContactKind::Core => liou.smooth_spheres_coll(
                p1,
                p2,
                ctx.m1,
                ctx.m2,
                ctx.species1,
                ctx.species2,
                self.e,
                EventType::Core,
                bc,
                now,
            ),
            ContactKind::WellEntry => liou.sphere_well_event(
                p1,
                p2,
                ctx.m1,
                ctx.m2,
                ctx.species1,
                ctx.species2,
                self.well_depth,
                bc,
                now,
            ),
            ContactKind::WellExit => liou.sphere_well_event(
                p1,
                p2,
                ctx.m1,
                ctx.m2,
                ctx.species1,
                ctx.species2,
                -self.well_depth,
                bc,
                now,
            ),
        };
        Ok(ev)
    }

    fn overlapping(&self, dat: &CollisionPrediction) -> bool {
        NewtonianLiouvillean::new().sphere_overlap(dat, self.core2())
    }

    fn internal_energy(&self, particles: &[Particle], bc: &dyn BoundaryCondition) -> f64 {
        // Diagnostic O(N^2) scan over claimed captured pairs.
        let mut energy = 0.0;
        for (i, p1) in particles.iter().enumerate() {
            for p2 in particles.iter().skip(i + 1) {
                if !self.claims_pair(p1, p2) {
                    continue;
                }
                let dat = CollisionPrediction::for_pair(p1, p2, bc);
                if dat.r2 < self.well2() {
                    energy -= self.well_depth;
                }
            }
        }
        energy
    }

    fn describe(&self) -> PluginInfo {
        PluginInfo::new(self.name.clone(), "SquareWell")
            .with("diameter", self.diameter)
            .with("lambda", self.lambda)
            .with("well_depth", self.well_depth)
            .with("elasticity", self.e)
    }
}

// ---- parallel cubes ------------------------------------------------------

/// Axis-aligned (or uniformly pre-rotated) hard cubes.
#[derive(Debug, Clone)]
pub struct ParallelCubes {
    name: String,
    width: f64,
    e: f64,
    rotation: Option<Rotation>,
    range: PairRange,
    id: usize,
}

impl ParallelCubes {
    /// Create a parallel-cube interaction with per-axis contact distance
    /// `width` (the cube edge length for equal cubes).
    pub fn new(
        name: impl Into<String>,
        width: f64,
        e: f64,
        rotation: Option<Rotation>,
        range: PairRange,
    ) -> Result<Self> {
        if !width.is_finite() || width <= 0.0 {
            return Err(Error::InvalidParam("width must be finite and > 0".into()));
        }
        if !(0.0..=1.0).contains(&e) {
            return Err(Error::InvalidParam("restitution must lie in [0, 1]".into()));
        }
        Ok(Self {
            name: name.into(),
            width,
            e,
            rotation,
            range,
            id: 0,
        })
    }
}

impl Interaction for ParallelCubes {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialise(&mut self, id: usize) {
        self.id = id;
    }

    fn id(&self) -> usize {
        self.id
    }

    fn pair_range(&self) -> &PairRange {
        &self.range
    }

    fn max_interaction_distance(&self) -> f64 {
        // Farthest contact is corner to corner.
        self.width * (3.0_f64).sqrt()
    }

    fn excluded_volume(&self, _id: u32) -> f64 {
        self.width.powi(3)
    }

    fn predict(&self, dat: &mut CollisionPrediction) -> Option<(f64, ContactKind)> {
        let liou = NewtonianLiouvillean::new();
        if liou.cube_cube_in_root(dat, self.width, self.rotation.as_ref()) {
            Some((dat.dt, ContactKind::Core))
        } else {
            None
        }
    }

    fn run_event(
        &self,
        p1: &mut Particle,
        p2: &mut Particle,
        kind: ContactKind,
        ctx: &PairContext,
        liou: &NewtonianLiouvillean,
        bc: &dyn BoundaryCondition,
        now: f64,
    ) -> Result<PairEvent> {
        if kind != ContactKind::Core {
            return Err(Error::InvalidParam(
                "parallel cubes only produce core contacts".into(),
            ));
        }
        Ok(liou.parallel_cube_coll(
            p1,
            p2,
            ctx.m1,
            ctx.m2,
            ctx.species1,
            ctx.species2,
            self.e,
            self.rotation.as_ref(),
            bc,
            now,
        ))
    }

    fn overlapping(&self, dat: &CollisionPrediction) -> bool {
        let r = match &self.rotation {
            Some(m) => m.apply(&dat.rij),
            None => dat.rij,
        };
        r.iter().all(|c| c.abs() < self.width)
    }

    fn describe(&self) -> PluginInfo {
        PluginInfo::new(self.name.clone(), "ParallelCubes")
            .with("width", self.width)
            .with("elasticity", self.e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::boundary::OpenBoundary;
    use crate::core::math::dot;

    fn ctx() -> PairContext {
        PairContext {
            m1: 1.0,
            m2: 1.0,
            species1: 0,
            species2: 0,
        }
    }

    fn open_bc() -> OpenBoundary {
        OpenBoundary::new([100.0, 100.0, 100.0]).expect("valid cell")
    }

    #[test]
    fn hard_sphere_predicts_core_contact() -> Result<()> {
        let int = HardSphere::new("Bulk", 1.0, 1.0, PairRange::All)?;
        let p1 = Particle::new(0, [-0.6, 0.0, 0.0], [1.0, 0.0, 0.0])?;
        let p2 = Particle::new(1, [0.6, 0.0, 0.0], [-1.0, 0.0, 0.0])?;
        let mut dat = CollisionPrediction::for_pair(&p1, &p2, &open_bc());
        let (dt, kind) = int.predict(&mut dat).expect("approaching pair");
        assert_eq!(kind, ContactKind::Core);
        assert!((dt - 0.1).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn square_well_free_pair_predicts_entry() -> Result<()> {
        let int = SquareWell::new("Well", 1.0, 1.5, 0.5, 1.0, PairRange::All)?;
        let p1 = Particle::new(0, [-2.0, 0.0, 0.0], [1.0, 0.0, 0.0])?;
        let p2 = Particle::new(1, [2.0, 0.0, 0.0], [-1.0, 0.0, 0.0])?;
        let mut dat = CollisionPrediction::for_pair(&p1, &p2, &open_bc());
        let (dt, kind) = int.predict(&mut dat).expect("approaching pair");
        assert_eq!(kind, ContactKind::WellEntry);
        // Separation 4.0 closes at 2.0 to reach the 1.5 well boundary.
        assert!((dt - 1.25).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn square_well_captured_pair_races_core_against_exit() -> Result<()> {
        let int = SquareWell::new("Well", 1.0, 1.5, 0.5, 1.0, PairRange::All)?;
        // Inside the well (separation 1.2), approaching: core wins.
        let p1 = Particle::new(0, [-0.6, 0.0, 0.0], [1.0, 0.0, 0.0])?;
        let p2 = Particle::new(1, [0.6, 0.0, 0.0], [-1.0, 0.0, 0.0])?;
        let mut dat = CollisionPrediction::for_pair(&p1, &p2, &open_bc());
        let (_, kind) = int.predict(&mut dat).expect("captured pair");
        assert_eq!(kind, ContactKind::Core);

        // Same separation, separating: well exit is the only candidate.
        let p1 = Particle::new(0, [-0.6, 0.0, 0.0], [-1.0, 0.0, 0.0])?;
        let p2 = Particle::new(1, [0.6, 0.0, 0.0], [1.0, 0.0, 0.0])?;
        let mut dat = CollisionPrediction::for_pair(&p1, &p2, &open_bc());
        let (dt, kind) = int.predict(&mut dat).expect("escaping pair");
        assert_eq!(kind, ContactKind::WellExit);
        // Gap to the 1.5 boundary is 0.3, opening at 2.0.
        assert!((dt - 0.15).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn well_entry_then_exit_returns_energy() -> Result<()> {
        let int = SquareWell::new("Well", 1.0, 1.5, 0.5, 1.0, PairRange::All)?;
        let liou = NewtonianLiouvillean::new();
        let bc = open_bc();
        let mut p1 = Particle::new(0, [-0.75, 0.0, 0.0], [1.0, 0.0, 0.0])?;
        let mut p2 = Particle::new(1, [0.75, 0.0, 0.0], [-1.0, 0.0, 0.0])?;

        let entry = int.run_event(&mut p1, &mut p2, ContactKind::WellEntry, &ctx(), &liou, &bc, 0.0)?;
        assert!((entry.delta_ke() - 0.5).abs() < 1e-12);

        // Reverse radial motion so the pair exits again.
        p1.v[0] = -p1.v[0];
        p2.v[0] = -p2.v[0];
        let exit = int.run_event(&mut p1, &mut p2, ContactKind::WellExit, &ctx(), &liou, &bc, 0.0)?;
        assert!((exit.delta_ke() + 0.5).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn cube_response_acts_on_largest_axis_only() -> Result<()> {
        let int = ParallelCubes::new("Cubes", 1.0, 1.0, None, PairRange::All)?;
        let liou = NewtonianLiouvillean::new();
        let bc = open_bc();
        let mut p1 = Particle::new(0, [-0.5, 0.2, 0.0], [1.0, 0.3, 0.0])?;
        let mut p2 = Particle::new(1, [0.5, 0.0, 0.0], [-1.0, 0.0, 0.0])?;
        let ev = int.run_event(&mut p1, &mut p2, ContactKind::Core, &ctx(), &liou, &bc, 0.0)?;
        // Impulse confined to x; tangential velocities untouched.
        assert!(ev.impulse[1].abs() < 1e-15);
        assert!(ev.impulse[2].abs() < 1e-15);
        assert!((p1.v[1] - 0.3).abs() < 1e-15);
        assert!((p1.v[0] + 1.0).abs() < 1e-12);
        assert!((p2.v[0] - 1.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn square_well_internal_energy_counts_captured_pairs() -> Result<()> {
        let int = SquareWell::new("Well", 1.0, 1.5, 0.5, 1.0, PairRange::All)?;
        let bc = open_bc();
        let particles = vec![
            Particle::new(0, [0.0, 0.0, 0.0], [0.0; 3])?,
            Particle::new(1, [1.2, 0.0, 0.0], [0.0; 3])?,
            Particle::new(2, [10.0, 0.0, 0.0], [0.0; 3])?,
        ];
        // Only the (0, 1) pair sits inside the 1.5 well boundary.
        assert!((int.internal_energy(&particles, &bc) + 0.5).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn bad_parameters_rejected() {
        assert!(HardSphere::new("x", 0.0, 1.0, PairRange::All).is_err());
        assert!(HardSphere::new("x", 1.0, 1.5, PairRange::All).is_err());
        assert!(SquareWell::new("x", 1.0, 0.9, 0.5, 1.0, PairRange::All).is_err());
        assert!(ParallelCubes::new("x", -1.0, 1.0, None, PairRange::All).is_err());
    }

    #[test]
    fn overlap_checks_respect_geometry() -> Result<()> {
        let int = HardSphere::new("Bulk", 1.0, 1.0, PairRange::All)?;
        let close = CollisionPrediction::new([0.9, 0.0, 0.0], [0.0; 3]);
        let apart = CollisionPrediction::new([1.1, 0.0, 0.0], [0.0; 3]);
        assert!(int.overlapping(&close));
        assert!(!int.overlapping(&apart));
        // Sanity: rvdot of a static pair is zero.
        assert!(dot(&close.rij, &close.vij).abs() < 1e-15);
        Ok(())
    }
}
