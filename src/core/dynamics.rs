//! The aggregate dynamics registry: owns the particles, the boundary
//! condition, the Liouvillean, and every configured plugin family, and
//! exposes the prediction/response surface an external event scheduler
//! drives.

use crate::core::boundary::BoundaryCondition;
use crate::core::event::{CandidateEvent, EventSource, NParticleEvent, PairEvent, ParticleEvent, PluginInfo};
use crate::core::global::Global;
use crate::core::interaction::{ContactKind, Interaction, PairContext};
use crate::core::liouvillean::{CollisionPrediction, NewtonianLiouvillean};
use crate::core::local::Local;
use crate::core::math::{add_scaled, scale, Vec3, ZERO};
use crate::core::particle::Particle;
use crate::core::species::Species;
use crate::core::system::{System, TickerSystem};
use crate::core::topology::Topology;
use crate::error::{Error, Result};
use rand::{rng, rngs::StdRng, Rng, SeedableRng};

/// Lifecycle of the registry. `add*` calls are legal strictly below
/// `Initialised`; `initialise` is the single transition into full validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SimStatus {
    /// Freshly constructed, nothing configured.
    Uninitialised,
    /// Population in progress.
    Configuring,
    /// `initialise()` has run; the registry is queryable.
    Initialised,
    /// Events have started flowing.
    Running,
}

/// The composed dynamics object.
///
/// Owns every plugin instance outright; there is no way to copy a
/// configured registry — restarts are modelled by reconstructing from
/// the persisted descriptions.
pub struct Dynamics {
    status: SimStatus,
    time_now: f64,
    particles: Vec<Particle>,
    bc: Box<dyn BoundaryCondition>,
    liouvillean: NewtonianLiouvillean,
    species: Vec<Species>,
    interactions: Vec<Box<dyn Interaction>>,
    locals: Vec<Box<dyn Local>>,
    globals: Vec<Box<dyn Global>>,
    systems: Vec<Box<dyn System>>,
    topologies: Vec<Box<dyn Topology>>,
    rng: StdRng,
}

impl Dynamics {
    /// Create an empty registry over the given boundary condition. A fixed
    /// `seed` gives reproducible stochastic events.
    pub fn new(bc: Box<dyn BoundaryCondition>, seed: Option<u64>) -> Self {
        let rng: StdRng = match seed {
            Some(s) => SeedableRng::seed_from_u64(s),
            None => SeedableRng::seed_from_u64(rng().random()),
        };
        Self {
            status: SimStatus::Uninitialised,
            time_now: 0.0,
            particles: Vec::new(),
            bc,
            liouvillean: NewtonianLiouvillean::new(),
            species: Vec::new(),
            interactions: Vec::new(),
            locals: Vec::new(),
            globals: Vec::new(),
            systems: Vec::new(),
            topologies: Vec::new(),
            rng,
        }
    }

    // ---- accessors -------------------------------------------------------

    /// Current lifecycle status.
    pub fn status(&self) -> SimStatus {
        self.status
    }

    /// Current absolute simulation time.
    pub fn time_now(&self) -> f64 {
        self.time_now
    }

    /// The owned particles, indexed by id.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// The boundary condition.
    pub fn boundary(&self) -> &dyn BoundaryCondition {
        &*self.bc
    }

    /// The propagation/collision engine.
    pub fn liouvillean(&self) -> &NewtonianLiouvillean {
        &self.liouvillean
    }

    /// Configured species, in insertion order.
    pub fn species(&self) -> &[Species] {
        &self.species
    }

    fn n_total(&self) -> u32 {
        self.particles.len() as u32
    }

    // ---- configuration ---------------------------------------------------

    fn ensure_configurable(&self, what: &str) -> Result<()> {
        if self.status >= SimStatus::Initialised {
            return Err(Error::Config(format!(
                "cannot add {what} once the registry is initialised"
            )));
        }
        Ok(())
    }

    /// Append a particle, returning its id. Ids are assigned densely in
    /// insertion order, so `particles[id].id == id` always holds.
    pub fn add_particle(&mut self, r: Vec3, v: Vec3) -> Result<u32> {
        self.ensure_configurable("a particle")?;
        let id = self.particles.len() as u32;
        self.particles.push(Particle::new(id, r, v)?);
        self.status = SimStatus::Configuring;
        Ok(id)
    }

    /// Register a species. Fails after initialisation or on a duplicate
    /// name, without mutating the registry.
    pub fn add_species(&mut self, sp: Species) -> Result<()> {
        self.ensure_configurable("a species")?;
        if self.species.iter().any(|s| s.name() == sp.name()) {
            return Err(Error::Config(format!("duplicate species '{}'", sp.name())));
        }
        self.species.push(sp);
        self.status = SimStatus::Configuring;
        Ok(())
    }

    /// Register an interaction.
    pub fn add_interaction(&mut self, inter: Box<dyn Interaction>) -> Result<()> {
        self.ensure_configurable("an interaction")?;
        if self.interactions.iter().any(|i| i.name() == inter.name()) {
            return Err(Error::Config(format!(
                "duplicate interaction '{}'",
                inter.name()
            )));
        }
        self.interactions.push(inter);
        self.status = SimStatus::Configuring;
        Ok(())
    }

    /// Register a local event source.
    pub fn add_local(&mut self, local: Box<dyn Local>) -> Result<()> {
        self.ensure_configurable("a local")?;
        if self.locals.iter().any(|l| l.name() == local.name()) {
            return Err(Error::Config(format!("duplicate local '{}'", local.name())));
        }
        self.locals.push(local);
        self.status = SimStatus::Configuring;
        Ok(())
    }

    /// Register a global event source.
    pub fn add_global(&mut self, global: Box<dyn Global>) -> Result<()> {
        self.ensure_configurable("a global")?;
        if self.globals.iter().any(|g| g.name() == global.name()) {
            return Err(Error::Config(format!(
                "duplicate global '{}'",
                global.name()
            )));
        }
        self.globals.push(global);
        self.status = SimStatus::Configuring;
        Ok(())
    }

    /// Register a system event source.
    pub fn add_system(&mut self, system: Box<dyn System>) -> Result<()> {
        self.ensure_configurable("a system")?;
        if self.systems.iter().any(|s| s.name() == system.name()) {
            return Err(Error::Config(format!(
                "duplicate system '{}'",
                system.name()
            )));
        }
        self.systems.push(system);
        self.status = SimStatus::Configuring;
        Ok(())
    }

    /// Register a topology.
    pub fn add_topology(&mut self, topo: Box<dyn Topology>) -> Result<()> {
        self.ensure_configurable("a topology")?;
        if self.topologies.iter().any(|t| t.name() == topo.name()) {
            return Err(Error::Config(format!(
                "duplicate topology '{}'",
                topo.name()
            )));
        }
        self.topologies.push(topo);
        self.status = SimStatus::Configuring;
        Ok(())
    }

    /// Install the standard periodic ticker, if not already present.
    pub fn add_system_ticker(&mut self, period: f64) -> Result<()> {
        if self.systems.iter().any(|s| s.name() == "SystemTicker") {
            return Err(Error::Config("SystemTicker already registered".into()));
        }
        self.add_system(Box::new(TickerSystem::new("SystemTicker", period)?))
    }

    // ---- initialisation --------------------------------------------------

    /// The single transition into full validity.
    ///
    /// Assigns every plugin collection its 0-based running ids, links each
    /// species to the interaction that claims it, and validates that the
    /// species ranges partition the particle set exactly. Interactions and
    /// locals are initialised before globals, which may depend on their ids.
    pub fn initialise(&mut self) -> Result<()> {
        if self.status >= SimStatus::Initialised {
            return Err(Error::Config("registry already initialised".into()));
        }
        let n_total = self.n_total();

        for (id, sp) in self.species.iter_mut().enumerate() {
            sp.initialise(id);
            let claimed = self
                .interactions
                .iter()
                .find(|i| i.claims_species(sp, n_total));
            match claimed {
                Some(inter) => sp.set_interaction(inter.name()),
                None => {
                    return Err(Error::NotFound {
                        kind: "interaction",
                        name: format!("claiming species '{}'", sp.name()),
                    })
                }
            }
        }

        self.validate_partition()?;

        for (id, inter) in self.interactions.iter_mut().enumerate() {
            inter.initialise(id);
        }
        for (id, local) in self.locals.iter_mut().enumerate() {
            local.initialise(id);
        }
        for (id, global) in self.globals.iter_mut().enumerate() {
            global.initialise(id);
        }
        for (id, system) in self.systems.iter_mut().enumerate() {
            system.initialise(id);
        }
        for (id, topo) in self.topologies.iter_mut().enumerate() {
            topo.initialise(id);
        }

        self.status = SimStatus::Initialised;
        tracing::info!(
            particles = self.particles.len(),
            species = self.species.len(),
            interactions = self.interactions.len(),
            locals = self.locals.len(),
            globals = self.globals.len(),
            systems = self.systems.len(),
            topologies = self.topologies.len(),
            "dynamics registry initialised"
        );
        Ok(())
    }

    /// Every particle must belong to exactly one species.
    fn validate_partition(&self) -> Result<()> {
        for p in &self.particles {
            let owners = self
                .species
                .iter()
                .filter(|sp| sp.range().contains(p.id))
                .count();
            if owners != 1 {
                return Err(Error::Config(format!(
                    "particle {} belongs to {} species, expected exactly 1",
                    p.id, owners
                )));
            }
        }
        Ok(())
    }

    fn ensure_initialised(&self) -> Result<()> {
        if self.status < SimStatus::Initialised {
            return Err(Error::Config("registry not initialised".into()));
        }
        Ok(())
    }

    // ---- lookups ---------------------------------------------------------

    /// Species by configured name.
    pub fn species_by_name(&self, name: &str) -> Result<&Species> {
        self.species
            .iter()
            .find(|sp| sp.name() == name)
            .ok_or_else(|| Error::NotFound {
                kind: "species",
                name: name.into(),
            })
    }

    /// The species owning particle `id`.
    pub fn species_of(&self, id: u32) -> Result<&Species> {
        self.species
            .iter()
            .find(|sp| sp.range().contains(id))
            .ok_or_else(|| Error::NotFound {
                kind: "species",
                name: format!("owning particle {id}"),
            })
    }

    /// Interaction by configured name.
    pub fn interaction_by_name(&self, name: &str) -> Result<&dyn Interaction> {
        self.interactions
            .iter()
            .find(|i| i.name() == name)
            .map(|i| &**i)
            .ok_or_else(|| Error::NotFound {
                kind: "interaction",
                name: name.into(),
            })
    }

    /// The interaction governing the unordered pair `(i, j)`.
    pub fn interaction_for_pair(&self, i: u32, j: u32) -> Result<&dyn Interaction> {
        let p1 = self.particle(i)?;
        let p2 = self.particle(j)?;
        self.interactions
            .iter()
            .find(|inter| inter.claims_pair(p1, p2))
            .map(|inter| &**inter)
            .ok_or_else(|| Error::NotFound {
                kind: "interaction",
                name: format!("claiming pair ({i}, {j})"),
            })
    }

    /// Local by configured name.
    pub fn local_by_name(&self, name: &str) -> Result<&dyn Local> {
        self.locals
            .iter()
            .find(|l| l.name() == name)
            .map(|l| &**l)
            .ok_or_else(|| Error::NotFound {
                kind: "local",
                name: name.into(),
            })
    }

    /// Global by configured name.
    pub fn global_by_name(&self, name: &str) -> Result<&dyn Global> {
        self.globals
            .iter()
            .find(|g| g.name() == name)
            .map(|g| &**g)
            .ok_or_else(|| Error::NotFound {
                kind: "global",
                name: name.into(),
            })
    }

    /// System by configured name.
    pub fn system_by_name(&self, name: &str) -> Result<&dyn System> {
        self.systems
            .iter()
            .find(|s| s.name() == name)
            .map(|s| &**s)
            .ok_or_else(|| Error::NotFound {
                kind: "system",
                name: name.into(),
            })
    }

    /// Topology by configured name.
    pub fn topology_by_name(&self, name: &str) -> Result<&dyn Topology> {
        self.topologies
            .iter()
            .find(|t| t.name() == name)
            .map(|t| &**t)
            .ok_or_else(|| Error::NotFound {
                kind: "topology",
                name: name.into(),
            })
    }

    fn particle(&self, id: u32) -> Result<&Particle> {
        self.particles
            .get(id as usize)
            .ok_or_else(|| Error::OutOfBounds(format!("particle id {id}")))
    }

    /// `(species_id, mass)` of particle `id`.
    fn species_entry(&self, id: u32) -> Result<(usize, f64)> {
        let sp = self.species_of(id)?;
        Ok((sp.id(), sp.mass_of(id)))
    }

    /// `(species_id, mass)` for every particle, indexed by id.
    fn species_table(&self) -> Result<Vec<(usize, f64)>> {
        (0..self.n_total()).map(|id| self.species_entry(id)).collect()
    }

    // ---- time evolution --------------------------------------------------

    /// Advance simulation time by `dt`: boundary geometry, the clock, and
    /// every system countdown. Particles stream lazily when next touched.
    pub fn stream(&mut self, dt: f64) -> Result<()> {
        self.ensure_initialised()?;
        self.bc.update(dt);
        self.time_now += dt;
        for system in &mut self.systems {
            system.stream(dt);
        }
        self.status = SimStatus::Running;
        Ok(())
    }

    /// A copy of particle `id` streamed to the current time, for
    /// prediction queries that must not mutate stored state.
    fn projected(&self, id: u32) -> Result<Particle> {
        let mut p = self.particle(id)?.clone();
        self.liouvillean.update_particle(&mut p, self.time_now);
        Ok(p)
    }

    // ---- candidate-event queries -----------------------------------------

    /// Next contact for the pair `(i, j)` under its governing interaction,
    /// or `None` when nothing is predicted.
    pub fn pair_candidate(&self, i: u32, j: u32) -> Result<Option<(CandidateEvent, ContactKind)>> {
        self.ensure_initialised()?;
        let inter = self.interaction_for_pair(i, j)?;
        let p1 = self.projected(i)?;
        let p2 = self.projected(j)?;
        let mut dat = CollisionPrediction::for_pair(&p1, &p2, &*self.bc);
        match inter.predict(&mut dat) {
            Some((dt, kind)) => {
                let ev = CandidateEvent::new(
                    self.time_now + dt,
                    EventSource::Interaction {
                        id: inter.id(),
                        p1: i,
                        p2: j,
                    },
                )?;
                Ok(Some((ev, kind)))
            }
            None => Ok(None),
        }
    }

    /// Candidate events for particle `i` from every local source covering
    /// it. Infinite times are skipped.
    pub fn local_candidates(&self, i: u32) -> Result<Vec<CandidateEvent>> {
        self.ensure_initialised()?;
        let p = self.projected(i)?;
        let mut out = Vec::new();
        for local in self.locals.iter().filter(|l| l.applies_to(&p)) {
            let dt = local.event_time(&p, &self.liouvillean, &*self.bc, self.time_now);
            if dt.is_finite() {
                out.push(CandidateEvent::new(
                    self.time_now + dt,
                    EventSource::Local {
                        id: local.id(),
                        p: i,
                    },
                )?);
            }
        }
        Ok(out)
    }

    /// Candidate events for particle `i` from every global source.
    pub fn global_candidates(&self, i: u32) -> Result<Vec<CandidateEvent>> {
        self.ensure_initialised()?;
        let p = self.projected(i)?;
        let mut out = Vec::new();
        for global in self.globals.iter().filter(|g| g.applies_to(&p)) {
            let dt = global.event_time(&p, &self.liouvillean, &*self.bc);
            if dt.is_finite() {
                out.push(CandidateEvent::new(
                    self.time_now + dt,
                    EventSource::Global {
                        id: global.id(),
                        p: i,
                    },
                )?);
            }
        }
        Ok(out)
    }

    /// Candidate events from every system source.
    pub fn system_candidates(&self) -> Result<Vec<CandidateEvent>> {
        self.ensure_initialised()?;
        self.systems
            .iter()
            .map(|s| {
                CandidateEvent::new(
                    self.time_now + s.time_to_event(),
                    EventSource::System { id: s.id() },
                )
            })
            .collect()
    }

    // ---- event responses -------------------------------------------------

    /// Run the `kind` contact of pair `(i, j)` at the current time.
    pub fn run_pair_event(&mut self, i: u32, j: u32, kind: ContactKind) -> Result<PairEvent> {
        self.ensure_initialised()?;
        if i == j {
            return Err(Error::InvalidParam("pair event needs two particles".into()));
        }
        let (s1, m1) = self.species_entry(i)?;
        let (s2, m2) = self.species_entry(j)?;
        let idx = {
            let p1 = self.particle(i)?;
            let p2 = self.particle(j)?;
            self.interactions
                .iter()
                .position(|inter| inter.claims_pair(p1, p2))
                .ok_or_else(|| Error::NotFound {
                    kind: "interaction",
                    name: format!("claiming pair ({i}, {j})"),
                })?
        };
        let ctx = PairContext {
            m1,
            m2,
            species1: s1,
            species2: s2,
        };

        let (lo, hi) = (i.min(j) as usize, i.max(j) as usize);
        let (head, tail) = self.particles.split_at_mut(hi);
        let (pa, pb) = (&mut head[lo], &mut tail[0]);
        let (p1, p2) = if (i as usize) < (j as usize) {
            (pa, pb)
        } else {
            (pb, pa)
        };
        self.interactions[idx].run_event(p1, p2, kind, &ctx, &self.liouvillean, &*self.bc, self.time_now)
    }

    /// Run local `local_id`'s event for particle `i` at the current time.
    pub fn run_local_event(&mut self, local_id: usize, i: u32) -> Result<ParticleEvent> {
        self.ensure_initialised()?;
        let (species_id, mass) = self.species_entry(i)?;
        if local_id >= self.locals.len() {
            return Err(Error::OutOfBounds(format!("local id {local_id}")));
        }
        let p = self
            .particles
            .get_mut(i as usize)
            .ok_or_else(|| Error::OutOfBounds(format!("particle id {i}")))?;
        self.locals[local_id].run_event(
            p,
            mass,
            species_id,
            &self.liouvillean,
            &*self.bc,
            self.time_now,
            &mut self.rng,
        )
    }

    /// Run global `global_id`'s event for particle `i` at the current time.
    pub fn run_global_event(&mut self, global_id: usize, i: u32) -> Result<ParticleEvent> {
        self.ensure_initialised()?;
        let (species_id, _) = self.species_entry(i)?;
        if global_id >= self.globals.len() {
            return Err(Error::OutOfBounds(format!("global id {global_id}")));
        }
        let p = self
            .particles
            .get_mut(i as usize)
            .ok_or_else(|| Error::OutOfBounds(format!("particle id {i}")))?;
        self.globals[global_id].run_event(p, species_id, &self.liouvillean, &*self.bc, self.time_now)
    }

    /// Fire system `system_id` at the current time.
    pub fn run_system_event(&mut self, system_id: usize) -> Result<NParticleEvent> {
        self.ensure_initialised()?;
        if system_id >= self.systems.len() {
            return Err(Error::OutOfBounds(format!("system id {system_id}")));
        }
        let table = self.species_table()?;
        let lookup = move |id: u32| table[id as usize];
        self.systems[system_id].run_event(
            &mut self.particles,
            &lookup,
            &self.liouvillean,
            &*self.bc,
            self.time_now,
            &mut self.rng,
        )
    }

    /// Rigid collision between structures `s1` and `s2` of a topology.
    pub fn run_structure_collision(
        &mut self,
        topology_id: usize,
        s1: usize,
        s2: usize,
    ) -> Result<NParticleEvent> {
        self.ensure_initialised()?;
        let (ids1, ids2) = self.structure_pair(topology_id, s1, s2)?;
        let table = self.species_table()?;
        let lookup = move |id: u32| table[id as usize];
        Ok(self.liouvillean.multibody_collision(
            &mut self.particles,
            &ids1,
            &ids2,
            &lookup,
            &*self.bc,
            self.time_now,
        ))
    }

    /// Rigid well crossing between structures `s1` and `s2`, exchanging
    /// `delta_ke` of kinetic energy (bounce-substituted when unaffordable).
    pub fn run_structure_well_event(
        &mut self,
        topology_id: usize,
        s1: usize,
        s2: usize,
        delta_ke: f64,
    ) -> Result<NParticleEvent> {
        self.ensure_initialised()?;
        let (ids1, ids2) = self.structure_pair(topology_id, s1, s2)?;
        let table = self.species_table()?;
        let lookup = move |id: u32| table[id as usize];
        Ok(self.liouvillean.multibody_well_event(
            &mut self.particles,
            &ids1,
            &ids2,
            delta_ke,
            &lookup,
            &*self.bc,
            self.time_now,
        ))
    }

    fn structure_pair(
        &self,
        topology_id: usize,
        s1: usize,
        s2: usize,
    ) -> Result<(Vec<u32>, Vec<u32>)> {
        let topo = self
            .topologies
            .get(topology_id)
            .ok_or_else(|| Error::OutOfBounds(format!("topology id {topology_id}")))?;
        let n = self.n_total();
        let get = |idx: usize| -> Result<Vec<u32>> {
            topo.structures()
                .get(idx)
                .map(|r| r.ids(n))
                .ok_or_else(|| Error::OutOfBounds(format!("structure index {idx}")))
        };
        let ids1 = get(s1)?;
        let ids2 = get(s2)?;
        if ids1.is_empty() || ids2.is_empty() {
            return Err(Error::Config("rigid structure has no members".into()));
        }
        Ok((ids1, ids2))
    }

    // ---- global invariants & diagnostics ---------------------------------

    /// Volume of the primary simulation cell.
    pub fn sim_volume(&self) -> f64 {
        self.bc.cell_size().iter().product()
    }

    /// Particle number density `N / V`.
    pub fn number_density(&self) -> f64 {
        self.particles.len() as f64 / self.sim_volume()
    }

    /// Fraction of the cell volume excluded by particle cores.
    pub fn packing_fraction(&self) -> Result<f64> {
        let mut occupied = 0.0;
        for sp in &self.species {
            let inter_name = sp.interaction().ok_or_else(|| {
                Error::Config(format!("species '{}' has no linked interaction", sp.name()))
            })?;
            let inter = self.interaction_by_name(inter_name)?;
            for id in sp.range().ids(self.n_total()) {
                occupied += inter.excluded_volume(id);
            }
        }
        Ok(occupied / self.sim_volume())
    }

    /// Total kinetic energy. Sentinel-infinite masses contribute nothing.
    pub fn kinetic_energy(&self) -> Result<f64> {
        let mut ke = 0.0;
        for p in &self.particles {
            let (_, mass) = self.species_entry(p.id)?;
            ke += p.kinetic_energy(mass);
        }
        Ok(ke)
    }

    /// Total potential energy stored in captured well pairs.
    pub fn internal_energy(&self) -> f64 {
        self.interactions
            .iter()
            .map(|i| i.internal_energy(&self.particles, &*self.bc))
            .sum()
    }

    /// Kinetic plus internal energy.
    pub fn total_energy(&self) -> Result<f64> {
        Ok(self.kinetic_energy()? + self.internal_energy())
    }

    /// Largest centre separation at which any interaction can act.
    pub fn longest_interaction(&self) -> f64 {
        self.interactions
            .iter()
            .map(|i| i.max_interaction_distance())
            .fold(0.0, f64::max)
    }

    /// Shift every movable particle's velocity so the centre-of-mass
    /// velocity equals `target`.
    pub fn set_com_velocity(&mut self, target: Vec3) -> Result<()> {
        let mut total_mass = 0.0;
        let mut momentum = ZERO;
        for p in &self.particles {
            let (_, mass) = self.species_entry(p.id)?;
            if mass > 0.0 {
                total_mass += mass;
                add_scaled(&mut momentum, &p.v, mass);
            }
        }
        if total_mass == 0.0 {
            return Err(Error::Config(
                "no movable particles to shift the centre of mass".into(),
            ));
        }
        let com = scale(&momentum, 1.0 / total_mass);
        for p in &mut self.particles {
            for k in 0..3 {
                p.v[k] += target[k] - com[k];
            }
        }
        Ok(())
    }

    /// Scan every claimed pair and every local surface for hard-core
    /// violations, warning per offender. Returns the number found.
    pub fn overlap_test(&self) -> Result<usize> {
        self.ensure_initialised()?;
        let mut found = 0usize;
        let n = self.particles.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let p1 = self.projected(i as u32)?;
                let p2 = self.projected(j as u32)?;
                let Some(inter) = self.interactions.iter().find(|x| x.claims_pair(&p1, &p2))
                else {
                    continue;
                };
                let dat = CollisionPrediction::for_pair(&p1, &p2, &*self.bc);
                if inter.overlapping(&dat) {
                    tracing::warn!(
                        p1 = p1.id,
                        p2 = p2.id,
                        interaction = inter.name(),
                        separation = dat.r2.sqrt(),
                        "hard-core overlap detected"
                    );
                    found += 1;
                }
            }
            let p = self.projected(i as u32)?;
            for local in self.locals.iter().filter(|l| l.applies_to(&p)) {
                if local.check_overlap(&p, &*self.bc) {
                    tracing::warn!(
                        particle = p.id,
                        local = local.name(),
                        "boundary penetration detected"
                    );
                    found += 1;
                }
            }
        }
        Ok(found)
    }

    /// Descriptions of every configured object, enough for the persistence
    /// collaborator to reconstruct the registry identically.
    pub fn describe_all(&self) -> Vec<PluginInfo> {
        let mut out = vec![self.bc.describe()];
        out.extend(self.species.iter().map(|s| s.describe()));
        out.extend(self.interactions.iter().map(|i| i.describe()));
        out.extend(self.locals.iter().map(|l| l.describe()));
        out.extend(self.globals.iter().map(|g| g.describe()));
        out.extend(self.systems.iter().map(|s| s.describe()));
        out.extend(self.topologies.iter().map(|t| t.describe()));
        out
    }
}
