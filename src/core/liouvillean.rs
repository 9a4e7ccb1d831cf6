//! The Newtonian Liouvillean: ballistic propagation plus the analytic
//! collision-time and collision-response algebra for every supported
//! contact geometry.
//!
//! Prediction routines are pure: they fill a [`CollisionPrediction`] and
//! report success with a `bool` or a `dt` (with `f64::INFINITY` meaning
//! "no event"). NaN results from degenerate algebra are mapped to
//! "no event" rather than propagated. Response routines take the involved
//! particles by exclusive mutable reference, force them current with
//! `update_particle` first, mutate velocities, and return an event record
//! whose ΔKE is computed from the actual post-update velocities.

use crate::core::boundary::BoundaryCondition;
use crate::core::event::{EventType, NParticleEvent, PairEvent, ParticleEvent};
use crate::core::math::{add_scaled, dot, largest_axis, norm_sq, scale, sub, Rotation, Vec3, ZERO};
use crate::core::particle::{Particle, DIM};
use crate::core::species::INFINITE_MASS;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;

/// Transient per-pair scratch record for a collision-time query.
///
/// Holds the relative kinematics already expressed in the
/// boundary-corrected frame; created fresh per prediction, never persisted.
#[derive(Debug, Clone)]
pub struct CollisionPrediction {
    /// Relative position `r1 − r2`.
    pub rij: Vec3,
    /// Relative velocity `v1 − v2`.
    pub vij: Vec3,
    /// `|rij|²`.
    pub r2: f64,
    /// `|vij|²`.
    pub v2: f64,
    /// `rij · vij`.
    pub rvdot: f64,
    /// Time to contact, written by the root functions.
    pub dt: f64,
}

impl CollisionPrediction {
    /// Build from pre-corrected relative kinematics.
    pub fn new(rij: Vec3, vij: Vec3) -> Self {
        Self {
            rij,
            vij,
            r2: norm_sq(&rij),
            v2: norm_sq(&vij),
            rvdot: dot(&rij, &vij),
            dt: f64::INFINITY,
        }
    }

    /// Build for a particle pair, applying the boundary condition to the
    /// relative vectors first.
    pub fn for_pair(p1: &Particle, p2: &Particle, bc: &dyn BoundaryCondition) -> Self {
        let mut rij = sub(&p1.r, &p2.r);
        let mut vij = sub(&p1.v, &p2.v);
        bc.apply_bc(&mut rij, &mut vij);
        Self::new(rij, vij)
    }
}

/// Per-pair mass factors with the infinite-mass sentinel resolved.
///
/// Returns `(mu, inv1, inv2, both_fixed)`: the reduced mass to use in the
/// impulse, the inverse masses to apply it with (zero for an immovable
/// side), and whether both sides are immovable (impulse must be zeroed).
fn mass_factors(m1: f64, m2: f64) -> (f64, f64, f64, bool) {
    match (m1 == INFINITE_MASS, m2 == INFINITE_MASS) {
        // Masses treated as equal for the geometry, impulse zeroed by caller.
        (true, true) => (0.5, 0.0, 0.0, true),
        (true, false) => (m2, 0.0, 1.0 / m2, false),
        (false, true) => (m1, 1.0 / m1, 0.0, false),
        (false, false) => (m1 * m2 / (m1 + m2), 1.0 / m1, 1.0 / m2, false),
    }
}

/// Ballistic (event-free) Newtonian propagation and hard-particle
/// collision algebra.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewtonianLiouvillean;

impl NewtonianLiouvillean {
    /// Create the Newtonian Liouvillean.
    pub fn new() -> Self {
        Self
    }

    // ---- propagation -----------------------------------------------------

    /// Advance a particle's position by `v · dt`. No effect on velocity or
    /// on the update timestamp; use [`Self::update_particle`] to bring a
    /// particle current.
    #[inline]
    pub fn stream_particle(&self, p: &mut Particle, dt: f64) {
        add_scaled(&mut p.r, &p.v, dt);
    }

    /// Stream `p` to absolute time `now` and stamp it current.
    ///
    /// Response routines call this first; reading or writing a stale
    /// velocity is a correctness bug.
    #[inline]
    pub fn update_particle(&self, p: &mut Particle, now: f64) {
        let dt = now - p.last_update_time;
        if dt != 0.0 {
            self.stream_particle(p, dt);
        }
        p.last_update_time = now;
    }

    /// Bring both members of a pair current.
    #[inline]
    pub fn update_particle_pair(&self, p1: &mut Particle, p2: &mut Particle, now: f64) {
        self.update_particle(p1, now);
        self.update_particle(p2, now);
    }

    /// Bring every particle current.
    pub fn update_all(&self, particles: &mut [Particle], now: f64) {
        for p in particles {
            self.update_particle(p, now);
        }
    }

    // ---- collision-time prediction ---------------------------------------

    /// First contact of two approaching spheres at squared contact
    /// distance `d2`: smaller positive root of `|rij + dt·vij|² = d²`.
    ///
    /// Uses the numerically stable form
    /// `dt = (d² − r²) / (rv − √(rv² − v²(r² − d²)))`, avoiding the
    /// catastrophic cancellation of the naive quadratic formula. Returns
    /// false for non-approaching pairs (`rv ≥ 0`) or a non-positive
    /// discriminant.
    pub fn sphere_sphere_in_root(&self, dat: &mut CollisionPrediction, d2: f64) -> bool {
        if dat.rvdot < 0.0 {
            let arg = dat.rvdot * dat.rvdot - dat.v2 * (dat.r2 - d2);
            if arg > 0.0 {
                dat.dt = (d2 - dat.r2) / (dat.rvdot - arg.sqrt());
                debug_assert!(!dat.dt.is_nan(), "sphere in-root produced NaN");
                true
            } else {
                false
            }
        } else {
            false
        }
    }

    /// Exit root of a well/shoulder at squared boundary distance `d2`.
    ///
    /// A NaN root means the pair is not moving apart; it maps to
    /// `dt = +∞` and failure rather than propagating.
    pub fn sphere_sphere_out_root(&self, dat: &mut CollisionPrediction, d2: f64) -> bool {
        dat.dt = ((dat.rvdot * dat.rvdot - dat.v2 * (dat.r2 - d2)).sqrt() - dat.rvdot) / dat.v2;
        if dat.dt.is_nan() {
            dat.dt = f64::INFINITY;
            false
        } else {
            true
        }
    }

    /// True when the pair currently overlaps the squared distance `d2`.
    #[inline]
    pub fn sphere_overlap(&self, dat: &CollisionPrediction, d2: f64) -> bool {
        (dat.r2 - d2) < 0.0
    }

    /// Entry time for two parallel cubes with per-axis contact distance `d`
    /// (the edge length, for equal cubes), optionally in a rotated frame.
    ///
    /// Per-axis entry/exit times are `(−rij ± d)/vij`; the true entry is
    /// the max of entries, the exit the min of exits, and contact requires
    /// entry < exit. Fast reject: the axis of largest separation must be
    /// shrinking, else no approach is possible.
    pub fn cube_cube_in_root(
        &self,
        dat: &mut CollisionPrediction,
        d: f64,
        rot: Option<&Rotation>,
    ) -> bool {
        let (r, v) = match rot {
            Some(m) => (m.apply(&dat.rij), m.apply(&dat.vij)),
            None => (dat.rij, dat.vij),
        };

        let widest = largest_axis(&r);
        if r[widest] * v[widest] >= 0.0 {
            return false;
        }

        let mut t_entry = f64::NEG_INFINITY;
        let mut t_exit = f64::INFINITY;
        for k in 0..DIM {
            if v[k] == 0.0 {
                if r[k].abs() >= d {
                    return false;
                }
                continue;
            }
            let t1 = (-r[k] - d) / v[k];
            let t2 = (-r[k] + d) / v[k];
            let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
            if lo > t_entry {
                t_entry = lo;
            }
            if hi < t_exit {
                t_exit = hi;
            }
        }

        if t_entry < t_exit && t_entry > 0.0 {
            dat.dt = t_entry;
            true
        } else {
            false
        }
    }

    /// Time until `part` reaches the static plane through `wall_loc` with
    /// unit normal `wall_norm`, or `+∞` when receding.
    pub fn wall_collision_time(
        &self,
        part: &Particle,
        wall_loc: &Vec3,
        wall_norm: &Vec3,
        bc: &dyn BoundaryCondition,
    ) -> f64 {
        let mut rij = part.r;
        let mut vel = part.v;
        bc.apply_bc(&mut rij, &mut vel);

        let rvdot = dot(&vel, wall_norm);
        let rij = sub(&rij, wall_loc);

        if rvdot < 0.0 {
            -(dot(&rij, wall_norm) / rvdot)
        } else {
            f64::INFINITY
        }
    }

    /// Time until `part` contacts a static spherical shell of `radius`
    /// centred at `center`. `inside` selects the exit root (particle
    /// confined within the shell) versus the approach root.
    pub fn sphere_shell_time(
        &self,
        part: &Particle,
        center: &Vec3,
        radius: f64,
        inside: bool,
        bc: &dyn BoundaryCondition,
    ) -> f64 {
        let mut rij = sub(&part.r, center);
        let mut vij = part.v;
        bc.apply_bc(&mut rij, &mut vij);
        let mut dat = CollisionPrediction::new(rij, vij);
        let hit = if inside {
            self.sphere_sphere_out_root(&mut dat, radius * radius)
        } else {
            self.sphere_sphere_in_root(&mut dat, radius * radius)
        };
        if hit {
            dat.dt
        } else {
            f64::INFINITY
        }
    }

    /// Time until `part` contacts an infinite cylinder wall of `radius`
    /// about the axis through `origin` with unit direction `axis`. The
    /// axial component is projected out and the sphere algebra applied in
    /// the transverse plane; confinement side is inferred from the current
    /// transverse separation.
    pub fn cylinder_wall_time(
        &self,
        part: &Particle,
        origin: &Vec3,
        axis: &Vec3,
        radius: f64,
        bc: &dyn BoundaryCondition,
    ) -> f64 {
        let mut rij = sub(&part.r, origin);
        let mut vij = part.v;
        bc.apply_bc(&mut rij, &mut vij);

        let mut r_perp = rij;
        add_scaled(&mut r_perp, axis, -dot(&rij, axis));
        let mut v_perp = vij;
        add_scaled(&mut v_perp, axis, -dot(&vij, axis));

        let mut dat = CollisionPrediction::new(r_perp, v_perp);
        let inside = dat.r2 < radius * radius;
        let hit = if inside {
            self.sphere_sphere_out_root(&mut dat, radius * radius)
        } else {
            self.sphere_sphere_in_root(&mut dat, radius * radius)
        };
        if hit {
            dat.dt
        } else {
            f64::INFINITY
        }
    }

    /// Time until `part` exits the axis-aligned cell at `origin` with edge
    /// lengths `width` (minimum over axes of the per-axis exit time).
    pub fn square_cell_time(
        &self,
        part: &Particle,
        origin: &Vec3,
        width: &Vec3,
        bc: &dyn BoundaryCondition,
    ) -> f64 {
        let mut rpos = sub(&part.r, origin);
        let mut vel = part.v;
        bc.apply_bc(&mut rpos, &mut vel);

        let mut ret = f64::INFINITY;
        for k in 0..DIM {
            if vel[k] == 0.0 {
                continue;
            }
            let t = if vel[k] < 0.0 {
                -rpos[k] / vel[k]
            } else {
                (width[k] - rpos[k]) / vel[k]
            };
            if t < ret {
                ret = t;
            }
        }
        ret
    }

    /// Axis along which `part` exits the cell first (companion to
    /// [`Self::square_cell_time`]).
    pub fn square_cell_axis(
        &self,
        part: &Particle,
        origin: &Vec3,
        width: &Vec3,
        bc: &dyn BoundaryCondition,
    ) -> usize {
        let mut rpos = sub(&part.r, origin);
        let mut vel = part.v;
        bc.apply_bc(&mut rpos, &mut vel);

        let mut best_axis = 0usize;
        let mut best_t = f64::INFINITY;
        for k in 0..DIM {
            if vel[k] == 0.0 {
                continue;
            }
            let t = if vel[k] < 0.0 {
                -rpos[k] / vel[k]
            } else {
                (width[k] - rpos[k]) / vel[k]
            };
            if t < best_t {
                best_t = t;
                best_axis = k;
            }
        }
        best_axis
    }

    /// Time until a particle could have travelled far enough for the
    /// minimum-image convention to miss an interaction of maximum reach
    /// `l_max` (the PBC wraparound guard).
    pub fn pbc_sentinel_time(&self, part: &Particle, l_max: f64, bc: &dyn BoundaryCondition) -> f64 {
        debug_assert!(
            part.v.iter().any(|&c| c != 0.0),
            "sentinel time queried for a motionless particle"
        );
        let mut pos = part.r;
        let mut vel = part.v;
        bc.apply_bc(&mut pos, &mut vel);

        let cell = bc.cell_size();
        let mut ret = f64::INFINITY;
        for k in 0..DIM {
            if vel[k] == 0.0 {
                continue;
            }
            let t = (0.5 * cell[k] - l_max) / vel[k].abs();
            if t < ret {
                ret = t;
            }
        }
        ret
    }

    // ---- collision response ----------------------------------------------

    /// Specular/inelastic reflection off a wall with unit normal `norm` and
    /// restitution `e`.
    pub fn run_wall_collision(
        &self,
        part: &mut Particle,
        norm: &Vec3,
        e: f64,
        mass: f64,
        species_id: usize,
        now: f64,
    ) -> ParticleEvent {
        self.update_particle(part, now);

        let record = ParticleEvent::capture(part, species_id, EventType::Wall);
        let vdotn = dot(norm, &part.v);
        add_scaled(&mut part.v, norm, -(1.0 + e) * vdotn);
        record.finalise(part, mass)
    }

    /// Thermal (Andersen) wall re-emission at temperature `T = sqrt_t²`:
    /// the particle leaves with a fresh Gaussian velocity whose wall-normal
    /// component is replaced by a flux-weighted draw directed off the wall.
    pub fn run_andersen_wall_collision(
        &self,
        part: &mut Particle,
        norm: &Vec3,
        sqrt_t: f64,
        mass: f64,
        species_id: usize,
        now: f64,
        rng: &mut StdRng,
    ) -> ParticleEvent {
        self.update_particle(part, now);

        let record = ParticleEvent::capture(part, species_id, EventType::Wall);
        for k in 0..DIM {
            let n: f64 = rng.sample(StandardNormal);
            part.v[k] = n * sqrt_t;
        }
        let u: f64 = rng.random();
        let flux = sqrt_t * (-2.0 * (1.0 - u).ln() / mass).sqrt();
        let vdotn = dot(&part.v, norm);
        add_scaled(&mut part.v, norm, -(vdotn + flux));
        record.finalise(part, mass)
    }

    /// Full thermal re-draw of the particle's velocity at temperature
    /// `T = sqrt_t²` (Andersen thermostat kick).
    pub fn random_gaussian_event(
        &self,
        part: &mut Particle,
        sqrt_t: f64,
        mass: f64,
        species_id: usize,
        now: f64,
        rng: &mut StdRng,
    ) -> ParticleEvent {
        self.update_particle(part, now);

        let record = ParticleEvent::capture(part, species_id, EventType::Gaussian);
        if mass == INFINITE_MASS {
            // An immovable particle cannot be thermostatted.
            return record.finalise(part, mass);
        }
        let factor = sqrt_t / mass.sqrt();
        for k in 0..DIM {
            let n: f64 = rng.sample(StandardNormal);
            part.v[k] = n * factor;
        }
        record.finalise(part, mass)
    }

    /// Hard-core collision of two smooth spheres with restitution `e`.
    ///
    /// Standard reduced-mass impulse
    /// `dP = rij (1+e) μ (rij·vij) / |rij|²`, with the infinite-mass
    /// sentinel special-cased: an immovable side absorbs no impulse, and
    /// when both sides are immovable the impulse is zeroed outright.
    #[allow(clippy::too_many_arguments)]
    pub fn smooth_spheres_coll(
        &self,
        p1: &mut Particle,
        p2: &mut Particle,
        m1: f64,
        m2: f64,
        species1: usize,
        species2: usize,
        e: f64,
        event_type: EventType,
        bc: &dyn BoundaryCondition,
        now: f64,
    ) -> PairEvent {
        self.update_particle_pair(p1, p2, now);

        let mut record = PairEvent::capture(p1, p2, species1, species2, event_type);
        bc.apply_bc(&mut record.rij, &mut record.vij_old);

        let (mu, inv1, inv2, both_fixed) = mass_factors(m1, m2);

        record.rvdot = dot(&record.rij, &record.vij_old);
        record.impulse = if both_fixed {
            ZERO
        } else {
            scale(
                &record.rij,
                (1.0 + e) * mu * record.rvdot / norm_sq(&record.rij),
            )
        };

        add_scaled(&mut p1.v, &record.impulse, -inv1);
        add_scaled(&mut p2.v, &record.impulse, inv2);

        record.finalise(p1, p2, m1, m2)
    }

    /// Square-well boundary crossing with requested kinetic-energy change
    /// `delta_ke`. Solves `rv² + 2R²ΔKE/μ` for the post-event radial
    /// velocity; if `ΔKE < 0` and the discriminant is negative the pair
    /// cannot escape and a reflective `Bounce` is substituted. The root
    /// branch is chosen by the sign of `rv` so nearly-equal quantities are
    /// never subtracted. `ΔKE == 0` short-circuits to a zero-impulse
    /// `Virtual` event.
    #[allow(clippy::too_many_arguments)]
    pub fn sphere_well_event(
        &self,
        p1: &mut Particle,
        p2: &mut Particle,
        m1: f64,
        m2: f64,
        species1: usize,
        species2: usize,
        delta_ke: f64,
        bc: &dyn BoundaryCondition,
        now: f64,
    ) -> PairEvent {
        self.update_particle_pair(p1, p2, now);

        let tag = if delta_ke < 0.0 {
            EventType::WellKeDown
        } else {
            EventType::WellKeUp
        };
        let mut record = PairEvent::capture(p1, p2, species1, species2, tag);
        bc.apply_bc(&mut record.rij, &mut record.vij_old);
        record.rvdot = dot(&record.rij, &record.vij_old);

        if delta_ke == 0.0 {
            record.set_type(EventType::Virtual);
            return record.finalise(p1, p2, m1, m2);
        }

        let (mu, inv1, inv2, both_fixed) = mass_factors(m1, m2);
        let r2 = norm_sq(&record.rij);
        let sqrt_arg = record.rvdot * record.rvdot + 2.0 * r2 * delta_ke / mu;

        if delta_ke < 0.0 && sqrt_arg < 0.0 {
            // The pair cannot afford to leave the well; reflect instead.
            tracing::debug!(p1 = p1.id, p2 = p2.id, "well exit refused, bouncing");
            record.set_type(EventType::Bounce);
            record.impulse = scale(&record.rij, 2.0 * mu * record.rvdot / r2);
        } else if record.rvdot < 0.0 {
            record.impulse = scale(
                &record.rij,
                2.0 * delta_ke / (sqrt_arg.sqrt() - record.rvdot),
            );
        } else {
            record.impulse = scale(
                &record.rij,
                -2.0 * delta_ke / (record.rvdot + sqrt_arg.sqrt()),
            );
        }

        if both_fixed {
            record.impulse = ZERO;
        }
        debug_assert!(
            !record.impulse[0].is_nan(),
            "NaN impulse in square-well event"
        );

        add_scaled(&mut p1.v, &record.impulse, -inv1);
        add_scaled(&mut p2.v, &record.impulse, inv2);

        record.finalise(p1, p2, m1, m2)
    }

    /// Parallel-cube collision: the contact normal is the axis of largest
    /// relative separation (in the optionally rotated frame), and the
    /// reduced-mass impulse law is applied along that single axis.
    #[allow(clippy::too_many_arguments)]
    pub fn parallel_cube_coll(
        &self,
        p1: &mut Particle,
        p2: &mut Particle,
        m1: f64,
        m2: f64,
        species1: usize,
        species2: usize,
        e: f64,
        rot: Option<&Rotation>,
        bc: &dyn BoundaryCondition,
        now: f64,
    ) -> PairEvent {
        self.update_particle_pair(p1, p2, now);

        let mut record = PairEvent::capture(p1, p2, species1, species2, EventType::Core);
        bc.apply_bc(&mut record.rij, &mut record.vij_old);

        let (r, v) = match rot {
            Some(m) => (m.apply(&record.rij), m.apply(&record.vij_old)),
            None => (record.rij, record.vij_old),
        };
        let axis = largest_axis(&r);

        let (mu, inv1, inv2, both_fixed) = mass_factors(m1, m2);

        let mut dp_body = ZERO;
        dp_body[axis] = (1.0 + e) * mu * v[axis];
        record.rvdot = r[axis] * v[axis];
        record.impulse = if both_fixed {
            ZERO
        } else {
            match rot {
                Some(m) => m.apply_inverse(&dp_body),
                None => dp_body,
            }
        };

        add_scaled(&mut p1.v, &record.impulse, -inv1);
        add_scaled(&mut p2.v, &record.impulse, inv2);

        record.finalise(p1, p2, m1, m2)
    }

    /// DSMC candidate-pair acceptance test: rejection sampling against a
    /// running maximum-probability estimate. `prob = factor · (−rv)`; the
    /// pair is accepted when `prob > U(0,1) · maxprob`, and `maxprob` is
    /// ratcheted upward whenever a larger `prob` is seen.
    pub fn dsmc_spheres_test(
        &self,
        p1: &Particle,
        p2: &Particle,
        maxprob: &mut f64,
        factor: f64,
        pdat: &mut CollisionPrediction,
        rng: &mut StdRng,
    ) -> bool {
        pdat.vij = sub(&p1.v, &p2.v);
        pdat.rvdot = dot(&pdat.rij, &pdat.vij);

        if pdat.rvdot > 0.0 {
            return false;
        }

        let prob = factor * (-pdat.rvdot);
        if prob > *maxprob {
            *maxprob = prob;
        }

        prob > rng.random::<f64>() * *maxprob
    }

    /// Response for an accepted DSMC pair: the ordinary reduced-mass
    /// impulse along the sampled `rij` of `pdat`.
    #[allow(clippy::too_many_arguments)]
    pub fn dsmc_spheres_run(
        &self,
        p1: &mut Particle,
        p2: &mut Particle,
        m1: f64,
        m2: f64,
        species1: usize,
        species2: usize,
        e: f64,
        pdat: &CollisionPrediction,
        now: f64,
    ) -> PairEvent {
        self.update_particle_pair(p1, p2, now);

        let mut record = PairEvent::capture(p1, p2, species1, species2, EventType::Core);
        record.rij = pdat.rij;
        record.vij_old = pdat.vij;
        record.rvdot = pdat.rvdot;

        let (mu, inv1, inv2, both_fixed) = mass_factors(m1, m2);
        record.impulse = if both_fixed {
            ZERO
        } else {
            scale(
                &record.rij,
                (1.0 + e) * mu * record.rvdot / norm_sq(&record.rij),
            )
        };

        add_scaled(&mut p1.v, &record.impulse, -inv1);
        add_scaled(&mut p2.v, &record.impulse, inv2);

        record.finalise(p1, p2, m1, m2)
    }

    /// Rigid multibody collision between two particle ranges: each range is
    /// collapsed to a mass-weighted synthetic body, the two-body impulse
    /// law applied between the synthetic bodies with restitution fixed at
    /// 1, and `∓dP/structureMass` distributed back onto every member.
    ///
    /// `particles` must be indexed by id (`particles[i].id == i`), which
    /// the registry guarantees. `lookup` maps a particle id to its
    /// `(species_id, mass)`.
    pub fn multibody_collision(
        &self,
        particles: &mut [Particle],
        range1: &[u32],
        range2: &[u32],
        lookup: &dyn Fn(u32) -> (usize, f64),
        bc: &dyn BoundaryCondition,
        now: f64,
    ) -> NParticleEvent {
        let (com1, com2) = self.aggregate_bodies(particles, range1, range2, lookup, bc, now);

        let mut rij = sub(&com1.pos, &com2.pos);
        let mut vij = sub(&com1.vel, &com2.vel);
        bc.apply_bc(&mut rij, &mut vij);
        let rvdot = dot(&rij, &vij);

        let mu = com1.mass * com2.mass / (com1.mass + com2.mass);

        // Rigid structures always collide elastically.
        const E: f64 = 1.0;
        let dp = scale(&rij, (1.0 + E) * mu * rvdot / norm_sq(&rij));

        self.distribute_impulse(
            particles,
            range1,
            range2,
            &com1,
            &com2,
            &dp,
            EventType::Core,
            lookup,
        )
    }

    /// Multibody analogue of [`Self::sphere_well_event`]: the synthetic
    /// two-body well crossing, with the `Bounce` substitution when the
    /// structures cannot afford the requested `delta_ke`.
    pub fn multibody_well_event(
        &self,
        particles: &mut [Particle],
        range1: &[u32],
        range2: &[u32],
        delta_ke: f64,
        lookup: &dyn Fn(u32) -> (usize, f64),
        bc: &dyn BoundaryCondition,
        now: f64,
    ) -> NParticleEvent {
        let (com1, com2) = self.aggregate_bodies(particles, range1, range2, lookup, bc, now);

        let mut rij = sub(&com1.pos, &com2.pos);
        let mut vij = sub(&com1.vel, &com2.vel);
        bc.apply_bc(&mut rij, &mut vij);
        let rvdot = dot(&rij, &vij);

        let mu = com1.mass * com2.mass / (com1.mass + com2.mass);
        let r2 = norm_sq(&rij);
        let sqrt_arg = rvdot * rvdot + 2.0 * r2 * delta_ke / mu;

        let (dp, tag) = if delta_ke < 0.0 && sqrt_arg < 0.0 {
            (scale(&rij, 2.0 * mu * rvdot / r2), EventType::Bounce)
        } else {
            let tag = if delta_ke < 0.0 {
                EventType::WellKeDown
            } else {
                EventType::WellKeUp
            };
            let dp = if rvdot < 0.0 {
                scale(&rij, 2.0 * delta_ke / (sqrt_arg.sqrt() - rvdot))
            } else {
                scale(&rij, -2.0 * delta_ke / (rvdot + sqrt_arg.sqrt()))
            };
            (dp, tag)
        };

        self.distribute_impulse(particles, range1, range2, &com1, &com2, &dp, tag, lookup)
    }

    fn aggregate_bodies(
        &self,
        particles: &mut [Particle],
        range1: &[u32],
        range2: &[u32],
        lookup: &dyn Fn(u32) -> (usize, f64),
        bc: &dyn BoundaryCondition,
        now: f64,
    ) -> (SyntheticBody, SyntheticBody) {
        let collect = |ids: &[u32], particles: &mut [Particle]| {
            let mut body = SyntheticBody::default();
            for &id in ids {
                let p = &mut particles[id as usize];
                self.update_particle(p, now);
                let (_, mass) = lookup(id);

                let mut pos = p.r;
                let mut vel = p.v;
                bc.apply_bc(&mut pos, &mut vel);

                body.mass += mass;
                add_scaled(&mut body.pos, &pos, mass);
                add_scaled(&mut body.vel, &vel, mass);
            }
            body.pos = scale(&body.pos, 1.0 / body.mass);
            body.vel = scale(&body.vel, 1.0 / body.mass);
            body
        };
        let b1 = collect(range1, particles);
        let b2 = collect(range2, particles);
        (b1, b2)
    }

    #[allow(clippy::too_many_arguments)]
    fn distribute_impulse(
        &self,
        particles: &mut [Particle],
        range1: &[u32],
        range2: &[u32],
        com1: &SyntheticBody,
        com2: &SyntheticBody,
        dp: &Vec3,
        tag: EventType,
        lookup: &dyn Fn(u32) -> (usize, f64),
    ) -> NParticleEvent {
        let mut out = NParticleEvent::new(tag);
        for &id in range1 {
            let p = &mut particles[id as usize];
            let (species_id, mass) = lookup(id);
            let ev = ParticleEvent::capture(p, species_id, tag);
            add_scaled(&mut p.v, dp, -1.0 / com1.mass);
            out.push(ev.finalise(p, mass));
        }
        for &id in range2 {
            let p = &mut particles[id as usize];
            let (species_id, mass) = lookup(id);
            let ev = ParticleEvent::capture(p, species_id, tag);
            add_scaled(&mut p.v, dp, 1.0 / com2.mass);
            out.push(ev.finalise(p, mass));
        }
        out
    }
}

/// Mass-weighted centre-of-mass aggregate of one particle range.
#[derive(Debug, Clone, Copy, Default)]
struct SyntheticBody {
    pos: Vec3,
    vel: Vec3,
    mass: f64,
}
