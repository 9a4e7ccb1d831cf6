//! Conservation-law and edge-case properties of the collision algebra,
//! checked over randomly sampled kinematics.

use edmd::core::boundary::OpenBoundary;
use edmd::core::event::EventType;
use edmd::core::liouvillean::{CollisionPrediction, NewtonianLiouvillean};
use edmd::core::math::{add_scaled, dot, norm_sq, scale, sub, Vec3};
use edmd::core::particle::Particle;
use edmd::core::species::INFINITE_MASS;
use edmd::error::Result;
use proptest::prelude::*;

fn open_bc() -> OpenBoundary {
    OpenBoundary::new([1000.0, 1000.0, 1000.0]).expect("valid cell")
}

fn vec3(lo: f64, hi: f64) -> impl Strategy<Value = Vec3> {
    prop::array::uniform3(lo..hi)
}

/// Place two particles exactly at contact (separation `d` along `n`) with
/// the given velocities.
fn contact_pair(n: &Vec3, d: f64, v1: Vec3, v2: Vec3) -> (Particle, Particle) {
    let p1 = Particle::new(0, scale(n, 0.5 * d), v1).expect("valid particle");
    let p2 = Particle::new(1, scale(n, -0.5 * d), v2).expect("valid particle");
    (p1, p2)
}

fn momentum(p1: &Particle, p2: &Particle, m1: f64, m2: f64) -> Vec3 {
    let mut out = [0.0; 3];
    add_scaled(&mut out, &p1.v, m1);
    add_scaled(&mut out, &p2.v, m2);
    out
}

proptest! {
    /// Non-approaching pairs (`rij · vij >= 0`) never produce an entry root.
    #[test]
    fn non_approaching_pairs_never_collide(
        rij in vec3(-5.0, 5.0),
        vij in vec3(-3.0, 3.0),
    ) {
        let mut dat = CollisionPrediction::new(rij, vij);
        prop_assume!(dat.rvdot >= 0.0);
        let liou = NewtonianLiouvillean::new();
        prop_assert!(!liou.sphere_sphere_in_root(&mut dat, 1.0));
        prop_assert!(dat.dt.is_infinite());
    }

    /// Elastic (`e = 1`) two-body collisions conserve momentum and kinetic
    /// energy to floating-point tolerance, for arbitrary mass ratios.
    #[test]
    fn elastic_collisions_conserve_momentum_and_energy(
        n_raw in vec3(-1.0, 1.0),
        v1 in vec3(-3.0, 3.0),
        v2 in vec3(-3.0, 3.0),
        m1 in 0.5..4.0f64,
        m2 in 0.5..4.0f64,
    ) {
        let norm = norm_sq(&n_raw).sqrt();
        prop_assume!(norm > 0.1);
        let n = scale(&n_raw, 1.0 / norm);
        let (mut p1, mut p2) = contact_pair(&n, 1.0, v1, v2);
        // Only approaching pairs collide.
        prop_assume!(dot(&n, &sub(&v1, &v2)) < -1e-6);

        let ke_before = 0.5 * m1 * norm_sq(&p1.v) + 0.5 * m2 * norm_sq(&p2.v);
        let mom_before = momentum(&p1, &p2, m1, m2);

        let liou = NewtonianLiouvillean::new();
        let bc = open_bc();
        let ev = liou.smooth_spheres_coll(
            &mut p1, &mut p2, m1, m2, 0, 0, 1.0, EventType::Core, &bc, 0.0,
        );

        let ke_after = 0.5 * m1 * norm_sq(&p1.v) + 0.5 * m2 * norm_sq(&p2.v);
        let mom_after = momentum(&p1, &p2, m1, m2);

        prop_assert!((ke_after - ke_before).abs() < 1e-9 * ke_before.max(1.0));
        for k in 0..3 {
            prop_assert!((mom_after[k] - mom_before[k]).abs() < 1e-9);
        }
        // The record's ΔKE agrees with the actual mutation.
        prop_assert!(ev.delta_ke().abs() < 1e-9 * ke_before.max(1.0));
    }

    /// Post-collision separation velocity along `rij` is `-e` times the
    /// pre-collision value, for all restitutions in `[0, 1]`.
    #[test]
    fn restitution_scales_separation_velocity(
        n_raw in vec3(-1.0, 1.0),
        v1 in vec3(-3.0, 3.0),
        v2 in vec3(-3.0, 3.0),
        e in 0.0..1.0f64,
    ) {
        let norm = norm_sq(&n_raw).sqrt();
        prop_assume!(norm > 0.1);
        let n = scale(&n_raw, 1.0 / norm);
        let rv_before = dot(&n, &sub(&v1, &v2));
        prop_assume!(rv_before < -1e-6);

        let (mut p1, mut p2) = contact_pair(&n, 1.0, v1, v2);
        let liou = NewtonianLiouvillean::new();
        let bc = open_bc();
        liou.smooth_spheres_coll(
            &mut p1, &mut p2, 1.0, 1.0, 0, 0, e, EventType::Core, &bc, 0.0,
        );

        let rv_after = dot(&n, &sub(&p1.v, &p2.v));
        prop_assert!((rv_after + e * rv_before).abs() < 1e-9 * rv_before.abs().max(1.0));
    }

    /// Streaming forward then backward by the same interval restores the
    /// position to within floating error.
    #[test]
    fn streaming_round_trips(
        r in vec3(-100.0, 100.0),
        v in vec3(-10.0, 10.0),
        dt in 0.0..10.0f64,
    ) {
        let liou = NewtonianLiouvillean::new();
        let mut p = Particle::new(0, r, v).expect("valid particle");
        liou.stream_particle(&mut p, dt);
        liou.stream_particle(&mut p, -dt);
        for k in 0..3 {
            prop_assert!((p.r[k] - r[k]).abs() < 1e-9 * r[k].abs().max(1.0));
        }
    }

    /// Cube entry never reports contact when the axis of largest separation
    /// is not shrinking.
    #[test]
    fn cube_entry_requires_approach_on_widest_axis(
        rij in vec3(-5.0, 5.0),
        vij in vec3(-3.0, 3.0),
    ) {
        let widest = rij
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(k, _)| k)
            .unwrap_or(0);
        prop_assume!(rij[widest] * vij[widest] >= 0.0);

        let mut dat = CollisionPrediction::new(rij, vij);
        let liou = NewtonianLiouvillean::new();
        prop_assert!(!liou.cube_cube_in_root(&mut dat, 1.0, None));
    }
}

/// Two unit-mass, unit-diameter spheres launched head-on from `±0.6` at
/// unit speed meet after exactly `dt = 0.1` and swap velocities.
#[test]
fn head_on_unit_spheres_contact_and_swap() -> Result<()> {
    let liou = NewtonianLiouvillean::new();
    let bc = open_bc();
    let mut p1 = Particle::new(0, [-0.6, 0.0, 0.0], [1.0, 0.0, 0.0])?;
    let mut p2 = Particle::new(1, [0.6, 0.0, 0.0], [-1.0, 0.0, 0.0])?;

    let mut dat = CollisionPrediction::for_pair(&p1, &p2, &bc);
    assert!(liou.sphere_sphere_in_root(&mut dat, 1.0));
    assert!((dat.dt - 0.1).abs() < 1e-12, "contact time {}", dat.dt);

    liou.smooth_spheres_coll(
        &mut p1,
        &mut p2,
        1.0,
        1.0,
        0,
        0,
        1.0,
        EventType::Core,
        &bc,
        dat.dt,
    );
    assert_eq!(p1.v, [-1.0, 0.0, 0.0]);
    assert_eq!(p2.v, [1.0, 0.0, 0.0]);
    Ok(())
}

/// A finite-mass particle colliding with a sentinel-infinite one receives
/// the standard wall-reflection impulse; the infinite side never moves.
#[test]
fn infinite_mass_acts_as_a_wall() -> Result<()> {
    let liou = NewtonianLiouvillean::new();
    let bc = open_bc();
    let mut p1 = Particle::new(0, [-0.5, 0.0, 0.0], [1.0, 0.5, 0.0])?;
    let mut p2 = Particle::new(1, [0.5, 0.0, 0.0], [0.0, 0.0, 0.0])?;

    liou.smooth_spheres_coll(
        &mut p1,
        &mut p2,
        1.0,
        INFINITE_MASS,
        0,
        0,
        1.0,
        EventType::Core,
        &bc,
        0.0,
    );

    // Reflection along the contact normal (x), tangential motion untouched.
    assert_eq!(p1.v, [-1.0, 0.5, 0.0]);
    assert_eq!(p2.v, [0.0, 0.0, 0.0]);
    Ok(())
}

/// Two sentinel-infinite particles exchange no momentum at all.
#[test]
fn double_infinite_mass_transfers_nothing() -> Result<()> {
    let liou = NewtonianLiouvillean::new();
    let bc = open_bc();
    let mut p1 = Particle::new(0, [-0.5, 0.0, 0.0], [1.0, 0.0, 0.0])?;
    let mut p2 = Particle::new(1, [0.5, 0.0, 0.0], [-1.0, 0.0, 0.0])?;

    let ev = liou.smooth_spheres_coll(
        &mut p1,
        &mut p2,
        INFINITE_MASS,
        INFINITE_MASS,
        0,
        0,
        1.0,
        EventType::Core,
        &bc,
        0.0,
    );

    assert_eq!(p1.v, [1.0, 0.0, 0.0]);
    assert_eq!(p2.v, [-1.0, 0.0, 0.0]);
    assert_eq!(ev.impulse, [0.0, 0.0, 0.0]);
    Ok(())
}

/// The exit root reports "no event" (`+∞`) instead of NaN for a pair that
/// is not actually leaving the well.
#[test]
fn exit_root_maps_nan_to_no_event() {
    let liou = NewtonianLiouvillean::new();
    // Far outside the well and motionless: degenerate algebra.
    let mut dat = CollisionPrediction::new([10.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
    assert!(!liou.sphere_sphere_out_root(&mut dat, 2.25));
    assert!(dat.dt.is_infinite());
}
