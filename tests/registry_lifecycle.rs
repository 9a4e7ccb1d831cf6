//! Registry lifecycle and a small end-to-end event loop driven the way an
//! external scheduler would drive the kernel.

use edmd::core::boundary::{OpenBoundary, PeriodicBoundary};
use edmd::core::interaction::HardSphere;
use edmd::core::local::WallLocal;
use edmd::core::range::{PairRange, ParticleRange};
use edmd::core::species::Species;
use edmd::{Dynamics, SimStatus};
use edmd::error::{Error, Result};

#[test]
fn additions_after_initialise_fail_without_mutation() -> Result<()> {
    let bc = PeriodicBoundary::new([10.0, 10.0, 10.0])?;
    let mut dynamics = Dynamics::new(Box::new(bc), Some(1));
    dynamics.add_particle([0.0; 3], [1.0, 0.0, 0.0])?;
    dynamics.add_interaction(Box::new(HardSphere::new("Bulk", 1.0, 1.0, PairRange::All)?))?;
    dynamics.add_species(Species::new("Bulk", 1.0, ParticleRange::All)?)?;
    dynamics.initialise()?;
    assert_eq!(dynamics.status(), SimStatus::Initialised);

    let n_species = dynamics.species().len();
    let n_particles = dynamics.particles().len();

    assert!(matches!(
        dynamics.add_species(Species::new("Late", 1.0, ParticleRange::All)?),
        Err(Error::Config(_))
    ));
    assert!(dynamics.add_particle([1.0, 0.0, 0.0], [0.0; 3]).is_err());
    assert!(dynamics
        .add_interaction(Box::new(HardSphere::new("Late", 1.0, 1.0, PairRange::All)?))
        .is_err());

    assert_eq!(dynamics.species().len(), n_species);
    assert_eq!(dynamics.particles().len(), n_particles);
    Ok(())
}

/// One particle bouncing between two facing walls: drive the kernel the way
/// the scheduler would (query candidates, stream to the minimum, run the
/// response) and check times, positions, and energy over several bounces.
#[test]
fn particle_bounces_between_walls() -> Result<()> {
    let bc = OpenBoundary::new([20.0, 20.0, 20.0])?;
    let mut dynamics = Dynamics::new(Box::new(bc), Some(9));
    dynamics.add_particle([0.0, 0.0, 0.0], [1.0, 0.0, 0.0])?;
    dynamics.add_interaction(Box::new(HardSphere::new("Bulk", 1.0, 1.0, PairRange::All)?))?;
    dynamics.add_species(Species::new("Bulk", 1.0, ParticleRange::All)?)?;
    dynamics.add_local(Box::new(WallLocal::new(
        "Right",
        [5.0, 0.0, 0.0],
        [-1.0, 0.0, 0.0],
        1.0,
        0.5,
        ParticleRange::All,
    )?))?;
    dynamics.add_local(Box::new(WallLocal::new(
        "Left",
        [-5.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        1.0,
        0.5,
        ParticleRange::All,
    )?))?;
    dynamics.initialise()?;

    let mut sign = 1.0;
    let mut expected_next = 4.5;
    for bounce in 0..4 {
        let candidates = dynamics.local_candidates(0)?;
        let next = candidates
            .iter()
            .min()
            .ok_or_else(|| Error::Config("expected a wall candidate".into()))?;
        assert!(
            (next.time_f64() - expected_next).abs() < 1e-9,
            "bounce {bounce}: expected t = {expected_next}, got {}",
            next.time_f64()
        );

        let source_id = match next.source {
            edmd::core::event::EventSource::Local { id, .. } => id,
            other => panic!("expected a local candidate, got {other:?}"),
        };
        let dt = next.time_f64() - dynamics.time_now();
        dynamics.stream(dt)?;
        dynamics.run_local_event(source_id, 0)?;

        sign = -sign;
        assert_eq!(dynamics.particles()[0].v, [sign, 0.0, 0.0]);
        // Full cavity width between the contact planes is 9.
        expected_next += 9.0;
    }

    // Elastic walls: speed never changes.
    assert!((dynamics.kinetic_energy()? - 0.5).abs() < 1e-12);
    Ok(())
}

/// A three-particle chain resolved pair by pair: the middle particle is
/// struck from both sides in a deterministic order.
#[test]
fn pair_events_chain_through_a_line() -> Result<()> {
    let bc = OpenBoundary::new([50.0, 50.0, 50.0])?;
    let mut dynamics = Dynamics::new(Box::new(bc), Some(3));
    dynamics.add_particle([-3.0, 0.0, 0.0], [1.0, 0.0, 0.0])?;
    dynamics.add_particle([0.0, 0.0, 0.0], [0.0, 0.0, 0.0])?;
    dynamics.add_particle([3.0, 0.0, 0.0], [-2.0, 0.0, 0.0])?;
    dynamics.add_interaction(Box::new(HardSphere::new("Bulk", 1.0, 1.0, PairRange::All)?))?;
    dynamics.add_species(Species::new("Bulk", 1.0, ParticleRange::All)?)?;
    dynamics.initialise()?;

    let momentum = |d: &Dynamics| -> f64 { d.particles().iter().map(|p| p.v[0]).sum() };
    let p_before = momentum(&dynamics);
    let ke_before = dynamics.kinetic_energy()?;

    for _ in 0..3 {
        // Scan all pairs for the earliest contact.
        let mut best = None;
        for i in 0..3u32 {
            for j in (i + 1)..3u32 {
                if let Some((cand, kind)) = dynamics.pair_candidate(i, j)? {
                    let better = match &best {
                        None => true,
                        Some((c, _, _, _)) => cand < *c,
                    };
                    if better {
                        best = Some((cand, kind, i, j));
                    }
                }
            }
        }
        let Some((cand, kind, i, j)) = best else { break };
        let dt = cand.time_f64() - dynamics.time_now();
        dynamics.stream(dt)?;
        dynamics.run_pair_event(i, j, kind)?;
    }

    // Equal-mass elastic line collisions conserve both invariants exactly.
    assert!((momentum(&dynamics) - p_before).abs() < 1e-9);
    assert!((dynamics.kinetic_energy()? - ke_before).abs() < 1e-9);
    // The fast right-hand particle's speed has propagated leftward.
    assert!(dynamics.particles()[0].v[0] < 0.0);
    Ok(())
}
