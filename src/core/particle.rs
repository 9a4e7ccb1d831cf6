use crate::core::math::{norm_sq, Vec3};
use crate::error::{Error, Result};

/// Fixed spatial dimension (3D).
pub const DIM: usize = 3;

/// Mutable kinematic state of one particle.
///
/// Mass and contact geometry live on the owning [`Species`] and
/// [`Interaction`]; the particle itself is purely kinematic.
///
/// Fields:
/// - `id`: stable identifier
/// - `r`: position vector [x, y, z]
/// - `v`: velocity vector [vx, vy, vz]
/// - `last_update_time`: absolute time the kinematic state was last made
///   current. Every collision-response routine must stream the particle to
///   the present before touching its velocity; `last_update_time` is how
///   that staleness is tracked.
///
/// [`Species`]: crate::core::species::Species
/// [`Interaction`]: crate::core::interaction::Interaction
#[derive(Debug, Clone)]
pub struct Particle {
    /// Stable particle identifier.
    pub id: u32,
    /// Position (x, y, z).
    pub r: Vec3,
    /// Velocity (vx, vy, vz).
    pub v: Vec3,
    /// Absolute simulation time at which `r` was last brought current.
    pub last_update_time: f64,
}

impl Particle {
    /// Create a new particle after validating invariants.
    ///
    /// Errors:
    /// - `Error::InvalidParam` if any position/velocity component is NaN/inf.
    pub fn new(id: u32, r: Vec3, v: Vec3) -> Result<Self> {
        if !r.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("position must be finite".into()));
        }
        if !v.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("velocity must be finite".into()));
        }
        Ok(Self {
            id,
            r,
            v,
            last_update_time: 0.0,
        })
    }

    /// True when the particle's state is current at absolute time `now`.
    #[inline]
    pub fn is_up_to_date(&self, now: f64) -> bool {
        (self.last_update_time - now).abs() <= f64::EPSILON * now.abs().max(1.0)
    }

    /// Kinetic energy 1/2 m |v|^2 for the supplied mass.
    ///
    /// The infinite-mass sentinel (`mass == 0.0`) yields zero: an immovable
    /// particle carries no bookkept kinetic energy.
    #[inline]
    pub fn kinetic_energy(&self, mass: f64) -> f64 {
        0.5 * mass * norm_sq(&self.v)
    }

    /// Set position (validated as finite).
    pub fn set_position(&mut self, r: Vec3) -> Result<()> {
        if !r.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("position must be finite".into()));
        }
        self.r = r;
        Ok(())
    }

    /// Set velocity (validated as finite).
    pub fn set_velocity(&mut self, v: Vec3) -> Result<()> {
        if !v.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("velocity must be finite".into()));
        }
        self.v = v;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_particle_ok() -> Result<()> {
        let p = Particle::new(1, [0.0, 1.0, 2.0], [2.0, -3.0, 0.5])?;
        assert_eq!(p.id, 1);
        assert_eq!(p.r, [0.0, 1.0, 2.0]);
        assert_eq!(p.v, [2.0, -3.0, 0.5]);
        assert_eq!(p.last_update_time, 0.0);
        Ok(())
    }

    #[test]
    fn non_finite_position_rejected() {
        let err = Particle::new(0, [f64::NAN, 0.0, 0.0], [0.0, 0.0, 0.0]).unwrap_err();
        assert!(err.to_string().contains("position"));
    }

    #[test]
    fn kinetic_energy_computed() -> Result<()> {
        // v = (3,4,0), |v|^2 = 25; KE = 0.5 * m * 25
        let p = Particle::new(7, [0.0, 0.0, 0.0], [3.0, 4.0, 0.0])?;
        assert!((p.kinetic_energy(2.0) - 25.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn infinite_mass_sentinel_has_zero_ke() -> Result<()> {
        let p = Particle::new(7, [0.0, 0.0, 0.0], [3.0, 4.0, 0.0])?;
        assert_eq!(p.kinetic_energy(0.0), 0.0);
        Ok(())
    }

    #[test]
    fn staleness_check() -> Result<()> {
        let mut p = Particle::new(0, [0.0; DIM], [0.0; DIM])?;
        assert!(p.is_up_to_date(0.0));
        assert!(!p.is_up_to_date(1.0));
        p.last_update_time = 1.0;
        assert!(p.is_up_to_date(1.0));
        Ok(())
    }
}
