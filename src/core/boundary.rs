//! Boundary conditions: map absolute positions/velocities into the
//! periodic/bounded image used for relative-vector geometry.

use crate::core::event::PluginInfo;
use crate::core::math::Vec3;
use crate::core::particle::DIM;
use crate::error::{Error, Result};

/// The narrow boundary-condition contract consumed throughout the kernel.
///
/// `apply_bc` must be a deterministic, pure function of the current box
/// geometry. `update` lets time-dependent boundaries (compression ramps,
/// shear) advance their internal state when the registry streams.
pub trait BoundaryCondition {
    /// Fold `r` (and, for moving boundaries, `v`) into the primary image.
    fn apply_bc(&self, r: &mut Vec3, v: &mut Vec3);

    /// Advance boundary-dependent state by `dt`. Static boundaries ignore it.
    fn update(&mut self, _dt: f64) {}

    /// Edge lengths of the primary cell.
    fn cell_size(&self) -> Vec3;

    /// Self-description for the persistence collaborator.
    fn describe(&self) -> PluginInfo;
}

/// Rectangular periodic boundary: positions fold into
/// `[-L/2, L/2)` per axis; velocities are untouched.
#[derive(Debug, Clone)]
pub struct PeriodicBoundary {
    cell: Vec3,
}

impl PeriodicBoundary {
    /// Create a periodic box with edge lengths `cell` (each finite, > 0).
    pub fn new(cell: Vec3) -> Result<Self> {
        if !cell.iter().all(|&l| l.is_finite() && l > 0.0) {
            return Err(Error::InvalidParam(
                "cell edge lengths must be finite and > 0".into(),
            ));
        }
        Ok(Self { cell })
    }
}

impl BoundaryCondition for PeriodicBoundary {
    fn apply_bc(&self, r: &mut Vec3, _v: &mut Vec3) {
        for k in 0..DIM {
            let l = self.cell[k];
            r[k] -= l * (r[k] / l).round();
        }
    }

    fn cell_size(&self) -> Vec3 {
        self.cell
    }

    fn describe(&self) -> PluginInfo {
        PluginInfo::new("PBC", "Periodic")
            .with("Lx", self.cell[0])
            .with("Ly", self.cell[1])
            .with("Lz", self.cell[2])
    }
}

/// Open (non-wrapping) boundary over a nominal cell: `apply_bc` is the
/// identity. Used with wall Locals that confine the system explicitly.
#[derive(Debug, Clone)]
pub struct OpenBoundary {
    cell: Vec3,
}

impl OpenBoundary {
    /// Create an open boundary with nominal cell edge lengths `cell`.
    pub fn new(cell: Vec3) -> Result<Self> {
        if !cell.iter().all(|&l| l.is_finite() && l > 0.0) {
            return Err(Error::InvalidParam(
                "cell edge lengths must be finite and > 0".into(),
            ));
        }
        Ok(Self { cell })
    }
}

impl BoundaryCondition for OpenBoundary {
    fn apply_bc(&self, _r: &mut Vec3, _v: &mut Vec3) {}

    fn cell_size(&self) -> Vec3 {
        self.cell
    }

    fn describe(&self) -> PluginInfo {
        PluginInfo::new("None", "Open")
            .with("Lx", self.cell[0])
            .with("Ly", self.cell[1])
            .with("Lz", self.cell[2])
    }
}
