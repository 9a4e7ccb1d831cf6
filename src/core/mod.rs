//! Core data structures and algorithms of the event-driven dynamics kernel.
//!
//! Leaves first: vector/matrix helpers, the particle model, particle
//! ranges, species, boundary conditions, event records; then the
//! Newtonian Liouvillean (propagation + collision algebra), the pluggable
//! Interaction / Local / Global / System / Topology families, and the
//! `Dynamics` registry that owns and composes all of them.

pub mod boundary;
pub mod dynamics;
pub mod event;
pub mod global;
pub mod interaction;
pub mod liouvillean;
pub mod local;
pub mod math;
pub mod particle;
pub mod range;
pub mod species;
pub mod system;
pub mod topology;

pub use boundary::{BoundaryCondition, OpenBoundary, PeriodicBoundary};
pub use dynamics::{Dynamics, SimStatus};
pub use event::{CandidateEvent, EventSource, EventType, NParticleEvent, PairEvent, ParticleEvent};
pub use liouvillean::{CollisionPrediction, NewtonianLiouvillean};
pub use particle::Particle;
pub use range::{PairRange, ParticleRange};
pub use species::Species;
