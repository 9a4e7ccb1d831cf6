//! edmd — an event-driven hard-particle dynamics kernel.
//!
//! Particles move ballistically between discrete, analytically predicted
//! collision events; state changes only at those events. This crate is the
//! dynamics kernel of such a simulator: the Newtonian propagation and
//! collision algebra ([`core::liouvillean`]), the pluggable interaction /
//! boundary / event-source families, and the [`core::dynamics::Dynamics`]
//! registry that composes them into one queryable object.
//!
//! The event *scheduler* (the priority queue deciding which candidate event
//! fires next) is an external collaborator: it queries the kernel for
//! candidate event times, picks the minimum, invokes the matching response
//! routine, and re-queries for the affected particles. [`core::event`]
//! defines the records exchanged across that boundary.

pub mod core;
pub mod error;

pub use crate::core::dynamics::{Dynamics, SimStatus};
pub use crate::core::liouvillean::{CollisionPrediction, NewtonianLiouvillean};
pub use crate::core::particle::Particle;
pub use crate::error::{Error, Result};
