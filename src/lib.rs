//! Continuous-time TASEP growth simulator.
//!
//! [`initial`] builds a [`ParticleState`], [`stepper`] advances it frame by frame and
//! [`projection`] turns the current state into drawable [`tasep_common::Geometry`].
//! [`TasepSimulation`] ties the three together for a caller that owns the frame timer.

pub mod error;
pub mod initial;
pub mod output;
pub mod projection;
pub mod simulation;
pub mod state;
pub mod stepper;

pub use error::{EngineError, Result};
pub use initial::{build_initial_state, particle_count, MAX_PARTICLES};
pub use projection::{can_be_stopped, project};
pub use simulation::TasepSimulation;
pub use state::ParticleState;
pub use stepper::{FrameReport, StochasticStepper, FRAME_DURATION};
