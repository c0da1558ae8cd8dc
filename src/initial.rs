//! Initial particle configurations.
//!
//! The number of particles is chosen larger than what the canvas shows so that the
//! left end of the particle system never becomes visible before the run can stop.

use crate::error::{EngineError, Result};
use crate::state::ParticleState;
use log::debug;
use tasep_common::{InitialData, ModelParams};

/// Hard ceiling on the particle count. Only reached with a vanishing jump rate or
/// particle size, which would otherwise try to allocate an absurd lattice.
pub const MAX_PARTICLES: u64 = 1 << 22;

/// Number of particles needed to cover the canvas for the configured variant.
pub fn particle_count(params: &ModelParams) -> u64 {
    let width = params.lattice_width();
    let height = params.lattice_height();
    // Saturating: a tiny jump rate can push this past u64, the ceiling check catches it.
    let climb = (height as f64 / params.jump_rate()).floor().min(u64::MAX as f64) as u64;
    match params.initial_data() {
        InitialData::Flat => (width / 2).saturating_add(climb),
        InitialData::HalfFlat => (width / 4).saturating_add(climb / 2),
        InitialData::Step => (width / 2).max(climb / 2),
    }
}

/// Position of particle `index` (leader first) in a system of `count` particles.
pub fn initial_position(initial_data: InitialData, count: usize, index: usize) -> i64 {
    let n = count as i64;
    let i = index as i64;
    match initial_data {
        InitialData::Flat => n - 1 - 2 * i,
        InitialData::HalfFlat => -2 * i - 1,
        InitialData::Step => -i,
    }
}

/// Builds a fresh particle state for `params`.
pub fn build_initial_state(params: &ModelParams) -> Result<ParticleState> {
    let count = particle_count(params);
    if count < 1 {
        return Err(EngineError::Configuration(format!(
            "a {}x{} canvas with particle size {} holds no particles",
            params.canvas().width,
            params.canvas().height,
            params.particle_size()
        )));
    }
    if count > MAX_PARTICLES {
        return Err(EngineError::Configuration(format!(
            "configuration needs {} particles, more than the supported {}",
            count, MAX_PARTICLES
        )));
    }

    let count = count as usize;
    let positions: Vec<i64> = (0..count)
        .map(|k| initial_position(params.initial_data(), count, k))
        .collect();
    let state = ParticleState::from_positions(positions)?;

    debug!(
        "Built {} initial data with {} particles ({} mobile).",
        params.initial_data(),
        state.len(),
        state.free_count()
    );
    Ok(state)
}
