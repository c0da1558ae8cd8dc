//! Continuous-time dynamics.
//!
//! Every mobile particle carries an independent exponential clock: the leader rings
//! at rate `jump_rate`, every other mobile particle at rate 1. One micro-step samples
//! the minimum of those clocks and moves the particle whose clock rang. A frame keeps
//! doing micro-steps until more than one unit of model time has passed.

use crate::error::{EngineError, Result};
use crate::state::ParticleState;
use log::{trace, warn};
use rand::Rng;
use rand_distr::Exp1;

/// Length of one frame in model time.
pub const FRAME_DURATION: f64 = 1.0;

/// Rejection-sampling budget, in multiples of the expected number of tries.
const REJECTION_BUDGET_FACTOR: usize = 4;
const REJECTION_BUDGET_SLACK: usize = 16;

/// Micro-steps allowed per frame, in multiples of the expected number.
const CEILING_FACTOR: f64 = 64.0;
const CEILING_SLACK: f64 = 1024.0;

/// What happened during one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub micro_steps: usize,
    /// Model time consumed by this frame.
    pub elapsed: f64,
    /// Accumulated model time after the frame.
    pub model_time: f64,
    /// The frame hit the micro-step ceiling before a full time unit had passed.
    pub truncated: bool,
}

/// Advances a [`ParticleState`] and owns the accumulated model time.
#[derive(Debug, Clone, PartialEq)]
pub struct StochasticStepper {
    jump_rate: f64,
    model_time: f64,
}

impl StochasticStepper {
    /// `jump_rate` must be positive; [`tasep_common::ModelParams`] guarantees it.
    pub fn new(jump_rate: f64) -> Self {
        Self {
            jump_rate,
            model_time: 0.0,
        }
    }

    pub fn jump_rate(&self) -> f64 {
        self.jump_rate
    }

    pub fn model_time(&self) -> f64 {
        self.model_time
    }

    /// Advances `state` by one frame.
    pub fn step<R: Rng>(&mut self, state: &mut ParticleState, rng: &mut R) -> Result<FrameReport> {
        let ceiling = micro_step_ceiling(state.len(), self.jump_rate);
        let mut local_time = 0.0;
        let mut micro_steps = 0;
        let mut truncated = false;

        while local_time <= FRAME_DURATION {
            if micro_steps >= ceiling {
                warn!(
                    "Frame stopped after {} micro-steps at local time {:.4}; configuration looks pathological.",
                    micro_steps, local_time
                );
                truncated = true;
                break;
            }
            local_time += self.micro_step(state, rng)?;
            micro_steps += 1;
        }

        if cfg!(debug_assertions) {
            state.verify_bookkeeping()?;
        }

        trace!(
            "Frame done: {} micro-steps, t = {:.4}, {} of {} particles mobile",
            micro_steps,
            self.model_time,
            state.free_count(),
            state.len()
        );

        Ok(FrameReport {
            micro_steps,
            elapsed: local_time,
            model_time: self.model_time,
            truncated,
        })
    }

    /// Performs a single jump and returns the waiting time that preceded it.
    pub fn micro_step<R: Rng>(&mut self, state: &mut ParticleState, rng: &mut R) -> Result<f64> {
        let n = state.len();
        let free = state.free_count();
        if n == 0 || free == 0 || free > n {
            return Err(EngineError::InvariantViolation(format!(
                "free count {} impossible for {} particles",
                free, n
            )));
        }

        // Mobile particles other than the leader.
        let followers = free - 1;
        let total_rate = self.jump_rate + followers as f64;
        let exp: f64 = rng.sample(Exp1);
        let dt = exp / total_rate;

        if followers == 0 || rng.random::<f64>() * total_rate < self.jump_rate {
            state.advance_leader();
        } else {
            let index = select_mobile_follower(state, rng)?;
            state.advance_follower(index)?;
        }

        self.model_time += dt;
        Ok(dt)
    }
}

/// Upper bound on micro-steps in one frame.
///
/// The expected count is the total jump rate, at most `jump_rate + n - 1`.
pub fn micro_step_ceiling(n: usize, jump_rate: f64) -> usize {
    let ceiling = CEILING_FACTOR * (n as f64 + jump_rate.ceil()) + CEILING_SLACK;
    ceiling.min(usize::MAX as f64) as usize
}

/// Picks a mobile particle among indices `1..n`, uniformly.
///
/// Rejection sampling is cheap while many particles are mobile. Its budget is a few
/// times the expected number of tries; when that runs out the pick falls back to an
/// exact scan, which keeps the choice uniform and the loop bounded.
fn select_mobile_follower<R: Rng>(state: &ParticleState, rng: &mut R) -> Result<usize> {
    let n = state.len();
    let followers = state.free_count().saturating_sub(1);
    if n < 2 || followers == 0 {
        return Err(EngineError::InvariantViolation(format!(
            "no mobile follower to move among {} particles",
            n
        )));
    }

    let budget = REJECTION_BUDGET_FACTOR * (n - 1) / followers + REJECTION_BUDGET_SLACK;
    for _ in 0..budget {
        let candidate = rng.random_range(1..n);
        if state.is_mobile(candidate) {
            return Ok(candidate);
        }
    }

    let target = rng.random_range(0..followers);
    state.mobile()[1..]
        .iter()
        .enumerate()
        .filter(|(_, mobile)| **mobile)
        .nth(target)
        .map(|(offset, _)| offset + 1)
        .ok_or_else(|| {
            EngineError::InvariantViolation(format!(
                "free count claims {} mobile followers but the scan found fewer",
                followers
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn step_state(len: i64) -> ParticleState {
        ParticleState::from_positions((0..len).map(|k| -k).collect()).unwrap()
    }

    #[test]
    fn single_particle_always_advances() {
        let mut state = ParticleState::from_positions(vec![0]).unwrap();
        let mut stepper = StochasticStepper::new(0.5);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let before = state.leader_position();
            stepper.micro_step(&mut state, &mut rng).unwrap();
            assert_eq!(state.leader_position(), before + 1);
            assert_eq!(state.free_count(), 1);
        }
        let report = stepper.step(&mut state, &mut rng).unwrap();
        assert!(report.micro_steps >= 1);
        assert_eq!(state.free_count(), 1);
    }

    #[test]
    fn frame_consumes_more_than_one_time_unit() {
        let mut state = step_state(30);
        let mut stepper = StochasticStepper::new(1.0);
        let mut rng = StdRng::seed_from_u64(2);
        let report = stepper.step(&mut state, &mut rng).unwrap();
        assert!(report.elapsed > FRAME_DURATION);
        assert!(!report.truncated);
        assert_eq!(report.model_time, stepper.model_time());
        state.verify_bookkeeping().unwrap();
    }

    #[test]
    fn only_the_leader_moves_from_a_packed_step() {
        let mut state = step_state(10);
        let mut stepper = StochasticStepper::new(0.5);
        let mut rng = StdRng::seed_from_u64(3);
        stepper.micro_step(&mut state, &mut rng).unwrap();
        assert_eq!(state.leader_position(), 1);
        assert_eq!(&state.positions()[1..3], &[-1, -2]);
        assert_eq!(state.free_count(), 2);
    }

    #[test]
    fn identical_seeds_give_identical_runs() {
        let mut a = step_state(100);
        let mut b = a.clone();
        let mut stepper_a = StochasticStepper::new(0.7);
        let mut stepper_b = StochasticStepper::new(0.7);
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            stepper_a.micro_step(&mut a, &mut rng_a).unwrap();
            stepper_b.micro_step(&mut b, &mut rng_b).unwrap();
        }
        assert_eq!(a, b);
        assert_eq!(
            stepper_a.model_time().to_bits(),
            stepper_b.model_time().to_bits()
        );
    }

    #[test]
    fn corrupt_free_count_is_reported() {
        let mut state = ParticleState::from_raw_parts(vec![3, 2, 1], vec![false, false, false], 0);
        let mut stepper = StochasticStepper::new(0.5);
        let mut rng = StdRng::seed_from_u64(4);
        assert!(matches!(
            stepper.micro_step(&mut state, &mut rng),
            Err(EngineError::InvariantViolation(_))
        ));
        assert_eq!(stepper.model_time(), 0.0);
    }

    #[test]
    fn phantom_mobile_follower_is_reported() {
        // free_count says one follower can move but none is flagged.
        let state = ParticleState::from_raw_parts(vec![3, 2, 1], vec![true, false, false], 2);
        let mut rng = StdRng::seed_from_u64(5);
        assert!(matches!(
            select_mobile_follower(&state, &mut rng),
            Err(EngineError::InvariantViolation(_))
        ));
    }

    #[test]
    fn follower_choice_is_uniform() {
        // Followers 2, 4 and 6 are mobile; 1, 3 and 5 are blocked.
        let state = ParticleState::from_positions(vec![20, 19, 17, 16, 14, 13, 11]).unwrap();
        assert_eq!(state.free_count(), 4);
        let mut rng = StdRng::seed_from_u64(6);
        let mut hits = [0usize; 7];
        for _ in 0..30_000 {
            hits[select_mobile_follower(&state, &mut rng).unwrap()] += 1;
        }
        assert_eq!(hits[0] + hits[1] + hits[3] + hits[5], 0);
        for &i in &[2, 4, 6] {
            assert!((9_000..11_000).contains(&hits[i]), "index {} hit {} times", i, hits[i]);
        }
    }

    #[test]
    fn ceiling_scales_with_system_size() {
        assert!(micro_step_ceiling(1, 0.5) >= 1024);
        assert!(micro_step_ceiling(10_000, 0.5) > micro_step_ceiling(100, 0.5));
        assert_eq!(micro_step_ceiling(0, f64::MAX), usize::MAX);
    }
}
