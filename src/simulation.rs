use crate::error::Result;
use crate::initial::build_initial_state;
use crate::projection;
use crate::state::ParticleState;
use crate::stepper::{FrameReport, StochasticStepper};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tasep_common::{Geometry, ModelParams, Snapshot};

/// Drives one TASEP model: owns the particle state, the stepper (and with it the
/// model time) and the random source.
///
/// Single owner, single thread. A caller advances it with [`step`](Self::step) and
/// draws the result of [`project`](Self::project) after each frame.
pub struct TasepSimulation {
    params: ModelParams,
    state: ParticleState,
    stepper: StochasticStepper,
    rng: StdRng,
    /// Frames advanced since the last (re)initialization.
    frame: u64,
    last_report: Option<FrameReport>,
    /// Stores collected snapshots at record intervals.
    recorded_snapshots: Vec<Snapshot>,
    /// Whether recorded snapshots carry the full position list.
    record_positions: bool,
}

impl TasepSimulation {
    /// Creates a simulation for `params`. Without a seed the generator is seeded from
    /// the operating system.
    pub fn new(params: ModelParams, seed: Option<u64>) -> Result<Self> {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let state = build_initial_state(&params)?;
        info!(
            "Initialized {} data on a {}x{} canvas: {} particles, jump rate {}, angle {}.",
            params.initial_data(),
            params.canvas().width,
            params.canvas().height,
            state.len(),
            params.jump_rate(),
            params.angle()
        );
        Ok(Self {
            stepper: StochasticStepper::new(params.jump_rate()),
            params,
            state,
            rng,
            frame: 0,
            last_report: None,
            recorded_snapshots: Vec::new(),
            record_positions: true,
        })
    }

    /// Rebuilds the initial configuration and sets the model time back to zero.
    ///
    /// The random stream continues; recorded snapshots are kept.
    pub fn reset(&mut self) -> Result<()> {
        let params = self.params;
        self.reconfigure(params)
    }

    /// Switches to new parameters, replacing the whole state.
    ///
    /// The replacement is built before anything is touched, so on error the running
    /// model is left exactly as it was.
    pub fn reconfigure(&mut self, params: ModelParams) -> Result<()> {
        let state = build_initial_state(&params)?;
        debug!(
            "Reconfigured: {} particles after {} frames of the previous run.",
            state.len(),
            self.frame
        );
        self.state = state;
        self.stepper = StochasticStepper::new(params.jump_rate());
        self.params = params;
        self.frame = 0;
        self.last_report = None;
        Ok(())
    }

    /// Advances one frame and returns the accumulated model time.
    pub fn step(&mut self) -> Result<f64> {
        let report = self.stepper.step(&mut self.state, &mut self.rng)?;
        if report.truncated {
            warn!(
                "Frame {} was truncated after {} micro-steps.",
                self.frame + 1,
                report.micro_steps
            );
        }
        self.frame += 1;
        self.last_report = Some(report);
        Ok(report.model_time)
    }

    /// Geometry of the current frame.
    pub fn project(&self) -> Geometry {
        projection::project(&self.state, self.stepper.model_time(), &self.params)
    }

    pub fn can_be_stopped(&self) -> bool {
        projection::can_be_stopped(&self.params, self.stepper.model_time())
    }

    /// Records a snapshot of the current frame.
    pub fn record_snapshot(&mut self) {
        let snapshot = self.snapshot();
        debug!(
            "Recording snapshot at frame {} (t = {:.3}, {:.1}% mobile).",
            snapshot.frame,
            snapshot.model_time,
            100.0 * snapshot.mobile_fraction()
        );
        self.recorded_snapshots.push(snapshot);
    }

    /// Builds a snapshot of the current frame without recording it.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            frame: self.frame,
            model_time: self.stepper.model_time(),
            particle_count: saturate(self.state.len()),
            free_count: saturate(self.state.free_count()),
            leader_position: self.state.leader_position(),
            can_be_stopped: self.can_be_stopped(),
            positions: self
                .record_positions
                .then(|| self.state.positions().to_vec()),
        }
    }

    /// Returns a reference to the recorded snapshots.
    pub fn get_recorded_snapshots(&self) -> &[Snapshot] {
        &self.recorded_snapshots
    }

    pub fn set_record_positions(&mut self, record: bool) {
        self.record_positions = record;
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn state(&self) -> &ParticleState {
        &self.state
    }

    pub fn model_time(&self) -> f64 {
        self.stepper.model_time()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Report of the most recent frame, if any frame ran since initialization.
    pub fn last_report(&self) -> Option<FrameReport> {
        self.last_report
    }
}

// MAX_PARTICLES keeps every count well inside u32.
fn saturate(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use tasep_common::{Angle, CanvasSize, InitialData};

    fn params(data: InitialData) -> ModelParams {
        ModelParams::new(CanvasSize::new(200.0, 100.0), 0.5, 2.0, data, Angle::Zero).unwrap()
    }

    #[test]
    fn stepping_accumulates_time_and_frames() {
        let mut sim = TasepSimulation::new(params(InitialData::Step), Some(9)).unwrap();
        let mut previous = 0.0;
        for _ in 0..5 {
            let t = sim.step().unwrap();
            assert!(t > previous + 1.0 - 1e-12);
            previous = t;
        }
        assert_eq!(sim.frame(), 5);
        assert_eq!(sim.model_time(), previous);
        assert!(sim.last_report().is_some());
    }

    #[test]
    fn reset_restores_the_initial_configuration() {
        let p = params(InitialData::HalfFlat);
        let fresh = build_initial_state(&p).unwrap();
        let mut sim = TasepSimulation::new(p, Some(1)).unwrap();
        for _ in 0..3 {
            sim.step().unwrap();
        }
        sim.reset().unwrap();
        assert_eq!(sim.model_time(), 0.0);
        assert_eq!(sim.frame(), 0);
        assert_eq!(sim.state(), &fresh);
        assert!(sim.last_report().is_none());
    }

    #[test]
    fn failed_reconfigure_keeps_the_running_model() {
        let mut sim = TasepSimulation::new(params(InitialData::Flat), Some(2)).unwrap();
        sim.step().unwrap();
        let before = sim.state().clone();
        let time = sim.model_time();

        let empty = ModelParams::new(CanvasSize::new(0.0, 0.0), 0.5, 2.0, InitialData::Flat, Angle::Zero).unwrap();
        assert!(matches!(sim.reconfigure(empty), Err(EngineError::Configuration(_))));
        assert_eq!(sim.state(), &before);
        assert_eq!(sim.model_time(), time);
        assert_eq!(sim.params().canvas().width, 200.0);
    }

    #[test]
    fn snapshots_follow_the_position_switch() {
        let mut sim = TasepSimulation::new(params(InitialData::Step), Some(3)).unwrap();
        sim.record_snapshot();
        sim.set_record_positions(false);
        sim.step().unwrap();
        sim.record_snapshot();

        let snaps = sim.get_recorded_snapshots();
        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps[0].frame, 0);
        assert_eq!(snaps[0].particle_count, 50);
        assert_eq!(snaps[0].free_count, 1);
        assert_eq!(snaps[0].positions.as_ref().map(Vec::len), Some(50));
        assert_eq!(snaps[1].frame, 1);
        assert!(snaps[1].positions.is_none());
        assert_eq!(snaps[1].model_time, sim.model_time());
    }

    #[test]
    fn projection_uses_the_current_parameters() {
        let mut sim = TasepSimulation::new(params(InitialData::Step), Some(4)).unwrap();
        assert_eq!(sim.project().markers.len(), 50);
        sim.reconfigure(params(InitialData::Flat)).unwrap();
        assert_eq!(sim.project().markers.len(), 150);
        assert!(!sim.can_be_stopped());
    }
}
