use tasep_common::{Angle, CanvasSize, ColorTag, InitialData, ModelParams, Snapshot};
use tasep_engine::output::{read_snapshot_stream, write_snapshot_stream};
use tasep_engine::{build_initial_state, can_be_stopped, project, ParticleState, TasepSimulation};

fn params(data: InitialData, angle: Angle) -> ModelParams {
    ModelParams::new(CanvasSize::new(200.0, 100.0), 0.5, 2.0, data, angle).unwrap()
}

#[test]
fn step_initial_data_on_a_small_canvas() {
    let sim = TasepSimulation::new(params(InitialData::Step, Angle::Zero), Some(7)).unwrap();
    let state = sim.state();
    assert_eq!(state.len(), 50);
    assert_eq!(state.positions(), (0..50).map(|k| -k).collect::<Vec<i64>>().as_slice());
    assert_eq!(state.free_count(), 1);
    assert!(state.mobile()[0]);
    assert!(!state.mobile()[1..].iter().any(|&m| m));
    assert_eq!(sim.model_time(), 0.0);
}

#[test]
fn flat_run_stops_once_the_trend_leaves_the_canvas() {
    let p = params(InitialData::Flat, Angle::Zero);
    let state = build_initial_state(&p).unwrap();
    // 0.5 * t * 2 / 2 >= 100  <=>  t >= 200
    let mut was_stoppable = false;
    for step in 0..400 {
        let t = step as f64;
        let now = project(&state, t, &p).can_be_stopped;
        assert_eq!(now, t >= 200.0);
        assert!(!was_stoppable || now, "stop predicate flipped back at t = {}", t);
        was_stoppable = now;
    }
    assert!(can_be_stopped(&p.with_angle(Angle::FortyFive), 200.0));
}

#[test]
fn projection_is_pure() {
    let p = params(InitialData::HalfFlat, Angle::FortyFive);
    let mut sim = TasepSimulation::new(p, Some(11)).unwrap();
    for _ in 0..12 {
        sim.step().unwrap();
    }
    let first = project(sim.state(), sim.model_time(), &p);
    let second = project(sim.state(), sim.model_time(), &p);
    assert_eq!(bincode::serialize(&first).unwrap(), bincode::serialize(&second).unwrap());
    assert_eq!(first, sim.project());
}

#[test]
fn reconfiguring_restarts_the_clock() {
    let mut sim = TasepSimulation::new(params(InitialData::Step, Angle::Zero), Some(5)).unwrap();
    for _ in 0..10 {
        sim.step().unwrap();
    }
    assert!(sim.model_time() > 10.0);

    sim.reconfigure(params(InitialData::Flat, Angle::FortyFive)).unwrap();
    assert_eq!(sim.model_time(), 0.0);
    assert_eq!(sim.state().len(), 150);
    assert_eq!(sim.state().free_count(), 150);

    sim.step().unwrap();
    sim.reset().unwrap();
    assert_eq!(sim.model_time(), 0.0);
    assert_eq!(sim.params().angle(), Angle::FortyFive);
}

#[test]
fn lone_particle_keeps_walking() {
    // A 2x2 canvas at size 2 is one lattice site: flat data then holds one particle.
    let p = ModelParams::new(CanvasSize::new(2.0, 2.0), 1.0, 2.0, InitialData::Flat, Angle::Zero).unwrap();
    let mut sim = TasepSimulation::new(p, Some(3)).unwrap();
    assert_eq!(sim.state().len(), 1);
    let mut leader = sim.state().leader_position();
    for _ in 0..20 {
        sim.step().unwrap();
        assert!(sim.state().leader_position() > leader);
        assert_eq!(sim.state().free_count(), 1);
        leader = sim.state().leader_position();
    }
}

#[test]
fn recorded_snapshots_redraw_the_same_frame() {
    let p = params(InitialData::Step, Angle::Zero);
    let mut sim = TasepSimulation::new(p, Some(21)).unwrap();
    for _ in 0..6 {
        sim.step().unwrap();
    }
    sim.record_snapshot();

    let mut buffer = Vec::new();
    write_snapshot_stream(&mut buffer, sim.get_recorded_snapshots()).unwrap();
    let back: Vec<Snapshot> = read_snapshot_stream(buffer.as_slice()).unwrap();
    let snapshot = &back[0];

    let positions = snapshot.positions.clone().unwrap();
    let state = ParticleState::from_positions(positions).unwrap();
    let redrawn = project(&state, snapshot.model_time, &p);
    assert_eq!(redrawn, sim.project());
    assert_eq!(redrawn.segments_with(ColorTag::Axis).count(), 1);
    assert_eq!(state.free_count() as u32, snapshot.free_count);
}
