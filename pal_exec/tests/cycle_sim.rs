//! # Simulated palletizing cycle tests
//!
//! Runs the cycle manager against the simulated robot, stepping it with a synthetic clock.

use std::sync::{Arc, Mutex};

use comms_if::{
    eqpt::{
        robot::{ActuatorError, GripperState, Pose},
        vision::Detection,
    },
    tc::TcResponse,
};
use pal_lib::{
    coord_tf::{CoordTfParams, TransformFrame},
    cycle_mgr::{CycleMgr, CycleMgrParams, CycleState},
    data_store::DataStore,
    motion_eng::{MotionEng, MotionEngError, MotionEngParams},
    sim_actuator::{SimActuator, SimRecord},
    tc_processor, ErrorKind,
};
use util::script_interpreter::{PendingTcs, ScriptInterpreter};

/// Period of the synthetic control loop.
const STEP_S: f64 = 0.02;

/// Upper bound on the number of steps of any test.
const MAX_STEPS: usize = 100_000;

fn cycle_mgr_params() -> CycleMgrParams {
    util::params::from_str(include_str!("../../params/cycle_mgr.toml")).unwrap()
}

fn motion_eng() -> MotionEng {
    let params: MotionEngParams =
        util::params::from_str(include_str!("../../params/motion_eng.toml")).unwrap();
    MotionEng::new(params).unwrap()
}

fn frame() -> TransformFrame {
    let params: CoordTfParams =
        util::params::from_str(include_str!("../../params/coord_tf.toml")).unwrap();
    TransformFrame::from_params(&params).unwrap()
}

fn build(params: CycleMgrParams, sim: SimActuator) -> (CycleMgr, Arc<Mutex<SimRecord>>) {
    let record = sim.record();
    let mgr = CycleMgr::new(params, motion_eng(), frame(), Box::new(sim)).unwrap();
    (mgr, record)
}

/// A box under the camera, which is 800 mm above the pallet plane.
fn detection(x_mm: f64, y_mm: f64) -> Detection {
    Detection {
        x_mm,
        y_mm,
        z_mm: 800.0,
        yaw_deg: 0.0,
    }
}

/// Step the manager until it leaves the active states, supplying a detection whenever it waits
/// for one. Returns the time at which the cycle ended.
fn run_cycle(mgr: &mut CycleMgr) -> f64 {
    let mut time_s = 0.0;

    for _ in 0..MAX_STEPS {
        if mgr.state() == CycleState::Picking
            && mgr.seq().is_none()
            && mgr.context().detection.is_none()
        {
            mgr.set_detection(detection(10.0, -20.0));
        }

        let tm = mgr.step(time_s);
        if !tm.state.is_active() {
            return time_s;
        }

        time_s += STEP_S;
    }

    panic!("Cycle did not finish within {} steps", MAX_STEPS);
}

#[test]
fn test_full_cycle_places_every_box() {
    let (mut mgr, record) = build(cycle_mgr_params(), SimActuator::new());

    mgr.start().unwrap();
    run_cycle(&mut mgr);

    let tm = mgr.status();
    assert_eq!(tm.state, CycleState::Idle);
    assert_eq!(tm.current_box, 4);
    assert_eq!(tm.total_boxes, 4);
    assert_eq!(tm.error, None);

    let r = record.lock().unwrap();
    assert_eq!(
        r.gripper_demands,
        vec![
            GripperState::Closed,
            GripperState::Open,
            GripperState::Closed,
            GripperState::Open,
            GripperState::Closed,
            GripperState::Open,
            GripperState::Closed,
            GripperState::Open,
        ]
    );

    // Every box is released exactly at its place position, in grid order
    let released: Vec<Vec<f64>> = r.release_poses.iter().map(|p| p.axes.clone()).collect();
    let expected: Vec<Vec<f64>> = mgr
        .context()
        .place_positions
        .iter()
        .map(|p| vec![p.x, p.y, p.z])
        .collect();
    assert_eq!(released, expected);
    assert_eq!(expected[3], vec![510.0, -90.0, 100.0]);

    assert!(mgr.motion_eng().is_stationary());
    assert!(mgr.context().place_target.is_none());
}

#[test]
fn test_restart_after_complete() {
    let (mut mgr, _) = build(cycle_mgr_params(), SimActuator::new());

    mgr.start().unwrap();
    run_cycle(&mut mgr);
    assert_eq!(mgr.status().current_box, 4);

    // A new start begins again from the first box
    mgr.start().unwrap();
    assert_eq!(mgr.status().current_box, 0);
    run_cycle(&mut mgr);
    assert_eq!(mgr.status().current_box, 4);
    assert_eq!(mgr.state(), CycleState::Idle);
}

#[test]
fn test_stalled_motion_faults() {
    let mut params = cycle_mgr_params();
    params.motion_timeout_s = 1.0;
    let (mut mgr, record) = build(params, SimActuator::new());

    mgr.start().unwrap();
    let end_s = run_cycle(&mut mgr);

    // The first approach takes far longer than the timeout
    assert!(end_s > 1.0 && end_s < 2.0);

    let tm = mgr.status();
    assert_eq!(tm.state, CycleState::Fault);
    assert!(tm
        .error
        .unwrap()
        .starts_with("Motion stalled: move pick approach"));
    assert!(mgr.motion_eng().is_stationary());
    assert_eq!(record.lock().unwrap().num_stops, 1);

    // Only a reset leaves fault
    assert!(mgr.start().is_err());
    assert_eq!(mgr.reset().unwrap(), CycleState::Idle);
    assert_eq!(mgr.status().error, None);
}

#[test]
fn test_poll_limit_faults() {
    let mut params = cycle_mgr_params();
    params.max_polls_per_segment = 5;
    let (mut mgr, _) = build(params, SimActuator::new());

    mgr.start().unwrap();
    run_cycle(&mut mgr);

    let tm = mgr.status();
    assert_eq!(tm.state, CycleState::Fault);
    assert!(tm.error.unwrap().contains("after 5 polls"));
}

#[test]
fn test_actuator_failure_faults_with_message() {
    let err = ActuatorError::Other(String::from("joint 3 overcurrent"));

    // Move 1 is homing, moves 2 and onwards approach the pick
    let (mut mgr, record) = build(
        cycle_mgr_params(),
        SimActuator::new().fail_linear_move(3, err.clone()),
    );

    mgr.start().unwrap();
    run_cycle(&mut mgr);

    let tm = mgr.status();
    assert_eq!(tm.state, CycleState::Fault);
    assert_eq!(tm.error, Some(err.to_string()));
    assert_eq!(record.lock().unwrap().num_linear_moves, 3);
    assert!(mgr.seq().is_none());
}

#[test]
fn test_gripper_not_acknowledged_faults() {
    let (mut mgr, record) = build(
        cycle_mgr_params(),
        SimActuator::new().ack_gripper_as(GripperState::Open),
    );

    mgr.start().unwrap();
    run_cycle(&mut mgr);

    let tm = mgr.status();
    assert_eq!(tm.state, CycleState::Fault);
    assert_eq!(
        tm.error,
        Some(String::from(
            "Gripper demanded Closed but the robot acknowledged Open"
        ))
    );
    assert_eq!(
        record.lock().unwrap().gripper_demands,
        vec![GripperState::Closed]
    );
}

#[test]
fn test_speed_validation() {
    let mut eng = motion_eng();
    let before = eng.pose();
    let target = Pose::new(vec![100.0, 0.0, 100.0]);

    for speed in [0.0, 150.0, -10.0, f64::NAN].iter() {
        let err = eng.move_to_at(&target, *speed, 0.0).unwrap_err();
        assert!(matches!(err, MotionEngError::InvalidSpeed(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(eng.pose(), before);
        assert!(eng.is_stationary());
    }
}

/// Run a script through the TC processor the way the exec does, with a synthetic clock.
fn run_script(script: &str) -> DataStore {
    let (mgr, _) = build(cycle_mgr_params(), SimActuator::new());
    let mut ds = DataStore::new(mgr);
    let mut si = ScriptInterpreter::from_script_str(script).unwrap();
    let mut end_of_script = false;

    for i in 0..MAX_STEPS {
        ds.cycle_start_at(1.0 / STEP_S, i as f64 * STEP_S);

        match si.get_pending_tcs_at(ds.sim_time_s) {
            PendingTcs::None => (),
            PendingTcs::Some(tcs) => {
                for tc in tcs.iter() {
                    assert_eq!(tc_processor::exec(&mut ds, tc), TcResponse::Ok);
                }
            }
            PendingTcs::EndOfScript => end_of_script = true,
        }

        ds.cycle_tm = Some(ds.cycle_mgr.step(ds.sim_time_s));

        if end_of_script && !ds.cycle_mgr.state().is_active() {
            return ds;
        }

        ds.cycle_end();
    }

    panic!("Script did not finish within {} steps", MAX_STEPS);
}

#[test]
fn test_demo_script() {
    let ds = run_script(include_str!("../../scripts/demo_2x2.pal"));

    let tm = ds.cycle_mgr.status();
    assert_eq!(tm.state, CycleState::Idle);
    assert_eq!(tm.current_box, 4);
    assert_eq!(tm.error, None);
}

#[test]
fn test_stop_and_fault_script() {
    let ds = run_script(include_str!("../../scripts/stop_and_fault.pal"));

    let tm = ds.cycle_mgr.status();
    assert_eq!(tm.state, CycleState::Idle);
    assert_eq!(tm.current_box, 0);
    assert_eq!(tm.error, None);
}
