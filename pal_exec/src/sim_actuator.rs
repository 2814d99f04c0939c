//! # Simulated robot driver
//!
//! [`SimActuator`] stands in for the robot driver when no robot is connected. Every demand is
//! accepted immediately: a linear move sets the measured pose to the demanded pose and the gripper
//! acknowledges whatever state it is driven to.
//!
//! Faults can be injected to exercise the error handling of the cycle, and everything the driver
//! is asked to do is recorded in a [`SimRecord`] which can be inspected through a shared handle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, trace, warn};
use std::f64::consts::{FRAC_PI_2, PI};
use std::sync::{Arc, Mutex};

use comms_if::eqpt::robot::{Actuator, ActuatorError, GripperState, Pose};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Pose reported by the simulated robot before it has been moved.
///
/// Units: millimeters, radians
const SIM_INITIAL_POSE: ([f64; 3], [f64; 3]) = ([0.0, -400.0, 400.0], [0.0, PI, 0.0]);

/// Joint angles reported by the simulated robot.
///
/// Units: radians
const SIM_JOINT_ANGLES: [f64; 6] = [0.0, -FRAC_PI_2, FRAC_PI_2, -FRAC_PI_2, -FRAC_PI_2, 0.0];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A simulated robot.
pub struct SimActuator {
    pose: Pose,

    joints: Vec<f64>,

    gripper: GripperState,

    connected: bool,

    /// Linear move number (counted from 1) which will fail, with the error to fail with.
    fail_linear_move: Option<(usize, ActuatorError)>,

    /// State the gripper acknowledges regardless of the demand.
    gripper_ack: Option<GripperState>,

    record: Arc<Mutex<SimRecord>>,
}

/// Everything the simulated robot has been asked to do.
#[derive(Debug, Clone, Default)]
pub struct SimRecord {
    /// Number of linear moves demanded.
    pub num_linear_moves: usize,

    /// Gripper demands, in order.
    pub gripper_demands: Vec<GripperState>,

    /// Pose of the robot each time the gripper was opened.
    pub release_poses: Vec<Pose>,

    /// Number of stop demands.
    pub num_stops: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimActuator {
    pub fn new() -> Self {
        Self {
            pose: Pose::with_orientation(SIM_INITIAL_POSE.0.to_vec(), SIM_INITIAL_POSE.1),
            joints: SIM_JOINT_ANGLES.to_vec(),
            gripper: GripperState::Open,
            connected: true,
            fail_linear_move: None,
            gripper_ack: None,
            record: Arc::new(Mutex::new(SimRecord::default())),
        }
    }

    /// Make the `n`th linear move (counted from 1, including those already made) fail.
    pub fn fail_linear_move(mut self, n: usize, error: ActuatorError) -> Self {
        self.fail_linear_move = Some((n, error));
        self
    }

    /// Make the gripper always acknowledge `state`.
    pub fn ack_gripper_as(mut self, state: GripperState) -> Self {
        self.gripper_ack = Some(state);
        self
    }

    /// Connect or disconnect the simulated robot.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Shared handle to the record of this robot.
    pub fn record(&self) -> Arc<Mutex<SimRecord>> {
        self.record.clone()
    }

    fn check_connected(&self) -> Result<(), ActuatorError> {
        if self.connected {
            Ok(())
        } else {
            Err(ActuatorError::NotConnected)
        }
    }

    fn update_record<F: FnOnce(&mut SimRecord)>(&self, f: F) {
        match self.record.lock() {
            Ok(mut r) => f(&mut r),
            Err(_) => warn!("SimActuator record is poisoned"),
        }
    }
}

impl Default for SimActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl Actuator for SimActuator {
    fn current_pose(&mut self) -> Result<Pose, ActuatorError> {
        self.check_connected()?;
        Ok(self.pose.clone())
    }

    fn current_joint_angles(&mut self) -> Result<Vec<f64>, ActuatorError> {
        self.check_connected()?;
        Ok(self.joints.clone())
    }

    fn linear_move(
        &mut self,
        pose: &Pose,
        velocity: f64,
        acceleration: f64,
    ) -> Result<(), ActuatorError> {
        self.check_connected()?;

        if !(velocity > 0.0 && acceleration > 0.0) {
            return Err(ActuatorError::Rejected(format!(
                "velocity ({}) and acceleration ({}) must be positive",
                velocity, acceleration
            )));
        }

        let mut num_moves = 0;
        self.update_record(|r| {
            r.num_linear_moves += 1;
            num_moves = r.num_linear_moves;
        });

        if let Some((n, ref e)) = self.fail_linear_move {
            if n == num_moves {
                return Err(e.clone());
            }
        }

        trace!("SimActuator moveL to {}", pose);
        self.pose = pose.clone();

        Ok(())
    }

    fn joint_move(
        &mut self,
        angles: &[f64],
        velocity: f64,
        acceleration: f64,
    ) -> Result<(), ActuatorError> {
        self.check_connected()?;

        if angles.len() != self.joints.len() {
            return Err(ActuatorError::Rejected(format!(
                "expected {} joint angles, found {}",
                self.joints.len(),
                angles.len()
            )));
        }

        debug!(
            "SimActuator moveJ to {:?} ({} rad/s, {} rad/s^2)",
            angles, velocity, acceleration
        );
        self.joints = angles.to_vec();

        Ok(())
    }

    fn set_gripper(&mut self, state: GripperState) -> Result<GripperState, ActuatorError> {
        self.check_connected()?;

        let pose = self.pose.clone();
        self.update_record(|r| {
            r.gripper_demands.push(state);
            if state == GripperState::Open {
                r.release_poses.push(pose);
            }
        });

        self.gripper = self.gripper_ack.unwrap_or(state);
        debug!("SimActuator gripper {:?}", self.gripper);

        Ok(self.gripper)
    }

    fn stop_motion(&mut self) -> Result<(), ActuatorError> {
        self.check_connected()?;
        self.update_record(|r| r.num_stops += 1);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_moves_and_record() {
        let mut sim = SimActuator::new();
        let record = sim.record();

        assert_eq!(sim.current_pose().unwrap().axes, vec![0.0, -400.0, 400.0]);
        assert_eq!(sim.current_joint_angles().unwrap().len(), 6);

        let target = Pose::new(vec![1.0, 2.0, 3.0]);
        sim.linear_move(&target, 250.0, 1000.0).unwrap();
        assert_eq!(sim.current_pose().unwrap(), target);

        assert_eq!(sim.set_gripper(GripperState::Closed).unwrap(), GripperState::Closed);
        assert_eq!(sim.set_gripper(GripperState::Open).unwrap(), GripperState::Open);

        let r = record.lock().unwrap();
        assert_eq!(r.num_linear_moves, 1);
        assert_eq!(
            r.gripper_demands,
            vec![GripperState::Closed, GripperState::Open]
        );
        assert_eq!(r.release_poses, vec![target]);
    }

    #[test]
    fn test_injected_faults() {
        let mut sim = SimActuator::new()
            .fail_linear_move(2, ActuatorError::Other("joint 3 overcurrent".into()));
        let p = Pose::new(vec![0.0; 3]);

        assert!(sim.linear_move(&p, 1.0, 1.0).is_ok());
        assert_eq!(
            sim.linear_move(&p, 1.0, 1.0),
            Err(ActuatorError::Other("joint 3 overcurrent".into()))
        );
        assert!(sim.linear_move(&p, 1.0, 1.0).is_ok());

        assert!(matches!(
            sim.linear_move(&p, 0.0, 1.0),
            Err(ActuatorError::Rejected(_))
        ));

        sim.set_connected(false);
        assert_eq!(sim.current_pose(), Err(ActuatorError::NotConnected));
    }

    #[test]
    fn test_gripper_ack_override() {
        let mut sim = SimActuator::new().ack_gripper_as(GripperState::Open);
        assert_eq!(sim.set_gripper(GripperState::Closed).unwrap(), GripperState::Open);
    }

    #[test]
    fn test_joint_move() {
        let mut sim = SimActuator::new();
        assert!(sim.joint_move(&[0.0; 6], 1.0, 1.0).is_ok());
        assert!(sim.joint_move(&[0.0; 5], 1.0, 1.0).is_err());
    }
}
