//! # Motion sequences
//!
//! A sequence is the list of moves and gripper actions performed in one state of the cycle. The
//! sequence is polled once per control cycle. A move is polled through the motion engine until
//! the engine reports zero velocity, and each engine output is forwarded to the robot driver.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, trace};
use nalgebra::{Point3, UnitQuaternion, Vector3};
use std::collections::VecDeque;

use comms_if::eqpt::robot::{Actuator, GripperState, Pose};
use util::maths::all_zero;

use super::{CycleMgrError, CycleMgrParams};
use crate::motion_eng::MotionEng;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An ordered sequence of steps.
#[derive(Debug)]
pub struct MotionSeq {
    steps: VecDeque<SeqStep>,

    /// Time the current step was first polled at.
    step_start_s: Option<f64>,

    /// Number of times the current step has been polled.
    step_polls: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// One step of a sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum SeqStep {
    /// Move the tool to the pose.
    Move { label: &'static str, pose: Pose },

    /// Drive the gripper, the driver must acknowledge the demanded state.
    Grip(GripperState),
}

/// Result of polling a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqStatus {
    Running,
    Complete,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotionSeq {
    pub fn new(steps: Vec<SeqStep>) -> Self {
        Self {
            steps: steps.into(),
            step_start_s: None,
            step_polls: 0,
        }
    }

    /// Move to the home pose.
    pub fn homing(params: &CycleMgrParams) -> Self {
        Self::new(vec![SeqStep::Move {
            label: "home",
            pose: Pose::with_orientation(params.home_pos_mm.clone(), params.tool_orientation_rad),
        }])
    }

    /// Approach, descend, close the gripper and retract.
    pub fn pick(pick: &Point3<f64>, orientation: [f64; 3], params: &CycleMgrParams) -> Self {
        let above = offset_pose(pick, params.approach_offset_mm, orientation);

        Self::new(vec![
            SeqStep::Move {
                label: "pick approach",
                pose: above.clone(),
            },
            SeqStep::Move {
                label: "pick",
                pose: offset_pose(pick, 0.0, orientation),
            },
            SeqStep::Grip(GripperState::Closed),
            SeqStep::Move {
                label: "pick retract",
                pose: above,
            },
        ])
    }

    /// Approach, descend, open the gripper and retract.
    pub fn place(place: &Point3<f64>, params: &CycleMgrParams) -> Self {
        let orientation = params.tool_orientation_rad;
        let above = offset_pose(place, params.approach_offset_mm, orientation);

        Self::new(vec![
            SeqStep::Move {
                label: "place approach",
                pose: above.clone(),
            },
            SeqStep::Move {
                label: "place",
                pose: offset_pose(place, 0.0, orientation),
            },
            SeqStep::Grip(GripperState::Open),
            SeqStep::Move {
                label: "place retract",
                pose: above,
            },
        ])
    }

    /// Steps not yet completed.
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    /// Perform one poll of the current step.
    pub fn poll(
        &mut self,
        time_s: f64,
        motion_eng: &mut MotionEng,
        actuator: &mut dyn Actuator,
        params: &CycleMgrParams,
    ) -> Result<SeqStatus, CycleMgrError> {
        let step_done = match self.steps.front() {
            None => return Ok(SeqStatus::Complete),
            Some(SeqStep::Move { label, pose }) => {
                let start_s = *self.step_start_s.get_or_insert(time_s);
                let elapsed_s = time_s - start_s;

                if elapsed_s > params.motion_timeout_s
                    || self.step_polls >= params.max_polls_per_segment
                {
                    return Err(CycleMgrError::MotionStalled {
                        label: *label,
                        elapsed_s,
                        polls: self.step_polls,
                    });
                }
                self.step_polls += 1;

                let (current, velocity) = motion_eng.move_to_at(pose, params.speed_pc, time_s)?;
                actuator.linear_move(&current, params.lin_vel_mms, params.lin_acc_mmss)?;

                trace!("Move {}: {}", label, current);

                let arrived = all_zero(&velocity);
                if arrived {
                    debug!(
                        "Move {} complete after {} polls ({:.3} s)",
                        label, self.step_polls, elapsed_s
                    );
                }
                arrived
            }
            Some(SeqStep::Grip(demand)) => {
                let ack = actuator.set_gripper(*demand)?;
                if ack != *demand {
                    return Err(CycleMgrError::GripperNotAcknowledged {
                        demanded: *demand,
                        acknowledged: ack,
                    });
                }
                debug!("Gripper {:?}", ack);
                true
            }
        };

        if step_done {
            self.steps.pop_front();
            self.step_start_s = None;
            self.step_polls = 0;
        }

        if self.steps.is_empty() {
            Ok(SeqStatus::Complete)
        } else {
            Ok(SeqStatus::Running)
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Orientation of the tool for a box whose heading in the robot frame is `heading_rad`.
///
/// The default (pointing down) orientation is rotated about the robot Z axis by the heading.
pub fn tool_orientation(default_rad: [f64; 3], heading_rad: f64) -> [f64; 3] {
    let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), heading_rad)
        * UnitQuaternion::from_scaled_axis(Vector3::from(default_rad));
    let v = q.scaled_axis();

    [v.x, v.y, v.z]
}

fn offset_pose(point: &Point3<f64>, dz_mm: f64, orientation: [f64; 3]) -> Pose {
    Pose::with_orientation(vec![point.x, point.y, point.z + dz_mm], orientation)
}
