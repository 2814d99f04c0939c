//! Implementations for the MotionEng state structure

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::{debug, trace};
use serde::Serialize;
use std::time::Instant;

// Internal
use super::{MotionEngError, MotionEngParams};
use comms_if::eqpt::robot::Pose;
use util::maths::{all_finite, all_zero, norm};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Kinematic motion engine
pub struct MotionEng {
    params: MotionEngParams,

    state: MotionState,

    /// Instant the engine was created at, the reference of the wall-clock variant of `move_to`.
    epoch: Instant,
}

/// The motion state of the effector.
///
/// The velocity is all zero exactly when the effector is stationary, either because it has never
/// been commanded or because it has arrived at its target.
#[derive(Debug, Clone, Serialize)]
pub struct MotionState {
    /// Position of each axis.
    ///
    /// Units: millimeters
    pub position: Vec<f64>,

    /// Velocity of each axis.
    ///
    /// Units: millimeters/second
    pub velocity: Vec<f64>,

    /// Time of the last integration step.
    ///
    /// Units: seconds
    pub last_update_s: f64,

    /// The target being driven to, `None` when stationary.
    pub target: Option<Vec<f64>>,

    /// Tool orientation of the most recent target, passed through to returned poses.
    pub orientation: Option<[f64; 3]>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotionEng {
    /// Initialise the engine from the given parameter file.
    pub fn init(params_path: &str) -> Result<Self, MotionEngError> {
        let params: MotionEngParams =
            util::params::load(params_path).map_err(MotionEngError::ParamLoadError)?;

        Self::new(params)
    }

    /// Create a new engine from already loaded parameters.
    pub fn new(params: MotionEngParams) -> Result<Self, MotionEngError> {
        let n = params.num_axes;

        if n == 0 {
            return Err(MotionEngError::InvalidParams("num_axes must be at least 1".into()));
        }

        for (name, v) in [
            ("initial_pos", &params.initial_pos),
            ("limits.min_pos", &params.limits.min_pos),
            ("limits.max_pos", &params.limits.max_pos),
        ]
        .iter()
        {
            if v.len() != n {
                return Err(MotionEngError::InvalidParams(format!(
                    "{} has {} values, expected {}",
                    name,
                    v.len(),
                    n
                )));
            }
        }

        if !(params.limits.max_rate_mms > 0.0) || !params.limits.max_rate_mms.is_finite() {
            return Err(MotionEngError::InvalidParams(format!(
                "limits.max_rate_mms must be positive and finite, found {}",
                params.limits.max_rate_mms
            )));
        }

        let state = MotionState {
            position: params.initial_pos.clone(),
            velocity: vec![0.0; n],
            last_update_s: 0.0,
            target: None,
            orientation: None,
        };

        // Initial position must itself be inside the limits
        let eng = Self {
            params,
            state,
            epoch: Instant::now(),
        };
        eng.check_limits(&eng.state.position)
            .map_err(|e| MotionEngError::InvalidParams(format!("initial_pos: {}", e)))?;

        Ok(eng)
    }

    /// Drive the effector towards `target` at `speed_pc` percent of the maximum rate, using the
    /// wall clock as the time source.
    ///
    /// Returns the current pose and per-axis velocity. The move is complete when the returned
    /// velocity is all zero.
    pub fn move_to(
        &mut self,
        target: &Pose,
        speed_pc: f64,
    ) -> Result<(Pose, Vec<f64>), MotionEngError> {
        let time_s = self.epoch.elapsed().as_secs_f64();
        self.move_to_at(target, speed_pc, time_s)
    }

    /// Drive the effector towards `target`, with the current time supplied by the caller.
    ///
    /// Invalid requests return an error and leave the motion state unchanged.
    pub fn move_to_at(
        &mut self,
        target: &Pose,
        speed_pc: f64,
        time_s: f64,
    ) -> Result<(Pose, Vec<f64>), MotionEngError> {
        // ---- VALIDATION ----

        // Negated so that NaN is rejected as well
        if !(speed_pc > 0.0 && speed_pc <= 100.0) {
            return Err(MotionEngError::InvalidSpeed(speed_pc));
        }

        if target.num_axes() != self.params.num_axes {
            return Err(MotionEngError::DimensionMismatch {
                expected: self.params.num_axes,
                found: target.num_axes(),
            });
        }

        if !all_finite(&target.axes) || !target.orientation.map_or(true, |o| all_finite(&o)) {
            return Err(MotionEngError::NonFiniteTarget(target.axes.clone()));
        }

        self.check_limits(&target.axes)?;

        // ---- PLANNING ----

        if self.is_stationary() {
            // Already at the target, only the orientation is taken on
            if target.axes == self.state.position {
                self.state.orientation = target.orientation;
                return Ok((self.pose(), self.velocity()));
            }

            self.plan(target, speed_pc, time_s);
        } else if self.state.target.as_ref() != Some(&target.axes) {
            return Err(MotionEngError::Retarget(
                self.state.target.clone().unwrap_or_default(),
            ));
        }

        // ---- INTEGRATION ----

        let dt_s = (time_s - self.state.last_update_s).max(0.0);

        for (p, v) in self
            .state
            .position
            .iter_mut()
            .zip(self.state.velocity.iter())
        {
            *p += v * dt_s;
        }
        self.state.last_update_s = time_s;

        // ---- ARRIVAL ----

        // An axis has arrived once its remaining delta is no longer in the direction of travel.
        let arrived = target
            .axes
            .iter()
            .zip(self.state.position.iter())
            .zip(self.state.velocity.iter())
            .all(|((t, p), v)| (t - p) * v <= 0.0);

        if arrived {
            // Snap exactly to the target to remove integration drift
            self.state.position = target.axes.clone();
            self.state.velocity.iter_mut().for_each(|v| *v = 0.0);
            self.state.target = None;

            debug!("MotionEng arrived at {}", self.pose());
        } else {
            trace!(
                "MotionEng position {:?}, velocity {:?}",
                self.state.position,
                self.state.velocity
            );
        }

        Ok((self.pose(), self.velocity()))
    }

    /// Stop in place, forgetting the current target.
    pub fn abort(&mut self) {
        if !self.is_stationary() {
            debug!("MotionEng motion aborted at {}", self.pose());
        }

        self.state.velocity.iter_mut().for_each(|v| *v = 0.0);
        self.state.target = None;
    }

    /// Set the position of the effector, for instance from the pose measured by the robot.
    ///
    /// Only allowed while stationary.
    pub fn set_position(&mut self, pose: &Pose) -> Result<(), MotionEngError> {
        if !self.is_stationary() {
            return Err(MotionEngError::NotStationary);
        }

        if pose.num_axes() != self.params.num_axes {
            return Err(MotionEngError::DimensionMismatch {
                expected: self.params.num_axes,
                found: pose.num_axes(),
            });
        }

        if !all_finite(&pose.axes) {
            return Err(MotionEngError::NonFiniteTarget(pose.axes.clone()));
        }

        self.check_limits(&pose.axes)?;

        self.state.position = pose.axes.clone();
        self.state.orientation = pose.orientation;

        Ok(())
    }

    /// Returns true if the effector is not moving.
    pub fn is_stationary(&self) -> bool {
        all_zero(&self.state.velocity)
    }

    /// Current pose of the effector.
    pub fn pose(&self) -> Pose {
        Pose {
            axes: self.state.position.clone(),
            orientation: self.state.orientation,
        }
    }

    /// Current velocity of each axis.
    pub fn velocity(&self) -> Vec<f64> {
        self.state.velocity.clone()
    }

    /// The full motion state.
    pub fn state(&self) -> &MotionState {
        &self.state
    }

    /// Number of axes the engine drives.
    pub fn num_axes(&self) -> usize {
        self.params.num_axes
    }

    /// Plan a coordinated move to the target.
    fn plan(&mut self, target: &Pose, speed_pc: f64, time_s: f64) {
        let delta: Vec<f64> = target
            .axes
            .iter()
            .zip(self.state.position.iter())
            .map(|(t, p)| t - p)
            .collect();

        // The dominant axis sets the duration of the move
        let dominant_delta = delta.iter().fold(0f64, |acc, d| acc.max(d.abs()));
        let rate_mms = self.params.limits.max_rate_mms * speed_pc / 100.0;
        let duration_s = dominant_delta / rate_mms;

        self.state.velocity = delta.iter().map(|d| d / duration_s).collect();
        self.state.target = Some(target.axes.clone());
        self.state.orientation = target.orientation;
        self.state.last_update_s = time_s;

        debug!(
            "MotionEng planned {:.1} mm move to {} at {} % ({:.3} s), velocity {:?}",
            norm(&target.axes, &self.state.position).unwrap_or(dominant_delta),
            target,
            speed_pc,
            duration_s,
            self.state.velocity
        );
    }

    fn check_limits(&self, axes: &[f64]) -> Result<(), MotionEngError> {
        let limits = &self.params.limits;

        for (axis, value) in axes.iter().enumerate() {
            let (min, max) = (limits.min_pos[axis], limits.max_pos[axis]);
            if *value < min || *value > max {
                return Err(MotionEngError::LimitExceeded {
                    axis,
                    value: *value,
                    min,
                    max,
                });
            }
        }

        Ok(())
    }
}
