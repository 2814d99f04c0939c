//! # Cycle manager module
//!
//! This module implements the [`CycleMgr`] state machine, which sequences the palletizing cycle.
//! The cycle is broken down into the states:
//!
//! - `Idle` - No cycle is running. The grid may be configured.
//! - `Homing` - The tool is moving to the home pose.
//! - `Picking` - The tool is waiting for a detection, then picking the detected box.
//! - `Placing` - The tool is placing the box in hand at the place position of the current box.
//! - `Fault` - An error occured during the cycle. Only a reset will return to `Idle`.
//!
//! The decision of which state to move to is made by [`transition`]. The manager applies the side
//! effects of each transition and, in [`CycleMgr::step`], polls the motion sequence of the active
//! state, raising the next trigger when the sequence completes. Any error during an active cycle
//! moves the cycle into `Fault`, with the error text recorded as the fault message.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod context;
mod params;
mod seq;
pub mod tm;
mod transition;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, error, info, trace, warn};
use nalgebra::Point3;

use comms_if::eqpt::{
    robot::{Actuator, ActuatorError, GripperState},
    vision::Detection,
};

pub use self::{
    context::CycleContext,
    params::CycleMgrParams,
    seq::{tool_orientation, MotionSeq, SeqStatus, SeqStep},
    tm::CycleTm,
    transition::{transition, CycleState, SideEffect, Trigger},
};
use crate::{
    coord_tf::{self, CoordTfError, TransformFrame},
    grid_plan::{GridPlanError, GridSpec},
    motion_eng::{MotionEng, MotionEngError},
    ErrorKind,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Cycle Manager
///
/// Owns the cycle context, the motion engine, and the robot driver. All access to them goes
/// through the manager, so that only one state transition can ever be in progress.
pub struct CycleMgr {
    /// Parameters of the manager.
    pub params: CycleMgrParams,

    state: CycleState,

    ctx: CycleContext,

    motion_eng: MotionEng,

    frame: TransformFrame,

    actuator: Box<dyn Actuator>,

    /// The motion sequence of the active state, if one has been started.
    seq: Option<MotionSeq>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors that can occur in the cycle manager.
#[derive(Debug, thiserror::Error)]
pub enum CycleMgrError {
    #[error("Failed to load CycleMgrParams: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("CycleMgr parameters are invalid: {0}")]
    InvalidParams(String),

    #[error("The grid can only be configured when idle (currently {0})")]
    NotIdle(CycleState),

    #[error("Invalid grid: {0}")]
    InvalidGrid(#[from] GridPlanError),

    #[error("Trigger {trigger:?} is not valid in {state}")]
    InvalidTransition { state: CycleState, trigger: Trigger },

    #[error("There is no place position for box {0}")]
    NoPlaceTarget(usize),

    #[error("Trigger {0:?} cannot be fired while the effector is moving")]
    MotionInProgress(Trigger),

    #[error("Motion stalled: move {label} did not complete after {polls} polls ({elapsed_s:.3} s)")]
    MotionStalled {
        label: &'static str,
        elapsed_s: f64,
        polls: usize,
    },

    #[error("{0}")]
    MotionEng(#[from] MotionEngError),

    #[error("{0}")]
    CoordTf(#[from] CoordTfError),

    #[error("{0}")]
    Actuator(#[from] ActuatorError),

    #[error("Gripper demanded {demanded:?} but the robot acknowledged {acknowledged:?}")]
    GripperNotAcknowledged {
        demanded: GripperState,
        acknowledged: GripperState,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CycleMgr {
    /// Initialise the manager from the given parameter file.
    pub fn init(
        params_path: &str,
        motion_eng: MotionEng,
        frame: TransformFrame,
        actuator: Box<dyn Actuator>,
    ) -> Result<Self, CycleMgrError> {
        let params: CycleMgrParams =
            util::params::load(params_path).map_err(CycleMgrError::ParamLoadError)?;

        Self::new(params, motion_eng, frame, actuator)
    }

    /// Create a new manager from already loaded parameters.
    ///
    /// The position of the motion engine is seeded from the pose measured by the robot, if it is
    /// available.
    pub fn new(
        params: CycleMgrParams,
        mut motion_eng: MotionEng,
        frame: TransformFrame,
        mut actuator: Box<dyn Actuator>,
    ) -> Result<Self, CycleMgrError> {
        // Pick and place targets are 3D points
        if motion_eng.num_axes() != 3 {
            return Err(CycleMgrError::InvalidParams(format!(
                "the motion engine must drive 3 axes, found {}",
                motion_eng.num_axes()
            )));
        }
        if params.home_pos_mm.len() != 3 {
            return Err(CycleMgrError::InvalidParams(format!(
                "home_pos_mm must have 3 values, found {}",
                params.home_pos_mm.len()
            )));
        }
        if !(params.speed_pc > 0.0 && params.speed_pc <= 100.0) {
            return Err(CycleMgrError::InvalidParams(format!(
                "speed_pc must be in (0, 100], found {}",
                params.speed_pc
            )));
        }
        if !(params.approach_offset_mm.is_finite() && params.approach_offset_mm >= 0.0) {
            return Err(CycleMgrError::InvalidParams(format!(
                "approach_offset_mm must be non-negative, found {}",
                params.approach_offset_mm
            )));
        }
        if !(params.motion_timeout_s > 0.0) || params.max_polls_per_segment == 0 {
            return Err(CycleMgrError::InvalidParams(
                "motion_timeout_s and max_polls_per_segment must be positive".into(),
            ));
        }

        let ctx = CycleContext::new(params.default_grid)?;

        match actuator.current_pose() {
            Ok(pose) if pose.num_axes() == motion_eng.num_axes() => {
                match motion_eng.set_position(&pose) {
                    Ok(()) => info!("Effector position seeded from robot: {}", pose),
                    Err(e) => warn!("Cannot seed effector position from robot: {}", e),
                }
            }
            Ok(pose) => warn!(
                "Robot reports a {} axis pose, effector position not seeded",
                pose.num_axes()
            ),
            Err(e) => warn!("Cannot read the robot pose: {}", e),
        }

        match actuator.current_joint_angles() {
            Ok(j) => debug!("Robot joint angles: {:?}", j),
            Err(e) => warn!("Cannot read the robot joint angles: {}", e),
        }

        Ok(Self {
            params,
            state: CycleState::Idle,
            ctx,
            motion_eng,
            frame,
            actuator,
            seq: None,
        })
    }

    // ---- COMMANDS ----

    /// Configure the grid of the next cycle.
    ///
    /// Only accepted when idle. On error the current grid is left untouched.
    pub fn configure(&mut self, grid: GridSpec) -> Result<(), CycleMgrError> {
        if self.state != CycleState::Idle {
            return Err(CycleMgrError::NotIdle(self.state));
        }

        let mut ctx = CycleContext::new(grid)?;
        ctx.detection = self.ctx.detection.take();
        self.ctx = ctx;

        info!(
            "Grid configured: {} x {} boxes of {:?} mm from {:?} mm, spacing {} mm",
            grid.rows, grid.cols, grid.box_size_mm, grid.origin_mm, grid.spacing_mm
        );

        Ok(())
    }

    /// Start a cycle.
    pub fn start(&mut self) -> Result<CycleState, CycleMgrError> {
        self.trigger(Trigger::Start)
    }

    /// Stop the cycle, aborting any motion. Stopping when idle does nothing.
    pub fn stop(&mut self) -> Result<CycleState, CycleMgrError> {
        self.trigger(Trigger::Stop)
    }

    /// Clear a fault and return to idle.
    pub fn reset(&mut self) -> Result<CycleState, CycleMgrError> {
        self.trigger(Trigger::Reset)
    }

    /// Put the cycle into fault with the given message.
    pub fn fault<S: Into<String>>(&mut self, message: S) -> Result<CycleState, CycleMgrError> {
        self.trigger(Trigger::Fault(message.into()))
    }

    /// Store the latest detection, to be used by the next pick.
    pub fn set_detection(&mut self, detection: Detection) {
        debug!("New detection: {:?}", detection);
        self.ctx.detection = Some(detection);
    }

    /// Fire a trigger, moving the cycle into a new state.
    ///
    /// If the trigger isn't valid in the current state an error is returned and the state is
    /// unchanged. Completion triggers are refused while the motion engine is moving.
    pub fn trigger(&mut self, trigger: Trigger) -> Result<CycleState, CycleMgrError> {
        // A completed state would start a new sequence on top of the running move
        let completes = matches!(
            trigger,
            Trigger::FinishedHoming
                | Trigger::FinishedPicking
                | Trigger::FinishedPlacing
                | Trigger::CycleComplete
        );
        if completes && !self.motion_eng.is_stationary() {
            let e = CycleMgrError::MotionInProgress(trigger);
            warn!("{}", e);
            return Err(e);
        }

        let (new_state, effects) = match transition(self.state, &trigger, &self.ctx) {
            Ok(t) => t,
            Err(e) => {
                warn!("{}", e);
                return Err(e);
            }
        };

        for effect in effects {
            self.apply(effect);
        }

        if new_state != self.state {
            match new_state {
                CycleState::Fault => error!(
                    "CycleMgr state change to: {} ({})",
                    new_state, self.ctx.error
                ),
                _ => info!(
                    "CycleMgr state change to: {} (box {}/{})",
                    new_state,
                    self.ctx.box_index,
                    self.ctx.total_boxes()
                ),
            }
        }
        self.state = new_state;

        Ok(self.state)
    }

    // ---- PROCESSING ----

    /// Step the active state, `time_s` being the current time.
    ///
    /// Returns the status of the cycle after the step.
    pub fn step(&mut self, time_s: f64) -> CycleTm {
        if self.state.is_active() {
            if let Err(e) = self.step_active(time_s) {
                // Faulting is valid from any state so this cannot be refused
                if let Err(fe) = self.fault(e.to_string()) {
                    error!("Cannot enter fault: {}", fe);
                }
            }
        }

        self.status()
    }

    fn step_active(&mut self, time_s: f64) -> Result<(), CycleMgrError> {
        // A pick sequence can only start once there's a box to pick
        if self.state == CycleState::Picking && self.seq.is_none() {
            match self.ctx.detection.take() {
                Some(d) => self.begin_pick(&d)?,
                None => {
                    trace!("Waiting for a detection");
                    return Ok(());
                }
            }
        }

        let seq = match self.seq.as_mut() {
            Some(s) => s,
            None => return Ok(()),
        };

        let status = seq.poll(
            time_s,
            &mut self.motion_eng,
            self.actuator.as_mut(),
            &self.params,
        )?;

        if status == SeqStatus::Complete {
            self.seq = None;

            let next = match self.state {
                CycleState::Homing => Trigger::FinishedHoming,
                CycleState::Picking => Trigger::FinishedPicking,
                CycleState::Placing if self.ctx.box_index + 1 < self.ctx.total_boxes() => {
                    Trigger::FinishedPlacing
                }
                _ => Trigger::CycleComplete,
            };

            self.trigger(next)?;
        }

        Ok(())
    }

    /// Transform the detection into the robot frame and start the pick sequence.
    fn begin_pick(&mut self, detection: &Detection) -> Result<(), CycleMgrError> {
        let pick = coord_tf::to_robot_frame(
            &Point3::new(detection.x_mm, detection.y_mm, detection.z_mm),
            &self.frame,
        )?;
        let heading_rad =
            coord_tf::heading_to_robot_frame(detection.yaw_deg.to_radians(), &self.frame)?;
        let orientation = tool_orientation(self.params.tool_orientation_rad, heading_rad);

        info!(
            "Picking box {} at [{:.3}, {:.3}, {:.3}] mm (heading {:.2} deg)",
            self.ctx.box_index,
            pick.x,
            pick.y,
            pick.z,
            heading_rad.to_degrees()
        );

        self.ctx.pick_position = Some(pick);
        self.seq = Some(MotionSeq::pick(&pick, orientation, &self.params));

        Ok(())
    }

    fn apply(&mut self, effect: SideEffect) {
        trace!("Applying {:?}", effect);

        match effect {
            SideEffect::ResetProgress => self.ctx.reset_progress(),
            SideEffect::MoveHome => self.seq = Some(MotionSeq::homing(&self.params)),
            SideEffect::BeginPick => {
                self.ctx.pick_position = None;
                self.seq = None;
            }
            SideEffect::FetchPlace => {
                // The transition guarantees the index is inside the grid
                if let Some(target) = self.ctx.place_positions.get(self.ctx.box_index).copied() {
                    info!(
                        "Placing box {} at [{:.3}, {:.3}, {:.3}] mm",
                        self.ctx.box_index, target.x, target.y, target.z
                    );
                    self.ctx.place_target = Some(target);
                    self.seq = Some(MotionSeq::place(&target, &self.params));
                }
            }
            SideEffect::AdvanceBox => {
                self.ctx.box_index += 1;
                self.ctx.clear_in_flight();
            }
            SideEffect::ClearCycle => {
                self.ctx.clear_in_flight();
                self.seq = None;
            }
            SideEffect::AbortMotion => {
                self.seq = None;
                self.motion_eng.abort();
                if let Err(e) = self.actuator.stop_motion() {
                    warn!("Robot failed to stop: {}", e);
                }
            }
            SideEffect::RecordError(msg) => self.ctx.error = msg,
            SideEffect::ClearError => self.ctx.error.clear(),
        }
    }

    // ---- ACCESSORS ----

    /// Current state of the cycle.
    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Status report of the cycle.
    pub fn status(&self) -> CycleTm {
        CycleTm {
            state: self.state,
            current_box: self.ctx.box_index,
            total_boxes: self.ctx.total_boxes(),
            error: if self.ctx.error.is_empty() {
                None
            } else {
                Some(self.ctx.error.clone())
            },
        }
    }

    pub fn context(&self) -> &CycleContext {
        &self.ctx
    }

    pub fn motion_eng(&self) -> &MotionEng {
        &self.motion_eng
    }

    pub fn frame(&self) -> &TransformFrame {
        &self.frame
    }

    /// The active motion sequence, if any.
    pub fn seq(&self) -> Option<&MotionSeq> {
        self.seq.as_ref()
    }
}

impl CycleMgrError {
    /// Get the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CycleMgrError::ParamLoadError(_) | CycleMgrError::InvalidParams(_) => ErrorKind::Config,
            CycleMgrError::NotIdle(_)
            | CycleMgrError::InvalidTransition { .. }
            | CycleMgrError::NoPlaceTarget(_)
            | CycleMgrError::MotionInProgress(_) => ErrorKind::Usage,
            CycleMgrError::InvalidGrid(e) => e.kind(),
            CycleMgrError::MotionStalled { .. } => ErrorKind::MotionStalled,
            CycleMgrError::MotionEng(e) => e.kind(),
            CycleMgrError::CoordTf(e) => e.kind(),
            CycleMgrError::Actuator(_) | CycleMgrError::GripperNotAcknowledged { .. } => {
                ErrorKind::Actuator
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::motion_eng::{AxisLimits, MotionEngParams};
    use crate::sim_actuator::SimActuator;

    fn test_params() -> CycleMgrParams {
        util::params::from_str(include_str!("../../../params/cycle_mgr.toml")).unwrap()
    }

    fn test_mgr() -> CycleMgr {
        let motion_eng = MotionEng::new(MotionEngParams {
            num_axes: 3,
            initial_pos: vec![0.0, -400.0, 400.0],
            limits: AxisLimits {
                min_pos: vec![-1000.0; 3],
                max_pos: vec![1000.0; 3],
                max_rate_mms: 100.0,
            },
        })
        .unwrap();

        CycleMgr::new(
            test_params(),
            motion_eng,
            TransformFrame::identity(),
            Box::new(SimActuator::new()),
        )
        .unwrap()
    }

    fn grid_3x1() -> GridSpec {
        GridSpec {
            rows: 1,
            cols: 3,
            box_size_mm: [100.0, 100.0, 50.0],
            origin_mm: [400.0, -200.0, 100.0],
            spacing_mm: 10.0,
        }
    }

    #[test]
    fn test_defaults() {
        let mgr = test_mgr();

        assert_eq!(
            mgr.status(),
            CycleTm {
                state: CycleState::Idle,
                current_box: 0,
                total_boxes: 4,
                error: None
            }
        );
        assert_eq!(mgr.context().place_positions[1], Point3::new(510.0, -200.0, 100.0));
    }

    #[test]
    fn test_configure_only_when_idle() {
        let mut mgr = test_mgr();

        mgr.configure(grid_3x1()).unwrap();
        assert_eq!(mgr.status().total_boxes, 3);

        mgr.start().unwrap();
        let err = mgr.configure(GridSpec {
            rows: 5,
            ..grid_3x1()
        });
        assert!(matches!(err, Err(CycleMgrError::NotIdle(CycleState::Homing))));
        assert_eq!(err.unwrap_err().kind(), ErrorKind::Usage);
        assert_eq!(mgr.context().grid, grid_3x1());
        assert_eq!(mgr.status().total_boxes, 3);
        assert_eq!(mgr.state(), CycleState::Homing);
    }

    #[test]
    fn test_invalid_configure_keeps_grid() {
        let mut mgr = test_mgr();
        mgr.configure(grid_3x1()).unwrap();

        let err = mgr
            .configure(GridSpec {
                cols: 0,
                ..grid_3x1()
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(mgr.context().grid, grid_3x1());
        assert_eq!(mgr.state(), CycleState::Idle);
    }

    #[test]
    fn test_trigger_sequence() {
        let mut mgr = test_mgr();

        assert_eq!(mgr.start().unwrap(), CycleState::Homing);
        assert_eq!(mgr.trigger(Trigger::FinishedHoming).unwrap(), CycleState::Picking);
        assert_eq!(mgr.trigger(Trigger::FinishedPicking).unwrap(), CycleState::Placing);
        assert!(mgr.context().place_target.is_some());
        assert_eq!(mgr.trigger(Trigger::FinishedPlacing).unwrap(), CycleState::Picking);
        assert_eq!(mgr.status().current_box, 1);

        // Not the last box yet
        mgr.trigger(Trigger::FinishedPicking).unwrap();
        assert!(mgr.trigger(Trigger::CycleComplete).is_err());
        assert_eq!(mgr.state(), CycleState::Placing);

        mgr.trigger(Trigger::FinishedPlacing).unwrap();
        mgr.trigger(Trigger::FinishedPicking).unwrap();
        mgr.trigger(Trigger::FinishedPlacing).unwrap();
        mgr.trigger(Trigger::FinishedPicking).unwrap();
        assert_eq!(mgr.status().current_box, 3);

        assert_eq!(mgr.trigger(Trigger::CycleComplete).unwrap(), CycleState::Idle);
        assert_eq!(mgr.status().current_box, 4);
        assert_eq!(mgr.status().total_boxes, 4);
    }

    #[test]
    fn test_stop_clears_targets() {
        for n in 0..3 {
            let mut mgr = test_mgr();
            mgr.start().unwrap();

            if n > 0 {
                mgr.trigger(Trigger::FinishedHoming).unwrap();
            }
            if n == 1 {
                mgr.set_detection(Detection {
                    x_mm: 300.0,
                    y_mm: 0.0,
                    z_mm: 50.0,
                    yaw_deg: 0.0,
                });
                mgr.step(0.0);
                assert!(mgr.context().pick_position.is_some());
                assert!(!mgr.motion_eng().is_stationary());
            }
            if n == 2 {
                mgr.trigger(Trigger::FinishedPicking).unwrap();
                assert!(mgr.context().place_target.is_some());
                mgr.step(0.0);
                assert!(!mgr.motion_eng().is_stationary());
            }

            assert_eq!(mgr.stop().unwrap(), CycleState::Idle);
            assert!(mgr.context().pick_position.is_none());
            assert!(mgr.context().place_target.is_none());
            assert!(mgr.seq().is_none());
            assert!(mgr.motion_eng().is_stationary());
        }

        // Stopping when idle is fine
        let mut mgr = test_mgr();
        assert_eq!(mgr.stop().unwrap(), CycleState::Idle);
    }

    #[test]
    fn test_completion_refused_while_moving() {
        let mut mgr = test_mgr();
        mgr.start().unwrap();
        mgr.trigger(Trigger::FinishedHoming).unwrap();
        mgr.set_detection(Detection {
            x_mm: 300.0,
            y_mm: 0.0,
            z_mm: 50.0,
            yaw_deg: 0.0,
        });

        // The pick approach is now under way
        mgr.step(0.0);
        assert!(!mgr.motion_eng().is_stationary());

        let err = mgr.trigger(Trigger::FinishedPicking).unwrap_err();
        assert!(matches!(
            err,
            CycleMgrError::MotionInProgress(Trigger::FinishedPicking)
        ));
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(mgr.state(), CycleState::Picking);
        assert!(mgr.context().place_target.is_none());

        // The pick carries on without faulting
        let tm = mgr.step(0.02);
        assert_eq!(tm.state, CycleState::Picking);
        assert_eq!(tm.error, None);
        assert!(mgr.seq().is_some());

        // Stop and fault are still accepted mid-motion
        assert_eq!(mgr.stop().unwrap(), CycleState::Idle);
        assert!(mgr.motion_eng().is_stationary());
    }

    #[test]
    fn test_fault_and_reset() {
        let mut mgr = test_mgr();
        mgr.start().unwrap();
        mgr.trigger(Trigger::FinishedHoming).unwrap();

        assert_eq!(mgr.fault("msg").unwrap(), CycleState::Fault);
        assert_eq!(mgr.status().error, Some("msg".to_string()));

        // Fault is terminal until reset
        assert!(mgr.start().is_err());
        assert!(mgr.stop().is_err());
        assert!(mgr.configure(grid_3x1()).is_err());
        assert_eq!(mgr.state(), CycleState::Fault);

        assert_eq!(mgr.reset().unwrap(), CycleState::Idle);
        assert_eq!(mgr.status().error, None);
        assert_eq!(mgr.status().current_box, 0);

        // Fault from idle is also possible
        assert_eq!(mgr.fault("from idle").unwrap(), CycleState::Fault);
    }

    #[test]
    fn test_step_idle_does_nothing() {
        let mut mgr = test_mgr();
        let before = mgr.motion_eng().pose();

        let tm = mgr.step(1.0);
        assert_eq!(tm.state, CycleState::Idle);
        assert_eq!(mgr.motion_eng().pose(), before);
    }

    #[test]
    fn test_picking_waits_for_detection() {
        let mut mgr = test_mgr();
        mgr.start().unwrap();
        mgr.trigger(Trigger::FinishedHoming).unwrap();

        for i in 0..10 {
            assert_eq!(mgr.step(i as f64).state, CycleState::Picking);
        }
        assert!(mgr.seq().is_none());
        assert!(mgr.context().pick_position.is_none());
    }

    #[test]
    fn test_invalid_params() {
        let motion_eng = || {
            MotionEng::new(MotionEngParams {
                num_axes: 3,
                initial_pos: vec![0.0; 3],
                limits: AxisLimits {
                    min_pos: vec![-1000.0; 3],
                    max_pos: vec![1000.0; 3],
                    max_rate_mms: 100.0,
                },
            })
            .unwrap()
        };

        let mut params = test_params();
        params.speed_pc = 0.0;
        assert!(matches!(
            CycleMgr::new(params, motion_eng(), TransformFrame::identity(), Box::new(SimActuator::new())),
            Err(CycleMgrError::InvalidParams(_))
        ));

        let mut params = test_params();
        params.default_grid.rows = 0;
        assert!(matches!(
            CycleMgr::new(params, motion_eng(), TransformFrame::identity(), Box::new(SimActuator::new())),
            Err(CycleMgrError::InvalidGrid(GridPlanError::InvalidRows))
        ));
    }
}
