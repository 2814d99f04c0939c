//! # Cycle state machine transitions
//!
//! [`transition`] is the only place in which the next state of the cycle is decided. It is a pure
//! function of the current state, the trigger, and the cycle context, and returns the new state
//! along with the side effects the [`super::CycleMgr`] must perform to enter it.
//!
//! | From                       | Trigger           | To      | Side effects                 |
//! |----------------------------|-------------------|---------|------------------------------|
//! | Idle                       | Start             | Homing  | reset progress, move home    |
//! | Homing                     | FinishedHoming    | Picking | begin pick                   |
//! | Picking                    | FinishedPicking   | Placing | fetch place target           |
//! | Placing (boxes remain)     | FinishedPlacing   | Picking | advance box, begin pick      |
//! | Placing (grid exhausted)   | CycleComplete     | Idle    | advance box, clear cycle     |
//! | Homing, Picking, Placing   | Stop              | Idle    | abort motion, clear cycle    |
//! | Idle                       | Stop              | Idle    | none                         |
//! | any                        | Fault             | Fault   | abort motion, record error   |
//! | Fault                      | Reset             | Idle    | clear error, reset progress  |
//!
//! Any other pair is an invalid transition.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::{CycleContext, CycleMgrError};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// States of the palletizing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleState {
    Idle,
    Homing,
    Picking,
    Placing,
    Fault,
}

/// Events which can move the cycle between states.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    Start,
    FinishedHoming,
    FinishedPicking,
    FinishedPlacing,
    CycleComplete,
    Stop,
    Fault(String),
    Reset,
}

/// Actions performed by the manager when entering a new state, in the order given.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    /// Zero the box index and forget any in-flight targets.
    ResetProgress,

    /// Start the homing motion.
    MoveHome,

    /// Wait for a detection and start the pick motion.
    BeginPick,

    /// Take the place target of the current box and start the place motion.
    FetchPlace,

    /// Move on to the next box of the grid.
    AdvanceBox,

    /// Discard the in-flight pick and place targets and any active motion sequence.
    ClearCycle,

    /// Stop the effector where it is.
    AbortMotion,

    /// Store the fault message.
    RecordError(String),

    /// Clear the fault message.
    ClearError,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CycleState {
    /// Returns true if the state is one of the states of a running cycle.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            CycleState::Homing | CycleState::Picking | CycleState::Placing
        )
    }
}

impl Display for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleState::Idle => write!(f, "CycleState::Idle"),
            CycleState::Homing => write!(f, "CycleState::Homing"),
            CycleState::Picking => write!(f, "CycleState::Picking"),
            CycleState::Placing => write!(f, "CycleState::Placing"),
            CycleState::Fault => write!(f, "CycleState::Fault"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Decide the outcome of `trigger` in `state`.
///
/// An `Err` leaves the state machine where it is.
pub fn transition(
    state: CycleState,
    trigger: &Trigger,
    ctx: &CycleContext,
) -> Result<(CycleState, Vec<SideEffect>), CycleMgrError> {
    use CycleState::*;
    use SideEffect::*;

    let total = ctx.total_boxes();
    let invalid = || {
        Err(CycleMgrError::InvalidTransition {
            state,
            trigger: trigger.clone(),
        })
    };

    // No catch-all arm, every (state, trigger) pair is listed
    match (state, trigger) {
        (_, Trigger::Fault(msg)) => Ok((Fault, vec![AbortMotion, RecordError(msg.clone())])),

        (Idle, Trigger::Start) => Ok((Homing, vec![ResetProgress, MoveHome])),
        (Idle, Trigger::Stop) => Ok((Idle, vec![])),
        (Idle, Trigger::FinishedHoming)
        | (Idle, Trigger::FinishedPicking)
        | (Idle, Trigger::FinishedPlacing)
        | (Idle, Trigger::CycleComplete)
        | (Idle, Trigger::Reset) => invalid(),

        (Homing, Trigger::FinishedHoming) => Ok((Picking, vec![BeginPick])),
        (Homing, Trigger::Stop) => Ok((Idle, vec![AbortMotion, ClearCycle])),
        (Homing, Trigger::Start)
        | (Homing, Trigger::FinishedPicking)
        | (Homing, Trigger::FinishedPlacing)
        | (Homing, Trigger::CycleComplete)
        | (Homing, Trigger::Reset) => invalid(),

        (Picking, Trigger::FinishedPicking) => {
            if ctx.box_index < total {
                Ok((Placing, vec![FetchPlace]))
            } else {
                Err(CycleMgrError::NoPlaceTarget(ctx.box_index))
            }
        }
        (Picking, Trigger::Stop) => Ok((Idle, vec![AbortMotion, ClearCycle])),
        (Picking, Trigger::Start)
        | (Picking, Trigger::FinishedHoming)
        | (Picking, Trigger::FinishedPlacing)
        | (Picking, Trigger::CycleComplete)
        | (Picking, Trigger::Reset) => invalid(),

        (Placing, Trigger::FinishedPlacing) if ctx.box_index + 1 < total => {
            Ok((Picking, vec![AdvanceBox, BeginPick]))
        }
        (Placing, Trigger::CycleComplete) if ctx.box_index + 1 >= total => {
            Ok((Idle, vec![AdvanceBox, ClearCycle]))
        }
        (Placing, Trigger::Stop) => Ok((Idle, vec![AbortMotion, ClearCycle])),
        // Completion triggers whose guard does not hold
        (Placing, Trigger::FinishedPlacing)
        | (Placing, Trigger::CycleComplete)
        | (Placing, Trigger::Start)
        | (Placing, Trigger::FinishedHoming)
        | (Placing, Trigger::FinishedPicking)
        | (Placing, Trigger::Reset) => invalid(),

        (Fault, Trigger::Reset) => Ok((Idle, vec![ClearError, ResetProgress, ClearCycle])),
        (Fault, Trigger::Start)
        | (Fault, Trigger::FinishedHoming)
        | (Fault, Trigger::FinishedPicking)
        | (Fault, Trigger::FinishedPlacing)
        | (Fault, Trigger::CycleComplete)
        | (Fault, Trigger::Stop) => invalid(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid_plan::GridSpec;

    fn ctx_2x2() -> CycleContext {
        CycleContext::new(GridSpec {
            rows: 2,
            cols: 2,
            box_size_mm: [100.0, 100.0, 50.0],
            origin_mm: [400.0, -200.0, 100.0],
            spacing_mm: 10.0,
        })
        .unwrap()
    }

    #[test]
    fn test_nominal_path() {
        let ctx = ctx_2x2();

        let (s, fx) = transition(CycleState::Idle, &Trigger::Start, &ctx).unwrap();
        assert_eq!(s, CycleState::Homing);
        assert_eq!(fx, vec![SideEffect::ResetProgress, SideEffect::MoveHome]);

        let (s, _) = transition(s, &Trigger::FinishedHoming, &ctx).unwrap();
        assert_eq!(s, CycleState::Picking);

        let (s, fx) = transition(s, &Trigger::FinishedPicking, &ctx).unwrap();
        assert_eq!(s, CycleState::Placing);
        assert_eq!(fx, vec![SideEffect::FetchPlace]);

        let (s, fx) = transition(s, &Trigger::FinishedPlacing, &ctx).unwrap();
        assert_eq!(s, CycleState::Picking);
        assert_eq!(fx, vec![SideEffect::AdvanceBox, SideEffect::BeginPick]);
    }

    #[test]
    fn test_placing_guards() {
        let mut ctx = ctx_2x2();

        // Boxes remain, the cycle cannot complete
        ctx.box_index = 1;
        assert!(matches!(
            transition(CycleState::Placing, &Trigger::CycleComplete, &ctx),
            Err(CycleMgrError::InvalidTransition { .. })
        ));
        assert!(transition(CycleState::Placing, &Trigger::FinishedPlacing, &ctx).is_ok());

        // Last box, the cycle can only complete
        ctx.box_index = 3;
        assert!(matches!(
            transition(CycleState::Placing, &Trigger::FinishedPlacing, &ctx),
            Err(CycleMgrError::InvalidTransition { .. })
        ));
        let (s, fx) = transition(CycleState::Placing, &Trigger::CycleComplete, &ctx).unwrap();
        assert_eq!(s, CycleState::Idle);
        assert_eq!(fx, vec![SideEffect::AdvanceBox, SideEffect::ClearCycle]);
    }

    #[test]
    fn test_stop() {
        let ctx = ctx_2x2();

        for state in &[CycleState::Homing, CycleState::Picking, CycleState::Placing] {
            let (s, fx) = transition(*state, &Trigger::Stop, &ctx).unwrap();
            assert_eq!(s, CycleState::Idle);
            assert_eq!(fx, vec![SideEffect::AbortMotion, SideEffect::ClearCycle]);
        }

        assert_eq!(
            transition(CycleState::Idle, &Trigger::Stop, &ctx).unwrap(),
            (CycleState::Idle, vec![])
        );
        assert!(transition(CycleState::Fault, &Trigger::Stop, &ctx).is_err());
    }

    #[test]
    fn test_fault_and_reset() {
        let ctx = ctx_2x2();
        let fault = Trigger::Fault("msg".into());

        for state in &[
            CycleState::Idle,
            CycleState::Homing,
            CycleState::Picking,
            CycleState::Placing,
            CycleState::Fault,
        ] {
            let (s, fx) = transition(*state, &fault, &ctx).unwrap();
            assert_eq!(s, CycleState::Fault);
            assert_eq!(
                fx,
                vec![SideEffect::AbortMotion, SideEffect::RecordError("msg".into())]
            );
        }

        let (s, fx) = transition(CycleState::Fault, &Trigger::Reset, &ctx).unwrap();
        assert_eq!(s, CycleState::Idle);
        assert_eq!(fx[0], SideEffect::ClearError);

        assert!(transition(CycleState::Idle, &Trigger::Reset, &ctx).is_err());
    }

    #[test]
    fn test_invalid_pairs() {
        let ctx = ctx_2x2();

        let invalid = [
            (CycleState::Idle, Trigger::FinishedHoming),
            (CycleState::Idle, Trigger::FinishedPicking),
            (CycleState::Homing, Trigger::Start),
            (CycleState::Homing, Trigger::FinishedPicking),
            (CycleState::Picking, Trigger::FinishedHoming),
            (CycleState::Picking, Trigger::CycleComplete),
            (CycleState::Placing, Trigger::Start),
            (CycleState::Placing, Trigger::Reset),
            (CycleState::Fault, Trigger::Start),
            (CycleState::Fault, Trigger::FinishedHoming),
        ];

        for (state, trigger) in invalid.iter() {
            match transition(*state, trigger, &ctx) {
                Err(CycleMgrError::InvalidTransition { state: s, trigger: t }) => {
                    assert_eq!(s, *state);
                    assert_eq!(&t, trigger);
                }
                r => panic!("Expected {:?} + {:?} to be invalid, got {:?}", state, trigger, r),
            }
        }
    }

    #[test]
    fn test_full_table() {
        let mut ctx = ctx_2x2();
        ctx.box_index = 1;

        let states = [
            CycleState::Idle,
            CycleState::Homing,
            CycleState::Picking,
            CycleState::Placing,
            CycleState::Fault,
        ];
        let triggers = [
            Trigger::Start,
            Trigger::FinishedHoming,
            Trigger::FinishedPicking,
            Trigger::FinishedPlacing,
            Trigger::CycleComplete,
            Trigger::Stop,
            Trigger::Fault("msg".into()),
            Trigger::Reset,
        ];
        let accepted = [
            (CycleState::Idle, Trigger::Start),
            (CycleState::Idle, Trigger::Stop),
            (CycleState::Homing, Trigger::FinishedHoming),
            (CycleState::Homing, Trigger::Stop),
            (CycleState::Picking, Trigger::FinishedPicking),
            (CycleState::Picking, Trigger::Stop),
            (CycleState::Placing, Trigger::FinishedPlacing),
            (CycleState::Placing, Trigger::Stop),
            (CycleState::Fault, Trigger::Reset),
        ];

        for state in states.iter() {
            for trigger in triggers.iter() {
                let result = transition(*state, trigger, &ctx);
                let expected = matches!(trigger, Trigger::Fault(_))
                    || accepted.iter().any(|(s, t)| s == state && t == trigger);

                match result {
                    Ok(_) => assert!(expected, "{:?} + {:?} was accepted", state, trigger),
                    Err(CycleMgrError::InvalidTransition { state: s, .. }) => {
                        assert!(!expected, "{:?} + {:?} was rejected", state, trigger);
                        assert_eq!(s, *state);
                    }
                    Err(e) => panic!("{:?} + {:?} gave {:?}", state, trigger, e),
                }
            }
        }
    }

    #[test]
    fn test_state_serialisation() {
        assert_eq!(serde_json::to_string(&CycleState::Idle).unwrap(), "\"IDLE\"");
        assert_eq!(serde_json::to_string(&CycleState::Placing).unwrap(), "\"PLACING\"");
    }
}
