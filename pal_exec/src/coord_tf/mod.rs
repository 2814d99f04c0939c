//! # Coordinate transform module
//!
//! Maps points between the camera (sensor) frame and the robot base frame. The two frames are
//! related by a fixed rigid transform, a rotation `R` and translation `t`:
//!
//! - sensor to robot: `p_r = R·p_s + t`
//! - robot to sensor: `p_s = Rᵀ·(p_r - t)`
//!
//! Rotations are built from roll, pitch and yaw as `R = Rz(yaw)·Ry(pitch)·Rx(roll)`, that is roll
//! about X is applied first, then pitch about Y, then yaw about Z, all about the fixed axes of the
//! base frame. Pick accuracy depends on this order, do not change it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Isometry3, Matrix4, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

pub use params::CoordTfParams;

use crate::ErrorKind;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A rigid transform from the sensor frame into the robot base frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformFrame {
    /// Rotation of the sensor frame in the base frame.
    pub rotation: Rotation3<f64>,

    /// Position of the sensor frame origin in the base frame.
    ///
    /// Units: millimeters
    pub translation: Vector3<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors that can occur in coordinate transformations.
#[derive(Debug, thiserror::Error)]
pub enum CoordTfError {
    #[error("Failed to load CoordTf parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid rotation angles (roll {0}, pitch {1}, yaw {2}), all angles must be finite")]
    InvalidRotation(f64, f64, f64),

    #[error("Invalid translation {0:?}, all components must be finite")]
    InvalidTranslation([f64; 3]),

    #[error("Cannot transform the non-finite point {0:?}")]
    NonFinitePoint([f64; 3]),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TransformFrame {
    /// Create a new frame from a rotation and a translation.
    pub fn new(rotation: Rotation3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// The frame in which sensor and robot coordinates coincide.
    pub fn identity() -> Self {
        Self::new(Rotation3::identity(), Vector3::zeros())
    }

    /// Load the frame from the given parameter file.
    pub fn init(params_path: &str) -> Result<Self, CoordTfError> {
        let params: CoordTfParams =
            util::params::load(params_path).map_err(CoordTfError::ParamLoadError)?;

        Self::from_params(&params)
    }

    /// Build the frame from the camera mounting parameters.
    pub fn from_params(params: &CoordTfParams) -> Result<Self, CoordTfError> {
        let rotation = build_rotation(
            params.mount_roll_deg.to_radians(),
            params.mount_pitch_deg.to_radians(),
            params.mount_yaw_deg.to_radians(),
        )?;

        let t = params.translation_mm;
        if t.iter().any(|v| !v.is_finite()) {
            return Err(CoordTfError::InvalidTranslation(t));
        }

        Ok(Self::new(rotation, Vector3::new(t[0], t[1], t[2])))
    }

    /// The 4x4 homogeneous matrix of this frame.
    pub fn to_homogeneous(&self) -> Matrix4<f64> {
        build_homogeneous(&self.rotation, &self.translation)
    }
}

impl CoordTfError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordTfError::ParamLoadError(_) => ErrorKind::Config,
            _ => ErrorKind::Validation,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build a rotation from roll, pitch and yaw angles, as `R = Rz(yaw)·Ry(pitch)·Rx(roll)`.
///
/// Units: radians
pub fn build_rotation(roll: f64, pitch: f64, yaw: f64) -> Result<Rotation3<f64>, CoordTfError> {
    if !(roll.is_finite() && pitch.is_finite() && yaw.is_finite()) {
        return Err(CoordTfError::InvalidRotation(roll, pitch, yaw));
    }

    let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), roll);
    let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), pitch);
    let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), yaw);

    Ok(rz * ry * rx)
}

/// Build the 4x4 homogeneous matrix of a rotation and translation.
pub fn build_homogeneous(rotation: &Rotation3<f64>, translation: &Vector3<f64>) -> Matrix4<f64> {
    Isometry3::from_parts(
        Translation3::from(*translation),
        UnitQuaternion::from_rotation_matrix(rotation),
    )
    .to_homogeneous()
}

/// Transform a point from the sensor frame into the robot base frame.
pub fn to_robot_frame(
    point: &Point3<f64>,
    frame: &TransformFrame,
) -> Result<Point3<f64>, CoordTfError> {
    check_finite(point)?;

    Ok(frame.rotation * point + frame.translation)
}

/// Transform a point from the robot base frame into the sensor frame.
pub fn to_sensor_frame(
    point: &Point3<f64>,
    frame: &TransformFrame,
) -> Result<Point3<f64>, CoordTfError> {
    check_finite(point)?;

    Ok(frame.rotation.inverse() * (point - frame.translation))
}

/// Convert a heading about the sensor Z axis into a heading about the robot base Z axis.
///
/// The sensor-frame direction of the heading is rotated into the base frame and projected onto
/// the base XY plane.
///
/// Units: radians
pub fn heading_to_robot_frame(yaw: f64, frame: &TransformFrame) -> Result<f64, CoordTfError> {
    if !yaw.is_finite() {
        return Err(CoordTfError::InvalidRotation(0.0, 0.0, yaw));
    }

    let dir = frame.rotation * Vector3::new(yaw.cos(), yaw.sin(), 0.0);

    Ok(dir.y.atan2(dir.x))
}

fn check_finite(point: &Point3<f64>) -> Result<(), CoordTfError> {
    if point.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(CoordTfError::NonFinitePoint([point.x, point.y, point.z]))
    }
}
