//! # Telecommand processor module
//!
//! The telecommand processor handles TCs coming from any source (script, operator or vision
//! system) and applies them to the cycle manager.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use nalgebra::Point3;

// Internal
use crate::{coord_tf, data_store::DataStore, grid_plan::GridSpec};
use comms_if::{
    eqpt::vision::Detection,
    tc::{Tc, TcResponse},
};

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Mutates the datastore to send commands to the cycle manager. TCs which are rejected leave the
/// state of the cycle untouched and return `CannotExecute` with the reason.
pub fn exec(ds: &mut DataStore, tc: &Tc) -> TcResponse {
    debug!("Recieved {:?}", tc);

    let result = match tc {
        Tc::Configure(cmd) => ds
            .cycle_mgr
            .configure(GridSpec::from(cmd))
            .map_err(|e| e.to_string()),
        Tc::Start => ds.cycle_mgr.start().map(|_| ()).map_err(|e| e.to_string()),
        Tc::Stop => ds.cycle_mgr.stop().map(|_| ()).map_err(|e| e.to_string()),
        Tc::Reset => ds.cycle_mgr.reset().map(|_| ()).map_err(|e| e.to_string()),
        Tc::Fault { message } => ds
            .cycle_mgr
            .fault(message.as_str())
            .map(|_| ())
            .map_err(|e| e.to_string()),
        Tc::Detect(d) => {
            ds.cycle_mgr.set_detection(*d);
            Ok(())
        }
        Tc::Status => {
            let tm = ds.cycle_mgr.status();
            match serde_json::to_string(&tm) {
                Ok(s) => info!("Status: {}", s),
                Err(e) => warn!("Cannot serialise the status: {}", e),
            }
            ds.cycle_tm = Some(tm);
            Ok(())
        }
        Tc::Positions => {
            let ctx = ds.cycle_mgr.context();
            info!(
                "{} place positions for a {} x {} grid:",
                ctx.place_positions.len(),
                ctx.grid.rows,
                ctx.grid.cols
            );
            for (i, p) in ctx.place_positions.iter().enumerate() {
                info!("    {:3}: [{:.3}, {:.3}, {:.3}] mm", i, p.x, p.y, p.z);
            }
            Ok(())
        }
        Tc::Transform(d) => report_transform(ds, d),
    };

    match result {
        Ok(()) => TcResponse::Ok,
        Err(reason) => {
            warn!("Cannot execute {:?}: {}", tc, reason);
            TcResponse::CannotExecute(reason)
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn report_transform(ds: &DataStore, d: &Detection) -> Result<(), String> {
    let frame = ds.cycle_mgr.frame();

    let point = coord_tf::to_robot_frame(&Point3::new(d.x_mm, d.y_mm, d.z_mm), frame)
        .map_err(|e| e.to_string())?;
    let heading_rad = coord_tf::heading_to_robot_frame(d.yaw_deg.to_radians(), frame)
        .map_err(|e| e.to_string())?;

    info!(
        "Sensor [{:.3}, {:.3}, {:.3}] mm, yaw {:.2} deg -> robot [{:.3}, {:.3}, {:.3}] mm, \
        heading {:.2} deg",
        d.x_mm,
        d.y_mm,
        d.z_mm,
        d.yaw_deg,
        point.x,
        point.y,
        point.z,
        heading_rad.to_degrees()
    );

    Ok(())
}
