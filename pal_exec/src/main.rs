//! Main palletizer executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Telecommand processing and handling
//!         - Cycle manager processing, which drives the motion engine and the robot
//!         - Status archiving
//!
//! TCs are either read from a script given on the command line, or typed on stdin as command
//! lines (for example `detect 50 -30 0 --yaw-deg 15`).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use comms_if::tc::{Tc, TcResponse};
use pal_lib::{
    coord_tf::TransformFrame,
    cycle_mgr::{CycleMgr, CycleState},
    data_store::DataStore,
    motion_eng::MotionEng,
    sim_actuator::SimActuator,
    tc_processor,
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.02;

/// Number of cycles per second
const CYCLE_FREQUENCY_HZ: f64 = 1.0 / CYCLE_PERIOD_S;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "pal_exec", about = "Palletizer cell executable")]
struct Opt {
    /// TC script to execute. If not provided TCs are read from stdin.
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// Various sources for the telecommands incoming to the exec.
enum TcSource {
    Script(ScriptInterpreter),
    Stdin(Receiver<Tc>),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("pal_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(
        LevelFilter::Trace,
        &[("pal_lib::motion_eng", LevelFilter::Debug)],
        &session,
    )
    .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Palletizer Executable\n");
    info!(
        "Software root: {:?}",
        host::get_pal_sw_root().wrap_err("Failed to get the software root")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- INITIALISE TC SOURCE ----

    let mut tc_source = match opt.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} TCs\n",
                si.get_duration(),
                si.get_num_tcs()
            );

            TcSource::Script(si)
        }
        None => {
            info!("No script provided, TCs will be read from stdin\n");
            TcSource::Stdin(spawn_stdin_reader())
        }
    };

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let motion_eng =
        MotionEng::init("motion_eng.toml").wrap_err("Failed to initialise MotionEng")?;
    info!("MotionEng init complete");

    let frame = TransformFrame::init("coord_tf.toml").wrap_err("Failed to initialise CoordTf")?;
    info!("CoordTf init complete");

    let cycle_mgr = CycleMgr::init(
        "cycle_mgr.toml",
        motion_eng,
        frame,
        Box::new(SimActuator::new()),
    )
    .wrap_err("Failed to initialise CycleMgr")?;
    info!("CycleMgr init complete");

    let mut ds = DataStore::new(cycle_mgr);

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut end_of_input = false;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        ds.cycle_start(CYCLE_FREQUENCY_HZ);

        // ---- TELECOMMAND PROCESSING ----

        match tc_source {
            TcSource::Script(ref mut si) => match si.get_pending_tcs() {
                PendingTcs::None => (),
                PendingTcs::Some(tc_vec) => {
                    for tc in tc_vec.iter() {
                        exec_tc(&mut ds, tc);
                    }
                }
                PendingTcs::EndOfScript => {
                    if !end_of_input {
                        info!("End of TC script reached, waiting for the cycle to finish");
                    }
                    end_of_input = true;
                }
            },
            TcSource::Stdin(ref rx) => loop {
                match rx.try_recv() {
                    Ok(tc) => exec_tc(&mut ds, &tc),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        if !end_of_input {
                            info!("End of stdin reached, waiting for the cycle to finish");
                        }
                        end_of_input = true;
                        break;
                    }
                }
            },
        }

        // ---- CONTROL ALGORITHM PROCESSING ----

        ds.cycle_tm = Some(ds.cycle_mgr.step(ds.sim_time_s));

        // ---- TELEMETRY ----

        if let Some(tm) = ds.take_state_change() {
            session.save(format!("cycle_tm/{:08}.json", ds.num_cycles), tm);
        }

        if ds.is_1_hz_cycle && ds.cycle_mgr.state().is_active() {
            if let Some(ref tm) = ds.cycle_tm {
                debug!(
                    "{} box {}/{}",
                    tm.state, tm.current_box, tm.total_boxes
                );
            }
        }

        // Once no more TCs can arrive there's nothing left to do when the cycle isn't running
        if end_of_input && !ds.cycle_mgr.state().is_active() {
            info!("Cycle finished in {}", ds.cycle_mgr.state());
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        ds.cycle_end();
    }

    // ---- SHUTDOWN ----

    let tm = ds.cycle_mgr.status();
    if tm.state == CycleState::Fault {
        warn!("Exiting in fault: {}", tm.error.unwrap_or_default());
    }

    info!("End of execution");
    session.exit();

    Ok(())
}

/// Execute a TC, warning if it was rejected.
fn exec_tc(ds: &mut DataStore, tc: &Tc) {
    if let TcResponse::CannotExecute(reason) = tc_processor::exec(ds, tc) {
        debug!("TC rejected: {}", reason);
    }
}

/// Start a thread reading TC command lines from stdin.
///
/// The returned channel disconnects when stdin is closed.
fn spawn_stdin_reader() -> Receiver<Tc> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let stdin = io::stdin();

        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!("Cannot read from stdin: {}", e);
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match Tc::from_line(&line) {
                Ok(tc) => {
                    if tx.send(tc).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Could not parse TC: {}", e),
            }
        }
    });

    rx
}
