//! Main planner executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Telemetry acquisition, either live from the simulator or from
//!           a replay script
//!         - Planner processing (behavior selection and trajectory
//!           synthesis)
//!         - Response to the simulator
//!         - Archive writing and telemetry output
//!
//! # Modules
//!
//! All modules (e.g. `planner`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use comms_if::{
    net::NetParams,
    sim::{SimMessage, SimResponse},
};
use plan_lib::{
    data_store::DataStore, sim_server::SimServer, tm_server::TmServer,
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::env;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::State,
    replay::{PendingTelemetry, TelemetryPlayer},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle, the simulator's control tick.
const CYCLE_PERIOD_S: f64 = 0.02;

/// Number of cycles per second
const CYCLE_FREQUENCY_HZ: f64 = 1.0 / CYCLE_PERIOD_S;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("plan_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Highway Planner Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE TELEMETRY SOURCE ----

    // The source determines whether telemetry comes live from the simulator
    // or from a replay script.
    let mut telemetry_source = TelemetrySource::None;
    let mut use_sim_server = false;

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    // If we have a single argument use it as the script path
    if args.len() == 2 {
        info!("Loading telemetry script from \"{}\"", &args[1]);

        // Load the telemetry player
        let player =
            TelemetryPlayer::new(&args[1]).wrap_err("Failed to load script")?;

        // Display some info
        info!(
            "Loaded script lasts {:.02} s and contains {} snapshots\n",
            player.get_duration(),
            player.get_num_snapshots()
        );

        // Set the player in the source
        telemetry_source = TelemetrySource::Replay(player);
    }
    // If no arguments then setup the simulator server
    else if args.len() == 1 {
        info!("No script provided, live telemetry from the simulator will be used\n");
        use_sim_server = true;
    }
    else {
        return Err(eyre!(
            "Expected either zero or one argument, found {}",
            args.len() - 1
        ));
    }

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    ds.planner
        .init("planner.toml", &session)
        .wrap_err("Failed to initialise Planner")?;
    info!("Planner init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = comms_if::net::zmq::Context::new();

    if use_sim_server {
        telemetry_source = TelemetrySource::Live(
            SimServer::new(&zmq_ctx, &net_params)
                .wrap_err("Failed to initialise the SimServer")?,
        );
        info!("SimServer initialised");
    }

    let mut tm_server = {
        let s = TmServer::new(&zmq_ctx, &net_params)
            .wrap_err("Failed to initialise TmServer")?;
        info!("TmServer initialised");
        s
    };

    info!("Network initialisation complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(CYCLE_FREQUENCY_HZ);

        // ---- TELEMETRY ACQUISITION AND PLANNING ----

        // Branch depending on the source
        match telemetry_source {
            // If no source no point in continuing so break
            TelemetrySource::None => {
                return Err(eyre!("No telemetry source present"))
            }

            TelemetrySource::Live(ref mut server) => {
                match server.recv_message() {
                    // No request within the receive timeout, the socket
                    // itself paces the loop while the simulator is away
                    None => continue,

                    Some(SimMessage::Manual) => {
                        debug!("Simulator is under manual control");

                        if let Err(e) = server.send_response(&SimResponse::Manual) {
                            warn!("Could not respond to the simulator: {}", e);
                        }

                        continue;
                    }

                    Some(SimMessage::Telemetry(snapshot)) => {
                        match ds.planner.proc(&snapshot) {
                            Ok((trajectory, report)) => {
                                ds.planner_status_rpt = report;

                                let (next_x_m, next_y_m) = trajectory.to_parallel();

                                if let Err(e) = server.send_response(
                                    &SimResponse::Control { next_x_m, next_y_m }
                                ) {
                                    warn!(
                                        "Could not send the trajectory to the \
                                        simulator: {}",
                                        e
                                    );
                                }
                            }
                            Err(e) => {
                                warn!("Error during Planner processing: {}", e);

                                // A response is still owed for the request
                                if let Err(e) =
                                    server.send_response(&SimResponse::Manual)
                                {
                                    warn!(
                                        "Could not respond to the simulator: {}",
                                        e
                                    );
                                }
                            }
                        }
                    }
                }
            }

            TelemetrySource::Replay(ref mut player) => match player.get_pending() {
                PendingTelemetry::None => (),
                PendingTelemetry::Some(snapshots) => {
                    for snapshot in snapshots.iter() {
                        match ds.planner.proc(snapshot) {
                            Ok((trajectory, report)) => {
                                ds.planner_status_rpt = report;

                                // Save the planned trajectory for offline
                                // inspection
                                session.save(
                                    format!(
                                        "trajectories/cycle_{:06}.json",
                                        ds.num_cycles
                                    ),
                                    trajectory,
                                );
                            }
                            Err(e) => {
                                warn!("Error during Planner processing: {}", e)
                            }
                        }
                    }
                }
                // Exit if end of script reached
                PendingTelemetry::EndOfScript => {
                    info!("End of telemetry script reached, stopping");
                    break;
                }
            },
        };

        // ---- WRITE ARCHIVES ----

        if let Err(e) = ds.planner.write() {
            warn!("Could not write the planner archives: {}", e);
        }

        // ---- TELEMETRY ----

        match tm_server.send(&ds) {
            Ok(_) => (),
            Err(e) => warn!("TmServer error: {}", e),
        };

        if ds.is_1_hz_cycle && ds.planner_status_rpt.trajectory_points > 0 {
            info!(
                "Cycle {}: {:?}, lane {}, ref speed {:.1} mph",
                ds.num_cycles,
                ds.planner_status_rpt.behavior,
                ds.planner_status_rpt.lane,
                ds.planner_status_rpt.ref_speed_mph
            );
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
                    cycle_dur.as_secs_f64()
                        - Duration::from_secs_f64(CYCLE_PERIOD_S).as_secs_f64()
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    // Let the save thread flush any pending trajectory files
    session.exit();

    info!("End of execution");

    Ok(())
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the telemetry incoming to the exec.
enum TelemetrySource {
    None,
    Live(SimServer),
    Replay(TelemetryPlayer),
}
