//! # Synthetic drive rig
//!
//! Stands in for the simulator during development. The rig connects to the
//! planner's REP socket, feeds it synthetic telemetry, and marches the ego
//! vehicle down the trajectories it gets back, consuming a few points per
//! tick the way the real simulator does.
//!
//! A slow vehicle is placed in the start lane ahead of the ego so the
//! planner has something to overtake.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::Result;
use structopt::StructOpt;

use comms_if::{
    net::{zmq, MonitoredSocket, NetParams, SocketOptions},
    sim::{SensedVehicle, SimMessage, SimResponse, TelemetrySnapshot},
};
use plan_lib::{
    planner::Params,
    road::{RoadCoord, RoadMap},
    synth::{Trajectory, MPH_PER_MS},
};
use util::{host, maths, params};

use std::thread;
use std::time::Duration;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Speed of the scripted slow vehicle.
const SLOW_VEHICLE_SPEED_MS: f64 = 10.0;

/// Starting longitudinal position of the scripted slow vehicle.
const SLOW_VEHICLE_START_S_M: f64 = 200.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Synthetic drive rig which exercises the planner over the simulator link.
#[derive(Debug, StructOpt)]
#[structopt(name = "sim_rig")]
struct Opt {
    /// Number of planning cycles to march through before stopping
    #[structopt(long, default_value = "500")]
    cycles: usize,

    /// Number of trajectory points consumed per cycle
    #[structopt(long, default_value = "3")]
    consume: usize,

    /// Print the telemetry packets published by the planner
    #[structopt(long)]
    watch_tm: bool,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // Load the same parameter files the planner loads
    let net_params: NetParams = params::load("net.toml")?;
    let planner_params: Params = params::load("planner.toml")?;
    let root = host::get_highway_sw_root()?;

    let map = RoadMap::load(
        root.join(&planner_params.map_file),
        planner_params.track_length_m,
    )?;

    println!(
        "Loaded {} waypoints over a {:.3} m track",
        map.num_waypoints(),
        map.track_length_m()
    );

    // Create the context for zmq
    let ctx = zmq::Context::new();

    // Set the socket options
    let socket_options = SocketOptions {
        connect_timeout: 1000,
        heartbeat_ivl: 500,
        heartbeat_ttl: 1000,
        heartbeat_timeout: 1000,
        linger: 1,
        recv_timeout: 1000,
        send_timeout: 10,
        req_correlate: true,
        req_relaxed: true,
        ..Default::default()
    };

    println!("Connecting to the planner at {}", net_params.sim_client_endpoint);

    // Create the socket
    let socket = MonitoredSocket::new(
        &ctx,
        zmq::REQ,
        socket_options,
        &net_params.sim_client_endpoint
    )?;

    // Optional subscription to the planner's TM stream
    let tm_socket = match opt.watch_tm {
        true => {
            let s = MonitoredSocket::new(
                &ctx,
                zmq::SUB,
                SocketOptions {
                    block_on_first_connect: false,
                    recv_timeout: 1,
                    ..Default::default()
                },
                &net_params.tm_client_endpoint
            )?;
            s.set_subscribe(b"")?;
            Some(s)
        }
        false => None,
    };

    // Ego state, starting at rest on the start lane centre
    let start_d_m = planner_params.lane_centre_m(planner_params.start_lane);
    let mut pose_m = map.to_world(0.0, start_d_m);

    let seg = map.waypoints()[1].pos_m - map.waypoints()[0].pos_m;
    let mut yaw_rad = seg.y.atan2(seg.x);

    let mut speed_mph = 0.0;
    let mut prev_path = Trajectory::default();
    let mut end_path = RoadCoord { s_m: 0.0, d_m: 0.0 };

    let mut slow_vehicle_s_m = SLOW_VEHICLE_START_S_M;

    let mut cycle = 0;
    while cycle < opt.cycles {
        // If the socket isn't connected wait a bit, so we don't build up a
        // backlog of messages for zmq to flush at the planner all at once
        if !socket.connected() {
            println!("Waiting for connection");
            thread::sleep(Duration::from_millis(1000));
            continue;
        }

        let coord = map.to_road(pose_m, yaw_rad);

        // Build this tick's telemetry
        let vehicle_s_m = maths::rem_euclid(slow_vehicle_s_m, map.track_length_m());
        let vehicle_pos_m = map.to_world(vehicle_s_m, start_d_m);

        let (previous_path_x_m, previous_path_y_m) = prev_path.to_parallel();

        let snapshot = TelemetrySnapshot {
            x_m: pose_m.x,
            y_m: pose_m.y,
            s_m: coord.s_m,
            d_m: coord.d_m,
            yaw_deg: yaw_rad.to_degrees(),
            speed_mph,
            previous_path_x_m,
            previous_path_y_m,
            end_path_s_m: end_path.s_m,
            end_path_d_m: end_path.d_m,
            sensed_vehicles: vec![SensedVehicle {
                id: 0,
                x_m: vehicle_pos_m.x,
                y_m: vehicle_pos_m.y,
                vx_ms: SLOW_VEHICLE_SPEED_MS,
                vy_ms: 0.0,
                s_m: vehicle_s_m,
                d_m: start_d_m,
            }],
        };

        // Send the telemetry to the planner
        match socket.send(&SimMessage::Telemetry(snapshot).to_json()?, 0) {
            Ok(_) => (),
            Err(e) => {
                println!("could not send: {}", e);
                thread::sleep(Duration::from_millis(1000));
                continue;
            }
        }

        // Recieve the response from the planner
        let msg = match socket.recv_msg(0) {
            Ok(m) => m,
            Err(e) => {
                println!("could not read from the planner: {}", e);
                thread::sleep(Duration::from_millis(1000));
                continue;
            }
        };

        let trajectory = match SimResponse::from_json(msg.as_str().unwrap_or(""))? {
            SimResponse::Control { next_x_m, next_y_m } => {
                Trajectory::from_parallel(&next_x_m, &next_y_m)
            }
            SimResponse::Manual => {
                println!("Planner replied manual, stopping");
                break;
            }
        };

        if trajectory.is_empty() {
            println!("Planner returned an empty trajectory, stopping");
            break;
        }

        // March the ego down the first few points of the new plan, always
        // taking at least one so the rig can't stall in place
        let consume = opt.consume.max(1).min(trajectory.len());
        let consumed = &trajectory.points_m[..consume];

        let new_pose_m = consumed[consume - 1];
        let prev_point_m = if consume >= 2 {
            consumed[consume - 2]
        } else {
            pose_m
        };

        let step_m = (new_pose_m - prev_point_m).norm();
        if step_m > 1e-12 {
            yaw_rad = (new_pose_m.y - prev_point_m.y).atan2(new_pose_m.x - prev_point_m.x);
        }
        speed_mph = step_m / planner_params.tick_s * MPH_PER_MS;

        pose_m = new_pose_m;
        prev_path = Trajectory {
            points_m: trajectory.points_m[consume..].to_vec(),
        };

        // The unconsumed tail is what the planner sees as the previous path
        // next tick, so report its end in road coordinates
        end_path = match prev_path.len() {
            0 => RoadCoord { s_m: 0.0, d_m: 0.0 },
            1 => map.to_road(prev_path.points_m[0], yaw_rad),
            n => {
                let last = prev_path.points_m[n - 1];
                let second_last = prev_path.points_m[n - 2];

                let tail_step = last - second_last;
                let tail_yaw_rad = if tail_step.norm() > 1e-12 {
                    tail_step.y.atan2(tail_step.x)
                } else {
                    yaw_rad
                };

                map.to_road(last, tail_yaw_rad)
            }
        };

        // March the slow vehicle down its lane
        slow_vehicle_s_m += SLOW_VEHICLE_SPEED_MS * planner_params.tick_s;

        if cycle % 50 == 0 {
            println!(
                "cycle {:4}: s {:7.1} m, d {:5.2} m, {:5.1} mph",
                cycle, coord.s_m, coord.d_m, speed_mph
            );
        }

        // Print any TM the planner published
        if let Some(ref tm) = tm_socket {
            while let Ok(m) = tm.recv_msg(0) {
                if let Some(s) = m.as_str() {
                    println!("TM: {}", s);
                }
            }
        }

        thread::sleep(Duration::from_secs_f64(planner_params.tick_s));

        cycle += 1;
    }

    let final_coord = map.to_road(pose_m, yaw_rad);
    println!(
        "Rig complete after {} cycles: s {:.1} m, d {:.2} m, {:.1} mph",
        cycle, final_coord.s_m, final_coord.d_m, speed_mph
    );

    Ok(())
}
