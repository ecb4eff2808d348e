//! # Planner Benchmark

use criterion::{criterion_group, criterion_main, Criterion};
use nalgebra::{Point2, Vector2};

use comms_if::sim::SensedVehicle;
use plan_lib::{
    behavior,
    planner::Params,
    road::{RoadMap, Waypoint},
    synth::{self, Trajectory},
};

/// Build a circular track for the benchmarks, anticlockwise with radially
/// outward lateral unit vectors.
fn circle_map(radius_m: f64, num_waypoints: usize) -> RoadMap {
    let track_length_m = std::f64::consts::TAU * radius_m;

    let waypoints = (0..num_waypoints)
        .map(|i| {
            let theta_rad = std::f64::consts::TAU * (i as f64) / (num_waypoints as f64);
            Waypoint {
                pos_m: Point2::new(radius_m * theta_rad.cos(), radius_m * theta_rad.sin()),
                s_m: radius_m * theta_rad,
                d_unit: Vector2::new(theta_rad.cos(), theta_rad.sin()),
            }
        })
        .collect();

    RoadMap::from_waypoints(waypoints, track_length_m).unwrap()
}

fn planner_benchmark(c: &mut Criterion) {
    // ---- Build the map and parameters ----

    let map = circle_map(250.0, 64);

    let params = Params {
        map_file: String::new(),
        track_length_m: map.track_length_m(),
        lane_width_m: 4.0,
        num_lanes: 3,
        start_lane: 1,
        speed_limit_mph: 49.5,
        speed_step_mph: 0.224,
        front_gap_m: 30.0,
        rear_gap_m: 5.0,
        anchor_spacing_m: 30.0,
        plan_horizon_points: 50,
        tick_s: 0.02,
    };

    let pose_m = map.to_world(100.0, 6.0);
    let heading_rad = 100.0 / 250.0 + std::f64::consts::FRAC_PI_2;

    c.bench_function("RoadMap::to_road", |b| {
        b.iter(|| map.to_road(pose_m, heading_rad))
    });

    // ---- Behavior selection over a dozen sensed vehicles ----

    let vehicles: Vec<SensedVehicle> = (0..12)
        .map(|i| SensedVehicle {
            id: i,
            x_m: 0.0,
            y_m: 0.0,
            vx_ms: 15.0,
            vy_ms: 0.0,
            s_m: 50.0 * (i as f64),
            d_m: 2.0 + 4.0 * ((i % 3) as f64),
        })
        .collect();

    c.bench_function("behavior::select", |b| {
        b.iter(|| behavior::select(&vehicles, 47, 100.0, 1, 40.0, &params))
    });

    // ---- Synthesis continuing a partially consumed path ----

    let (full, _) = synth::synthesize(
        &map,
        &params,
        pose_m,
        heading_rad,
        &Trajectory::default(),
        100.0,
        1,
        40.0,
    );

    let mut prev = full;
    prev.points_m.drain(0..3);

    let last = prev.points_m[prev.len() - 1];
    let second_last = prev.points_m[prev.len() - 2];
    let end_yaw_rad = (last.y - second_last.y).atan2(last.x - second_last.x);
    let end_s_m = map.to_road(last, end_yaw_rad).s_m;

    c.bench_function("synth::synthesize", |b| {
        b.iter(|| synth::synthesize(&map, &params, pose_m, heading_rad, &prev, end_s_m, 1, 40.0))
    });
}

criterion_group!(benches, planner_benchmark);
criterion_main!(benches);
