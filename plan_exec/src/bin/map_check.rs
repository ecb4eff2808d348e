//! # Simple Map Check
//!
//! Loads the waypoint map named in the planner parameters and measures the
//! road frame round trip error at probes between each waypoint pair.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::Result;
use plan_lib::{planner::Params, road::RoadMap};
use util::{host, maths, params};

fn main() -> Result<()> {
    color_eyre::install()?;

    // Load the planner parameters and the map they point at
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

    let track_length_m = map.track_length_m();

    let mut max_s_err_m = 0f64;
    let mut max_d_err_m = 0f64;
    let mut sum_d_err_m = 0f64;
    let mut num_probes = 0;

    // Probe the round trip midway along each waypoint segment at each lane
    // centre
    for i in 0..map.num_waypoints() {
        let next = (i + 1) % map.num_waypoints();

        let wp = &map.waypoints()[i];
        let next_wp = &map.waypoints()[next];

        let gap_m = maths::rem_euclid(next_wp.s_m - wp.s_m, track_length_m);
        let s_mid_m = maths::rem_euclid(wp.s_m + gap_m / 2.0, track_length_m);

        let seg = next_wp.pos_m - wp.pos_m;
        let heading_rad = seg.y.atan2(seg.x);

        for lane in 0..planner_params.num_lanes {
            let d_m = planner_params.lane_centre_m(lane);

            let coord = map.to_road(map.to_world(s_mid_m, d_m), heading_rad);

            // Wrap-aware s difference
            let mut s_err_m = (coord.s_m - s_mid_m).abs();
            if s_err_m > track_length_m / 2.0 {
                s_err_m = track_length_m - s_err_m;
            }

            let d_err_m = (coord.d_m - d_m).abs();

            max_s_err_m = max_s_err_m.max(s_err_m);
            max_d_err_m = max_d_err_m.max(d_err_m);
            sum_d_err_m += d_err_m;
            num_probes += 1;
        }
    }

    println!("Probed {} points", num_probes);
    println!("Max s round trip error: {:.6} m", max_s_err_m);
    println!(
        "Max d round trip error: {:.6} m (mean {:.6} m)",
        max_d_err_m,
        sum_d_err_m / (num_probes as f64)
    );

    Ok(())
}
