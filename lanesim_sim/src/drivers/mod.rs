//! Ready-made scenario drivers.
//!
//! Each driver is generic over its viewer (and clock or encoder), so the
//! CLI runs them against real outputs while tests substitute recorders.

pub mod intersection;
pub mod video;

pub use intersection::{intersection_lane_corridors, intersection_params, run_intersection, IntersectionOptions};
pub use video::{run_video_rendering, VideoOptions};

use lanesim_core::ParameterServer;

/// Reads `simulation::step_time` and `simulation::real_time_factor`.
pub(crate) fn simulation_timing(params: &ParameterServer) -> (f64, f64) {
    let simulation = params.child("simulation");
    let step_time = simulation.get_real("step_time", "Step-time used in simulation", 0.2);
    let real_time_factor = simulation.get_real("real_time_factor", "execution in real-time or faster", 1.0);
    (step_time, real_time_factor)
}
