//! Types shared by the crowdedness crates: configuration, the frame model and
//! the occupancy verdict.

pub mod config;
pub mod frame;
pub mod occupancy;
