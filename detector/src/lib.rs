//! Occupancy detection from a fixed camera: a temporal-average background
//! model, a change-ratio comparison and a two-signal crowdedness policy.

pub mod background;
pub mod classifier;
pub mod decision;
pub mod monitor;
pub mod source;
pub mod status;
