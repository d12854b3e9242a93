pub mod backend;
pub mod fmm;
pub mod import;
pub mod matcher;
pub mod model;
pub mod polyline;
pub mod segment;
pub mod speed;
pub mod traj;

pub use traj::*;
