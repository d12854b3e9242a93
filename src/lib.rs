pub mod algorithm;
pub mod graph;
pub mod mm;
pub mod polygon;
pub mod provider;
pub mod render;
pub mod utils;
