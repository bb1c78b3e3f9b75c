pub mod calibration;
pub mod classes;
pub mod collection;
pub mod colorize;
pub mod geometry;
pub mod qc;
