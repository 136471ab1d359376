extern crate nalgebra as na;

pub mod observers;
pub mod postprocessing;
pub mod preprocessing;
pub mod sim;
