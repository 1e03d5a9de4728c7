pub mod fdm;
pub mod math;
pub mod parameters;
pub mod render;
pub mod units;
