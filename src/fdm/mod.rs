pub mod aircraft;
pub mod atmosphere;
pub mod engine;
