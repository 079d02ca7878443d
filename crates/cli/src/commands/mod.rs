pub mod costs;
pub mod monitor;
pub mod recommendations;
pub mod status;
