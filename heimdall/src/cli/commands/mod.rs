pub mod monitor;
pub mod reset;
