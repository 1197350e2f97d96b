pub mod cli;
pub mod control;
pub mod device;
pub mod error;
pub mod screen;
pub mod vision;
