pub mod board;
pub mod config;
pub mod constants;
pub mod ghost;
pub mod goals;
pub mod grid;
pub mod layout;
pub mod logging;
pub mod mode;
pub mod motion;
pub mod pathfind;
pub mod protocol;
pub mod types;
pub mod workers;
