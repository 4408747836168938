pub mod error;
pub mod logging;
pub mod sim;
pub mod utils;

pub mod day09;
pub mod day10;
pub mod day11;

pub use error::{Error, Result};
