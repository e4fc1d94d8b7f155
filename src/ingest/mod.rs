pub mod reader;

pub use reader::{parse_reading, read_readings};
