pub mod engine;
pub mod outcome;

pub use engine::RangeEngine;
pub use outcome::{FlagResult, FlagStatus, FlaggedRecord};
