pub mod analyze;
pub mod columns;
pub mod ranges;
