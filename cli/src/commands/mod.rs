pub mod centers;
pub mod records;
