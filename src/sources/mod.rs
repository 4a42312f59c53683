pub mod base;
pub mod memory;
pub mod yahoo;
