// Check contract and bounded task scheduling

pub mod executor;
pub mod scheduler;

pub use executor::*;
pub use scheduler::*;
