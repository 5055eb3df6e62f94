pub mod call;
pub mod engine;
pub mod log;
pub mod stats;
