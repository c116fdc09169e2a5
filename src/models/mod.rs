pub mod strategy;
pub mod trade;

pub use strategy::*;
pub use trade::*;
