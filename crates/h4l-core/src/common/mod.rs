pub mod config;
pub mod constants;

pub use config::{ChargeGate, MassWindow, SelectionConfig, SelectionStrategy, ZWindowPolicy};
