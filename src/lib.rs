//! Agent-based simulation of a managed fishery.

pub mod config;
pub mod decision;
pub mod engine;
pub mod finance;
pub mod fisher;
pub mod grid;
pub mod memory;
pub mod report;
pub mod resource;
pub mod stats;
pub mod trip;

pub use config::Config;
pub use engine::Simulation;
