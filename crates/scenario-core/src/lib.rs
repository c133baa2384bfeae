//! Procedural road-network scenarios for driving-simulator test generation:
//! networks are grown point by point under geometric constraints, turned
//! into complete scenarios and evolved as a small population.

pub mod config;
pub mod error;
pub mod generator;
pub mod geometry;
pub mod individual;
pub mod intersection;
pub mod mutation;
pub mod network;
pub mod population;
pub mod retry;
pub mod road;
pub mod scenario;
pub mod spatial;
pub mod spline;
pub mod traffic_control;
pub mod validity;

pub use config::GeneratorConfig;
pub use error::{ConfigError, GenerationError, PopulationError, Rejection};
pub use individual::{IdCounters, Individual, Stage};
pub use population::{CycleTimings, Evaluator, Population};
