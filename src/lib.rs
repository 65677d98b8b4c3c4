//! UML trainer backend library: exercise grading, learner progress,
//! achievements and the HTTP / WebSocket surface over them.

pub mod achievements;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod logic;
pub mod persistence;
pub mod progress;
pub mod protocol;
pub mod routes;
pub mod seeds;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod tracker;
pub mod validate;

pub use routes::build_router;
pub use state::AppState;
