// Honey Duo - local AI family orchestration, training data and host monitoring
// Library exports

pub mod config;
pub mod dashboard;
pub mod errors;
pub mod family;
pub mod foundation;
pub mod logging;
pub mod migration;
pub mod monitor;
pub mod ollama;
pub mod orchestrator;
pub mod project;
pub mod training;
pub mod watcher;

pub use errors::ModelError;
pub use family::{Member, Roster};
