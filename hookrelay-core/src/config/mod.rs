//! Runtime configuration types for Hookrelay.
//!
//! These are the validated values the engine runs with. Parsing the TOML
//! file and reloading it on SIGHUP is the server crate's job.

mod config_store;
mod delivery;

pub use config_store::{ConfigStore, ConfigWatcher};
pub use delivery::{
    DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_ATTEMPTS, DEFAULT_USER_AGENT, DeliveryConfig,
};
